//! Block-aligned output stream

use crate::block::BLOCK_SIZE;
use std::io::{self, Write};

/// Writer that tracks its position and zero-pads up to a target offset.
pub struct BlockWriter<W: Write> {
    inner: W,
    position: u64,
}

impl<W: Write> BlockWriter<W> {
    pub fn new(inner: W) -> Self {
        BlockWriter { inner, position: 0 }
    }

    /// Bytes written so far, padding included
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Zero-fill up to byte `target`. No-op when already past it.
    pub fn pad_to(&mut self, target: u64) -> io::Result<()> {
        const ZEROS: [u8; BLOCK_SIZE as usize] = [0u8; BLOCK_SIZE as usize];
        while self.position < target {
            let n = (target - self.position).min(BLOCK_SIZE) as usize;
            self.write_all(&ZEROS[..n])?;
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for BlockWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.position += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
