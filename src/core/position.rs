//! Byte positions inside component streams

use crate::block::BLOCK_SIZE;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// A byte offset inside a named component file.
///
/// Used both for tag definitions (where a tag points) and for reference sites
/// (where a patch must be written).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub stream: PathBuf,
    pub offset: u64,
}

impl Position {
    pub fn new<P: Into<PathBuf>>(stream: P, offset: u64) -> Self {
        Position {
            stream: stream.into(),
            offset,
        }
    }

    pub fn stream(&self) -> &Path {
        &self.stream
    }

    /// Linear position in the linked book, given the start block of the
    /// component this position lives in.
    ///
    /// Block numbers count from the control header, so a component starting
    /// at block `S` begins at byte `(S - 1) * 2048` of the address space.
    pub fn absolute(&self, start_block: u64) -> u64 {
        start_block.saturating_sub(1) * BLOCK_SIZE + self.offset
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:#x}", self.stream.display(), self.offset)
    }
}
