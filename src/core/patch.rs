//! In-place patching of component files

use crate::error::ResolveError;
use crate::position::Position;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::PathBuf;
use tracing::{debug, error};

/// Open component files for one patch phase.
///
/// Files are opened lazily on first write and kept until [`PatchWriter::close`]
/// (or drop). Nothing else may read the component files while a writer is
/// alive.
#[derive(Debug, Default)]
pub struct PatchWriter {
    handles: HashMap<PathBuf, File>,
    written: usize,
}

impl PatchWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite `bytes.len()` bytes at `pos`. Other bytes are left untouched.
    ///
    /// Component files must already exist; they are never created here.
    pub fn write(&mut self, pos: &Position, bytes: &[u8]) -> Result<(), ResolveError> {
        let fail = |source: io::Error| ResolveError::Patch {
            path: pos.stream.clone(),
            offset: pos.offset,
            source,
        };

        let file = match self.handles.entry(pos.stream.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .open(&pos.stream)
                    .map_err(fail)?;
                debug!("opened {:?} for patching", pos.stream);
                entry.insert(file)
            }
        };

        file.seek(SeekFrom::Start(pos.offset)).map_err(fail)?;
        file.write_all(bytes).map_err(fail)?;
        self.written += 1;
        Ok(())
    }

    /// Number of patches applied so far
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn open_files(&self) -> usize {
        self.handles.len()
    }

    /// Flush and release every handle.
    pub fn close(mut self) {
        for (path, mut file) in self.handles.drain() {
            if let Err(e) = file.flush() {
                error!("failed to flush {:?}: {}", path, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_patch_in_place() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("body");
        fs::write(&path, vec![0xffu8; 32]).unwrap();

        let mut writer = PatchWriter::new();
        writer.write(&Position::new(&path, 4), &[1, 2, 3]).unwrap();
        writer.write(&Position::new(&path, 20), &[9]).unwrap();
        assert_eq!(writer.open_files(), 1);
        assert_eq!(writer.written(), 2);
        writer.close();

        let data = fs::read(&path).unwrap();
        assert_eq!(data.len(), 32);
        assert_eq!(&data[0..4], &[0xff; 4]);
        assert_eq!(&data[4..7], &[1, 2, 3]);
        assert_eq!(data[7], 0xff);
        assert_eq!(data[20], 9);
    }

    #[test]
    fn test_missing_file_is_not_created() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing");

        let mut writer = PatchWriter::new();
        let err = writer.write(&Position::new(&path, 0), &[1]).unwrap_err();
        assert!(matches!(err, ResolveError::Patch { offset: 0, .. }));
        assert!(!path.exists());
    }
}
