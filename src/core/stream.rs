//! Logical component streams
//!
//! Most components are a single file. Search indexes are a family of level
//! files sharing a base name (`word.1`, `word.2`, ...) discovered on disk at
//! link time.

use crate::block::AddressEncoding;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// One level file of a sharded index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shard {
    pub path: PathBuf,
    pub level: u32,
}

/// A component's data, as configured for a slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogicalStream {
    Single(PathBuf),
    Sharded { dir: PathBuf, base: String },
}

impl LogicalStream {
    pub fn single<P: Into<PathBuf>>(path: P) -> Self {
        LogicalStream::Single(path.into())
    }

    /// Build a sharded stream from its base path (`dir/base`).
    pub fn sharded<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let base = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        LogicalStream::Sharded {
            dir: parent_dir(path),
            base,
        }
    }

    /// The configured path: the file itself, or `dir/base` for a sharded family.
    pub fn path(&self) -> PathBuf {
        match self {
            LogicalStream::Single(path) => path.clone(),
            LogicalStream::Sharded { dir, base } => dir.join(base),
        }
    }

    /// Whether `path` is exactly the configured file of this stream.
    pub fn is_exact(&self, path: &Path) -> bool {
        match self {
            LogicalStream::Single(own) => own == path,
            LogicalStream::Sharded { .. } => self.path() == path,
        }
    }

    /// Whether `path` names one of this stream's level files.
    ///
    /// Only the file name is compared, directories may be spelled differently
    /// by the encoder that recorded the reference.
    pub fn owns_shard(&self, path: &Path) -> bool {
        let LogicalStream::Sharded { base, .. } = self else {
            return false;
        };
        file_name(path)
            .as_deref()
            .and_then(parse_shard_name)
            .is_some_and(|(b, _)| b == base.as_str())
    }

    /// Address encoding used for references written into `path`, if `path`
    /// belongs to this stream.
    pub fn encoding_for(&self, path: &Path) -> Option<AddressEncoding> {
        if self.is_exact(path) {
            Some(AddressEncoding::Bcd)
        } else if self.owns_shard(path) {
            Some(AddressEncoding::Binary)
        } else {
            None
        }
    }

    /// Level files in ascending level order. Empty for a single-file stream.
    pub fn shards(&self) -> io::Result<Vec<Shard>> {
        match self {
            LogicalStream::Single(_) => Ok(Vec::new()),
            LogicalStream::Sharded { dir, base } => list_shards(dir, base),
        }
    }

    /// Physical files in concatenation order.
    ///
    /// Level files are written highest level first.
    pub fn files(&self) -> io::Result<Vec<PathBuf>> {
        match self {
            LogicalStream::Single(path) => Ok(vec![path.clone()]),
            LogicalStream::Sharded { .. } => Ok(self
                .shards()?
                .into_iter()
                .rev()
                .map(|shard| shard.path)
                .collect()),
        }
    }
}

/// Split `base.level` into its parts. The level must be a decimal integer.
pub fn parse_shard_name(name: &str) -> Option<(&str, u32)> {
    let (base, level) = name.rsplit_once('.')?;
    let level = level.parse().ok()?;
    Some((base, level))
}

/// List the level files of `base` in `dir`, sorted by ascending level.
pub fn list_shards(dir: &Path, base: &str) -> io::Result<Vec<Shard>> {
    let prefix = format!("{}.", base);
    let mut shards = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with(&prefix) {
            continue;
        }
        match parse_shard_name(&name) {
            Some((b, level)) if b == base => shards.push(Shard {
                path: entry.path(),
                level,
            }),
            _ => warn!("ignoring non-level file {:?} next to index {}", name, base),
        }
    }

    shards.sort_by(|a, b| a.level.cmp(&b.level).then_with(|| a.path.cmp(&b.path)));
    Ok(shards)
}

/// Directory holding `path`, `.` for a bare file name.
pub(crate) fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

pub(crate) fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}
