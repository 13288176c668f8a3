//! Resolution of references into multi-level search indexes
//!
//! An index component is a trie written one level per file. A reference from
//! a level file names a block *within its own level*; in the linked book the
//! levels are concatenated highest level first, so the level's real start is
//! the combined size of every level at or above it plus the index's own
//! start block.

use crate::block::BLOCK_SIZE;
use crate::error::ResolveError;
use crate::position::Position;
use crate::stream::{file_name, list_shards, parent_dir, parse_shard_name, LogicalStream};
use byteorder::{BigEndian, ByteOrder};
use std::fs;
use tracing::warn;

/// Translates level-relative index block numbers into book block numbers.
pub struct ShardedIndexResolver<'a> {
    indexes: Vec<(&'a LogicalStream, u64)>,
}

impl<'a> ShardedIndexResolver<'a> {
    /// `indexes` pairs each registered index stream with its start block.
    pub fn new<I>(indexes: I) -> Self
    where
        I: IntoIterator<Item = (&'a LogicalStream, u64)>,
    {
        ShardedIndexResolver {
            indexes: indexes.into_iter().collect(),
        }
    }

    /// Resolve the index reference written at `site` with target `tag`.
    ///
    /// `site` must be a level file `base.level` with `level > 0`, and `tag`
    /// a positive block number within that level.
    pub fn resolve(&self, site: &Position, tag: &str) -> Result<u64, ResolveError> {
        let name = file_name(&site.stream).unwrap_or_default();
        let (base, level) = match parse_shard_name(&name) {
            Some((base, level)) if level > 0 => (base, level),
            _ => return Err(ResolveError::InvalidIndexFile(name.clone())),
        };

        let block = match tag.parse::<i64>() {
            Ok(block) if block > 0 => block as u64,
            _ => return Err(ResolveError::InvalidIndexTag(tag.to_string())),
        };

        let dir = parent_dir(&site.stream);
        let shards = list_shards(&dir, base).unwrap_or_else(|e| {
            warn!("cannot list index files {:?} in {:?}: {}", base, dir, e);
            Vec::new()
        });

        let mut size = 0u64;
        for shard in shards.iter().rev() {
            if shard.level < level {
                break;
            }
            size += fs::metadata(&shard.path).map(|m| m.len()).unwrap_or_else(|e| {
                warn!("cannot stat {:?}: {}", shard.path, e);
                0
            });
        }

        let start = self
            .start_block_of(base)
            .ok_or_else(|| ResolveError::UnknownIndexBase(name.clone()))?;

        Ok(start + block + size / BLOCK_SIZE - 1)
    }

    fn start_block_of(&self, base: &str) -> Option<u64> {
        self.indexes.iter().find_map(|(stream, start)| match stream {
            LogicalStream::Sharded { base: b, .. } if b == base => Some(*start),
            _ => None,
        })
    }

    /// Index addresses are plain 4-byte big-endian block numbers.
    pub fn encode(block: u64) -> [u8; 4] {
        let mut buf = [0u8; 4];
        BigEndian::write_u32(&mut buf, block as u32);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_levels(dir: &Path, base: &str, sizes: &[usize]) {
        for (i, len) in sizes.iter().enumerate() {
            fs::write(dir.join(format!("{}.{}", base, i + 1)), vec![0u8; *len]).unwrap();
        }
    }

    #[test]
    fn test_level_offset_arithmetic() {
        let dir = TempDir::new().unwrap();
        write_levels(dir.path(), "word", &[100, 200, 50]);

        let word = LogicalStream::sharded(dir.path().join("word"));
        let resolver = ShardedIndexResolver::new([(&word, 7)]);

        let site = Position::new(dir.path().join("word.2"), 0);
        // 7 + floor((50 + 200) / 2048) + 5 - 1
        assert_eq!(resolver.resolve(&site, "5").unwrap(), 11);
    }

    #[test]
    fn test_full_levels_shift_lower_levels() {
        let dir = TempDir::new().unwrap();
        write_levels(dir.path(), "word", &[2048, 4096, 2048]);

        let word = LogicalStream::sharded(dir.path().join("word"));
        let resolver = ShardedIndexResolver::new([(&word, 2)]);

        let top = Position::new(dir.path().join("word.3"), 0);
        assert_eq!(resolver.resolve(&top, "1").unwrap(), 2 + 1 + 1 - 1);

        let bottom = Position::new(dir.path().join("word.1"), 0);
        assert_eq!(resolver.resolve(&bottom, "1").unwrap(), 2 + 4 + 1 - 1);
    }

    #[test]
    fn test_picks_matching_index() {
        let dir = TempDir::new().unwrap();
        write_levels(dir.path(), "word", &[10]);
        write_levels(dir.path(), "endword", &[10]);

        let word = LogicalStream::sharded(dir.path().join("word"));
        let endword = LogicalStream::sharded(dir.path().join("endword"));
        let resolver = ShardedIndexResolver::new([(&word, 2), (&endword, 30)]);

        let site = Position::new(dir.path().join("endword.1"), 0);
        assert_eq!(resolver.resolve(&site, "1").unwrap(), 30);
    }

    #[test]
    fn test_rejects_bad_level_and_tag() {
        let dir = TempDir::new().unwrap();
        write_levels(dir.path(), "word", &[10]);
        let word = LogicalStream::sharded(dir.path().join("word"));
        let resolver = ShardedIndexResolver::new([(&word, 2)]);

        let level_zero = Position::new(dir.path().join("word.0"), 0);
        assert!(matches!(
            resolver.resolve(&level_zero, "1"),
            Err(ResolveError::InvalidIndexFile(_))
        ));

        let no_level = Position::new(dir.path().join("word"), 0);
        assert!(matches!(
            resolver.resolve(&no_level, "1"),
            Err(ResolveError::InvalidIndexFile(_))
        ));

        let site = Position::new(dir.path().join("word.1"), 0);
        for tag in ["0", "-3", "abc", "", " 5", "5\n"] {
            assert!(matches!(
                resolver.resolve(&site, tag),
                Err(ResolveError::InvalidIndexTag(_))
            ));
        }
    }

    #[test]
    fn test_unregistered_base() {
        let dir = TempDir::new().unwrap();
        write_levels(dir.path(), "keyword", &[10]);
        let word = LogicalStream::sharded(dir.path().join("word"));
        let resolver = ShardedIndexResolver::new([(&word, 2)]);

        let site = Position::new(dir.path().join("keyword.1"), 0);
        assert!(matches!(
            resolver.resolve(&site, "1"),
            Err(ResolveError::UnknownIndexBase(_))
        ));
    }

    #[test]
    fn test_encode_is_raw_big_endian() {
        assert_eq!(ShardedIndexResolver::encode(0x0102_0304), [1, 2, 3, 4]);
        assert_eq!(ShardedIndexResolver::encode(12), [0, 0, 0, 12]);
    }
}
