//! Sharded output directories
//!
//! Some raster stores slow down sharply once a single directory holds many
//! rasters. Outputs are therefore spread over sibling directories named
//! `stem`, `stem1`, `stem2`, ... each holding at most `capacity` entries.

use std::path::PathBuf;

/// Names shard directories under a common base
#[derive(Debug, Clone)]
pub struct ShardedNamer {
    base: PathBuf,
    stem: String,
    capacity: usize,
}

impl ShardedNamer {
    /// `capacity` of zero is treated as one entry per shard
    pub fn new(base: impl Into<PathBuf>, stem: impl Into<String>, capacity: usize) -> Self {
        Self {
            base: base.into(),
            stem: stem.into(),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Shard number holding entry `index`
    pub fn shard_of(&self, index: u64) -> u64 {
        index / self.capacity as u64
    }

    /// Directory of shard `shard`; shard 0 carries no suffix
    pub fn shard_dir(&self, shard: u64) -> PathBuf {
        if shard == 0 {
            self.base.join(&self.stem)
        } else {
            self.base.join(format!("{}{}", self.stem, shard))
        }
    }

    /// Directory holding entry `index`
    pub fn dir_for(&self, index: u64) -> PathBuf {
        self.shard_dir(self.shard_of(index))
    }
}

/// Running writer that moves to the next shard once the current one is full
#[derive(Debug, Clone)]
pub struct ShardCursor {
    namer: ShardedNamer,
    written: u64,
}

impl ShardCursor {
    pub fn new(namer: ShardedNamer) -> Self {
        Self { namer, written: 0 }
    }

    /// Directory the next entry should go to
    pub fn current_dir(&self) -> PathBuf {
        self.namer.dir_for(self.written)
    }

    /// Record one written entry
    pub fn advance(&mut self) {
        self.written += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shard_names() {
        let namer = ShardedNamer::new("/data/focal", "focal25_", 100);
        assert_eq!(namer.dir_for(7), PathBuf::from("/data/focal/focal25_"));
        assert_eq!(namer.dir_for(99), PathBuf::from("/data/focal/focal25_"));
        assert_eq!(namer.dir_for(100), PathBuf::from("/data/focal/focal25_1"));
        assert_eq!(namer.dir_for(250), PathBuf::from("/data/focal/focal25_2"));
    }

    #[test]
    fn test_zero_capacity() {
        let namer = ShardedNamer::new("b", "s", 0);
        assert_eq!(namer.capacity(), 1);
        assert_eq!(namer.shard_of(3), 3);
    }

    #[test]
    fn test_cursor_rotates() {
        let mut cursor = ShardCursor::new(ShardedNamer::new("out", "barrier", 2));
        assert_eq!(cursor.current_dir(), PathBuf::from("out/barrier"));
        cursor.advance();
        cursor.advance();
        assert_eq!(cursor.current_dir(), PathBuf::from("out/barrier1"));
    }
}
