//! Storage configuration.

use std::path::PathBuf;

/// Configuration for the graph storage backend.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// RocksDB directory. `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,
    /// Block cache size in bytes (default: 64MB)
    pub block_cache_size: usize,
    /// Write buffer size in bytes (default: 16MB)
    pub write_buffer_size: usize,
    /// fsync after each write (default: true)
    pub sync_writes: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            block_cache_size: 64 * 1024 * 1024,
            write_buffer_size: 16 * 1024 * 1024,
            sync_writes: true,
        }
    }
}

impl StorageConfig {
    /// Durable store under `path`.
    pub fn persistent(path: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(path.into()),
            ..Default::default()
        }
    }

    /// Smaller buffers and no fsync, for tests.
    pub fn for_testing(path: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(path.into()),
            block_cache_size: 8 * 1024 * 1024,
            write_buffer_size: 4 * 1024 * 1024,
            sync_writes: false,
        }
    }
}
