//! Key-value backends.

pub mod memory;
#[cfg(feature = "rocksdb")]
pub mod rocksdb;

pub use memory::InMemoryKVStore;
#[cfg(feature = "rocksdb")]
pub use self::rocksdb::RocksDbStore;

use std::sync::Arc;

use crate::config::StorageConfig;
use crate::error::StoreResult;
use crate::ports::outbound::KeyValueStore;

/// Open the backend selected by `config`.
///
/// A configured `data_dir` needs the `rocksdb` feature.
pub fn open_backend(config: &StorageConfig) -> StoreResult<Arc<dyn KeyValueStore>> {
    match &config.data_dir {
        None => Ok(Arc::new(InMemoryKVStore::new())),
        #[cfg(feature = "rocksdb")]
        Some(_) => Ok(Arc::new(RocksDbStore::open(config)?)),
        #[cfg(not(feature = "rocksdb"))]
        Some(path) => Err(crate::error::StoreError::Unavailable(format!(
            "{} requires the rocksdb feature",
            path.display()
        ))),
    }
}
