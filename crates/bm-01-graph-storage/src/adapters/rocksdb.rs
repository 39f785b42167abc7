//! # RocksDB Storage Adapter
//!
//! Durable implementation of the `KeyValueStore` trait.
//!
//! ## Column Families
//!
//! - `graphs` - BlockGraph records
//! - `graph_index` - natural key, by-hash, and flag indexes
//! - `jobs` - Job records
//! - `interpreted` - interpreted BlockIds
//!
//! Keys are routed to a column family by their prefix, so atomic batches can
//! span record kinds.

use parking_lot::RwLock;
use rocksdb::{ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch, DB};
use std::sync::Arc;

use crate::config::StorageConfig;
use crate::domain::KeyPrefix;
use crate::error::{KVStoreError, StoreError, StoreResult};
use crate::ports::outbound::{BatchOperation, KeyValueStore, ScanResult};

pub const CF_GRAPHS: &str = "graphs";
pub const CF_GRAPH_INDEX: &str = "graph_index";
pub const CF_JOBS: &str = "jobs";
pub const CF_INTERPRETED: &str = "interpreted";
pub const CF_SNAPSHOTS: &str = "snapshots";

/// All column families used by the store
pub const COLUMN_FAMILIES: &[&str] = &[
    CF_GRAPHS,
    CF_GRAPH_INDEX,
    CF_JOBS,
    CF_INTERPRETED,
    CF_SNAPSHOTS,
];

fn column_family(key: &[u8]) -> &'static str {
    match KeyPrefix::of(key) {
        Some(KeyPrefix::Graph) => CF_GRAPHS,
        Some(KeyPrefix::Job) => CF_JOBS,
        Some(KeyPrefix::Interpreted) => CF_INTERPRETED,
        Some(KeyPrefix::Snapshot) => CF_SNAPSHOTS,
        _ => CF_GRAPH_INDEX,
    }
}

fn io_error(context: &str, e: rocksdb::Error) -> KVStoreError {
    KVStoreError::IOError {
        message: format!("RocksDB {} failed: {}", context, e),
    }
}

/// RocksDB-backed key-value store
pub struct RocksDbStore {
    db: Arc<RwLock<DB>>,
    sync_writes: bool,
}

impl RocksDbStore {
    /// Open or create the database under `config.data_dir`.
    pub fn open(config: &StorageConfig) -> StoreResult<Self> {
        let path = config
            .data_dir
            .as_ref()
            .ok_or_else(|| StoreError::Unavailable("no data_dir configured".to_string()))?;

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        block_opts.set_block_cache(&rocksdb::Cache::new_lru_cache(config.block_cache_size));
        opts.set_block_based_table_factory(&block_opts);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = COLUMN_FAMILIES
            .iter()
            .map(|name| {
                let mut cf_opts = Options::default();
                cf_opts.set_compression_type(rocksdb::DBCompressionType::Snappy);
                ColumnFamilyDescriptor::new(*name, cf_opts)
            })
            .collect();

        let db = DB::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| io_error("open", e))?;

        tracing::info!(path = %path.display(), "[bm-01] RocksDB store opened");

        Ok(Self {
            db: Arc::new(RwLock::new(db)),
            sync_writes: config.sync_writes,
        })
    }

    fn write_options(&self) -> rocksdb::WriteOptions {
        let mut write_opts = rocksdb::WriteOptions::default();
        write_opts.set_sync(self.sync_writes);
        write_opts
    }
}

macro_rules! cf_handle {
    ($db:expr, $key:expr) => {{
        let name = column_family($key);
        $db.cf_handle(name)
            .ok_or_else(|| KVStoreError::CorruptionError {
                message: format!("missing column family {}", name),
            })?
    }};
}

impl KeyValueStore for RocksDbStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        let db = self.db.read();
        let cf = cf_handle!(db, key);
        db.get_cf(cf, key).map_err(|e| io_error("get", e))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        let db = self.db.write();
        let cf = cf_handle!(db, key);
        db.put_cf_opt(cf, key, value, &self.write_options())
            .map_err(|e| io_error("put", e))
    }

    fn delete(&self, key: &[u8]) -> Result<(), KVStoreError> {
        let db = self.db.write();
        let cf = cf_handle!(db, key);
        db.delete_cf_opt(cf, key, &self.write_options())
            .map_err(|e| io_error("delete", e))
    }

    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        let db = self.db.write();
        let mut batch = WriteBatch::default();

        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    let cf = cf_handle!(db, &key);
                    batch.put_cf(cf, &key, &value);
                }
                BatchOperation::Delete { key } => {
                    let cf = cf_handle!(db, &key);
                    batch.delete_cf(cf, &key);
                }
            }
        }

        db.write_opt(batch, &self.write_options())
            .map_err(|e| io_error("batch write", e))
    }

    fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError> {
        let db = self.db.read();
        let cf = cf_handle!(db, key);
        db.get_pinned_cf(cf, key)
            .map(|v| v.is_some())
            .map_err(|e| io_error("exists check", e))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, KVStoreError> {
        let db = self.db.read();
        let cf = cf_handle!(db, prefix);
        let mut results = Vec::new();

        for item in db.iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward)) {
            let (key, value) = item.map_err(|e| io_error("scan", e))?;
            if !key.starts_with(prefix) {
                break;
            }
            results.push((key.to_vec(), value.to_vec()));
        }

        Ok(results)
    }
}
