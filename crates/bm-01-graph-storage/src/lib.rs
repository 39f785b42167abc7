//! # Graph Storage (bm-01)
//!
//! Durable storage for the three record kinds of the replication layer:
//!
//! - **Block graphs**: one record per observed block, queried by id, by
//!   natural key `(hash, node, round)`, by root hash, and by the
//!   `included`/`replied` flags.
//! - **Jobs**: one quorum record per root hash.
//! - **Interpreted blocks**: blocks returned by the ordering engine, source of
//!   the last interpreted round per root.
//!
//! ## Invariants
//!
//! | Invariant | Enforced by |
//! |-----------|-------------|
//! | One record per natural key | `BlockGraphStore::put` returns `Conflict` |
//! | Flags only go false to true | `put` keeps stored flags, `set_*` are CAS |
//! | Locked jobs never unlock | `JobStore::put_job` / `update_status` |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - key layout and bincode record codec
//! - `ports/` - store APIs (inbound) and the key-value backend (outbound)
//! - `adapters/` - in-memory and RocksDB backends
//! - `service.rs` - `GraphStorageService` implementing every store API

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::{open_backend, InMemoryKVStore};
#[cfg(feature = "rocksdb")]
pub use adapters::RocksDbStore;
pub use config::StorageConfig;
pub use error::{KVStoreError, StoreError, StoreResult};
pub use ports::inbound::{BlockGraphStore, InterpretedStore, JobStore, StatusUpdate};
pub use ports::outbound::{BatchOperation, KeyValueStore};
pub use service::GraphStorageService;
