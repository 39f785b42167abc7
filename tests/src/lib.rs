//! # Blockmania Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/      # Multi-node flows over the in-process network
//!     ├── cluster.rs    # N wired node runtimes sharing one network
//!     └── flows.rs      # Quorum, partition, and interpretation flows
//! tests/benches/
//! └── subsystem_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p bm-tests
//! cargo bench -p bm-tests
//! ```

pub mod integration;
