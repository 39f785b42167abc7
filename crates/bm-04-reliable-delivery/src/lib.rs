//! # Reliable Delivery (bm-04)
//!
//! At-least-once handoff between a sender and a receiver that may lose,
//! reorder or replay messages.
//!
//! ```text
//! ReliableSender ── Delivery{id} ──→ ReliableReceiver ──→ DeliveryHandler
//!      ▲   │                              │ (once per sender and id)
//!      │   └── redeliver every 3s         │
//!      └──────────── Ack{id} ─────────────┘
//! ```
//!
//! The sender snapshots its pending set through `SnapshotStore`; `restore`
//! reloads the newest snapshot and redelivers what it holds.
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - ids, pending set, dedupe window, snapshots
//! - `ports/` - `DeliveryApi` (inbound); transports, handler, snapshot store (outbound)
//! - `adapters/` - in-process links, memory and key-value snapshot stores
//! - `service.rs` - `ReliableSender`, `ReliableReceiver`

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::{
    ack_link, delivery_link, AckLink, InMemorySnapshotStore, KvSnapshotStore, LinkTransport,
    LossyTransport,
};
pub use config::DeliveryConfig;
pub use domain::{Ack, Delivery, DeliveryId, DeliveryPayload, Snapshot};
pub use error::{DeliveryError, DeliveryResult};
pub use ports::{AckTransport, DeliveryApi, DeliveryHandler, DeliveryTransport, SnapshotStore};
pub use service::{ReliableReceiver, ReliableSender};
