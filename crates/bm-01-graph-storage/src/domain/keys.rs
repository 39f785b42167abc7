//! Key layout.
//!
//! | Prefix | Key | Value |
//! |--------|-----|-------|
//! | `g:` | `{id}` | `BlockGraph` |
//! | `n:` | `{hash}{node}{round be}` | `id` |
//! | `h:` | `{hash}{id}` | empty |
//! | `f:` | `{included}{replied}{id}` | empty |
//! | `j:` | `{hash}` | `Job` |
//! | `i:` | `{hash}{round be}{node}` | `BlockId` |
//! | `s:` | `{channel}/{sequence be}` | delivery snapshot |
//!
//! Big-endian rounds keep scans in round order.

use shared_types::{GraphKey, Hash, NodeId};
use uuid::Uuid;

/// Record kinds and their key prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPrefix {
    Graph,
    NaturalKey,
    ByHash,
    Flags,
    Job,
    Interpreted,
    Snapshot,
}

impl KeyPrefix {
    pub const ALL: [KeyPrefix; 7] = [
        KeyPrefix::Graph,
        KeyPrefix::NaturalKey,
        KeyPrefix::ByHash,
        KeyPrefix::Flags,
        KeyPrefix::Job,
        KeyPrefix::Interpreted,
        KeyPrefix::Snapshot,
    ];

    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            KeyPrefix::Graph => b"g:",
            KeyPrefix::NaturalKey => b"n:",
            KeyPrefix::ByHash => b"h:",
            KeyPrefix::Flags => b"f:",
            KeyPrefix::Job => b"j:",
            KeyPrefix::Interpreted => b"i:",
            KeyPrefix::Snapshot => b"s:",
        }
    }

    /// Prefix owning `key`, if any.
    pub fn of(key: &[u8]) -> Option<KeyPrefix> {
        Self::ALL
            .into_iter()
            .find(|prefix| key.starts_with(prefix.as_bytes()))
    }

    fn key(&self, parts: &[&[u8]]) -> Vec<u8> {
        let len = 2 + parts.iter().map(|p| p.len()).sum::<usize>();
        let mut key = Vec::with_capacity(len);
        key.extend_from_slice(self.as_bytes());
        for part in parts {
            key.extend_from_slice(part);
        }
        key
    }

    pub fn snapshot_key(channel: &str, sequence: u64) -> Vec<u8> {
        KeyPrefix::Snapshot.key(&[channel.as_bytes(), b"/", &sequence.to_be_bytes()])
    }

    /// Prefix of every snapshot of `channel`, in sequence order.
    pub fn snapshot_prefix(channel: &str) -> Vec<u8> {
        KeyPrefix::Snapshot.key(&[channel.as_bytes(), b"/"])
    }

    pub fn graph_key(id: &Uuid) -> Vec<u8> {
        KeyPrefix::Graph.key(&[id.as_bytes()])
    }

    pub fn natural_key(key: &GraphKey) -> Vec<u8> {
        KeyPrefix::NaturalKey.key(&[&key.hash, &key.node.0, &key.round.to_be_bytes()])
    }

    /// Prefix of every natural key for `(hash, node)`.
    pub fn chain_prefix(hash: &Hash, node: &NodeId) -> Vec<u8> {
        KeyPrefix::NaturalKey.key(&[hash, &node.0])
    }

    pub fn by_hash_key(hash: &Hash, id: &Uuid) -> Vec<u8> {
        KeyPrefix::ByHash.key(&[hash, id.as_bytes()])
    }

    pub fn by_hash_prefix(hash: &Hash) -> Vec<u8> {
        KeyPrefix::ByHash.key(&[hash])
    }

    pub fn flags_key(included: bool, replied: bool, id: &Uuid) -> Vec<u8> {
        KeyPrefix::Flags.key(&[&[included as u8, replied as u8], id.as_bytes()])
    }

    pub fn flags_prefix(included: bool, replied: bool) -> Vec<u8> {
        KeyPrefix::Flags.key(&[&[included as u8, replied as u8]])
    }

    pub fn job_key(hash: &Hash) -> Vec<u8> {
        KeyPrefix::Job.key(&[hash])
    }

    pub fn interpreted_key(hash: &Hash, round: u64, node: &NodeId) -> Vec<u8> {
        KeyPrefix::Interpreted.key(&[hash, &round.to_be_bytes(), &node.0])
    }

    pub fn interpreted_prefix(hash: &Hash) -> Vec<u8> {
        KeyPrefix::Interpreted.key(&[hash])
    }
}

/// Trailing 16 bytes of an index key, read as a record id.
pub fn trailing_id(key: &[u8]) -> Option<Uuid> {
    key.len()
        .checked_sub(16)
        .and_then(|start| Uuid::from_slice(&key[start..]).ok())
}

/// Round encoded in a natural key.
pub fn natural_key_round(key: &[u8]) -> Option<u64> {
    let start = 2 + 32 + 32;
    let bytes: [u8; 8] = key.get(start..start + 8)?.try_into().ok()?;
    Some(u64::from_be_bytes(bytes))
}
