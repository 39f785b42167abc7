//! # Dependency Assembler
//!
//! Turns a flat set of block-graph records into one rooted tree per root hash.
//!
//! Within a bucket the local node's lowest-round record becomes the root and
//! every record authored by another node is folded into it as a
//! [`Dependency`]. A bucket without a local record yields nothing: the node
//! has not authored or received its own leg of that conversation yet.

use shared_types::{BlockGraph, Dependency, Hash, NodeId};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A reconstructed root plus the ids of every record it absorbed.
#[derive(Debug, Clone)]
pub struct AssembledRoot<A> {
    pub root: BlockGraph<A>,
    /// Root id first, then every folded or already-present foreign record.
    pub consumed: Vec<Uuid>,
}

/// Group records by root hash.
pub fn bucket_by_hash<A>(records: Vec<BlockGraph<A>>) -> BTreeMap<Hash, Vec<BlockGraph<A>>> {
    let mut buckets: BTreeMap<Hash, Vec<BlockGraph<A>>> = BTreeMap::new();
    for record in records {
        buckets.entry(record.block.hash).or_default().push(record);
    }
    buckets
}

/// Snapshot of `record` suitable for embedding into another node's root.
pub fn as_dependency<A: Clone>(record: &BlockGraph<A>) -> Dependency<A> {
    Dependency {
        block: record.block.clone(),
        deps: record.deps.iter().map(|dep| dep.block.clone()).collect(),
        prev: record.prev.clone(),
    }
}

/// Assemble one root per bucket that contains a record authored by `local`.
pub fn assemble<A: Clone>(
    buckets: BTreeMap<Hash, Vec<BlockGraph<A>>>,
    local: &NodeId,
) -> Vec<AssembledRoot<A>> {
    buckets
        .into_values()
        .filter_map(|bucket| assemble_bucket(bucket, local))
        .collect()
}

fn assemble_bucket<A: Clone>(
    mut bucket: Vec<BlockGraph<A>>,
    local: &NodeId,
) -> Option<AssembledRoot<A>> {
    let root_index = bucket
        .iter()
        .enumerate()
        .filter(|(_, record)| record.block.node == *local)
        .min_by_key(|(_, record)| record.block.round)
        .map(|(index, _)| index)?;

    let mut root = bucket.swap_remove(root_index);
    let mut consumed = vec![root.id];

    for record in bucket.iter().filter(|r| r.block.node != *local) {
        let present = root
            .deps
            .iter()
            .any(|dep| dep.block.node == record.block.node && dep.block.round == record.block.round);
        if !present {
            root.deps.push(as_dependency(record));
        }
        consumed.push(record.id);
    }

    Some(AssembledRoot { root, consumed })
}
