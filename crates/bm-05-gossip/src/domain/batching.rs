//! Batch planning and reply reconciliation.

use shared_types::{BlockGraph, GossipReply, Hash};
use std::collections::BTreeSet;

/// Split `graphs` into batches of at most `batch_size`, keeping order.
pub fn plan_batches<A>(graphs: Vec<BlockGraph<A>>, batch_size: usize) -> Vec<Vec<BlockGraph<A>>> {
    let batch_size = batch_size.max(1);
    let mut batches = Vec::with_capacity(graphs.len().div_ceil(batch_size));
    let mut current = Vec::with_capacity(batch_size);
    for graph in graphs {
        current.push(graph);
        if current.len() == batch_size {
            batches.push(std::mem::replace(&mut current, Vec::with_capacity(batch_size)));
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

/// Hashes of `batch` that every peer accepted.
///
/// Hashes a peer reports but the batch never carried are ignored.
pub fn confirmed_hashes(batch: &[Hash], replies: &[GossipReply]) -> BTreeSet<Hash> {
    let mut confirmed: BTreeSet<Hash> = batch.iter().copied().collect();
    for reply in replies {
        let accepted: BTreeSet<&Hash> = reply.accepted.iter().collect();
        confirmed.retain(|hash| accepted.contains(hash));
    }
    confirmed
}
