//! # Chain Repair
//!
//! Every `(hash, node)` pair forms a chain of rounds `1, 2, 3, ...`. A block
//! at round `r > 1` must either carry a `prev` at round `r - 1` or have that
//! predecessor already stored.

use crate::error::ValidationError;
use shared_types::BlockId;

/// Whether `prev` is the immediate predecessor of `block` in its chain.
pub fn links<A>(prev: &BlockId<A>, block: &BlockId<A>) -> bool {
    prev.hash == block.hash
        && prev.node == block.node
        && prev.round.checked_add(1) == Some(block.round)
}

/// Decide the `prev` a block is stored with.
///
/// - rounds 0 and 1 have no predecessor
/// - a supplied `prev` that links is kept
/// - a broken `prev` is replaced by the stored predecessor
/// - without a supplied `prev` the stored predecessor is enough
/// - with neither, the chain has a gap
pub fn resolve_prev<A: Clone>(
    block: &BlockId<A>,
    supplied: Option<&BlockId<A>>,
    predecessor: Option<&BlockId<A>>,
) -> Result<Option<BlockId<A>>, ValidationError> {
    if block.round <= 1 {
        return Ok(None);
    }
    match (supplied, predecessor) {
        (Some(prev), _) if links(prev, block) => Ok(Some(prev.clone())),
        (Some(_), Some(stored)) => Ok(Some(stored.clone())),
        (None, Some(_)) => Ok(None),
        (_, None) => Err(ValidationError::RoundGap { key: block.key() }),
    }
}

/// A block may run at most one round ahead of what has been interpreted.
pub fn check_round(round: u64, last_interpreted: u64) -> Result<(), ValidationError> {
    if round > last_interpreted.saturating_add(1) {
        return Err(ValidationError::RoundAhead {
            round,
            last_interpreted,
        });
    }
    Ok(())
}
