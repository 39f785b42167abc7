//! # Structural Validation
//!
//! Checks a root before it is handed to the ordering engine.

use crate::domain::chain::links;
use crate::domain::signing::verify_block;
use crate::error::ValidationError;
use crate::ports::outbound::SigningService;
use shared_types::{Attachment, BlockGraph};

/// Signatures of the block, its `prev` (unless at round 0), and every
/// dependency; `prev` must link to the block; no dependency may share the
/// block's author.
pub fn validate_structure<A: Attachment>(
    graph: &BlockGraph<A>,
    signer: &dyn SigningService,
) -> Result<(), ValidationError> {
    let key = graph.key();
    verify_block(&graph.block, signer)?;

    if let Some(prev) = &graph.prev {
        if prev.round != 0 {
            verify_block(prev, signer)?;
        }
        if !links(prev, &graph.block) {
            return Err(ValidationError::BrokenPrev { key });
        }
    }

    for dep in &graph.deps {
        if dep.block.node == graph.block.node {
            return Err(ValidationError::SelfDependency { key });
        }
        verify_block(&dep.block, signer)?;
    }
    Ok(())
}
