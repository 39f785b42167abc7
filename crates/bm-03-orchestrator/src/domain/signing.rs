//! # Block Signing
//!
//! A block's signing key is the SHA-256 of its canonical payload
//! `(hash, node, round, previous_hash, attachment)`, bincode-encoded. The
//! signature covers that key under [`KeyPurpose::BlockGraph`].

use crate::error::{OrchestratorResult, ValidationError};
use crate::ports::outbound::SigningService;
use serde::Serialize;
use sha2::{Digest, Sha256};
use shared_types::{Attachment, BlockId, Hash, KeyPurpose, NodeId};

#[derive(Serialize)]
struct CanonicalPayload<'a, A> {
    hash: &'a Hash,
    node: &'a NodeId,
    round: u64,
    previous_hash: &'a Option<Hash>,
    attachment: &'a A,
}

/// Canonical bytes a block's signing key is derived from.
pub fn signing_payload<A: Attachment>(block: &BlockId<A>) -> Result<Vec<u8>, ValidationError> {
    bincode::serialize(&CanonicalPayload {
        hash: &block.hash,
        node: &block.node,
        round: block.round,
        previous_hash: &block.previous_hash,
        attachment: &block.signed.attachment,
    })
    .map_err(|e| ValidationError::Encoding(e.to_string()))
}

pub fn payload_key(payload: &[u8]) -> Hash {
    Sha256::digest(payload).into()
}

/// Derive the signing key of `block` and sign it in place.
pub async fn sign_block<A: Attachment>(
    block: &mut BlockId<A>,
    signer: &dyn SigningService,
) -> OrchestratorResult<()> {
    let key = payload_key(&signing_payload(block)?);
    let signature = signer.sign(&key, KeyPurpose::BlockGraph).await?;
    block.signed.key = key;
    block.signed.public_key = signature.public_key;
    block.signed.signature = signature.signature;
    Ok(())
}

/// Check that `block` is signed by its author and that its key and signature
/// match its payload.
pub fn verify_block<A: Attachment>(
    block: &BlockId<A>,
    signer: &dyn SigningService,
) -> Result<(), ValidationError> {
    let key = block.key();
    if !block.signed.is_signed() {
        return Err(ValidationError::MissingSignature { key });
    }
    if payload_key(&signing_payload(block)?) != block.signed.key {
        return Err(ValidationError::KeyMismatch { key });
    }
    if !signer.verify(
        &block.signed.key,
        &block.signed.public_key,
        &block.signed.signature,
        KeyPurpose::BlockGraph,
    ) {
        return Err(ValidationError::BadSignature { key });
    }
    if !signer.authorizes(&block.node, &block.signed.public_key) {
        return Err(ValidationError::ForeignKey { key });
    }
    Ok(())
}
