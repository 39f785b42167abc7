//! # Outbound Ports (Driven Ports)
//!
//! Services the orchestrators depend on: signing, the ordering engine, the
//! external batch interpreter, and the queue registrations travel through.

use crate::error::{EngineError, InterpretError, OrchestratorResult, SignerError};
use async_trait::async_trait;
use shared_types::{
    Attachment, BlockGraph, Hash, InterpretedBatch, KeyPurpose, NodeId, RegisterMessage,
};
use std::sync::Arc;

/// A detached signature and the public key that verifies it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub public_key: Vec<u8>,
    pub signature: Vec<u8>,
}

/// Signing and verification service.
#[async_trait]
pub trait SigningService: Send + Sync {
    /// Sign `message` with the key held for `purpose`.
    async fn sign(&self, message: &[u8], purpose: KeyPurpose) -> Result<Signature, SignerError>;

    /// Verify `signature` over `message` for `purpose`.
    fn verify(
        &self,
        message: &[u8],
        public_key: &[u8],
        signature: &[u8],
        purpose: KeyPurpose,
    ) -> bool;

    /// Whether `author` signs block graphs with `public_key`.
    fn authorizes(&self, author: &NodeId, public_key: &[u8]) -> bool;
}

/// Seed configuration for one root's ordering engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub hash: Hash,
    pub node: NodeId,
    pub self_address: String,
    pub cluster_size: usize,
}

/// Receives the engine's ordered output, at most once per finalized round.
#[async_trait]
pub trait InterpretedSink<A: Attachment>: Send + Sync {
    async fn on_interpreted(&self, batch: InterpretedBatch<A>);
}

/// Consensus ordering engine for one root.
#[async_trait]
pub trait OrderingEngine<A: Attachment>: Send + Sync {
    async fn append(&self, graph: BlockGraph<A>) -> Result<(), EngineError>;
}

/// Builds one ordering engine per root.
pub trait OrderingEngineFactory<A: Attachment>: Send + Sync {
    fn create(
        &self,
        config: EngineConfig,
        sink: Arc<dyn InterpretedSink<A>>,
    ) -> Result<Arc<dyn OrderingEngine<A>>, EngineError>;
}

/// Application-level validation of an interpreted batch (coins, commitments).
#[async_trait]
pub trait BatchInterpreter<A: Attachment>: Send + Sync {
    async fn interpret(&self, hash: &Hash, graphs: &[BlockGraph<A>]) -> Result<(), InterpretError>;
}

/// Queue registrations are handed to before they reach the supervisor.
#[async_trait]
pub trait RegistrationOutbox: Send + Sync {
    async fn enqueue(&self, message: RegisterMessage) -> OrchestratorResult<()>;
}
