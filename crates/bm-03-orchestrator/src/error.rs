//! Error types for the orchestration subsystem

use bm_01_graph_storage::StoreError;
use bm_02_quorum::QuorumError;
use shared_types::{ContractViolation, GraphKey, KeyPurpose, NodeId};
use thiserror::Error;

/// Why a fragment was refused. The fragment never reaches the ordering engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Block {key} has no round assigned")]
    UnassignedRound { key: GraphKey },

    /// No stored predecessor and no `prev` linking back to one.
    #[error("Round gap at {key}")]
    RoundGap { key: GraphKey },

    #[error("Round {round} is ahead of last interpreted round {last_interpreted}")]
    RoundAhead { round: u64, last_interpreted: u64 },

    /// A different record already holds the natural key.
    #[error("Another record already holds {key}")]
    Conflict { key: GraphKey },

    #[error("Block {key} is not signed")]
    MissingSignature { key: GraphKey },

    #[error("Signing key of {key} does not match its payload")]
    KeyMismatch { key: GraphKey },

    #[error("Invalid signature on {key}")]
    BadSignature { key: GraphKey },

    /// Signed with a key that is not registered for the block's author.
    #[error("Block {key} is not signed by its author's key")]
    ForeignKey { key: GraphKey },

    #[error("Prev of {key} does not link to it")]
    BrokenPrev { key: GraphKey },

    #[error("Block {key} depends on its own author")]
    SelfDependency { key: GraphKey },

    #[error("Cannot encode signing payload: {0}")]
    Encoding(String),
}

impl ValidationError {
    /// Short label used for the rejection metric.
    pub fn reason(&self) -> &'static str {
        match self {
            ValidationError::UnassignedRound { .. } => "unassigned_round",
            ValidationError::RoundGap { .. } => "round_gap",
            ValidationError::RoundAhead { .. } => "round_ahead",
            ValidationError::Conflict { .. } => "conflict",
            ValidationError::MissingSignature { .. } => "missing_signature",
            ValidationError::KeyMismatch { .. } => "key_mismatch",
            ValidationError::BadSignature { .. } => "bad_signature",
            ValidationError::ForeignKey { .. } => "foreign_key",
            ValidationError::BrokenPrev { .. } => "broken_prev",
            ValidationError::SelfDependency { .. } => "self_dependency",
            ValidationError::Encoding(_) => "encoding",
        }
    }
}

/// Signing service failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignerError {
    #[error("No signing key for purpose {}", .0.label())]
    KeyUnavailable(KeyPurpose),

    #[error("Signing failed: {0}")]
    Failed(String),
}

/// Ordering engine failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("Engine refused {key}: {reason}")]
    Rejected { key: GraphKey, reason: String },

    #[error("Engine unavailable: {0}")]
    Unavailable(String),
}

/// External batch interpreter failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpretError {
    #[error("Batch rejected: {0}")]
    Rejected(String),

    #[error("Interpreter unavailable: {0}")]
    Unavailable(String),
}

/// Orchestration errors
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Malformed input, returned to the caller immediately
    #[error(transparent)]
    Contract(#[from] ContractViolation),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Quorum error: {0}")]
    Quorum(#[from] QuorumError),

    #[error("Signer error: {0}")]
    Signer(#[from] SignerError),

    #[error("Ordering engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Interpreter error: {0}")]
    Interpret(#[from] InterpretError),

    /// Drafts may only be submitted for the local node
    #[error("Draft authored by {author}, expected {local}")]
    ForeignDraft { author: NodeId, local: NodeId },

    #[error("Registration outbox error: {0}")]
    Outbox(String),

    /// The orchestrator's mailbox is closed
    #[error("Orchestrator for {0} stopped")]
    Stopped(String),
}

/// Result type for orchestration operations
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
