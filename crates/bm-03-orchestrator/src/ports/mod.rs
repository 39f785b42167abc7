pub mod inbound;
pub mod outbound;

pub use inbound::{OrchestratorApi, RegisterOutcome};
pub use outbound::{
    BatchInterpreter, EngineConfig, InterpretedSink, OrderingEngine, OrderingEngineFactory,
    RegistrationOutbox, Signature, SigningService,
};
