pub mod chain;
pub mod signing;
pub mod validation;

pub use chain::{check_round, links, resolve_prev};
pub use signing::{payload_key, sign_block, signing_payload, verify_block};
pub use validation::validate_structure;
