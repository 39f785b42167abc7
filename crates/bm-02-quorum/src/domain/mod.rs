//! Quorum domain: dependency assembly and the quorum gate.

pub mod assembler;
pub mod incoming;

pub use assembler::{as_dependency, assemble, bucket_by_hash, AssembledRoot};
pub use incoming::{incoming, missing_members, new_job, refresh_job, JobContext};
