//! Trust policy: signal classification, audit decay, the trust state
//! machine, and level-gated checkpoints.

pub mod checkpoints;
pub mod decay;
pub mod signal;
pub mod trust;
