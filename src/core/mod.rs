//! Core modules for the governor's runtime.
//!
//! The trust record, its on-disk artifact and lease, configuration, the
//! audit trail, and the `Governor` that sequences a hook cycle.

pub mod audit;
pub mod config;
pub mod error;
pub mod governor;
pub mod lease;
pub mod output;
pub mod record;
pub mod store;
pub mod time;
