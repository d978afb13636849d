use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GovernorError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Config error: {0}")]
    ConfigError(String),
    #[error("State record busy: lock on {} not acquired within {waited_ms}ms; retry", .path.display())]
    LockTimeout { path: PathBuf, waited_ms: u64 },
    #[error("Not found: {0}")]
    NotFound(String),
}

impl GovernorError {
    /// Only contention on the shared record is worth retrying as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GovernorError::LockTimeout { .. })
    }
}
