use crate::core::error;
use crate::core::record::{AgentStatus, Level, TrustRecord};
use crate::core::time;
use crate::plugins::signal::Signal;
use crate::plugins::trust::Notice;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only JSONL trail of committed trust mutations.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AuditEvent {
    pub ts: String,
    pub event_id: String,
    pub actor: String,
    pub op: String,
    pub signal: Option<Signal>,
    pub notice: serde_json::Value,
    pub trust_before: u8,
    pub trust_after: u8,
    pub level_before: Level,
    pub level_after: Level,
    pub pending_promotion: Option<Level>,
    pub status: AgentStatus,
}

impl AuditEvent {
    pub fn new(
        actor: &str,
        op: &str,
        signal: Option<Signal>,
        notice: &Notice,
        before: &TrustRecord,
        after: &TrustRecord,
    ) -> Self {
        Self {
            ts: time::now_epoch_z(),
            event_id: time::new_event_id(),
            actor: actor.to_string(),
            op: op.to_string(),
            signal,
            notice: serde_json::to_value(notice).unwrap_or(serde_json::Value::Null),
            trust_before: before.trust,
            trust_after: after.trust,
            level_before: before.level,
            level_after: after.level,
            pending_promotion: after.pending_promotion,
            status: after.status,
        }
    }
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, event: &AuditEvent) -> Result<(), error::GovernorError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(error::GovernorError::IoError)?;
        }
        let line = serde_json::to_string(event).map_err(|e| {
            error::GovernorError::ValidationError(format!("AUDIT_ENCODE_FAILED: {}", e))
        })?;
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(error::GovernorError::IoError)?;
        writeln!(f, "{}", line).map_err(error::GovernorError::IoError)?;
        Ok(())
    }

    /// Reads back every parseable event; malformed lines are skipped.
    pub fn read_all(&self) -> Result<Vec<AuditEvent>, error::GovernorError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(error::GovernorError::IoError(err)),
        };
        Ok(content
            .lines()
            .filter_map(|line| serde_json::from_str::<AuditEvent>(line).ok())
            .collect())
    }
}
