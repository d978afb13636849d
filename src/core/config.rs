//! Governor configuration, read from `trustgov.toml`.

use crate::core::error::GovernorError;
use crate::plugins::signal::{
    DEFAULT_APPROVE_PHRASES, DEFAULT_COMMAND_PREFIX, DEFAULT_REJECT_PHRASES, SignalClassifier,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "trustgov.toml";
pub const DEFAULT_STATE_FILE: &str = ".prompts/governor-state.local.md";
pub const DEFAULT_AUDIT_LOG: &str = ".prompts/governor.events.jsonl";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GovernorConfig {
    pub state_file: PathBuf,
    /// An empty path disables the audit trail.
    pub audit_log: Option<PathBuf>,
    pub lock_timeout_ms: u64,
    pub command_prefix: String,
    pub signals: SignalsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SignalsConfig {
    pub approve: Vec<String>,
    pub reject: Vec<String>,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            audit_log: Some(PathBuf::from(DEFAULT_AUDIT_LOG)),
            lock_timeout_ms: 2000,
            command_prefix: DEFAULT_COMMAND_PREFIX.to_string(),
            signals: SignalsConfig::default(),
        }
    }
}

impl Default for SignalsConfig {
    fn default() -> Self {
        Self {
            approve: DEFAULT_APPROVE_PHRASES.iter().map(|s| s.to_string()).collect(),
            reject: DEFAULT_REJECT_PHRASES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl GovernorConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn classifier(&self) -> Result<SignalClassifier, GovernorError> {
        SignalClassifier::new(
            &self.command_prefix,
            &self.signals.approve,
            &self.signals.reject,
        )
    }

    /// Relative paths in the config resolve against `base`.
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        if self.state_file.is_relative() {
            self.state_file = base.join(&self.state_file);
        }
        self.audit_log = match self.audit_log.take() {
            Some(log) if log.as_os_str().is_empty() => None,
            Some(log) if log.is_relative() => Some(base.join(log)),
            other => other,
        };
        self
    }
}

pub fn parse_config(content: &str) -> Result<GovernorConfig, GovernorError> {
    toml::from_str(content).map_err(|e| GovernorError::ConfigError(e.to_string()))
}

/// Load config from an explicit path, or from `trustgov.toml` in `dir`.
///
/// An explicit path must exist; the implicit file is optional and its
/// absence yields defaults.
pub fn load_config(explicit: Option<&Path>, dir: &Path) -> Result<GovernorConfig, GovernorError> {
    let (config_path, required) = match explicit {
        Some(path) => (path.to_path_buf(), true),
        None => (dir.join(CONFIG_FILE_NAME), false),
    };

    if !config_path.exists() {
        if required {
            return Err(GovernorError::NotFound(format!(
                "config file {}",
                config_path.display()
            )));
        }
        return Ok(GovernorConfig::default().resolve_paths(dir));
    }

    let content = fs::read_to_string(&config_path).map_err(GovernorError::IoError)?;
    let base = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(dir);
    Ok(parse_config(&content)?.resolve_paths(base))
}
