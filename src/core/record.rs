//! The persisted trust record and its vocabulary.
//!
//! A `TrustRecord` is the only state the governor owns. Levels form a fixed,
//! ordered enumeration so that promotion and demotion are structural
//! comparisons rather than string lookups.

use crate::core::error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_TRUST: u8 = 15;
pub const MAX_TRUST: u8 = 100;

/// Autonomy tier, ordered from least to most independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
    Junior = 0,
    Senior = 1,
    Lead = 2,
    Principal = 3,
}

impl Level {
    pub const ALL: [Level; 4] = [Level::Junior, Level::Senior, Level::Lead, Level::Principal];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Level> {
        Self::ALL.get(index).copied()
    }

    /// Step function over the trust score: >=75 Principal, >=50 Lead,
    /// >=30 Senior, otherwise Junior.
    pub fn from_trust(trust: u8) -> Level {
        match trust {
            75.. => Level::Principal,
            50..=74 => Level::Lead,
            30..=49 => Level::Senior,
            _ => Level::Junior,
        }
    }

    /// The tier directly above, `None` at Principal.
    pub fn next(self) -> Option<Level> {
        Self::from_index(self.index() + 1)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Junior => "Junior",
            Level::Senior => "Senior",
            Level::Lead => "Lead",
            Level::Principal => "Principal",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = error::GovernorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Level::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| error::GovernorError::ValidationError(format!("unknown level '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// The agent is mid-task.
    #[default]
    Working,
    /// The agent stopped at a checkpoint and waits for the human.
    AwaitingHuman,
}

impl AgentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentStatus::Working => "working",
            AgentStatus::AwaitingHuman => "awaiting_human",
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentStatus {
    type Err = error::GovernorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "working" => Ok(AgentStatus::Working),
            "awaiting_human" | "awaitinghuman" => Ok(AgentStatus::AwaitingHuman),
            other => Err(error::GovernorError::ValidationError(format!(
                "unknown status '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustRecord {
    pub trust: u8,
    pub level: Level,
    pub status: AgentStatus,
    pub pending_promotion: Option<Level>,
    /// Kept verbatim; decay treats an unparseable value as "never touched".
    pub last_human_touch_at: Option<String>,
}

impl Default for TrustRecord {
    fn default() -> Self {
        Self {
            trust: DEFAULT_TRUST,
            level: Level::Junior,
            status: AgentStatus::Working,
            pending_promotion: None,
            last_human_touch_at: None,
        }
    }
}

impl TrustRecord {
    /// Level implied by the current score, ignoring confirmation state.
    pub fn calculated_level(&self) -> Level {
        Level::from_trust(self.trust)
    }

    /// Drops a pending promotion that is not exactly one tier above `level`.
    pub fn normalized(mut self) -> Self {
        self.trust = self.trust.min(MAX_TRUST);
        if self.pending_promotion.is_some() && self.pending_promotion != self.level.next() {
            self.pending_promotion = None;
        }
        self
    }
}

/// Clamps any integer score into `0..=100`.
pub fn clamp_trust(value: i64) -> u8 {
    value.clamp(0, MAX_TRUST as i64) as u8
}
