use crate::core::error;
use crate::core::record::Level;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A class of agent action that may require a human stop first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Checkpoint {
    IssueCreate,
    PrCreate,
    Merge,
    Release,
    ExternalComms,
    SpecChange,
}

/// Ordered from the first checkpoint earned away to the last one kept.
const ORDERED: [Checkpoint; 6] = [
    Checkpoint::IssueCreate,
    Checkpoint::PrCreate,
    Checkpoint::Merge,
    Checkpoint::Release,
    Checkpoint::ExternalComms,
    Checkpoint::SpecChange,
];

impl Checkpoint {
    pub fn slug(self) -> &'static str {
        match self {
            Checkpoint::IssueCreate => "issue-create",
            Checkpoint::PrCreate => "pr-create",
            Checkpoint::Merge => "merge",
            Checkpoint::Release => "release",
            Checkpoint::ExternalComms => "external-comms",
            Checkpoint::SpecChange => "spec-change",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Checkpoint::IssueCreate => "before issue creation",
            Checkpoint::PrCreate => "before PR creation",
            Checkpoint::Merge => "before merge",
            Checkpoint::Release => "before release",
            Checkpoint::ExternalComms => "before external communication",
            Checkpoint::SpecChange => "before spec change/deletion",
        }
    }

    pub fn all() -> &'static [Checkpoint] {
        &ORDERED
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Checkpoint {
    type Err = error::GovernorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        ORDERED
            .into_iter()
            .find(|cp| cp.slug() == wanted)
            .ok_or_else(|| {
                error::GovernorError::ValidationError(format!(
                    "unknown checkpoint '{}' (expected one of: {})",
                    s,
                    ORDERED.iter().map(|cp| cp.slug()).collect::<Vec<_>>().join(", ")
                ))
            })
    }
}

/// Mandatory human checkpoints for `level`, in order.
///
/// Every level keeps a strict suffix of the level below's list, so earned
/// trust only ever removes stops.
pub fn checkpoints_for(level: Level) -> &'static [Checkpoint] {
    let first_kept = match level {
        Level::Junior => 0,
        Level::Senior => 2,
        Level::Lead => 3,
        Level::Principal => 4,
    };
    &ORDERED[first_kept..]
}

pub fn requires_review(level: Level, checkpoint: Checkpoint) -> bool {
    checkpoints_for(level).contains(&checkpoint)
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "checkpoints",
        "version": "0.1.0",
        "description": "Level-gated human review checkpoints",
        "commands": [
            { "name": "gate", "description": "Check whether a checkpoint requires human review at the current level", "parameters": ["checkpoint"] }
        ],
        "checkpoints": ORDERED.iter().map(|cp| cp.slug()).collect::<Vec<_>>(),
    })
}
