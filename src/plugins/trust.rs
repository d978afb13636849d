//! Trust engine: the state machine behind earned autonomy.
//!
//! Trust moves only when the agent is paused for a human (`AwaitingHuman`).
//! Losing a level is automatic; gaining one always waits for an explicit
//! human promote command.

use crate::core::record::{AgentStatus, Level, TrustRecord, clamp_trust};
use crate::core::time;
use crate::plugins::checkpoints::{self, Checkpoint};
use crate::plugins::signal::Signal;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const APPROVE_DELTA: i64 = 2;
pub const REJECT_DELTA: i64 = 3;

/// What a transition did, for rendering and audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    Promoted { from: Level, to: Level },
    PromotionDenied { level: Level },
    NoPendingPromotion,
    Demoted { from: Level, to: Level },
    PromotionPending { level: Level },
    Evaluated { trust_before: u8, trust_after: u8, decay: u32 },
    ReviewRequested,
    Unchanged,
}

impl Notice {
    /// One-line message shown to the human ahead of the status block, for
    /// outcomes they should not miss.
    pub fn headline(&self) -> Option<String> {
        match self {
            Notice::Promoted { from, to } => Some(format!("Promotion approved: {} -> {}", from, to)),
            Notice::PromotionDenied { level } => Some(format!("Promotion denied: {}", level)),
            Notice::NoPendingPromotion => Some("No pending promotion".to_string()),
            Notice::Demoted { from, to } => Some(format!("Demoted: {} -> {}", from, to)),
            Notice::ReviewRequested => Some("Awaiting human review".to_string()),
            Notice::PromotionPending { .. } | Notice::Evaluated { .. } | Notice::Unchanged => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub record: TrustRecord,
    pub notice: Notice,
    pub changed: bool,
}

/// Read-path view of a record: what the agent is allowed to do right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub level: Level,
    pub trust: u8,
    pub status: AgentStatus,
    pub checkpoints: Vec<Checkpoint>,
    pub pending_promotion: Option<Level>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TrustEngine;

impl TrustEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn apply(
        &self,
        record: &TrustRecord,
        signal: Signal,
        decay: u32,
        now: DateTime<Utc>,
    ) -> Transition {
        let mut next = record.clone();
        let notice = match signal {
            Signal::PromoteCommand => match next.pending_promotion.take() {
                Some(target) => {
                    let from = next.level;
                    next.level = target;
                    next.last_human_touch_at = Some(time::format_timestamp(now));
                    Notice::Promoted { from, to: target }
                }
                None => Notice::NoPendingPromotion,
            },
            Signal::DenyCommand => match next.pending_promotion.take() {
                Some(level) => {
                    next.last_human_touch_at = Some(time::format_timestamp(now));
                    Notice::PromotionDenied { level }
                }
                None => Notice::NoPendingPromotion,
            },
            Signal::Approve | Signal::Reject | Signal::Neutral
                if next.status == AgentStatus::AwaitingHuman =>
            {
                evaluate(&mut next, signal, decay, now)
            }
            _ => Notice::Unchanged,
        };
        Transition {
            changed: next != *record,
            record: next,
            notice,
        }
    }

    /// The agent stopped at a checkpoint; the next human prompt is scored.
    pub fn request_review(&self, record: &TrustRecord) -> Transition {
        let mut next = record.clone();
        let notice = if next.status == AgentStatus::Working {
            next.status = AgentStatus::AwaitingHuman;
            Notice::ReviewRequested
        } else {
            Notice::Unchanged
        };
        Transition {
            changed: next != *record,
            record: next,
            notice,
        }
    }

    pub fn status(&self, record: &TrustRecord) -> StatusReport {
        StatusReport {
            level: record.level,
            trust: record.trust,
            status: record.status,
            checkpoints: checkpoints::checkpoints_for(record.level).to_vec(),
            pending_promotion: record.pending_promotion,
        }
    }
}

fn evaluate(record: &mut TrustRecord, signal: Signal, decay: u32, now: DateTime<Utc>) -> Notice {
    let trust_before = record.trust;
    let delta = match signal {
        Signal::Approve => APPROVE_DELTA,
        Signal::Reject => -REJECT_DELTA,
        _ => 0,
    };
    let scored = clamp_trust(i64::from(record.trust) + delta);
    record.trust = clamp_trust(i64::from(scored) - i64::from(decay));

    let calculated = Level::from_trust(record.trust);
    let notice = if calculated < record.level {
        let from = record.level;
        record.level = calculated;
        record.pending_promotion = None;
        Notice::Demoted {
            from,
            to: calculated,
        }
    } else if calculated > record.level && record.pending_promotion.is_none() {
        // One tier at a time; `calculated > level` guarantees a next tier.
        record.pending_promotion = record.level.next();
        match record.pending_promotion {
            Some(level) => Notice::PromotionPending { level },
            None => Notice::Unchanged,
        }
    } else {
        Notice::Evaluated {
            trust_before,
            trust_after: record.trust,
            decay,
        }
    };

    record.status = AgentStatus::Working;
    record.last_human_touch_at = Some(time::format_timestamp(now));
    notice
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "trust",
        "version": "0.3.0",
        "description": "Earned trust score and human-confirmed autonomy levels",
        "commands": [
            { "name": "hook", "description": "Score a human prompt and print the trust status" },
            { "name": "status", "description": "Show the current trust status", "parameters": ["format"] },
            { "name": "await", "description": "Pause the agent for human review" }
        ],
        "levels": Level::ALL.iter().map(|l| l.as_str()).collect::<Vec<_>>(),
        "storage": ["governor-state.local.md", "governor.events.jsonl"]
    })
}
