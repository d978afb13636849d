//! Classification of free-form human text into governance signals.
//!
//! Classification is an ordered rule table: the first rule whose pattern
//! matches decides the signal. Commands outrank feedback phrases, and
//! affirmative phrases outrank negative ones.

use crate::core::error;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Approve,
    Reject,
    PromoteCommand,
    DenyCommand,
    Neutral,
}

impl Signal {
    pub fn as_str(self) -> &'static str {
        match self {
            Signal::Approve => "approve",
            Signal::Reject => "reject",
            Signal::PromoteCommand => "promote_command",
            Signal::DenyCommand => "deny_command",
            Signal::Neutral => "neutral",
        }
    }

    pub fn is_command(self) -> bool {
        matches!(self, Signal::PromoteCommand | Signal::DenyCommand)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const DEFAULT_COMMAND_PREFIX: &str = "govern";

pub const DEFAULT_APPROVE_PHRASES: &[&str] = &[
    "lgtm",
    "ok",
    "okay",
    "continue",
    "go ahead",
    "proceed",
    "looks good",
    "ship it",
    "sounds good",
];

pub const DEFAULT_REJECT_PHRASES: &[&str] = &[
    "wrong", "redo", "no", "stop", "wait", "not that", "undo", "revert",
];

#[derive(Debug, Clone)]
struct SignalRule {
    pattern: Regex,
    signal: Signal,
}

#[derive(Debug, Clone)]
pub struct SignalClassifier {
    rules: Vec<SignalRule>,
}

impl SignalClassifier {
    /// Builds the rule table. `prefix` namespaces the commands
    /// (`/<prefix> promote`); the bare `/promote` form is always accepted.
    pub fn new(
        prefix: &str,
        approve: &[String],
        reject: &[String],
    ) -> Result<Self, error::GovernorError> {
        let mut rules = vec![
            SignalRule {
                pattern: command_pattern(prefix, "promote")?,
                signal: Signal::PromoteCommand,
            },
            SignalRule {
                pattern: command_pattern(prefix, "deny")?,
                signal: Signal::DenyCommand,
            },
        ];
        if let Some(pattern) = phrase_pattern(approve)? {
            rules.push(SignalRule {
                pattern,
                signal: Signal::Approve,
            });
        }
        if let Some(pattern) = phrase_pattern(reject)? {
            rules.push(SignalRule {
                pattern,
                signal: Signal::Reject,
            });
        }
        Ok(Self { rules })
    }

    pub fn with_defaults() -> Result<Self, error::GovernorError> {
        let approve: Vec<String> = DEFAULT_APPROVE_PHRASES.iter().map(|s| s.to_string()).collect();
        let reject: Vec<String> = DEFAULT_REJECT_PHRASES.iter().map(|s| s.to_string()).collect();
        Self::new(DEFAULT_COMMAND_PREFIX, &approve, &reject)
    }

    pub fn classify(&self, text: &str) -> Signal {
        if text.trim().is_empty() {
            return Signal::Neutral;
        }
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(text))
            .map(|rule| rule.signal)
            .unwrap_or(Signal::Neutral)
    }
}

/// A command may sit anywhere in the text, as long as its slash does not
/// continue a word or a path (`ok:/govern deny` counts, `a/b/promote` does not).
fn command_pattern(prefix: &str, verb: &str) -> Result<Regex, error::GovernorError> {
    let prefix = prefix.trim().trim_start_matches('/');
    let source = if prefix.is_empty() {
        format!(r"(?:^|[^\w/])/{}\b", verb)
    } else {
        format!(r"(?:^|[^\w/])/(?:{}\s+)?{}\b", regex::escape(prefix), verb)
    };
    build(&source)
}

fn phrase_pattern(phrases: &[String]) -> Result<Option<Regex>, error::GovernorError> {
    let alternatives: Vec<String> = phrases
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(regex::escape)
        .collect();
    if alternatives.is_empty() {
        return Ok(None);
    }
    build(&format!(r"\b(?:{})\b", alternatives.join("|"))).map(Some)
}

fn build(source: &str) -> Result<Regex, error::GovernorError> {
    RegexBuilder::new(source)
        .case_insensitive(true)
        .build()
        .map_err(|e| error::GovernorError::ConfigError(format!("invalid signal pattern: {}", e)))
}
