//! Composition root: payload in, status text out.
//!
//! The governor wires the classifier, decay, and engine to a `RecordStore`
//! and renders the result. Policy lives in the plugins; this module only
//! sequences them.

use crate::core::audit::{AuditEvent, AuditLog};
use crate::core::error;
use crate::core::output;
use crate::core::record::TrustRecord;
use crate::core::store::RecordStore;
use crate::plugins::decay;
use crate::plugins::signal::{DEFAULT_COMMAND_PREFIX, Signal, SignalClassifier};
use crate::plugins::trust::{Notice, StatusReport, Transition, TrustEngine};
use chrono::{DateTime, Utc};
use serde::Deserialize;

pub const DEFAULT_ACTOR: &str = "human";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookPayload {
    #[serde(default)]
    pub prompt: String,
}

/// A missing or malformed payload is an empty prompt.
pub fn parse_payload(input: &str) -> HookPayload {
    if input.trim().is_empty() {
        return HookPayload::default();
    }
    match serde_json::from_str::<HookPayload>(input) {
        Ok(payload) => payload,
        Err(e) => {
            eprintln!("trustgov: ignoring malformed hook payload: {}", e);
            HookPayload::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct Evaluation {
    pub signal: Option<Signal>,
    pub notice: Notice,
    pub report: StatusReport,
    pub committed: bool,
}

impl Evaluation {
    pub fn render(&self, command_prefix: &str) -> String {
        output::render(self.notice.headline().as_deref(), &self.report, command_prefix)
    }
}

pub struct Governor<S: RecordStore> {
    store: S,
    classifier: SignalClassifier,
    engine: TrustEngine,
    audit: Option<AuditLog>,
    command_prefix: String,
    actor: String,
}

impl<S: RecordStore> Governor<S> {
    pub fn new(store: S, classifier: SignalClassifier) -> Self {
        Self {
            store,
            classifier,
            engine: TrustEngine::new(),
            audit: None,
            command_prefix: DEFAULT_COMMAND_PREFIX.to_string(),
            actor: DEFAULT_ACTOR.to_string(),
        }
    }

    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn with_command_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.command_prefix = prefix.into();
        self
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn command_prefix(&self) -> &str {
        &self.command_prefix
    }

    /// Full hook cycle against the wall clock. `None` means no record exists
    /// and nothing should be printed.
    pub fn handle_input(&self, input: &str) -> Result<Option<String>, error::GovernorError> {
        self.handle_input_at(input, Utc::now())
    }

    pub fn handle_input_at(
        &self,
        input: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, error::GovernorError> {
        let payload = parse_payload(input);
        Ok(self
            .evaluate_at(&payload.prompt, now)?
            .map(|evaluation| evaluation.render(&self.command_prefix)))
    }

    pub fn evaluate_at(
        &self,
        prompt: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Evaluation>, error::GovernorError> {
        let signal = self.classifier.classify(prompt);
        let engine = self.engine;
        self.commit("trust.hook", Some(signal), |record| {
            let decay = decay::decay(record.last_human_touch_at.as_deref(), now);
            engine.apply(record, signal, decay, now)
        })
    }

    /// The agent stops at a checkpoint and hands control to the human.
    pub fn request_review(&self) -> Result<Option<Evaluation>, error::GovernorError> {
        let engine = self.engine;
        self.commit("trust.await", None, |record| engine.request_review(record))
    }

    /// Read path only; never writes.
    pub fn status(&self) -> Result<Option<StatusReport>, error::GovernorError> {
        Ok(self
            .store
            .snapshot()?
            .map(|record| self.engine.status(&record)))
    }

    fn commit<F>(
        &self,
        op: &str,
        signal: Option<Signal>,
        step: F,
    ) -> Result<Option<Evaluation>, error::GovernorError>
    where
        F: FnOnce(&TrustRecord) -> Transition,
    {
        let outcome = self.store.transact_then(
            |record| {
                let transition = step(record);
                let persist = transition.changed.then(|| transition.record.clone());
                (persist, (record.clone(), transition))
            },
            // Still under the lease, so the trail follows commit order.
            |(before, transition): &(TrustRecord, Transition)| {
                self.record_audit(op, signal, &transition.notice, before, &transition.record)
            },
        )?;
        let Some((_, transition)) = outcome else {
            return Ok(None);
        };
        Ok(Some(Evaluation {
            signal,
            report: self.engine.status(&transition.record),
            notice: transition.notice,
            committed: transition.changed,
        }))
    }

    /// The mutation is already committed; a failing audit trail only warns.
    fn record_audit(
        &self,
        op: &str,
        signal: Option<Signal>,
        notice: &Notice,
        before: &TrustRecord,
        after: &TrustRecord,
    ) {
        use colored::Colorize;

        let Some(audit) = &self.audit else {
            return;
        };
        let event = AuditEvent::new(&self.actor, op, signal, notice, before, after);
        if let Err(e) = audit.append(&event) {
            eprintln!(
                "{} audit write to {} failed: {}",
                "⚠".bright_yellow(),
                audit.path().display(),
                e
            );
        }
    }
}
