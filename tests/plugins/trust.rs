use chrono::{DateTime, TimeZone, Utc};
use trustgov::core::record::{AgentStatus, Level, TrustRecord};
use trustgov::plugins::checkpoints::{self, Checkpoint};
use trustgov::plugins::signal::{Signal, SignalClassifier};
use trustgov::plugins::trust::{Notice, TrustEngine};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
}

fn awaiting(trust: u8, level: Level) -> TrustRecord {
    TrustRecord {
        trust,
        level,
        status: AgentStatus::AwaitingHuman,
        ..TrustRecord::default()
    }
}

/// Drives one review cycle: pause, then score `signal`.
fn review(engine: &TrustEngine, record: &TrustRecord, signal: Signal) -> TrustRecord {
    let paused = engine.request_review(record).record;
    engine.apply(&paused, signal, 0, now()).record
}

#[test]
fn test_trust_is_clamped_at_both_ends() {
    let engine = TrustEngine::new();

    let mut record = TrustRecord {
        trust: 99,
        level: Level::Principal,
        ..TrustRecord::default()
    };
    for _ in 0..3 {
        record = review(&engine, &record, Signal::Approve);
    }
    assert_eq!(record.trust, 100);
    assert_eq!(record.level, Level::Principal);

    let mut record = TrustRecord {
        trust: 4,
        ..TrustRecord::default()
    };
    for _ in 0..3 {
        record = review(&engine, &record, Signal::Reject);
    }
    assert_eq!(record.trust, 0);
    assert_eq!(record.level, Level::Junior);
}

#[test]
fn test_promotion_waits_for_human_command() {
    let engine = TrustEngine::new();

    let scored = engine.apply(&awaiting(28, Level::Junior), Signal::Approve, 0, now());
    assert_eq!(scored.record.trust, 30);
    assert_eq!(scored.record.level, Level::Junior);
    assert_eq!(scored.record.pending_promotion, Some(Level::Senior));
    assert_eq!(
        scored.notice,
        Notice::PromotionPending {
            level: Level::Senior
        }
    );

    // More approvals do not promote on their own.
    let again = review(&engine, &scored.record, Signal::Approve);
    assert_eq!(again.level, Level::Junior);
    assert_eq!(again.pending_promotion, Some(Level::Senior));

    let promoted = engine.apply(&again, Signal::PromoteCommand, 0, now());
    assert_eq!(promoted.record.level, Level::Senior);
    assert_eq!(promoted.record.pending_promotion, None);
    assert_eq!(
        promoted.notice,
        Notice::Promoted {
            from: Level::Junior,
            to: Level::Senior
        }
    );
    assert!(promoted.changed);
}

#[test]
fn test_demotion_is_immediate_and_clears_pending() {
    let engine = TrustEngine::new();
    let record = TrustRecord {
        pending_promotion: Some(Level::Lead),
        ..awaiting(31, Level::Senior)
    };

    let t = engine.apply(&record, Signal::Reject, 0, now());
    assert_eq!(t.record.trust, 28);
    assert_eq!(t.record.level, Level::Junior);
    assert_eq!(t.record.pending_promotion, None);
    assert_eq!(t.record.status, AgentStatus::Working);
    assert_eq!(
        t.notice,
        Notice::Demoted {
            from: Level::Senior,
            to: Level::Junior
        }
    );
}

#[test]
fn test_large_jump_offers_only_the_next_tier() {
    let engine = TrustEngine::new();
    let t = engine.apply(&awaiting(74, Level::Junior), Signal::Approve, 0, now());
    assert_eq!(t.record.trust, 76);
    assert_eq!(t.record.pending_promotion, Some(Level::Senior));

    let t = engine.apply(&t.record, Signal::PromoteCommand, 0, now());
    assert_eq!(t.record.level, Level::Senior);

    // The next review queues the following tier.
    let next = review(&engine, &t.record, Signal::Neutral);
    assert_eq!(next.pending_promotion, Some(Level::Lead));
}

#[test]
fn test_deny_keeps_level_and_trust() {
    let engine = TrustEngine::new();
    let record = TrustRecord {
        trust: 33,
        pending_promotion: Some(Level::Senior),
        ..TrustRecord::default()
    };

    let t = engine.apply(&record, Signal::DenyCommand, 0, now());
    assert_eq!(t.record.level, Level::Junior);
    assert_eq!(t.record.trust, 33);
    assert_eq!(t.record.pending_promotion, None);
    assert_eq!(
        t.notice,
        Notice::PromotionDenied {
            level: Level::Senior
        }
    );

    let again = engine.apply(&t.record, Signal::DenyCommand, 0, now());
    assert_eq!(again.notice, Notice::NoPendingPromotion);
    assert!(!again.changed);
}

#[test]
fn test_decay_applies_only_when_scored() {
    let engine = TrustEngine::new();

    let working = TrustRecord {
        trust: 20,
        ..TrustRecord::default()
    };
    let t = engine.apply(&working, Signal::Approve, 5, now());
    assert!(!t.changed);
    assert_eq!(t.notice, Notice::Unchanged);

    let t = engine.apply(&awaiting(20, Level::Junior), Signal::Neutral, 3, now());
    assert_eq!(t.record.trust, 17);
    assert_eq!(
        t.notice,
        Notice::Evaluated {
            trust_before: 20,
            trust_after: 17,
            decay: 3
        }
    );

    // Decay alone can demote.
    let t = engine.apply(&awaiting(31, Level::Senior), Signal::Approve, 4, now());
    assert_eq!(t.record.trust, 29);
    assert_eq!(t.record.level, Level::Junior);
}

#[test]
fn test_classified_prompts_drive_the_engine() {
    let classifier = SignalClassifier::with_defaults().unwrap();
    let engine = TrustEngine::new();

    let mut record = awaiting(28, Level::Junior);
    record = engine
        .apply(&record, classifier.classify("LGTM, ship it"), 0, now())
        .record;
    assert_eq!(record.pending_promotion, Some(Level::Senior));

    record = engine
        .apply(&record, classifier.classify("/govern promote"), 0, now())
        .record;
    assert_eq!(record.level, Level::Senior);

    record = engine.request_review(&record).record;
    record = engine
        .apply(&record, classifier.classify("no, revert that"), 0, now())
        .record;
    assert_eq!(record.trust, 27);
    assert_eq!(record.level, Level::Junior);
}

#[test]
fn test_status_lists_checkpoints_for_level() {
    let engine = TrustEngine::new();

    let junior = engine.status(&TrustRecord::default());
    assert_eq!(junior.checkpoints, checkpoints::checkpoints_for(Level::Junior));
    assert_eq!(junior.checkpoints.len(), 6);

    let principal = engine.status(&TrustRecord {
        trust: 90,
        level: Level::Principal,
        ..TrustRecord::default()
    });
    assert_eq!(
        principal.checkpoints,
        vec![Checkpoint::ExternalComms, Checkpoint::SpecChange]
    );
    assert!(!checkpoints::requires_review(Level::Principal, Checkpoint::Merge));
    assert!(checkpoints::requires_review(Level::Lead, Checkpoint::Release));
}
