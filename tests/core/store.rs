use std::fs;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use tempfile::tempdir;
use trustgov::core::error::GovernorError;
use trustgov::core::lease::{self, RecordLease};
use trustgov::core::record::{AgentStatus, Level, TrustRecord};
use trustgov::core::store::{FileStateStore, RecordStore, StoredRecord};

const ARTIFACT: &str = "---\ntrust: 0\nlevel: Junior\nstatus: working\npending_promotion: null\nlast_human_touch_at: null\nowner: ops-team\n---\n## Session log\n\n- started  \n- paused\n";

fn seeded(dir: &std::path::Path) -> FileStateStore {
    let path = dir.join(".prompts").join("governor-state.local.md");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, ARTIFACT).unwrap();
    FileStateStore::new(path)
}

fn bump(record: &TrustRecord) -> (Option<TrustRecord>, u8) {
    let mut next = record.clone();
    next.trust += 1;
    let trust = next.trust;
    (Some(next), trust)
}

#[test]
fn test_concurrent_transacts_lose_no_update() {
    let tmp = tempdir().unwrap();
    let store = seeded(tmp.path()).with_lock_timeout(Duration::from_secs(10));

    let threads = 8;
    let per_thread = 10;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let store = store.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..per_thread {
                    store.transact(bump).unwrap().unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let record = store.snapshot().unwrap().unwrap();
    assert_eq!(usize::from(record.trust), threads * per_thread);

    let content = fs::read_to_string(store.path()).unwrap();
    assert!(content.ends_with("---\n## Session log\n\n- started  \n- paused\n"));
    assert!(content.contains("owner: ops-team"));
}

#[test]
fn test_held_lease_times_out_without_touching_artifact() {
    let tmp = tempdir().unwrap();
    let store = seeded(tmp.path()).with_lock_timeout(Duration::from_millis(80));
    let before = fs::read_to_string(store.path()).unwrap();

    let held = RecordLease::acquire(store.path(), Duration::from_secs(1)).unwrap();
    let err = store.transact(bump).unwrap_err();
    match &err {
        GovernorError::LockTimeout { path, .. } => {
            assert_eq!(path, &lease::lock_path_for(store.path()));
        }
        other => panic!("expected LockTimeout, got {:?}", other),
    }
    assert!(err.is_retryable());
    assert_eq!(fs::read_to_string(store.path()).unwrap(), before);

    drop(held);
    assert_eq!(store.transact(bump).unwrap(), Some(1));
}

#[test]
fn test_lock_file_survives_release() {
    let tmp = tempdir().unwrap();
    let store = seeded(tmp.path());
    store.transact(bump).unwrap();
    assert!(lease::lock_path_for(store.path()).exists());
    store.transact(bump).unwrap();
    assert_eq!(store.snapshot().unwrap().unwrap().trust, 2);
}

#[test]
fn test_unchanged_record_is_not_rewritten() {
    let tmp = tempdir().unwrap();
    let store = seeded(tmp.path());
    let out = store.transact(|r| (Some(r.clone()), "same")).unwrap();
    assert_eq!(out, Some("same"));
    // Rendering would normalize the header; an untouched file keeps its bytes.
    assert_eq!(fs::read_to_string(store.path()).unwrap(), ARTIFACT);
}

#[test]
fn test_save_keeps_foreign_keys_in_order() {
    let tmp = tempdir().unwrap();
    let store = seeded(tmp.path());
    store
        .save(&TrustRecord {
            trust: 52,
            level: Level::Lead,
            status: AgentStatus::AwaitingHuman,
            pending_promotion: None,
            last_human_touch_at: Some("2026-10-19T12:00:00Z".to_string()),
        })
        .unwrap();

    let content = fs::read_to_string(store.path()).unwrap();
    let doc = StoredRecord::parse(&content);
    assert_eq!(doc.record.trust, 52);
    assert_eq!(doc.record.level, Level::Lead);
    assert_eq!(doc.record.status, AgentStatus::AwaitingHuman);

    let keys: Vec<&str> = doc.header.keys().filter_map(|k| k.as_str()).collect();
    assert_eq!(
        keys,
        vec![
            "trust",
            "level",
            "status",
            "pending_promotion",
            "last_human_touch_at",
            "owner"
        ]
    );
    assert_eq!(doc.body, "## Session log\n\n- started  \n- paused\n");
}

#[test]
fn test_artifact_without_header_gains_one() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("notes.md");
    fs::write(&path, "plain notes\n").unwrap();
    let store = FileStateStore::new(&path);

    let out = store.transact(bump).unwrap();
    assert_eq!(out, Some(16));

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("---\n"));
    assert!(content.ends_with("---\nplain notes\n"));
}

#[test]
fn test_duplicate_foreign_key_survives_mutation() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("state.md");
    fs::write(
        &path,
        "---\ntrust: 60\nlevel: Lead\nowner: ops\nowner: ops2\n---\n## Session log\n",
    )
    .unwrap();
    let store = FileStateStore::new(&path);

    let record = store.snapshot().unwrap().unwrap();
    assert_eq!(record.trust, 60);
    assert_eq!(record.level, Level::Lead);

    assert_eq!(store.transact(bump).unwrap(), Some(61));
    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("trust: 61\n"));
    assert!(content.contains("level: Lead\n"));
    assert!(content.contains("owner: ops\nowner: ops2\n"));
    assert!(content.ends_with("---\n## Session log\n"));
    assert_eq!(store.load().unwrap().trust, 61);
}

#[test]
fn test_commit_hook_runs_under_the_lease() {
    let tmp = tempdir().unwrap();
    let store = seeded(tmp.path());
    let mut contended = None;

    store
        .transact_then(bump, |trust| {
            let second = RecordLease::acquire(store.path(), Duration::from_millis(30));
            contended = Some((*trust, second.is_err()));
        })
        .unwrap();
    assert_eq!(contended, Some((1, true)));

    // Released once the transaction returns.
    assert!(RecordLease::acquire(store.path(), Duration::from_millis(30)).is_ok());
}
