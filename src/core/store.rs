//! State storage for the trust record.
//!
//! The persisted artifact is a text file with a YAML front-matter header
//! followed by an opaque body owned by other tooling:
//!
//! ```text
//! ---
//! trust: 15
//! level: Junior
//! status: working
//! pending_promotion: null
//! last_human_touch_at: null
//! ---
//! <body, never touched>
//! ```
//!
//! Only the governor's own header keys are rewritten. Other keys keep their
//! values and order, and the body is written back byte-for-byte.

use crate::core::error;
use crate::core::lease::{self, RecordLease};
use crate::core::record::{AgentStatus, DEFAULT_TRUST, Level, TrustRecord, clamp_trust};
use serde_yaml::{Mapping, Value};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

const FENCE: &str = "---";
const KEY_TRUST: &str = "trust";
const KEY_LEVEL: &str = "level";
const KEY_STATUS: &str = "status";
const KEY_LEGACY_STATUS: &str = "last_status";
const KEY_PENDING: &str = "pending_promotion";
const KEY_LAST_TOUCH: &str = "last_human_touch_at";

/// Storage seam the governor runs against.
///
/// `transact_then` holds exclusive access for the whole read-modify-write.
/// The closure returns the record to persist (if any) and a value handed
/// back to the caller. A record equal to the loaded one is not rewritten.
/// `on_commit` runs only after a changed record was persisted, while
/// exclusive access is still held.
pub trait RecordStore {
    fn transact_then<R, F, C>(&self, f: F, on_commit: C) -> Result<Option<R>, error::GovernorError>
    where
        F: FnOnce(&TrustRecord) -> (Option<TrustRecord>, R),
        C: FnOnce(&R);

    fn transact<R, F>(&self, f: F) -> Result<Option<R>, error::GovernorError>
    where
        F: FnOnce(&TrustRecord) -> (Option<TrustRecord>, R),
    {
        self.transact_then(f, |_| {})
    }

    /// Current record without mutation; `None` when nothing is persisted.
    fn snapshot(&self) -> Result<Option<TrustRecord>, error::GovernorError> {
        self.transact(|record| (None, record.clone()))
    }
}

/// A parsed artifact: the typed record, the header it came from, and the
/// untouched body.
///
/// When the header is not a valid YAML mapping, `raw_header` keeps its text
/// and `header` holds only the owned keys recovered line by line. Rendering
/// then rewrites just those lines.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub record: TrustRecord,
    pub header: Mapping,
    pub raw_header: Option<String>,
    pub body: String,
}

impl StoredRecord {
    pub fn new(record: TrustRecord) -> Self {
        Self {
            record,
            header: Mapping::new(),
            raw_header: None,
            body: String::new(),
        }
    }

    /// Never fails: a missing header yields the default record and the whole
    /// content is treated as body. Malformed values degrade per field.
    pub fn parse(content: &str) -> Self {
        let Some((raw_header, body)) = split_front_matter(content) else {
            return Self {
                record: TrustRecord::default(),
                header: Mapping::new(),
                raw_header: None,
                body: content.to_string(),
            };
        };
        let (header, raw_header) = if raw_header.trim().is_empty() {
            (Mapping::new(), None)
        } else {
            match serde_yaml::from_str::<Value>(raw_header) {
                Ok(Value::Mapping(map)) => (map, None),
                _ => (recover_owned_keys(raw_header), Some(raw_header.to_string())),
            }
        };
        Self {
            record: record_from_header(&header),
            header,
            raw_header,
            body: body.to_string(),
        }
    }

    pub fn render(&self) -> Result<String, error::GovernorError> {
        let header_text = match &self.raw_header {
            Some(raw) => render_raw_header(raw, &self.record)?,
            None => {
                let mut header = self.header.clone();
                write_header(&mut header, &self.record);
                yaml_text_of(&Value::Mapping(header))?
            }
        };
        let mut out = String::with_capacity(header_text.len() + self.body.len() + 8);
        out.push_str(FENCE);
        out.push('\n');
        out.push_str(&header_text);
        if !header_text.is_empty() && !header_text.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(FENCE);
        out.push('\n');
        out.push_str(&self.body);
        Ok(out)
    }
}

fn yaml_text_of(value: &Value) -> Result<String, error::GovernorError> {
    serde_yaml::to_string(value).map_err(|e| {
        error::GovernorError::ValidationError(format!("STATE_HEADER_ENCODE_FAILED: {}", e))
    })
}

const OWNED_KEYS: [&str; 6] = [
    KEY_TRUST,
    KEY_LEVEL,
    KEY_STATUS,
    KEY_LEGACY_STATUS,
    KEY_PENDING,
    KEY_LAST_TOUCH,
];

/// `key: value` at column zero for one of the governor's own keys.
fn owned_entry(line: &str) -> Option<(&'static str, &str)> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.starts_with(char::is_whitespace) {
        return None;
    }
    let (key, rest) = line.split_once(':')?;
    if !(rest.is_empty() || rest.starts_with(char::is_whitespace)) {
        return None;
    }
    let key = OWNED_KEYS.into_iter().find(|owned| *owned == key.trim_end())?;
    Some((key, rest.trim()))
}

fn recover_owned_keys(raw: &str) -> Mapping {
    let mut header = Mapping::new();
    for line in raw.lines() {
        if let Some((key, value)) = owned_entry(line) {
            let value = serde_yaml::from_str::<Value>(value)
                .unwrap_or_else(|_| Value::String(value.to_string()));
            header.insert(key.into(), value);
        }
    }
    header
}

/// Rewrites owned lines in place, keeps every other line verbatim, and
/// appends owned keys the header did not have.
fn render_raw_header(raw: &str, record: &TrustRecord) -> Result<String, error::GovernorError> {
    let mut owned = Mapping::new();
    if raw.lines().any(|l| matches!(owned_entry(l), Some((KEY_LEGACY_STATUS, _)))) {
        owned.insert(KEY_LEGACY_STATUS.into(), Value::Null);
    }
    write_header(&mut owned, record);

    let mut written: Vec<&str> = Vec::new();
    let mut out = String::with_capacity(raw.len() + 64);
    for line in raw.split_inclusive('\n') {
        match owned_entry(line) {
            Some((key, _)) => {
                let value = owned.get(key).cloned().unwrap_or(Value::Null);
                out.push_str(&format!("{}: {}", key, yaml_text_of(&value)?.trim_end()));
                out.push_str(if line.ends_with("\r\n") { "\r\n" } else { "\n" });
                written.push(key);
            }
            None => out.push_str(line),
        }
    }
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    for (key, value) in &owned {
        let Some(key) = key.as_str() else { continue };
        if !written.contains(&key) {
            out.push_str(&format!("{}: {}\n", key, yaml_text_of(value)?.trim_end()));
        }
    }
    Ok(out)
}

fn split_front_matter(content: &str) -> Option<(&str, &str)> {
    let rest = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))?;
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == FENCE {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

fn record_from_header(header: &Mapping) -> TrustRecord {
    let trust = header
        .get(KEY_TRUST)
        .and_then(yaml_int)
        .map(clamp_trust)
        .unwrap_or(DEFAULT_TRUST);
    let level = header
        .get(KEY_LEVEL)
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<Level>().ok())
        .unwrap_or_else(|| Level::from_trust(trust));
    let status = header
        .get(KEY_STATUS)
        .or_else(|| header.get(KEY_LEGACY_STATUS))
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<AgentStatus>().ok())
        .unwrap_or_default();
    let pending_promotion = header
        .get(KEY_PENDING)
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<Level>().ok());
    let last_human_touch_at = header.get(KEY_LAST_TOUCH).and_then(yaml_text);

    TrustRecord {
        trust,
        level,
        status,
        pending_promotion,
        last_human_touch_at,
    }
    .normalized()
}

fn write_header(header: &mut Mapping, record: &TrustRecord) {
    header.insert(KEY_TRUST.into(), Value::from(u64::from(record.trust)));
    header.insert(KEY_LEVEL.into(), record.level.as_str().into());
    header.insert(KEY_STATUS.into(), record.status.as_str().into());
    if header.contains_key(KEY_LEGACY_STATUS) {
        header.insert(KEY_LEGACY_STATUS.into(), record.status.as_str().into());
    }
    header.insert(
        KEY_PENDING.into(),
        record
            .pending_promotion
            .map(|l| Value::from(l.as_str()))
            .unwrap_or(Value::Null),
    );
    header.insert(
        KEY_LAST_TOUCH.into(),
        record
            .last_human_touch_at
            .clone()
            .map(Value::String)
            .unwrap_or(Value::Null),
    );
}

fn yaml_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .ok()
            .or_else(|| s.trim().parse::<f64>().ok().map(|f| f as i64)),
        _ => None,
    }
}

fn yaml_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// File-backed store: one artifact, guarded by a sibling lock file.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
    lock_timeout: Duration,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_timeout: lease::DEFAULT_LOCK_TIMEOUT,
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Default record when the artifact or its header is missing.
    pub fn load(&self) -> Result<TrustRecord, error::GovernorError> {
        let _lease = self.lease()?;
        Ok(self
            .read_document()?
            .map(|doc| doc.record)
            .unwrap_or_default())
    }

    /// Rewrites the header only; the body and foreign header keys survive.
    pub fn save(&self, record: &TrustRecord) -> Result<(), error::GovernorError> {
        let _lease = self.lease()?;
        let mut doc = self
            .read_document()?
            .unwrap_or_else(|| StoredRecord::new(TrustRecord::default()));
        doc.record = record.clone();
        self.write_document(&doc)
    }

    /// Writes a default record unless an artifact already exists.
    pub fn create_if_missing(&self) -> Result<bool, error::GovernorError> {
        let _lease = self.lease()?;
        if self.exists() {
            return Ok(false);
        }
        self.write_document(&StoredRecord::new(TrustRecord::default()))?;
        Ok(true)
    }

    fn lease(&self) -> Result<RecordLease, error::GovernorError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(error::GovernorError::IoError)?;
        }
        RecordLease::acquire(&self.path, self.lock_timeout)
    }

    fn read_document(&self) -> Result<Option<StoredRecord>, error::GovernorError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(StoredRecord::parse(&content))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(error::GovernorError::IoError(err)),
        }
    }

    /// Atomically replaces the artifact via a `.tmp` sibling.
    fn write_document(&self, doc: &StoredRecord) -> Result<(), error::GovernorError> {
        let rendered = doc.render()?;
        let mut tmp_name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state".into());
        tmp_name.push(".tmp");
        let tmp = self.path.with_file_name(tmp_name);

        let write = || -> std::io::Result<()> {
            let mut file = File::create(&tmp)?;
            file.write_all(rendered.as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp, &self.path)
        };
        write().map_err(|err| {
            let _ = fs::remove_file(&tmp);
            error::GovernorError::IoError(err)
        })
    }
}

impl RecordStore for FileStateStore {
    fn transact_then<R, F, C>(&self, f: F, on_commit: C) -> Result<Option<R>, error::GovernorError>
    where
        F: FnOnce(&TrustRecord) -> (Option<TrustRecord>, R),
        C: FnOnce(&R),
    {
        if !self.exists() {
            return Ok(None);
        }
        let _lease = self.lease()?;
        let Some(mut doc) = self.read_document()? else {
            return Ok(None);
        };
        let (next, value) = f(&doc.record);
        if let Some(next) = next
            && next != doc.record
        {
            doc.record = next;
            self.write_document(&doc)?;
            on_commit(&value);
        }
        Ok(Some(value))
    }
}

/// In-process store for substituting the file artifact.
#[derive(Debug, Default)]
pub struct MemoryStore {
    record: Mutex<Option<TrustRecord>>,
    saves: Mutex<usize>,
    busy: bool,
}

impl MemoryStore {
    pub fn new(record: TrustRecord) -> Self {
        Self {
            record: Mutex::new(Some(record)),
            ..Self::default()
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// A store whose lock is never available.
    pub fn busy() -> Self {
        Self {
            record: Mutex::new(Some(TrustRecord::default())),
            busy: true,
            ..Self::default()
        }
    }

    pub fn current(&self) -> Option<TrustRecord> {
        self.record.lock().ok().and_then(|r| r.clone())
    }

    pub fn saves(&self) -> usize {
        self.saves.lock().map(|n| *n).unwrap_or(0)
    }
}

impl RecordStore for MemoryStore {
    fn transact_then<R, F, C>(&self, f: F, on_commit: C) -> Result<Option<R>, error::GovernorError>
    where
        F: FnOnce(&TrustRecord) -> (Option<TrustRecord>, R),
        C: FnOnce(&R),
    {
        if self.busy {
            return Err(error::GovernorError::LockTimeout {
                path: PathBuf::from("memory"),
                waited_ms: 0,
            });
        }
        let mut slot = self.record.lock().map_err(|_| {
            error::GovernorError::ValidationError("MemoryStore record lock poisoned".to_string())
        })?;
        let Some(current) = slot.as_ref() else {
            return Ok(None);
        };
        let (next, value) = f(current);
        if let Some(next) = next
            && next != *current
        {
            *slot = Some(next);
            if let Ok(mut saves) = self.saves.lock() {
                *saves += 1;
            }
            on_commit(&value);
        }
        Ok(Some(value))
    }
}
