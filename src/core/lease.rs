//! Exclusive, bounded-wait lease on the state record.
//!
//! The lease is an advisory OS lock on a `<state>.lock` sibling. The OS drops
//! the lock when the handle closes, so a crashed holder never wedges later
//! invocations. The lock file itself is left in place; removing it would let
//! a waiter lock an unlinked inode.

use crate::core::error;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(2000);

pub fn lock_path_for(state_path: &Path) -> PathBuf {
    let mut name = state_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "state".into());
    name.push(".lock");
    state_path.with_file_name(name)
}

/// Held for the full load-modify-save cycle; released on drop.
pub struct RecordLease {
    file: File,
    path: PathBuf,
}

impl RecordLease {
    /// Polls for the lock with jittered back-off until `timeout` elapses.
    pub fn acquire(state_path: &Path, timeout: Duration) -> Result<Self, error::GovernorError> {
        let path = lock_path_for(state_path);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(error::GovernorError::IoError)?;

        let started = Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(Self { file, path }),
                Err(err) if is_contended(&err) => {
                    let waited = started.elapsed();
                    if waited >= timeout {
                        return Err(error::GovernorError::LockTimeout {
                            path,
                            waited_ms: waited.as_millis() as u64,
                        });
                    }
                    let pause = Duration::from_millis(10 + jitter_ms(20));
                    std::thread::sleep(pause.min(timeout - waited));
                }
                Err(err) => return Err(error::GovernorError::IoError(err)),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RecordLease {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

fn jitter_ms(max_exclusive: u64) -> u64 {
    if max_exclusive <= 1 {
        return 0;
    }
    let now_ns = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos() as u64;
    now_ns % max_exclusive
}
