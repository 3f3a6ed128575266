//! Global batch mutation lock.
//! A sidecar lock file under the recovery directory ensures only one batch
//! mutates the filesystem at a time, system-wide.
//!
//! Design:
//! - fs2 advisory exclusive lock on the file handle; bounded-wait polling
//!   rather than a blocking acquire so a stuck batch surfaces as
//!   BATCH_LOCK_TIMEOUT instead of hanging the caller.
//! - The guard releases on Drop, so the lock cannot leak on early returns or
//!   panics inside the owning batch.
//! - The owning batch id is written into the file for diagnostics.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{trace, warn};

use crate::errors::BatchMoveError;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// RAII guard held while the global batch lock is active.
#[derive(Debug)]
pub struct BatchLock {
    file: File,
    path: PathBuf,
    batch_id: String,
}

impl BatchLock {
    /// Attempt to take the single global lock, waiting at most `wait`.
    /// Returns `BatchLockTimeout` if another batch is already in flight; the
    /// caller must abort, never silently proceed.
    pub fn acquire(lock_path: &Path, batch_id: &str, wait: Duration) -> Result<Self, BatchMoveError> {
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| BatchMoveError::io("create lock directory", parent, e))?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(lock_path)
            .map_err(|e| BatchMoveError::io("open lock file", lock_path, e))?;

        let start = Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => break,
                Err(e)
                    if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() =>
                {
                    if start.elapsed() >= wait {
                        trace!(path = %lock_path.display(), waited_ms = start.elapsed().as_millis() as u64, "lock wait budget exhausted");
                        return Err(BatchMoveError::BatchLockTimeout {
                            lock_path: lock_path.to_path_buf(),
                        });
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(e) => return Err(BatchMoveError::io("lock batch lock file", lock_path, e)),
            }
        }

        // Record the owner for operators inspecting a wedged system.
        let _ = file.set_len(0);
        let _ = writeln!(file, "{batch_id}");

        trace!(path = %lock_path.display(), batch_id, waited_ms = start.elapsed().as_millis() as u64, "batch lock acquired");
        Ok(Self {
            file,
            path: lock_path.to_path_buf(),
            batch_id: batch_id.to_string(),
        })
    }

    /// Explicit release for callers that want the cleanup earlier than scope
    /// exit. Dropping the guard is equivalent.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for BatchLock {
    fn drop(&mut self) {
        if let Err(e) = fs2::FileExt::unlock(&self.file) {
            warn!(error = %e, path = %self.path.display(), "failed to unlock batch lock");
        }
        // Remove the on-disk lock file so completed batches don't leave a
        // stale `.batch_move.lock` behind. Best-effort: another waiter may
        // have already recreated it.
        let _ = std::fs::remove_file(&self.path);
        trace!(path = %self.path.display(), batch_id = %self.batch_id, "batch lock released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn second_acquire_times_out_while_held() {
        let td = tempdir().unwrap();
        let path = td.path().join(".batch_move.lock");

        let held = BatchLock::acquire(&path, "batch-1", Duration::from_millis(100)).unwrap();
        let err = BatchLock::acquire(&path, "batch-2", Duration::from_millis(120)).unwrap_err();
        assert_eq!(err.code(), "BATCH_LOCK_TIMEOUT");

        held.release();
        let again = BatchLock::acquire(&path, "batch-3", Duration::from_millis(100));
        assert!(again.is_ok());
    }

    #[test]
    fn lock_file_records_owner() {
        let td = tempdir().unwrap();
        let path = td.path().join(".batch_move.lock");
        let guard = BatchLock::acquire(&path, "owner-42", Duration::from_millis(50)).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("owner-42"));
        drop(guard);
    }
}
