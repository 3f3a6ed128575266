//! Single-move execution.
//! Claims the destination name atomically, renames when possible, falls back
//! to a durable copy+verify+delete across volumes, and short-circuits when
//! byte-identical content already landed at the destination.
//!
//! Notes:
//! - The destination name is claimed with an O_EXCL placeholder before any
//!   rename, so two workers colliding on the same name can never overwrite
//!   each other; the loser simply advances to the next numeric suffix.
//! - Busy-file rename failures retry with linear backoff before surfacing.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::checksum::{file_sha256, files_identical};
use crate::config::EngineConfig;
use crate::errors::BatchMoveError;

/// Numeric-suffix ceiling before the unique-id fallback kicks in.
const MAX_SUFFIX_ATTEMPTS: u32 = 100;

/// Random-suffix attempts before the move fails outright.
const UNIQUE_ID_ATTEMPTS: u32 = 3;

/// Free-space cushion demanded on top of the file size before a copy.
const SPACE_CUSHION: u64 = 4 * 1024 * 1024;

const COPY_BUF_SIZE: usize = 1024 * 1024; // 1 MiB buffers

/// What a successful execution did on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The file now lives at `final_destination` (possibly suffix-adjusted).
    Moved { final_destination: PathBuf },
    /// Identical content already existed at `existing`; the source was
    /// deleted and no new copy was created.
    SkippedDuplicate { existing: PathBuf },
}

/// Performs one file move with collision handling and cross-volume fallback.
#[derive(Debug, Clone)]
pub struct MoveExecutor {
    contention_attempts: u32,
    contention_base_delay: Duration,
}

impl MoveExecutor {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            contention_attempts: config.contention_attempts.max(1),
            contention_base_delay: config.contention_base_delay,
        }
    }

    /// Move `src` to `dest`, resolving name collisions. On success the file
    /// exists at the returned destination and no longer at `src`.
    pub fn execute(&self, src: &Path, dest: &Path) -> Result<MoveOutcome, BatchMoveError> {
        fs::symlink_metadata(src).map_err(|e| BatchMoveError::io("stat source", src, e))?;

        if src == dest {
            debug!(path = %src.display(), "source equals destination; nothing to move");
            return Ok(MoveOutcome::Moved {
                final_destination: dest.to_path_buf(),
            });
        }

        if let Some(existing) = self.find_existing_duplicate(src, dest)? {
            fs::remove_file(src)
                .map_err(|e| BatchMoveError::io("remove duplicate source", src, e))?;
            info!(src = %src.display(), existing = %existing.display(), "identical content already at destination; source removed");
            return Ok(MoveOutcome::SkippedDuplicate { existing });
        }

        let mut candidate = dest.to_path_buf();
        let mut n: u32 = 0;
        loop {
            match claim_destination_name(&candidate) {
                Ok(true) => {
                    self.move_into_place(src, &candidate)?;
                    return Ok(MoveOutcome::Moved {
                        final_destination: candidate,
                    });
                }
                Ok(false) => {
                    n += 1;
                    if n > MAX_SUFFIX_ATTEMPTS {
                        return self.unique_id_fallback(src, dest);
                    }
                    candidate = numbered_candidate(dest, n);
                }
                Err(e) => {
                    return Err(BatchMoveError::Io {
                        op: "claim destination name",
                        path: candidate,
                        source: e,
                    });
                }
            }
        }
    }

    /// Reverse-direction move used by rollback: `from` (the moved file) back
    /// to `to` (its original path). Refuses to clobber a reoccupied original.
    pub(crate) fn restore(&self, from: &Path, to: &Path) -> Result<(), BatchMoveError> {
        if to.exists() {
            return Err(BatchMoveError::DestinationConflict {
                dest: to.to_path_buf(),
            });
        }
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| BatchMoveError::io("recreate source directory", parent, e))?;
        }
        match claim_destination_name(to) {
            Ok(true) => self.move_into_place(from, to),
            Ok(false) => Err(BatchMoveError::DestinationConflict {
                dest: to.to_path_buf(),
            }),
            Err(e) => Err(BatchMoveError::Io {
                op: "claim original path",
                path: to.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Rename `src` onto an already-claimed placeholder, retrying transient
    /// contention and falling back to copy+verify+delete across volumes.
    fn move_into_place(&self, src: &Path, claimed: &Path) -> Result<(), BatchMoveError> {
        // Windows rename refuses to overwrite; clear our own placeholder first.
        #[cfg(windows)]
        if let Err(e) = fs::remove_file(claimed) {
            if e.kind() != io::ErrorKind::NotFound {
                return Err(BatchMoveError::io("clear destination placeholder", claimed, e));
            }
        }

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match fs::rename(src, claimed) {
                Ok(()) => {
                    debug!(src = %src.display(), dest = %claimed.display(), "renamed file atomically");
                    return Ok(());
                }
                Err(e) => match e.kind() {
                    io::ErrorKind::NotFound => {
                        cleanup_placeholder(claimed);
                        return Err(BatchMoveError::SourceMissing(src.to_path_buf()));
                    }
                    io::ErrorKind::PermissionDenied => {
                        if attempt >= self.contention_attempts {
                            cleanup_placeholder(claimed);
                            return Err(BatchMoveError::PermissionDenied {
                                path: src.to_path_buf(),
                                context: format!("rename still refused after {attempt} attempts: {e}"),
                            });
                        }
                        std::thread::sleep(self.contention_base_delay * attempt);
                    }
                    io::ErrorKind::WouldBlock | io::ErrorKind::ResourceBusy => {
                        if attempt >= self.contention_attempts {
                            cleanup_placeholder(claimed);
                            return Err(BatchMoveError::FileBusy {
                                path: src.to_path_buf(),
                                attempts: attempt,
                            });
                        }
                        std::thread::sleep(self.contention_base_delay * attempt);
                    }
                    _ => {
                        // Cross-device boundary or an unexpected code: take the
                        // durable copy path instead.
                        warn!(error = %e, src = %src.display(), "rename failed, using copy+verify+delete");
                        return self.copy_verify_delete(src, claimed);
                    }
                },
            }
        }
    }

    /// Copy to a temp name in the destination directory, fsync, compare
    /// checksums, rename into place, then delete the source.
    fn copy_verify_delete(&self, src: &Path, dest: &Path) -> Result<(), BatchMoveError> {
        let dest_dir = dest.parent().ok_or_else(|| {
            BatchMoveError::Operation(format!("destination has no parent: {}", dest.display()))
        })?;

        let required = fs::metadata(src)
            .map_err(|e| BatchMoveError::io("stat source", src, e))?
            .len();
        let available = fs2::available_space(dest_dir)
            .map_err(|e| BatchMoveError::io("query free space", dest_dir, e))?;
        if available < required.saturating_add(SPACE_CUSHION) {
            cleanup_placeholder(dest);
            return Err(BatchMoveError::NoSpace {
                required,
                available,
                dest: dest.to_path_buf(),
            });
        }

        let tmp = dest_dir.join(format!(".batch_move.{}.tmp", Uuid::new_v4().simple()));
        if let Err(e) = copy_streaming(src, &tmp) {
            let _ = fs::remove_file(&tmp);
            cleanup_placeholder(dest);
            return Err(BatchMoveError::Io {
                op: "copy to temporary file",
                path: tmp,
                source: e,
            });
        }

        let src_sum = file_sha256(src)?;
        let tmp_sum = file_sha256(&tmp)?;
        if src_sum != tmp_sum {
            let _ = fs::remove_file(&tmp);
            cleanup_placeholder(dest);
            return Err(BatchMoveError::ChecksumMismatch {
                src: src.to_path_buf(),
                dest: tmp,
            });
        }

        #[cfg(windows)]
        let _ = fs::remove_file(dest);

        if let Err(e) = fs::rename(&tmp, dest) {
            let _ = fs::remove_file(&tmp);
            cleanup_placeholder(dest);
            return Err(BatchMoveError::io("rename temporary into place", dest, e));
        }

        fs::remove_file(src).map_err(|e| BatchMoveError::io("remove source after copy", src, e))?;
        info!(src = %src.display(), dest = %dest.display(), bytes = required, "copied across volumes and removed source");
        Ok(())
    }

    /// Last resort once numeric suffixes are exhausted: short random id
    /// suffixes, a small fixed number of tries.
    fn unique_id_fallback(&self, src: &Path, dest: &Path) -> Result<MoveOutcome, BatchMoveError> {
        for _ in 0..UNIQUE_ID_ATTEMPTS {
            let id = Uuid::new_v4().simple().to_string();
            let candidate = suffixed_candidate(dest, &id[..8]);
            match claim_destination_name(&candidate) {
                Ok(true) => {
                    warn!(dest = %dest.display(), fallback = %candidate.display(), "numeric suffixes exhausted; using unique-id name");
                    self.move_into_place(src, &candidate)?;
                    return Ok(MoveOutcome::Moved {
                        final_destination: candidate,
                    });
                }
                Ok(false) => continue,
                Err(e) => {
                    return Err(BatchMoveError::Io {
                        op: "claim fallback destination name",
                        path: candidate,
                        source: e,
                    });
                }
            }
        }
        Err(BatchMoveError::DestinationConflict {
            dest: dest.to_path_buf(),
        })
    }

    /// Look for byte-identical content already present at the destination
    /// path or elsewhere in the destination directory (single level).
    fn find_existing_duplicate(
        &self,
        src: &Path,
        dest: &Path,
    ) -> Result<Option<PathBuf>, BatchMoveError> {
        if dest.is_file() && files_identical(src, dest)? {
            return Ok(Some(dest.to_path_buf()));
        }

        let Some(dir) = dest.parent() else {
            return Ok(None);
        };
        if !dir.is_dir() {
            return Ok(None);
        }

        let src_len = fs::metadata(src)
            .map_err(|e| BatchMoveError::io("stat source", src, e))?
            .len();

        let mut src_sum: Option<String> = None;
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
        {
            if let Some(name) = entry.file_name().to_str()
                && name.starts_with(".batch_move.")
            {
                continue; // our own transient artifacts
            }
            let Ok(meta) = entry.metadata() else { continue };
            if meta.len() != src_len {
                continue;
            }
            let path = entry.into_path();
            if path == src {
                continue;
            }
            if src_sum.is_none() {
                src_sum = Some(file_sha256(src)?);
            }
            match file_sha256(&path) {
                Ok(sum) if Some(&sum) == src_sum.as_ref() => return Ok(Some(path)),
                _ => continue,
            }
        }
        Ok(None)
    }
}

/// Atomically claim a destination name with an O_EXCL placeholder.
/// Ok(false) means someone else owns the name; pick another.
fn claim_destination_name(path: &Path) -> io::Result<bool> {
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e),
    }
}

fn cleanup_placeholder(path: &Path) {
    // Only remove what is still a zero-byte placeholder; a populated file
    // means the move actually landed.
    if let Ok(meta) = fs::metadata(path)
        && meta.is_file()
        && meta.len() == 0
    {
        let _ = fs::remove_file(path);
    }
}

/// "name.ext" -> "name_1.ext", "name_2.ext", ... Preserves non-UTF8 stems.
fn numbered_candidate(dest: &Path, n: u32) -> PathBuf {
    suffixed_candidate(dest, &n.to_string())
}

fn suffixed_candidate(dest: &Path, suffix: &str) -> PathBuf {
    let stem = dest
        .file_stem()
        .map(|s| s.to_owned())
        .unwrap_or_else(|| std::ffi::OsStr::new("file").to_owned());
    let ext = dest.extension().map(|e| e.to_owned());

    let mut name = std::ffi::OsString::new();
    name.push(&stem);
    name.push(format!("_{suffix}"));
    if let Some(ref e) = ext {
        name.push(".");
        name.push(e);
    }
    dest.with_file_name(name)
}

/// Buffered copy into a freshly created file (never clobbers), flushed and
/// fsynced before returning.
fn copy_streaming(src: &Path, dst: &Path) -> io::Result<u64> {
    let src_f = File::open(src)?;
    let dst_f = OpenOptions::new().write(true).create_new(true).open(dst)?;

    let mut reader = BufReader::with_capacity(COPY_BUF_SIZE, src_f);
    let mut writer = BufWriter::with_capacity(COPY_BUF_SIZE, dst_f);
    let bytes = io::copy(&mut reader, &mut writer)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(bytes)
}
