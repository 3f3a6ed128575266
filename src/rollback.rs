//! Rollback of a partially completed batch.
//! Persists a recovery manifest before touching anything, then reverses
//! completed moves in reverse-completion order. One failed reversal never
//! stops the others; a clean rollback deletes the manifest, a partial one
//! leaves it on disk as the artifact for manual recovery.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::errors::BatchMoveError;
use crate::executor::MoveExecutor;
use crate::types::{CompletedOperation, ManifestStatus, RecoveryManifest, RollbackResult};

/// Summary of one rollback pass, folded into the batch report.
#[derive(Debug, Clone)]
pub struct RollbackSummary {
    pub reason: String,
    pub results: Vec<RollbackResult>,
    pub success_count: usize,
    pub fail_count: usize,
    pub recovery_path: PathBuf,
}

pub struct RollbackManager<'a> {
    recovery_dir: &'a Path,
    executor: &'a MoveExecutor,
}

impl<'a> RollbackManager<'a> {
    pub fn new(recovery_dir: &'a Path, executor: &'a MoveExecutor) -> Self {
        Self {
            recovery_dir,
            executor,
        }
    }

    /// Reverse `completed` in reverse order, restoring every file to its
    /// original source path. The manifest is written before the first
    /// reversal; if it cannot be persisted, nothing is reversed.
    pub fn roll_back(
        &self,
        batch_id: &str,
        reason: &str,
        completed: &[CompletedOperation],
    ) -> Result<RollbackSummary, BatchMoveError> {
        fs::create_dir_all(self.recovery_dir)
            .map_err(|e| BatchMoveError::io("create recovery directory", self.recovery_dir, e))?;
        let manifest_path = self.recovery_dir.join(format!("{batch_id}.json"));

        let mut manifest = RecoveryManifest {
            batch_id: batch_id.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            reason: reason.to_string(),
            status: ManifestStatus::Pending,
            operations: completed.to_vec(),
            results: Vec::new(),
        };
        write_manifest(&manifest_path, &manifest)?;
        info!(batch_id, reason, operations = completed.len(), manifest = %manifest_path.display(), "rollback started");

        let mut results = Vec::with_capacity(completed.len());
        let mut success_count = 0usize;
        let mut fail_count = 0usize;

        for op in completed.iter().rev() {
            match self.executor.restore(&op.final_destination, &op.source) {
                Ok(()) => {
                    success_count += 1;
                    info!(index = op.index, from = %op.final_destination.display(), to = %op.source.display(), "reversed");
                    results.push(RollbackResult {
                        index: op.index,
                        from: op.final_destination.clone(),
                        to: op.source.clone(),
                        success: true,
                        error: None,
                    });
                }
                Err(e) => {
                    fail_count += 1;
                    error!(index = op.index, from = %op.final_destination.display(), to = %op.source.display(), error = %e, "reversal failed");
                    results.push(RollbackResult {
                        index: op.index,
                        from: op.final_destination.clone(),
                        to: op.source.clone(),
                        success: false,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        if fail_count == 0 {
            if let Err(e) = fs::remove_file(&manifest_path) {
                warn!(error = %e, manifest = %manifest_path.display(), "clean rollback but manifest removal failed");
            }
            info!(batch_id, reversed = success_count, "rollback complete, state restored");
        } else {
            manifest.status = ManifestStatus::PartialFailure;
            manifest.results = results.clone();
            write_manifest(&manifest_path, &manifest)?;
            warn!(
                batch_id,
                reversed = success_count,
                failed = fail_count,
                manifest = %manifest_path.display(),
                "rollback incomplete; manifest left for manual recovery"
            );
        }

        Ok(RollbackSummary {
            reason: reason.to_string(),
            results,
            success_count,
            fail_count,
            recovery_path: manifest_path,
        })
    }
}

/// Durable manifest write: temp file in the same directory, then atomic
/// rename so a crash never leaves a half-written manifest.
fn write_manifest(path: &Path, manifest: &RecoveryManifest) -> Result<(), BatchMoveError> {
    let json = serde_json::to_vec_pretty(manifest)
        .map_err(|e| BatchMoveError::Operation(format!("serialize recovery manifest: {e}")))?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, &json).map_err(|e| BatchMoveError::io("write recovery manifest", &tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        BatchMoveError::io("publish recovery manifest", path, e)
    })?;
    Ok(())
}
