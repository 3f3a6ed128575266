//! Batch orchestration.
//! Drains the operation list on a fixed-size worker pool, deduplicates by
//! idempotency key, escalates critical errors into batch-wide cancellation
//! and hands completed work to the rollback manager when the batch must be
//! unwound.

use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cancel::CancelFlag;
use crate::checksum::idempotency_key;
use crate::collab::{Collaborators, UndoEntry};
use crate::config::EngineConfig;
use crate::errors::BatchMoveError;
use crate::executor::{MoveExecutor, MoveOutcome};
use crate::lock::BatchLock;
use crate::progress::{ProgressEvent, ProgressSink, emit_chunked};
use crate::rollback::{RollbackManager, RollbackSummary};
use crate::types::{
    BatchReport, BatchRequest, BatchStatus, CompletedOperation, OperationResult, OperationSpec,
};
use crate::validate::{ensure_safe_path, validate_batch};
use crate::verifier::MoveVerifier;

/// Workers yield to the scheduler after this many settled operations.
const YIELD_EVERY: usize = 8;

fn unpoisoned<T>(result: Result<T, PoisonError<T>>) -> T {
    result.unwrap_or_else(PoisonError::into_inner)
}

/// Mutable state shared by all workers of one batch.
struct BatchState<'a> {
    executor: &'a MoveExecutor,
    verifier: &'a MoveVerifier,
    claimed: Mutex<HashSet<String>>,
    completed: Mutex<Vec<CompletedOperation>>,
    rollback_reason: Mutex<Option<String>>,
    settled: AtomicUsize,
    started: Instant,
    total: usize,
}

/// Orchestrates one batch end to end: validate, lock, drain, finalize or
/// roll back. The caller always receives a structured report or a typed
/// error, never a bare panic.
pub struct BatchProcessor<'a> {
    config: &'a EngineConfig,
    sink: &'a dyn ProgressSink,
    collaborators: Collaborators<'a>,
    cancel: CancelFlag,
}

impl<'a> BatchProcessor<'a> {
    pub fn new(config: &'a EngineConfig, sink: &'a dyn ProgressSink) -> Self {
        Self::with_collaborators(config, sink, Collaborators::noop())
    }

    pub fn with_collaborators(
        config: &'a EngineConfig,
        sink: &'a dyn ProgressSink,
        collaborators: Collaborators<'a>,
    ) -> Self {
        Self {
            config,
            sink,
            collaborators,
            cancel: CancelFlag::new(),
        }
    }

    /// Handle for signal wiring: setting the returned flag stops new
    /// operations from starting while in-flight ones finish.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Run a batch to completion. Holds the global batch lock for the whole
    /// run; the lock is released on every exit path via its guard.
    pub fn run(&self, request: &BatchRequest) -> Result<BatchReport, BatchMoveError> {
        self.config.validate()?;
        validate_batch(request, self.config.max_batch_size)?;

        let batch_id = Uuid::new_v4().to_string();
        let _lock = BatchLock::acquire(
            &self.config.lock_path(),
            &batch_id,
            self.config.lock_wait,
        )?;
        info!(batch_id = %batch_id, operations = request.operations.len(), "batch started");
        self.run_locked(&batch_id, request)
    }

    fn run_locked(
        &self,
        batch_id: &str,
        request: &BatchRequest,
    ) -> Result<BatchReport, BatchMoveError> {
        if let Some(store) = self.collaborators.resume {
            store.create_or_load(batch_id, &request.operations);
        }

        let executor = MoveExecutor::new(self.config);
        let verifier = MoveVerifier::new(self.config);
        let state = BatchState {
            executor: &executor,
            verifier: &verifier,
            claimed: Mutex::new(HashSet::new()),
            completed: Mutex::new(Vec::new()),
            rollback_reason: Mutex::new(None),
            settled: AtomicUsize::new(0),
            started: Instant::now(),
            total: request.operations.len(),
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.concurrency)
            .build()
            .map_err(|e| BatchMoveError::Operation(format!("worker pool: {e}")))?;

        let results: Vec<OperationResult> = pool.install(|| {
            request
                .operations
                .par_iter()
                .enumerate()
                .map(|(index, op)| {
                    let result = self.run_one(index, op, &state);
                    let current = state.settled.fetch_add(1, Ordering::SeqCst) + 1;
                    self.sink
                        .progress(ProgressEvent::new(current, state.total, &op.source));
                    if current % YIELD_EVERY == 0 {
                        std::thread::yield_now();
                    }
                    result
                })
                .collect()
        });

        let completed = unpoisoned(state.completed.into_inner());
        let rollback_reason = unpoisoned(state.rollback_reason.into_inner());
        self.finalize(batch_id, &executor, results, completed, rollback_reason)
    }

    /// One operation through its state machine:
    /// pending -> in_progress -> done | error. Every skip condition is
    /// checked before any filesystem work.
    fn run_one(&self, index: usize, op: &OperationSpec, state: &BatchState<'_>) -> OperationResult {
        if self.cancel.is_set() {
            return OperationResult::skipped(&op.source, &op.destination, "cancelled");
        }
        if state.started.elapsed() >= self.config.max_batch_duration {
            debug!(index, "batch duration ceiling reached; abandoning unstarted operation");
            return OperationResult::skipped(&op.source, &op.destination, "deadline");
        }

        // Claim the idempotency key before any filesystem work. The insert
        // is the claim; holding the mutex makes check-and-set one step.
        let key = idempotency_key(&op.source, &op.destination);
        if !unpoisoned(state.claimed.lock()).insert(key) {
            debug!(index, source = %op.source, "duplicate operation in batch");
            return OperationResult::skipped(&op.source, &op.destination, "duplicate");
        }

        if let Some(store) = self.collaborators.resume
            && store.is_done(index)
        {
            debug!(index, "already completed in a prior run");
            return OperationResult::resumed(&op.source, &op.destination);
        }

        let src = match ensure_safe_path(&op.source) {
            Ok(p) => p,
            Err(e) => return self.fail(index, op, e, state),
        };
        let dest = match ensure_safe_path(&op.destination) {
            Ok(p) => p,
            Err(e) => return self.fail(index, op, e, state),
        };

        if let Some(store) = self.collaborators.resume {
            store.mark_started(index);
        }

        // Idempotent create: concurrent workers targeting the same parent
        // both succeed.
        if let Some(parent) = dest.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = fs::create_dir_all(parent)
        {
            return self.fail(
                index,
                op,
                BatchMoveError::io("create destination directory", parent, e),
                state,
            );
        }

        match state.executor.execute(&src, &dest) {
            Ok(MoveOutcome::SkippedDuplicate { existing }) => {
                if let Some(store) = self.collaborators.resume {
                    store.mark_done(index);
                }
                OperationResult::skipped(&op.source, existing.display().to_string(), "duplicate")
            }
            Ok(MoveOutcome::Moved { final_destination }) => {
                match state.verifier.verify(&src, &final_destination) {
                    Ok(()) => {
                        unpoisoned(state.completed.lock()).push(CompletedOperation {
                            index,
                            source: src,
                            final_destination: final_destination.clone(),
                            original_destination: dest,
                        });
                        if let Some(store) = self.collaborators.resume {
                            store.mark_done(index);
                        }
                        OperationResult::ok(&op.source, final_destination.display().to_string())
                    }
                    Err(e) => self.fail(index, op, e, state),
                }
            }
            Err(e) => self.fail(index, op, e, state),
        }
    }

    fn fail(
        &self,
        index: usize,
        op: &OperationSpec,
        err: BatchMoveError,
        state: &BatchState<'_>,
    ) -> OperationResult {
        if let Some(store) = self.collaborators.resume {
            store.mark_error(index, &err.to_string());
        }
        if err.is_critical() {
            self.cancel.set();
            let mut slot = unpoisoned(state.rollback_reason.lock());
            if slot.is_none() {
                *slot = Some(err.to_string());
                warn!(index, source = %op.source, error = %err, "critical error; cancelling batch");
            } else {
                // First critical error wins the rollback reason.
                warn!(index, source = %op.source, error = %err, "additional critical error");
            }
        } else {
            debug!(index, source = %op.source, error = %err, "operation failed");
        }
        OperationResult::failed(&op.source, &op.destination, &err)
    }

    fn finalize(
        &self,
        batch_id: &str,
        executor: &MoveExecutor,
        results: Vec<OperationResult>,
        completed: Vec<CompletedOperation>,
        rollback_reason: Option<String>,
    ) -> Result<BatchReport, BatchMoveError> {
        let total = results.len();
        let success_count = results.iter().filter(|r| r.success).count();
        let skipped_count = results.iter().filter(|r| r.skipped).count();
        let fail_count = total - success_count - skipped_count;
        let critical = rollback_reason.is_some();

        if let Some(reason) = rollback_reason
            && !completed.is_empty()
        {
            let summary = RollbackManager::new(&self.config.recovery_dir, executor).roll_back(
                batch_id,
                &reason,
                &completed,
            )?;
            return Ok(self.rolled_back_report(batch_id, results, completed.len(), summary));
        }

        // Non-rolled-back completion: record undo history and propagate path
        // consistency for every verified move.
        if !completed.is_empty() {
            let undo: Vec<UndoEntry> = completed
                .iter()
                .map(|c| UndoEntry {
                    original_path: c.source.clone(),
                    new_path: c.final_destination.clone(),
                })
                .collect();
            self.collaborators.undo.record_moves(&undo);

            for c in &completed {
                let outcome = self
                    .collaborators
                    .consistency
                    .atomic_path_update(&c.source, &c.final_destination);
                if !outcome.success {
                    warn!(
                        source = %c.source.display(),
                        dest = %c.final_destination.display(),
                        errors = outcome.errors.join("; "),
                        "path consistency update incomplete"
                    );
                }
            }
        }

        let chunks = emit_chunked(self.sink, batch_id, &results);
        let success = fail_count == 0 && !critical && !self.cancel.is_set();
        let status = if success {
            BatchStatus::Completed
        } else {
            BatchStatus::PartialFailure
        };
        let summary = format!(
            "{success_count} moved, {fail_count} failed, {skipped_count} skipped of {total}"
        );
        info!(batch_id, %summary, "batch finished");

        Ok(BatchReport {
            success,
            batch_id: batch_id.to_string(),
            status,
            results,
            success_count,
            fail_count,
            completed_operations: completed.len(),
            summary,
            chunked_results: chunks.map(|_| true),
            total_chunks: chunks,
            rolled_back: false,
            rollback_reason: None,
            rollback_results: None,
            rollback_success_count: None,
            rollback_fail_count: None,
            recovery_path: None,
            critical_error: critical,
        })
    }

    fn rolled_back_report(
        &self,
        batch_id: &str,
        results: Vec<OperationResult>,
        completed_operations: usize,
        rollback: RollbackSummary,
    ) -> BatchReport {
        let chunks = emit_chunked(self.sink, batch_id, &results);
        let success_count = results.iter().filter(|r| r.success).count();
        let skipped_count = results.iter().filter(|r| r.skipped).count();
        let fail_count = results.len() - success_count - skipped_count;
        let summary = format!(
            "rolled back after critical error: {} of {} reversals succeeded ({})",
            rollback.success_count,
            rollback.success_count + rollback.fail_count,
            rollback.reason
        );
        BatchReport {
            success: false,
            batch_id: batch_id.to_string(),
            status: BatchStatus::RolledBack,
            results,
            success_count,
            fail_count,
            completed_operations,
            summary,
            chunked_results: chunks.map(|_| true),
            total_chunks: chunks,
            rolled_back: true,
            rollback_reason: Some(rollback.reason),
            rollback_results: Some(rollback.results),
            rollback_success_count: Some(rollback.success_count),
            rollback_fail_count: Some(rollback.fail_count),
            recovery_path: Some(rollback.recovery_path),
            critical_error: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NullSink;
    use crate::types::OperationKind;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::tempdir;

    fn request(ops: &[(PathBuf, PathBuf)]) -> BatchRequest {
        BatchRequest {
            operations: ops
                .iter()
                .map(|(s, d)| OperationSpec {
                    source: s.display().to_string(),
                    destination: d.display().to_string(),
                    kind: OperationKind::Move,
                })
                .collect(),
        }
    }

    fn test_config(recovery: PathBuf) -> EngineConfig {
        EngineConfig {
            recovery_dir: recovery,
            verify_base_delay: Duration::from_millis(5),
            contention_base_delay: Duration::from_millis(5),
            ..EngineConfig::default()
        }
    }

    #[test]
    fn preset_cancellation_skips_every_operation() {
        let td = tempdir().unwrap();
        let src = td.path().join("a.txt");
        std::fs::write(&src, b"x").unwrap();
        let cfg = test_config(td.path().join("recovery"));
        let sink = NullSink;
        let proc = BatchProcessor::new(&cfg, &sink);
        proc.cancel_flag().set();

        let report = proc
            .run(&request(&[(src.clone(), td.path().join("out/a.txt"))]))
            .unwrap();
        assert!(!report.success);
        assert!(report.results[0].skipped);
        assert_eq!(report.results[0].skip_reason.as_deref(), Some("cancelled"));
        assert!(src.exists());
    }

    #[test]
    fn expired_deadline_abandons_without_failures() {
        let td = tempdir().unwrap();
        let src = td.path().join("a.txt");
        std::fs::write(&src, b"x").unwrap();
        let cfg = EngineConfig {
            max_batch_duration: Duration::ZERO,
            ..test_config(td.path().join("recovery"))
        };
        let sink = NullSink;
        let proc = BatchProcessor::new(&cfg, &sink);

        let report = proc
            .run(&request(&[(src.clone(), td.path().join("out/a.txt"))]))
            .unwrap();
        assert_eq!(report.fail_count, 0);
        assert_eq!(report.success_count, 0);
        assert!(report.results[0].skipped);
        assert_eq!(report.results[0].skip_reason.as_deref(), Some("deadline"));
        assert!(src.exists());
    }

    #[test]
    fn traversal_paths_fail_without_touching_disk() {
        let td = tempdir().unwrap();
        let cfg = test_config(td.path().join("recovery"));
        let sink = NullSink;
        let proc = BatchProcessor::new(&cfg, &sink);

        let report = proc
            .run(&BatchRequest {
                operations: vec![OperationSpec {
                    source: "/tmp/a.txt".into(),
                    destination: "/tmp/../etc/a.txt".into(),
                    kind: OperationKind::Move,
                }],
            })
            .unwrap();
        assert_eq!(report.fail_count, 1);
        assert_eq!(
            report.results[0].error_code.as_deref(),
            Some("UNSAFE_PATH")
        );
    }
}
