//! External collaborator seams.
//! The path-consistency coordinator, undo-history recorder and
//! resumable-batch store are owned by other layers; the engine talks to them
//! through these traits so it stays testable in isolation. No-op defaults
//! let the engine run standalone.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::types::OperationSpec;

/// Result of propagating one completed move to downstream indexes and
/// history stores.
#[derive(Debug, Clone, Default)]
pub struct PathUpdateOutcome {
    pub success: bool,
    pub errors: Vec<String>,
}

/// Propagates a completed move to any downstream path consumers.
pub trait PathConsistency: Send + Sync {
    fn atomic_path_update(&self, old: &Path, new: &Path) -> PathUpdateOutcome;
}

/// One undo-history entry for a completed move.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoEntry {
    pub original_path: PathBuf,
    pub new_path: PathBuf,
}

/// Records completed moves so a caller can offer undo.
pub trait UndoRecorder: Send + Sync {
    fn record_moves(&self, entries: &[UndoEntry]);
}

/// Optional persistent per-operation processing state, enabling a batch to
/// resume across process restarts.
pub trait ResumeStore: Send + Sync {
    fn create_or_load(&self, batch_id: &str, operations: &[OperationSpec]);
    fn mark_started(&self, index: usize);
    fn mark_done(&self, index: usize);
    fn mark_error(&self, index: usize, message: &str);
    /// Whether a prior run already completed this operation.
    fn is_done(&self, index: usize) -> bool;
}

#[derive(Debug, Default)]
pub struct NoopPathConsistency;

impl PathConsistency for NoopPathConsistency {
    fn atomic_path_update(&self, _old: &Path, _new: &Path) -> PathUpdateOutcome {
        PathUpdateOutcome {
            success: true,
            errors: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct NoopUndoRecorder;

impl UndoRecorder for NoopUndoRecorder {
    fn record_moves(&self, _entries: &[UndoEntry]) {}
}

static NOOP_CONSISTENCY: NoopPathConsistency = NoopPathConsistency;
static NOOP_UNDO: NoopUndoRecorder = NoopUndoRecorder;

/// Bundle of collaborator references handed to the processor.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub consistency: &'a dyn PathConsistency,
    pub undo: &'a dyn UndoRecorder,
    pub resume: Option<&'a dyn ResumeStore>,
}

impl Collaborators<'_> {
    /// All-no-op collaborators for standalone use.
    pub fn noop() -> Self {
        Self {
            consistency: &NOOP_CONSISTENCY,
            undo: &NOOP_UNDO,
            resume: None,
        }
    }
}

impl Default for Collaborators<'_> {
    fn default() -> Self {
        Self::noop()
    }
}
