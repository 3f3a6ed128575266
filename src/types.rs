//! Wire-facing data model: batch requests, per-operation results, the
//! rollback source of truth and the recovery manifest.
//!
//! Field names follow the caller's JSON convention (camelCase) so reports and
//! manifests round-trip without an adapter layer.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One caller-submitted set of move operations, processed as a unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    pub operations: Vec<OperationSpec>,
}

/// A single requested mutation. Only `Move` is executed by this engine; the
/// kind is carried through so callers can mix batches at a higher layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationSpec {
    pub source: String,
    pub destination: String,
    #[serde(rename = "type", default)]
    pub kind: OperationKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    #[default]
    Move,
    Copy,
    Delete,
    Batch,
}

/// Runtime state of one operation while the batch drains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Pending,
    InProgress,
    Done,
    Error,
}

/// Batch-level lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Running,
    Completed,
    PartialFailure,
    RolledBack,
}

/// Outcome of one operation, accumulated into the batch response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    pub success: bool,
    pub source: String,
    pub destination: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub resumed: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub critical: bool,
}

impl OperationResult {
    pub fn ok(source: &str, destination: impl Into<String>) -> Self {
        Self {
            success: true,
            source: source.to_string(),
            destination: destination.into(),
            error: None,
            error_code: None,
            skipped: false,
            skip_reason: None,
            resumed: false,
            critical: false,
        }
    }

    pub fn failed(source: &str, destination: &str, err: &crate::BatchMoveError) -> Self {
        Self {
            success: false,
            source: source.to_string(),
            destination: destination.to_string(),
            error: Some(err.to_string()),
            error_code: Some(err.code().to_string()),
            skipped: false,
            skip_reason: None,
            resumed: false,
            critical: err.is_critical(),
        }
    }

    pub fn skipped(source: &str, destination: impl Into<String>, reason: &str) -> Self {
        Self {
            success: false,
            source: source.to_string(),
            destination: destination.into(),
            error: None,
            error_code: None,
            skipped: true,
            skip_reason: Some(reason.to_string()),
            resumed: false,
            critical: false,
        }
    }

    pub fn resumed(source: &str, destination: &str) -> Self {
        Self {
            success: true,
            resumed: true,
            ..Self::ok(source, destination)
        }
    }
}

/// Recorded only after a move was executed and verified; this list is the
/// rollback source of truth. Skipped duplicates never land here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedOperation {
    pub index: usize,
    pub source: PathBuf,
    pub final_destination: PathBuf,
    pub original_destination: PathBuf,
}

/// One reversal attempt inside a rollback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackResult {
    pub index: usize,
    pub from: PathBuf,
    pub to: PathBuf,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestStatus {
    Pending,
    PartialFailure,
}

/// Durable record written before rollback begins. If the process dies
/// mid-rollback, this file is the only record of what must still be reversed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryManifest {
    pub batch_id: String,
    pub timestamp: String,
    pub reason: String,
    pub status: ManifestStatus,
    pub operations: Vec<CompletedOperation>,
    pub results: Vec<RollbackResult>,
}

/// Structured outcome handed back to the caller for every batch, covering
/// full success, partial success and rolled-back failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub success: bool,
    pub batch_id: String,
    pub status: BatchStatus,
    pub results: Vec<OperationResult>,
    pub success_count: usize,
    pub fail_count: usize,
    pub completed_operations: usize,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunked_results: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_chunks: Option<usize>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub rolled_back: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollback_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollback_results: Option<Vec<RollbackResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollback_success_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollback_fail_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub critical_error: bool,
}
