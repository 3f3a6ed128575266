//! Core library for `batch_move`.
//!
//! A batch file-mutation engine: executes a caller-submitted list of
//! (source, destination) moves concurrently, verifies each completed move,
//! and reverses already-completed moves when a critical failure lands
//! mid-batch. Keep the library small and composable: a `BatchProcessor`
//! driven by an `EngineConfig`, typed errors with stable codes, and trait
//! seams for the collaborators other layers own.

pub mod cancel;
pub mod checksum;
pub mod collab;
pub mod config;
pub mod errors;
pub mod executor;
pub mod lock;
pub mod output;
pub mod processor;
pub mod progress;
pub mod rollback;
pub mod types;
pub mod validate;
pub mod verifier;

pub use cancel::CancelFlag;
pub use collab::{Collaborators, PathConsistency, ResumeStore, UndoRecorder};
pub use config::{EngineConfig, LogLevel, default_recovery_dir};
pub use errors::BatchMoveError;
pub use executor::{MoveExecutor, MoveOutcome};
pub use lock::BatchLock;
pub use processor::BatchProcessor;
pub use progress::{LogSink, NullSink, ProgressSink};
pub use rollback::RollbackManager;
pub use types::{BatchReport, BatchRequest, BatchStatus, OperationResult, OperationSpec};
pub use verifier::MoveVerifier;
