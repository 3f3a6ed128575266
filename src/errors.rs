//! Typed error definitions for batch_move.
//! Provides a closed set of failure modes with machine-readable codes so the
//! caller never has to match on message text.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BatchMoveError {
    #[error("Batch request is malformed: {0}")]
    InvalidBatch(String),

    #[error("Batch contains no operations")]
    EmptyBatch,

    #[error("Batch too large: {provided} operations, maximum is {max_allowed}")]
    BatchTooLarge { max_allowed: usize, provided: usize },

    #[error("Operation {index} is invalid: {detail}")]
    InvalidOperation { index: usize, detail: String },

    #[error("Another batch holds the mutation lock at {lock_path}")]
    BatchLockTimeout { lock_path: PathBuf },

    #[error("Unsafe path rejected: {path}: {detail}")]
    UnsafePath { path: String, detail: String },

    #[error("Source path not found: {0}")]
    SourceMissing(PathBuf),

    #[error("Destination name space exhausted for {dest}")]
    DestinationConflict { dest: PathBuf },

    #[error("File busy after {attempts} attempts: {path}")]
    FileBusy { path: PathBuf, attempts: u32 },

    #[error("Permission denied on {path}: {context}")]
    PermissionDenied { path: PathBuf, context: String },

    #[error("Insufficient space for {dest}: need {required} bytes, have {available} bytes")]
    NoSpace {
        required: u64,
        available: u64,
        dest: PathBuf,
    },

    #[error("I/O failure while trying to {op} '{path}': {source}")]
    Io {
        op: &'static str,
        path: PathBuf,
        source: io::Error,
    },

    #[error("Checksum mismatch after copy: '{src}' vs '{dest}'")]
    ChecksumMismatch { src: PathBuf, dest: PathBuf },

    #[error("Destination never appeared after move: {0}")]
    VerificationDestinationMissing(PathBuf),

    #[error("Source still present after move: {0}")]
    VerificationSourceStillExists(PathBuf),

    #[error("Batch operation failed: {0}")]
    Operation(String),
}

impl BatchMoveError {
    /// Stable machine-readable code carried into per-operation results and
    /// error responses.
    pub fn code(&self) -> &'static str {
        match self {
            BatchMoveError::InvalidBatch(_) => "INVALID_BATCH",
            BatchMoveError::EmptyBatch => "EMPTY_BATCH",
            BatchMoveError::BatchTooLarge { .. } => "BATCH_TOO_LARGE",
            BatchMoveError::InvalidOperation { .. } => "INVALID_OPERATION",
            BatchMoveError::BatchLockTimeout { .. } => "BATCH_LOCK_TIMEOUT",
            BatchMoveError::UnsafePath { .. } => "UNSAFE_PATH",
            BatchMoveError::SourceMissing(_) => "SOURCE_MISSING",
            BatchMoveError::DestinationConflict { .. } => "DESTINATION_CONFLICT",
            BatchMoveError::FileBusy { .. } => "FILE_BUSY",
            BatchMoveError::PermissionDenied { .. } => "PERMISSION_DENIED",
            BatchMoveError::NoSpace { .. } => "NO_SPACE",
            BatchMoveError::Io { .. } => "IO_ERROR",
            BatchMoveError::ChecksumMismatch { .. } => "CHECKSUM_MISMATCH",
            BatchMoveError::VerificationDestinationMissing(_) => {
                "MOVE_VERIFICATION_DESTINATION_FAILED"
            }
            BatchMoveError::VerificationSourceStillExists(_) => "MOVE_VERIFICATION_SOURCE_EXISTS",
            BatchMoveError::Operation(_) => "BATCH_OPERATION_FAILED",
        }
    }

    /// Whether this error cancels the whole batch and triggers rollback.
    ///
    /// The set is closed and typed; classification never inspects message
    /// text. A vanished source is an expected race with external actors and
    /// stays non-critical, as do exhausted-name and busy-file failures.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            BatchMoveError::PermissionDenied { .. }
                | BatchMoveError::NoSpace { .. }
                | BatchMoveError::Io { .. }
                | BatchMoveError::ChecksumMismatch { .. }
                | BatchMoveError::VerificationDestinationMissing(_)
                | BatchMoveError::VerificationSourceStillExists(_)
        )
    }

    /// Wrap an io::Error with the operation and path that produced it.
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::PermissionDenied => BatchMoveError::PermissionDenied {
                path,
                context: format!("{op}: {source}"),
            },
            io::ErrorKind::NotFound => BatchMoveError::SourceMissing(path),
            _ => BatchMoveError::Io { op, path, source },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_set_is_closed() {
        assert!(
            BatchMoveError::PermissionDenied {
                path: "/x".into(),
                context: "rename".into()
            }
            .is_critical()
        );
        assert!(
            BatchMoveError::ChecksumMismatch {
                src: "/a".into(),
                dest: "/b".into()
            }
            .is_critical()
        );
        assert!(!BatchMoveError::SourceMissing("/gone".into()).is_critical());
        assert!(
            !BatchMoveError::FileBusy {
                path: "/busy".into(),
                attempts: 5
            }
            .is_critical()
        );
    }

    #[test]
    fn io_wrapper_promotes_permission_and_not_found() {
        let e = BatchMoveError::io(
            "rename",
            "/p",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert_eq!(e.code(), "PERMISSION_DENIED");

        let e = BatchMoveError::io(
            "stat",
            "/p",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert_eq!(e.code(), "SOURCE_MISSING");
    }
}
