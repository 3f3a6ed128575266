//! Batch request validation.
//! Pure checks, no filesystem access: shape, size and per-operation path
//! sanity before any work begins.

use std::path::{Component, Path, PathBuf};

use crate::errors::BatchMoveError;
use crate::types::BatchRequest;

/// Reject malformed or oversized batch requests.
pub fn validate_batch(request: &BatchRequest, max_batch_size: usize) -> Result<(), BatchMoveError> {
    if request.operations.is_empty() {
        return Err(BatchMoveError::EmptyBatch);
    }
    if request.operations.len() > max_batch_size {
        return Err(BatchMoveError::BatchTooLarge {
            max_allowed: max_batch_size,
            provided: request.operations.len(),
        });
    }
    for (index, op) in request.operations.iter().enumerate() {
        if op.source.trim().is_empty() {
            return Err(BatchMoveError::InvalidOperation {
                index,
                detail: "missing source path".into(),
            });
        }
        if op.destination.trim().is_empty() {
            return Err(BatchMoveError::InvalidOperation {
                index,
                detail: "missing destination path".into(),
            });
        }
    }
    Ok(())
}

/// Security re-validation applied per operation just before filesystem work.
/// Rejects empty paths, embedded NULs and `..` traversal components; callers
/// decide policy for anything the filesystem itself will refuse.
pub fn ensure_safe_path(raw: &str) -> Result<PathBuf, BatchMoveError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(BatchMoveError::UnsafePath {
            path: raw.to_string(),
            detail: "empty path".into(),
        });
    }
    if trimmed.contains('\0') {
        return Err(BatchMoveError::UnsafePath {
            path: raw.to_string(),
            detail: "embedded NUL".into(),
        });
    }
    let path = Path::new(trimmed);
    if path
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(BatchMoveError::UnsafePath {
            path: raw.to_string(),
            detail: "parent-directory traversal".into(),
        });
    }
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OperationKind, OperationSpec};

    fn op(src: &str, dst: &str) -> OperationSpec {
        OperationSpec {
            source: src.into(),
            destination: dst.into(),
            kind: OperationKind::Move,
        }
    }

    #[test]
    fn empty_batch_rejected() {
        let req = BatchRequest { operations: vec![] };
        let err = validate_batch(&req, 10).unwrap_err();
        assert_eq!(err.code(), "EMPTY_BATCH");
    }

    #[test]
    fn oversized_batch_rejected_with_limits() {
        let req = BatchRequest {
            operations: (0..3).map(|i| op(&format!("/s{i}"), "/d")).collect(),
        };
        match validate_batch(&req, 2).unwrap_err() {
            BatchMoveError::BatchTooLarge {
                max_allowed,
                provided,
            } => {
                assert_eq!(max_allowed, 2);
                assert_eq!(provided, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn blank_paths_rejected_with_index() {
        let req = BatchRequest {
            operations: vec![op("/a", "/b"), op("  ", "/c")],
        };
        match validate_batch(&req, 10).unwrap_err() {
            BatchMoveError::InvalidOperation { index, .. } => assert_eq!(index, 1),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn traversal_rejected() {
        assert!(ensure_safe_path("/ok/path.txt").is_ok());
        let err = ensure_safe_path("/etc/../etc/passwd").unwrap_err();
        assert_eq!(err.code(), "UNSAFE_PATH");
        assert!(ensure_safe_path("").is_err());
    }
}
