//! Post-move verification.
//! Confirms a move is durably visible: the destination must appear and the
//! source must vanish, each polled with bounded retries and growing backoff
//! to ride out filesystem or network-share propagation delay.

use std::io;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, trace};

use crate::config::EngineConfig;
use crate::errors::BatchMoveError;

#[derive(Debug, Clone)]
pub struct MoveVerifier {
    attempts: u32,
    base_delay: Duration,
}

impl MoveVerifier {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            attempts: config.verify_attempts.max(1),
            base_delay: config.verify_base_delay,
        }
    }

    /// Confirm `destination` exists and `source` is gone.
    ///
    /// A non-NotFound error while statting the source is propagated, not
    /// swallowed: it signals an unexpected filesystem state rather than the
    /// expected post-move absence.
    pub fn verify(&self, source: &Path, destination: &Path) -> Result<(), BatchMoveError> {
        if !self.poll_until(|| destination.exists()) {
            return Err(BatchMoveError::VerificationDestinationMissing(
                destination.to_path_buf(),
            ));
        }
        trace!(dest = %destination.display(), "destination visible");

        if source == destination {
            return Ok(());
        }

        for attempt in 1..=self.attempts {
            match std::fs::symlink_metadata(source) {
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!(src = %source.display(), dest = %destination.display(), "move verified");
                    return Ok(());
                }
                Err(e) => return Err(BatchMoveError::io("stat source during verification", source, e)),
                Ok(_) => {
                    if attempt < self.attempts {
                        std::thread::sleep(self.base_delay * attempt);
                    }
                }
            }
        }
        Err(BatchMoveError::VerificationSourceStillExists(
            source.to_path_buf(),
        ))
    }

    fn poll_until(&self, check: impl Fn() -> bool) -> bool {
        for attempt in 1..=self.attempts {
            if check() {
                return true;
            }
            if attempt < self.attempts {
                std::thread::sleep(self.base_delay * attempt);
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn verifier() -> MoveVerifier {
        MoveVerifier::new(&EngineConfig {
            verify_attempts: 3,
            verify_base_delay: Duration::from_millis(5),
            ..EngineConfig::default()
        })
    }

    #[test]
    fn verifies_completed_move() {
        let td = tempdir().unwrap();
        let src = td.path().join("src.txt");
        let dest = td.path().join("dest.txt");
        std::fs::write(&dest, b"moved").unwrap();
        // src never created: absent as expected
        verifier().verify(&src, &dest).unwrap();
    }

    #[test]
    fn missing_destination_fails_with_code() {
        let td = tempdir().unwrap();
        let err = verifier()
            .verify(&td.path().join("a"), &td.path().join("never"))
            .unwrap_err();
        assert_eq!(err.code(), "MOVE_VERIFICATION_DESTINATION_FAILED");
    }

    #[test]
    fn lingering_source_fails_with_code() {
        let td = tempdir().unwrap();
        let src = td.path().join("still-here.txt");
        let dest = td.path().join("dest.txt");
        std::fs::write(&src, b"x").unwrap();
        std::fs::write(&dest, b"x").unwrap();
        let err = verifier().verify(&src, &dest).unwrap_err();
        assert_eq!(err.code(), "MOVE_VERIFICATION_SOURCE_EXISTS");
    }

    #[test]
    fn same_path_skips_source_absence_check() {
        let td = tempdir().unwrap();
        let p = td.path().join("in-place.txt");
        std::fs::write(&p, b"x").unwrap();
        verifier().verify(&p, &p).unwrap();
    }
}
