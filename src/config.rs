//! Engine configuration and log verbosity.
//! EngineConfig holds runtime tunables with conservative defaults; the CLI
//! overrides individual fields.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Hard ceiling on operations per batch unless overridden.
pub const MAX_BATCH_SIZE_DEFAULT: usize = 1000;

/// Bounded worker-pool width.
pub const CONCURRENCY_DEFAULT: usize = 5;

/// Program-defined verbosity levels exposed to users.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Only errors
    Quiet,
    /// Informational output (default)
    #[default]
    Normal,
    /// More info (like verbose)
    Info,
    /// Debug/trace
    Debug,
}

impl LogLevel {
    /// Parse common string names into our LogLevel (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "quiet" | "error" | "none" => Some(LogLevel::Quiet),
            "normal" => Some(LogLevel::Normal),
            "info" | "verbose" | "detailed" => Some(LogLevel::Info),
            "debug" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };
        f.write_str(s)
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid log level: '{s}'"))
    }
}

/// Runtime configuration used by the batch engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum operations accepted per batch.
    pub max_batch_size: usize,
    /// Worker pool width; also the maximum number of in-flight moves.
    pub concurrency: usize,
    /// Where recovery manifests and the global batch lock live.
    pub recovery_dir: PathBuf,
    /// How long acquire() waits for the global lock before giving up.
    pub lock_wait: Duration,
    /// Wall-clock ceiling; unstarted operations past it are abandoned.
    pub max_batch_duration: Duration,
    /// Post-move verification poll attempts.
    pub verify_attempts: u32,
    /// Base delay between verification polls (grows linearly per attempt).
    pub verify_base_delay: Duration,
    /// Rename retries while the destination or source is held by another process.
    pub contention_attempts: u32,
    /// Base delay between contention retries (grows linearly per attempt).
    pub contention_base_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_batch_size: MAX_BATCH_SIZE_DEFAULT,
            concurrency: CONCURRENCY_DEFAULT,
            recovery_dir: default_recovery_dir(),
            lock_wait: Duration::from_secs(2),
            max_batch_duration: Duration::from_secs(10 * 60),
            verify_attempts: 5,
            verify_base_delay: Duration::from_millis(50),
            contention_attempts: 5,
            contention_base_delay: Duration::from_millis(100),
        }
    }
}

impl EngineConfig {
    /// Path of the global advisory lock file, inside the recovery directory
    /// so both crash artifacts live in one place.
    pub fn lock_path(&self) -> PathBuf {
        self.recovery_dir.join(".batch_move.lock")
    }

    /// Sanity-check tunables before a batch starts.
    pub fn validate(&self) -> Result<(), crate::BatchMoveError> {
        if self.concurrency == 0 {
            return Err(crate::BatchMoveError::Operation(
                "concurrency must be at least 1".into(),
            ));
        }
        if self.max_batch_size == 0 {
            return Err(crate::BatchMoveError::Operation(
                "max_batch_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// OS-appropriate default recovery directory under the user's local data dir,
/// falling back to the working directory for odd environments.
pub fn default_recovery_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("batch_move")
        .join("recovery")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loglevel_parse_aliases() {
        assert_eq!(LogLevel::parse("VERBOSE"), Some(LogLevel::Info));
        assert_eq!(LogLevel::parse("trace"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("bogus"), None);
    }

    #[test]
    fn zero_concurrency_rejected() {
        let cfg = EngineConfig {
            concurrency: 0,
            ..EngineConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn lock_path_lives_in_recovery_dir() {
        let cfg = EngineConfig {
            recovery_dir: PathBuf::from("/tmp/rec"),
            ..EngineConfig::default()
        };
        assert_eq!(cfg.lock_path(), PathBuf::from("/tmp/rec/.batch_move.lock"));
    }
}
