//! CLI definition and parsing.
//! Defines Args and provides parse() for command-line handling.
//!
//! Notes:
//! - The batch file is a JSON document matching the engine's request shape:
//!   `{ "operations": [ { "source": "...", "destination": "..." } ] }`.
//! - --debug is a shorthand for --log-level debug.

use clap::{Parser, ValueHint};
use std::path::PathBuf;

use batch_move::LogLevel;

/// CLI wrapper for the batch_move library.
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Execute a batch of file moves with verification and rollback"
)]
pub struct Args {
    /// JSON batch request file to execute.
    #[arg(value_name = "BATCH_FILE", value_hint = ValueHint::FilePath)]
    pub batch_file: Option<PathBuf>,

    /// Override the recovery directory (manifests and the global batch lock).
    #[arg(long, value_hint = ValueHint::DirPath, help = "Override the recovery directory")]
    pub recovery_dir: Option<PathBuf>,

    /// Worker pool width.
    #[arg(long, help = "Number of concurrent move workers")]
    pub concurrency: Option<usize>,

    /// Maximum operations accepted per batch.
    #[arg(long, help = "Maximum operations accepted per batch")]
    pub max_batch_size: Option<usize>,

    /// How long to wait for the global batch lock, in milliseconds.
    #[arg(long, value_name = "MS", help = "Global lock wait budget in milliseconds")]
    pub lock_wait_ms: Option<u64>,

    /// Wall-clock ceiling for the whole batch, in seconds.
    #[arg(long, value_name = "SECS", help = "Abandon unstarted operations past this many seconds")]
    pub max_duration_secs: Option<u64>,

    /// Enable debug logging (equivalent to `--log-level debug`).
    #[arg(
        short = 'd',
        long,
        help = "Enable debug logging (shorthand for --log-level debug)"
    )]
    pub debug: bool,

    /// Set log level. One of: quiet, normal, info, debug.
    #[arg(long, help = "Set log level: quiet, normal, info, debug")]
    pub log_level: Option<String>,

    /// Optional log file; logging continues to stdout either way.
    #[arg(long, value_hint = ValueHint::FilePath, help = "Also write logs to this file")]
    pub log_file: Option<PathBuf>,

    /// Emit logs in structured JSON (includes timestamp, level, and structured fields).
    #[arg(long, help = "Emit logs in structured JSON")]
    pub json: bool,

    /// Print the full batch report as JSON on stdout after the run.
    #[arg(long, help = "Print the full batch report as JSON")]
    pub report_json: bool,

    /// Print where batch_move stores recovery manifests, then exit.
    #[arg(long, help = "Print the recovery directory location and exit")]
    pub print_recovery_dir: bool,
}

impl Args {
    /// Effective log level derived from flags.
    /// Precedence: --debug > --log-level value > None (use default).
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            return Some(LogLevel::Debug);
        }
        self.log_level.as_deref().and_then(LogLevel::parse)
    }
}

pub fn parse() -> Args {
    Args::parse()
}
