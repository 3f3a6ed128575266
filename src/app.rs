//! Application orchestrator.
//! Merges CLI flags into the engine config, initializes logging, installs
//! the signal handler, loads the batch request and runs it.

use anyhow::{Context, Result, bail};
use std::time::Duration;
use tracing::debug;

use batch_move::output as out;
use batch_move::{BatchProcessor, BatchRequest, EngineConfig, LogLevel, LogSink};

use crate::cli::Args;
use crate::logging::init_tracing;

/// Run the CLI application.
pub fn run(args: Args) -> Result<()> {
    let mut cfg = EngineConfig::default();
    if let Some(dir) = args.recovery_dir.as_ref() {
        cfg.recovery_dir = dir.clone();
    }

    // Handle --print-recovery-dir before logging init
    if args.print_recovery_dir {
        out::print_info(&format!(
            "Recovery manifests and the batch lock live in:\n  {}\n",
            cfg.recovery_dir.display()
        ));
        if cfg.recovery_dir.exists() {
            out::print_info("The directory already exists; leftover manifests there are rolled-back batches awaiting manual recovery.");
        }
        return Ok(());
    }

    if let Some(n) = args.concurrency {
        cfg.concurrency = n;
    }
    if let Some(n) = args.max_batch_size {
        cfg.max_batch_size = n;
    }
    if let Some(ms) = args.lock_wait_ms {
        cfg.lock_wait = Duration::from_millis(ms);
    }
    if let Some(secs) = args.max_duration_secs {
        cfg.max_batch_duration = Duration::from_secs(secs);
    }

    let level = args.effective_log_level().unwrap_or(LogLevel::Normal);
    let guard = init_tracing(&level, args.log_file.as_deref(), args.json).map_err(|e| {
        out::print_error(&format!("Failed to initialize logging: {}", e));
        e
    })?;

    let result = run_batch(&args, &cfg);

    // Ensure logs are flushed before exit
    drop(guard);
    result
}

fn run_batch(args: &Args, cfg: &EngineConfig) -> Result<()> {
    let Some(batch_file) = args.batch_file.as_ref() else {
        bail!("no batch file given; pass a JSON batch request (or --print-recovery-dir)");
    };

    let raw = std::fs::read_to_string(batch_file)
        .with_context(|| format!("read batch file '{}'", batch_file.display()))?;
    let request: BatchRequest = serde_json::from_str(&raw)
        .with_context(|| format!("parse batch file '{}' [INVALID_BATCH]", batch_file.display()))?;

    debug!(file = %batch_file.display(), operations = request.operations.len(), "loaded batch request");

    let sink = LogSink;
    let processor = BatchProcessor::new(cfg, &sink);

    // SIGINT/SIGTERM stop new operations; in-flight moves finish and the
    // batch finalizes normally.
    let cancel = processor.cancel_flag();
    ctrlc::set_handler(move || {
        out::print_warn("Received interrupt; finishing in-flight moves then stopping...");
        cancel.set();
    })
    .context("failed to install signal handler")?;

    match processor.run(&request) {
        Ok(report) => {
            out::print_report(&report);
            if args.report_json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            if report.success {
                Ok(())
            } else {
                bail!("batch finished with failures: {}", report.summary)
            }
        }
        Err(e) => {
            out::print_error(&format!("{} [{}]", e, e.code()));
            Err(e.into())
        }
    }
}
