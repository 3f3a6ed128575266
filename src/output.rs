use owo_colors::OwoColorize;

use crate::types::BatchReport;

/// Small wrapper around stdout/stderr printing to provide consistent, colored
/// user-facing messages. Colors are enabled only when output is a TTY.
fn is_tty() -> bool {
    atty::is(atty::Stream::Stdout)
}

pub fn print_info(msg: &str) {
    if is_tty() {
        println!("{} {}", "info:".cyan().bold(), msg);
    } else {
        println!("info: {}", msg);
    }
}

pub fn print_warn(msg: &str) {
    if is_tty() {
        eprintln!("{} {}", "warn:".yellow().bold(), msg);
    } else {
        eprintln!("warn: {}", msg);
    }
}

pub fn print_error(msg: &str) {
    if is_tty() {
        eprintln!("{} {}", "error:".red().bold(), msg);
    } else {
        eprintln!("error: {}", msg);
    }
}

pub fn print_success(msg: &str) {
    if is_tty() {
        println!("{} {}", "ok:".green().bold(), msg);
    } else {
        println!("ok: {}", msg);
    }
}

/// Render a finished batch for humans: one status line, then per-operation
/// failures and the recovery pointer when a rollback happened.
pub fn print_report(report: &BatchReport) {
    if report.rolled_back {
        print_error(&format!("batch {}: {}", report.batch_id, report.summary));
        if let Some(path) = &report.recovery_path
            && path.exists()
        {
            print_warn(&format!(
                "recovery manifest left at {} — inspect before re-running",
                path.display()
            ));
        }
    } else if report.success {
        print_success(&format!("batch {}: {}", report.batch_id, report.summary));
    } else {
        print_warn(&format!("batch {}: {}", report.batch_id, report.summary));
    }

    for r in report.results.iter().filter(|r| !r.success && !r.skipped) {
        print_error(&format!(
            "  {} -> {}: {} [{}]",
            r.source,
            r.destination,
            r.error.as_deref().unwrap_or("unknown error"),
            r.error_code.as_deref().unwrap_or("?")
        ));
    }
}
