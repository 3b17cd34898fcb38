use anyhow::Result;
use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

/// File written by `--debug-log`, relative to the working directory
pub const DEBUG_LOG_FILE: &str = "ffaccel.log";

static ENABLED: AtomicBool = AtomicBool::new(false);

/// Turn on raw probe output capture for the rest of the process
pub fn enable() {
    ENABLED.store(true, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Write debug log to ffaccel.log in current directory
/// Appends to file, creating it if needed
pub fn write_debug_log(message: &str) -> Result<()> {
    let log_path = std::env::current_dir()?.join(DEBUG_LOG_FILE);
    write_debug_log_to(&log_path, message)
}

pub fn write_debug_log_to(path: &Path, message: &str) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;

    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    writeln!(file, "[{}] {}", timestamp, message)?;
    Ok(())
}

/// Append to the debug log when enabled; failures only warn
pub fn record(message: &str) {
    if !is_enabled() {
        return;
    }
    if let Err(err) = write_debug_log(message) {
        warn!(error = %err, "could not write debug log");
    }
}
