//! Logging for pilot.
use anyhow::Context;
use pilot_core::get_data_dir;
use std::io::LineWriter;
use std::sync::Mutex;
use tracing_subscriber::fmt::time::OffsetTime;

/// Initializes the application's logging system.
///
/// Sets up file-based logging: the log lives at `<data_dir>/pilot.log` and
/// rotates to `pilot.log.old` once it grows past 100KB. Levels default to
/// DEBUG for the pilot crates and INFO for rustyline.
///
/// # Errors
///
/// Returns `anyhow::Result` which can contain errors from:
/// - Getting the data directory
/// - Filesystem operations (checking file metadata, renaming files)
/// - Opening/creating the log file
/// - Initializing the tracing subscriber
pub fn setup_logging() -> anyhow::Result<()> {
    let data_dir = get_data_dir().context("Failed to get data directory")?;
    let log_path = data_dir.join("pilot.log");

    if log_path.exists() {
        let metadata = std::fs::metadata(&log_path)?;
        if metadata.len() > 100 * 1024 {
            // 100KB
            let backup_path = data_dir.join("pilot.log.old");
            if backup_path.exists() {
                std::fs::remove_file(&backup_path)?;
            }
            std::fs::rename(&log_path, backup_path)?;
        }
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;

    // Ensure the logs are flushed after every line
    let writer = Mutex::new(LineWriter::new(log_file));

    tracing_subscriber::fmt()
        .with_env_filter("pilot=debug,pilot_core=debug,rustyline=info")
        .with_writer(writer)
        .with_ansi(false) // Disable ANSI escape codes for file logging
        .with_timer(OffsetTime::local_rfc_3339()?) // Use local time
        .init();
    Ok(())
}
