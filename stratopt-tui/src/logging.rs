//! File logging for the TUI.
//!
//! The terminal belongs to ratatui, so tracing output goes to
//! `{data_dir}/stratopt.log`. The file is trimmed to its most recent
//! megabyte once it grows past five.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const MAX_LOG_SIZE: u64 = 5 * 1024 * 1024;
const KEEP_SIZE: u64 = 1024 * 1024;

pub const LOG_FILE: &str = "stratopt.log";

/// Keep only the last `keep` bytes (from a line boundary) once the file exceeds `max`.
fn rotate_if_over(log_path: &Path, max: u64, keep: u64) -> std::io::Result<bool> {
    let len = match fs::metadata(log_path) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    if len <= max {
        return Ok(false);
    }

    let mut file = File::open(log_path)?;
    file.seek(SeekFrom::Start(len.saturating_sub(keep)))?;
    let mut tail = Vec::new();
    file.read_to_end(&mut tail)?;
    drop(file);

    let skip = tail
        .iter()
        .position(|&b| b == b'\n')
        .map(|i| i + 1)
        .unwrap_or(0);

    let mut file = File::create(log_path)?;
    file.write_all(b"--- Log rotated (older entries removed) ---\n")?;
    file.write_all(&tail[skip..])?;
    Ok(true)
}

#[derive(Clone)]
struct LogWriterFactory {
    file: Arc<Mutex<File>>,
}

struct LogWriter {
    file: Arc<Mutex<File>>,
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        file.flush()
    }
}

impl<'a> MakeWriter<'a> for LogWriterFactory {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter {
            file: Arc::clone(&self.file),
        }
    }
}

/// Install the file subscriber. `RUST_LOG` overrides `level`.
pub fn init_logging(data_dir: &Path, level: &str) -> Result<PathBuf> {
    fs::create_dir_all(data_dir)
        .with_context(|| format!("creating log directory {}", data_dir.display()))?;
    let log_path = data_dir.join(LOG_FILE);

    if let Err(e) = rotate_if_over(&log_path, MAX_LOG_SIZE, KEEP_SIZE) {
        eprintln!("Warning: failed to rotate log file: {e}");
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("opening log file {}", log_path.display()))?;

    let default_filter = format!("stratopt_tui={level},stratopt_client={level},stratopt_core=warn");
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(LogWriterFactory {
                    file: Arc::new(Mutex::new(file)),
                })
                .with_ansi(false)
                .with_target(true),
        )
        .try_init()
        .context("installing tracing subscriber")?;

    tracing::info!("logging to {}", log_path.display());
    Ok(log_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_file_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOG_FILE);
        fs::write(&path, "one\ntwo\n").unwrap();

        assert!(!rotate_if_over(&path, 100, 10).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!rotate_if_over(&dir.path().join(LOG_FILE), 100, 10).unwrap());
    }

    #[test]
    fn oversized_file_keeps_whole_trailing_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOG_FILE);
        let body: String = (0..20).map(|i| format!("line {i:02}\n")).collect();
        fs::write(&path, &body).unwrap();

        // keep 20 bytes: a partial line plus "line 18\nline 19\n"
        assert!(rotate_if_over(&path, 50, 20).unwrap());
        let rotated = fs::read_to_string(&path).unwrap();
        let mut lines = rotated.lines();
        assert!(lines.next().unwrap().starts_with("--- Log rotated"));
        assert_eq!(lines.collect::<Vec<_>>(), vec!["line 18", "line 19"]);
    }
}
