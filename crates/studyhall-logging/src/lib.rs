//! Diagnostics for the study assistant: verbose console dumps of backend
//! traffic and per-request log files under `~/.studyhall/logs`.
pub mod request_logger;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub use request_logger::{
    log_request,
    log_request_to_file,
    log_response,
    log_stream_chunk,
    write_request_log,
};

/// Name of the per-user directory holding sessions and logs
pub const APP_DIR_NAME: &str = ".studyhall";

/// Truncate to at most `max_chars` characters, ending in `...` when cut
pub fn safe_truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

fn ensure_dir(dir: PathBuf) -> Result<PathBuf> {
    if !dir.is_dir() {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    Ok(dir)
}

/// `~/.studyhall`, created on first use. The default `--data-dir` for
/// `chatSessions.json`.
pub fn get_app_dir() -> Result<PathBuf> {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .context("Failed to get home directory")?;
    app_dir_in(Path::new(&home))
}

fn app_dir_in(home: &Path) -> Result<PathBuf> {
    ensure_dir(home.join(APP_DIR_NAME))
}

/// `~/.studyhall/logs`, where `--log-requests` writes one file per ask
pub fn get_logs_dir() -> Result<PathBuf> {
    ensure_dir(get_app_dir()?.join("logs"))
}
