//! Tracing setup for the `vdq` binary, and the span each job runs under.
//!
//! Filter directives come from `VDQ_LOG` (then `RUST_LOG`); anything
//! unparsable falls back to [`DEFAULT_FILTER`].

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

use crate::store::JobId;

pub const LOG_ENV: &str = "VDQ_LOG";
const DEFAULT_FILTER: &str = "info,vdq=debug,vdq_core=debug";

/// `$XDG_STATE_HOME/vdq/vdq.log`; the directory is created.
pub fn log_file_path() -> Result<PathBuf> {
    let dirs = xdg::BaseDirectories::with_prefix("vdq")?;
    let dir = dirs.get_state_home();
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir.join("vdq.log"))
}

fn filter_from(directives: Option<String>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

fn env_filter() -> EnvFilter {
    let directives = std::env::var(LOG_ENV)
        .or_else(|_| std::env::var("RUST_LOG"))
        .ok();
    filter_from(directives)
}

/// Append log lines to [`log_file_path`]. Errors when the file cannot be
/// opened so the caller can fall back to [`init_logging_stderr`].
pub fn init_logging() -> Result<PathBuf> {
    let path = log_file_path()?;
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("install tracing subscriber: {e}"))?;

    tracing::info!(path = %path.display(), "vdq logging initialized");
    Ok(path)
}

pub fn init_logging_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

/// Span that tags every event of one job run with its id.
pub fn job_span(job_id: JobId) -> tracing::Span {
    tracing::info_span!("job", id = %job_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn explicit_directives_win() {
        let filter = filter_from(Some("warn".into()));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn bad_or_missing_directives_use_default() {
        assert_eq!(filter_from(None).max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(
            filter_from(Some("vdq=loud".into())).max_level_hint(),
            Some(LevelFilter::DEBUG)
        );
    }
}
