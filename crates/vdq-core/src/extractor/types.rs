use std::path::PathBuf;

use thiserror::Error;

use crate::error::VdqError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// List playlist entries without per-entry format resolution.
    pub fast: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    /// Extractor format selector (`"137+bestaudio"`, `"best"`, ...).
    pub selector: String,
    pub output_dir: PathBuf,
    /// File name without extension; the extractor adds the one it produced.
    pub output_stem: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadOutput {
    /// Extension of the file actually written (after any merge).
    pub extension: String,
}

/// One progress report from a running download.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProgressEvent {
    pub downloaded_bytes: u64,
    /// Exact total, else the extractor's estimate.
    pub total_bytes: Option<u64>,
    pub speed_bytes_per_sec: Option<f64>,
    pub eta_secs: Option<u64>,
}

/// Receives progress while a download runs.
///
/// Called from the download loop, so implementations only stage the event.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Structured extractor failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractorError {
    /// The selector matched nothing the provider currently serves.
    #[error("requested format is not available: {0}")]
    FormatUnavailable(String),

    /// The provider wants a signed-in session (bot check, cookies).
    #[error("authentication challenge: {0}")]
    AuthChallenge(String),

    #[error("extraction failed: {0}")]
    ExtractionFailed(String),

    /// The extractor could not be run at all.
    #[error("extractor unavailable: {0}")]
    Unavailable(String),
}

impl From<ExtractorError> for VdqError {
    fn from(e: ExtractorError) -> Self {
        match e {
            ExtractorError::FormatUnavailable(m) => VdqError::FormatUnavailable(m),
            ExtractorError::AuthChallenge(m) => VdqError::AuthChallenge(m),
            ExtractorError::ExtractionFailed(m) => VdqError::ExtractionFailed(m),
            ExtractorError::Unavailable(m) => VdqError::ExtractorUnavailable(m),
        }
    }
}
