//! Domain error taxonomy shared by the gate, runner and scheduler.

use thiserror::Error;

/// Errors surfaced by submission and job execution.
///
/// Policy and validation variants are returned before any job row exists.
/// `FormatUnavailable` only escapes the runner when the whole fallback chain
/// was exhausted.
#[derive(Debug, Error)]
pub enum VdqError {
    #[error("invalid video URL: {0}")]
    InvalidVideoUrl(String),

    #[error("daily download limit exceeded ({used}/{limit} today)")]
    RateLimitExceeded { used: u32, limit: u32 },

    #[error("format not allowed: {0}")]
    FormatNotAllowed(String),

    #[error("no formats available: {0}")]
    NoFormatsAvailable(String),

    #[error("format {format_id} is not offered for this source")]
    UnknownFormat { format_id: String },

    #[error("media source {0} not found")]
    SourceNotFound(String),

    #[error("job {0} not found")]
    JobNotFound(String),

    #[error("requested format is not available: {0}")]
    FormatUnavailable(String),

    #[error("unable to download video with available formats")]
    NoWorkableFormat,

    #[error("{0}")]
    AuthChallenge(String),

    #[error("extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("extractor unavailable: {0}")]
    ExtractorUnavailable(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl VdqError {
    /// True for denials produced by the policy gate.
    pub fn is_policy_denial(&self) -> bool {
        matches!(
            self,
            VdqError::RateLimitExceeded { .. } | VdqError::FormatNotAllowed(_)
        )
    }
}

impl From<sqlx::Error> for VdqError {
    fn from(e: sqlx::Error) -> Self {
        VdqError::Store(e.into())
    }
}
