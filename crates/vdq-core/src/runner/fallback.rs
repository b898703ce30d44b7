//! Format fallback chain.
//!
//! Stored format ids go stale, so a job tries its exact format first and then
//! progressively more generic selectors. Generic selectors are not capped by
//! the requester's resolution limit.

use std::future::Future;

use crate::error::VdqError;
use crate::extractor::{DownloadOutput, ExtractorError};
use crate::media::MediaFormat;

const AUDIO_GENERIC: &str = "bestaudio[ext=m4a]/bestaudio[ext=webm]/bestaudio";
const AUDIO_CATCH_ALL: &str = "best";
const VIDEO_GENERIC: &str = "bestvideo[height>=720]+bestaudio/bestvideo+bestaudio";
const VIDEO_CATCH_ALL: &str = "best[height>=480]/best";

/// What the chain does after one selector failed.
#[derive(Debug)]
pub enum FallbackSignal {
    /// The selector is not served; the error is kept in case nothing else works.
    TryNext(VdqError),
    /// Stop the chain and surface this error.
    Abort(VdqError),
}

/// Ordered selectors to try for a stored format.
pub fn build_fallback_chain(format: &MediaFormat) -> Vec<String> {
    let id = format.format_id.as_str();
    let mut chain = Vec::with_capacity(4);
    if format.is_video_only() {
        chain.push(format!("{id}+bestaudio"));
    }
    chain.push(id.to_string());
    if format.is_audio_only {
        chain.push(AUDIO_GENERIC.to_string());
        chain.push(AUDIO_CATCH_ALL.to_string());
    } else {
        chain.push(VIDEO_GENERIC.to_string());
        chain.push(VIDEO_CATCH_ALL.to_string());
    }
    let mut seen = std::collections::HashSet::new();
    chain.retain(|s| seen.insert(s.clone()));
    chain
}

/// User-facing message for a provider sign-in challenge.
pub fn auth_challenge_message(cookies_configured: bool) -> String {
    if cookies_configured {
        "The provider rejected the configured cookies. Export fresh cookies and update \
         extractor.cookies_file."
            .to_string()
    } else {
        "The provider requires a signed-in session. Export cookies from a browser and set \
         extractor.cookies_file in config.toml."
            .to_string()
    }
}

/// Map one extractor failure to a chain decision.
pub fn signal_for(err: ExtractorError, cookies_configured: bool) -> FallbackSignal {
    match err {
        ExtractorError::FormatUnavailable(m) => FallbackSignal::TryNext(VdqError::FormatUnavailable(m)),
        ExtractorError::AuthChallenge(detail) => {
            tracing::warn!("auth challenge: {}", detail);
            FallbackSignal::Abort(VdqError::AuthChallenge(auth_challenge_message(
                cookies_configured,
            )))
        }
        other => FallbackSignal::Abort(other.into()),
    }
}

/// Try each selector in order until one succeeds or one aborts.
///
/// Exhaustion returns the last `TryNext` error, or `NoWorkableFormat` when
/// the chain was empty.
pub async fn run_chain<F, Fut>(chain: &[String], mut attempt: F) -> Result<DownloadOutput, VdqError>
where
    F: FnMut(&str) -> Fut,
    Fut: Future<Output = Result<DownloadOutput, FallbackSignal>>,
{
    let mut last_err = None;
    for selector in chain {
        match attempt(selector).await {
            Ok(out) => return Ok(out),
            Err(FallbackSignal::TryNext(e)) => {
                tracing::debug!(selector = %selector, "selector unavailable, trying next: {}", e);
                last_err = Some(e);
            }
            Err(FallbackSignal::Abort(e)) => return Err(e),
        }
    }
    Err(last_err.unwrap_or(VdqError::NoWorkableFormat))
}
