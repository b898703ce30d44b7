//! Classify job errors into retry kinds.

use crate::error::VdqError;
use crate::retry::policy::ErrorKind;

/// Transient: extractor failures and store errors. Everything else is fatal,
/// including an exhausted fallback chain and auth challenges (a retry would
/// hit the same wall).
pub fn classify(e: &VdqError) -> ErrorKind {
    match e {
        VdqError::ExtractionFailed(_) | VdqError::ExtractorUnavailable(_) | VdqError::Store(_) => {
            ErrorKind::Transient
        }
        VdqError::InvalidVideoUrl(_)
        | VdqError::RateLimitExceeded { .. }
        | VdqError::FormatNotAllowed(_)
        | VdqError::NoFormatsAvailable(_)
        | VdqError::UnknownFormat { .. }
        | VdqError::SourceNotFound(_)
        | VdqError::JobNotFound(_)
        | VdqError::FormatUnavailable(_)
        | VdqError::NoWorkableFormat
        | VdqError::AuthChallenge(_) => ErrorKind::Fatal,
    }
}
