//! URL validation and output filename derivation.
//!
//! Submitted URLs must be absolute http(s) URLs, optionally restricted to a
//! configured host list. Output names are derived from the video title and
//! the job id so concurrent jobs never collide in the download directory.

mod sanitize;

pub use sanitize::slugify;

use url::Url;
use uuid::Uuid;

use crate::error::VdqError;

/// Longest slug taken from a title.
const MAX_SLUG_LEN: usize = 80;
/// Slug used when a title has nothing usable in it.
const DEFAULT_SLUG: &str = "video";
/// Hex digits of the job id appended to every output name.
const JOB_ID_SUFFIX_LEN: usize = 8;

/// Validates a submitted video URL.
///
/// `allowed_hosts` empty means any host is accepted.
///
/// # Examples
///
/// - `validate_url("https://www.youtube.com/watch?v=x", &[])` → `Ok(..)`
/// - `validate_url("ftp://example.com/a", &[])` → `Err(InvalidVideoUrl)`
pub fn validate_url(value: &str, allowed_hosts: &[String]) -> Result<Url, VdqError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(VdqError::InvalidVideoUrl("URL is required".to_string()));
    }
    let parsed = Url::parse(value)
        .map_err(|e| VdqError::InvalidVideoUrl(format!("{value}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(VdqError::InvalidVideoUrl(format!(
            "unsupported scheme '{}'",
            parsed.scheme()
        )));
    }
    let Some(host) = parsed.host_str().filter(|h| !h.is_empty()) else {
        return Err(VdqError::InvalidVideoUrl(format!("{value}: missing host")));
    };
    if !allowed_hosts.is_empty() && !allowed_hosts.iter().any(|h| h.eq_ignore_ascii_case(host)) {
        return Err(VdqError::InvalidVideoUrl(format!(
            "provider {host} is not allowed"
        )));
    }
    Ok(parsed)
}

/// File stem for a job's output: `<slug(title)>-<job id prefix>`.
///
/// The extractor appends the extension it actually produced.
pub fn output_stem(title: &str, job_id: Uuid) -> String {
    let mut slug = slugify(title);
    if slug.is_empty() {
        slug = DEFAULT_SLUG.to_string();
    }
    // Slugs are ASCII, so byte truncation is safe.
    slug.truncate(MAX_SLUG_LEN);
    let slug = slug.trim_end_matches('-');
    let id = job_id.simple().to_string();
    format!("{slug}-{}", &id[..JOB_ID_SUFFIX_LEN])
}

/// Full output filename from a stem and the produced extension.
pub fn output_filename(stem: &str, ext: &str) -> String {
    let ext = ext.trim_start_matches('.');
    if ext.is_empty() {
        stem.to_string()
    } else {
        format!("{stem}.{ext}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https() {
        let u = validate_url("https://www.youtube.com/watch?v=abc", &[]).unwrap();
        assert_eq!(u.host_str(), Some("www.youtube.com"));
        assert!(validate_url("  http://example.com/v/1 ", &[]).is_ok());
    }

    #[test]
    fn rejects_garbage_and_other_schemes() {
        for bad in ["", "   ", "not a url", "ftp://example.com/a", "file:///etc/passwd"] {
            let err = validate_url(bad, &[]).unwrap_err();
            assert!(matches!(err, VdqError::InvalidVideoUrl(_)), "{bad}");
        }
    }

    #[test]
    fn allowed_hosts_restrict_providers() {
        let hosts = vec!["www.youtube.com".to_string(), "youtu.be".to_string()];
        assert!(validate_url("https://youtu.be/abc", &hosts).is_ok());
        assert!(validate_url("https://WWW.YOUTUBE.COM/watch?v=a", &hosts).is_ok());
        let err = validate_url("https://vimeo.com/1", &hosts).unwrap_err();
        assert!(err.to_string().contains("vimeo.com"));
    }

    #[test]
    fn output_stem_uses_slug_and_job_prefix() {
        let id = Uuid::parse_str("0123456789abcdef0123456789abcdef").unwrap();
        assert_eq!(output_stem("My Great Video!", id), "my-great-video-01234567");
        assert_eq!(output_stem("???", id), "video-01234567");
    }

    #[test]
    fn output_stem_truncates_long_titles() {
        let id = Uuid::new_v4();
        let title = "word ".repeat(40);
        let stem = output_stem(&title, id);
        let (slug, suffix) = stem.rsplit_once('-').unwrap();
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(!slug.ends_with('-'));
        assert_eq!(suffix.len(), JOB_ID_SUFFIX_LEN);
    }

    #[test]
    fn output_filename_joins_extension() {
        assert_eq!(output_filename("clip-1", "mp4"), "clip-1.mp4");
        assert_eq!(output_filename("clip-1", ".webm"), "clip-1.webm");
        assert_eq!(output_filename("clip-1", ""), "clip-1");
    }
}
