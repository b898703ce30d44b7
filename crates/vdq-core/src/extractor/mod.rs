//! Seam to the external media extractor.
//!
//! The rest of the crate only sees the `Extractor` trait and its structured
//! errors. `YtDlp` drives the `yt-dlp` binary and is the only code that looks
//! at extractor output text.

mod types;
mod ytdlp;

pub use types::{
    DownloadOutput, DownloadRequest, ExtractorError, FetchOptions, ProgressEvent, ProgressSink,
};
pub use ytdlp::YtDlp;

use async_trait::async_trait;

use crate::media::MediaInfo;

#[async_trait]
pub trait Extractor: Send + Sync {
    /// Fetch metadata for a video or playlist URL.
    ///
    /// `fast` lists playlist entries without resolving each entry's formats.
    async fn fetch_metadata(&self, url: &str, opts: FetchOptions)
        -> Result<MediaInfo, ExtractorError>;

    /// Download `req.url` with the format selector `req.selector`.
    ///
    /// Progress is reported through `sink` as it happens; the sink must not block.
    async fn download(
        &self,
        req: &DownloadRequest,
        sink: &dyn ProgressSink,
    ) -> Result<DownloadOutput, ExtractorError>;
}
