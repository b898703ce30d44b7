//! Persisted media rows referenced by jobs.

use uuid::Uuid;

use super::descriptor::{FormatDescriptor, MediaInfo};

/// A remote video entry, unique by canonical URL.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaSource {
    pub id: Uuid,
    pub canonical_url: String,
    pub provider: String,
    pub provider_video_id: String,
    pub title: String,
    pub channel: String,
    pub thumbnail_url: String,
    pub duration_secs: Option<u32>,
    pub raw_metadata: serde_json::Value,
    pub created_at: i64,
}

impl MediaSource {
    /// Parse the stored raw metadata back into a typed `MediaInfo`.
    pub fn info(&self) -> serde_json::Result<MediaInfo> {
        serde_json::from_value(self.raw_metadata.clone())
    }
}

/// Fields for get-or-create of a `MediaSource`.
#[derive(Debug, Clone)]
pub struct NewMediaSource {
    pub canonical_url: String,
    pub provider: String,
    pub provider_video_id: String,
    pub title: String,
    pub channel: String,
    pub thumbnail_url: String,
    pub duration_secs: Option<u32>,
    pub raw_metadata: serde_json::Value,
}

impl NewMediaSource {
    /// Build from extractor metadata. Returns None when the entry has no URL.
    pub fn from_info(info: &MediaInfo) -> Option<Self> {
        let canonical_url = info.canonical_url()?.to_string();
        let raw_metadata = serde_json::to_value(info).unwrap_or(serde_json::Value::Null);
        Some(Self {
            canonical_url,
            provider: info.provider().to_string(),
            provider_video_id: info.id.clone().unwrap_or_default(),
            title: info
                .title
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Untitled".to_string()),
            channel: info
                .channel
                .clone()
                .or_else(|| info.uploader.clone())
                .unwrap_or_default(),
            thumbnail_url: info.thumbnail.clone().unwrap_or_default(),
            duration_secs: info
                .duration
                .filter(|d| d.is_finite() && *d >= 0.0)
                .map(|d| d.round() as u32),
            raw_metadata,
        })
    }
}

/// A chosen encoding of a `MediaSource`, unique by `(source_id, format_id)`.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaFormat {
    pub id: Uuid,
    pub source_id: Uuid,
    pub format_id: String,
    pub container: String,
    pub quality_label: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub codec_video: String,
    pub codec_audio: String,
    pub is_audio_only: bool,
    pub is_premium_only: bool,
    pub size_bytes: Option<u64>,
}

impl MediaFormat {
    /// True when the stream carries video but needs a separate audio track.
    pub fn is_video_only(&self) -> bool {
        !self.is_audio_only && matches!(self.codec_audio.as_str(), "" | "none")
    }
}

/// Fields for get-or-create of a `MediaFormat`.
#[derive(Debug, Clone)]
pub struct NewMediaFormat {
    pub format_id: String,
    pub container: String,
    pub quality_label: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub codec_video: String,
    pub codec_audio: String,
    pub is_audio_only: bool,
    pub is_premium_only: bool,
    pub size_bytes: Option<u64>,
}

impl From<&FormatDescriptor> for NewMediaFormat {
    fn from(f: &FormatDescriptor) -> Self {
        Self {
            format_id: f.format_id.clone(),
            container: f.ext.clone().unwrap_or_else(|| "mp4".to_string()),
            quality_label: f.quality_label(),
            width: f.width,
            height: f.height,
            codec_video: f.vcodec.clone().unwrap_or_default(),
            codec_audio: f.acodec.clone().unwrap_or_default(),
            is_audio_only: f.is_audio_only(),
            is_premium_only: f.is_premium_only(),
            size_bytes: f.approx_size(),
        }
    }
}
