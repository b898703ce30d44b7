//! Extractor-facing metadata shapes.

use serde::{Deserialize, Deserializer, Serialize};

/// Returns the codec when it names a real codec (not missing, empty or "none").
fn real_codec(codec: Option<&str>) -> Option<&str> {
    codec.filter(|c| !c.is_empty() && *c != "none")
}

/// One candidate encoding as reported by the extractor.
///
/// Field names follow the extractor's JSON; keys not modeled here are kept in
/// `extra` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FormatDescriptor {
    #[serde(default)]
    pub format_id: String,
    /// Container extension (mp4, webm, m4a, mhtml, ...).
    #[serde(default)]
    pub ext: Option<String>,
    /// Provider quality label ("720p", "1080p Premium", "storyboard", ...).
    #[serde(default)]
    pub format_note: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    /// Total bitrate in kbps.
    #[serde(default)]
    pub tbr: Option<f64>,
    /// Video bitrate in kbps.
    #[serde(default)]
    pub vbr: Option<f64>,
    /// Audio bitrate in kbps.
    #[serde(default)]
    pub abr: Option<f64>,
    #[serde(default)]
    pub filesize: Option<f64>,
    #[serde(default)]
    pub filesize_approx: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl FormatDescriptor {
    pub fn has_video(&self) -> bool {
        real_codec(self.vcodec.as_deref()).is_some()
    }

    pub fn has_audio(&self) -> bool {
        real_codec(self.acodec.as_deref()).is_some()
    }

    /// No video codec but a real audio codec.
    pub fn is_audio_only(&self) -> bool {
        !self.has_video() && self.has_audio()
    }

    pub fn is_mp4(&self) -> bool {
        self.ext.as_deref() == Some("mp4")
    }

    /// Thumbnail sheets and storyboards are not downloadable media.
    pub fn is_storyboard(&self) -> bool {
        self.ext.as_deref() == Some("mhtml")
            || self
                .format_note
                .as_deref()
                .is_some_and(|n| n.to_ascii_lowercase().contains("storyboard"))
    }

    /// Formats the provider only serves to paying viewers ("1080p Premium").
    pub fn is_premium_only(&self) -> bool {
        self.format_note
            .as_deref()
            .is_some_and(|n| n.to_ascii_lowercase().contains("premium"))
    }

    /// Overall bitrate used to break ties between video formats.
    pub fn bitrate(&self) -> f64 {
        self.tbr.or(self.vbr).unwrap_or(0.0)
    }

    /// Audio bitrate used to rank audio-only formats.
    pub fn audio_bitrate(&self) -> f64 {
        self.abr.or(self.tbr).unwrap_or(0.0)
    }

    /// Exact size when known, else the provider's estimate.
    pub fn approx_size(&self) -> Option<u64> {
        self.filesize
            .or(self.filesize_approx)
            .filter(|s| s.is_finite() && *s >= 0.0)
            .map(|s| s as u64)
    }

    /// Label shown to users: the provider note, else "<height>p", else the container.
    pub fn quality_label(&self) -> String {
        if let Some(note) = self.format_note.as_deref().filter(|n| !n.is_empty()) {
            return note.to_string();
        }
        match self.height {
            Some(h) => format!("{h}p"),
            None if self.is_audio_only() => "audio".to_string(),
            None => String::new(),
        }
    }
}

/// Metadata for one video, or a playlist whose `entries` are videos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MediaInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Duration in seconds (providers report fractional values).
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub webpage_url: Option<String>,
    #[serde(default)]
    pub original_url: Option<String>,
    /// Entry URL in flat playlist listings.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub extractor_key: Option<String>,
    #[serde(default)]
    pub extractor: Option<String>,
    /// Container of the downloaded file (only in post-download metadata).
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub formats: Vec<FormatDescriptor>,
    #[serde(default, deserialize_with = "entries_skip_null")]
    pub entries: Vec<MediaInfo>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Playlists list unavailable videos as `null`; drop them.
fn entries_skip_null<'de, D>(d: D) -> Result<Vec<MediaInfo>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<Option<MediaInfo>>> = Option::deserialize(d)?;
    Ok(raw.unwrap_or_default().into_iter().flatten().collect())
}

impl MediaInfo {
    /// URL identifying this entry: page URL, else original URL, else flat-listing URL.
    pub fn canonical_url(&self) -> Option<&str> {
        self.webpage_url
            .as_deref()
            .or(self.original_url.as_deref())
            .or(self.url.as_deref())
            .filter(|u| !u.is_empty())
    }

    pub fn provider(&self) -> &str {
        self.extractor_key
            .as_deref()
            .or(self.extractor.as_deref())
            .unwrap_or("unknown")
    }

    pub fn is_playlist(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Videos to enqueue: the entries of a playlist, or the video itself.
    pub fn videos(&self) -> Vec<&MediaInfo> {
        if self.entries.is_empty() {
            vec![self]
        } else {
            self.entries.iter().collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_codecs() {
        let audio = FormatDescriptor {
            format_id: "140".into(),
            vcodec: Some("none".into()),
            acodec: Some("mp4a.40.2".into()),
            ..Default::default()
        };
        assert!(audio.is_audio_only());
        assert!(!audio.has_video());

        let video_only = FormatDescriptor {
            format_id: "137".into(),
            vcodec: Some("avc1.640028".into()),
            acodec: Some("none".into()),
            ..Default::default()
        };
        assert!(video_only.has_video());
        assert!(!video_only.has_audio());
        assert!(!video_only.is_audio_only());

        let neither = FormatDescriptor {
            format_id: "x".into(),
            ..Default::default()
        };
        assert!(!neither.has_video());
        assert!(!neither.is_audio_only());
    }

    #[test]
    fn storyboard_and_premium_detection() {
        let sb = FormatDescriptor {
            format_id: "sb0".into(),
            ext: Some("mhtml".into()),
            ..Default::default()
        };
        assert!(sb.is_storyboard());
        let sb_note = FormatDescriptor {
            format_id: "sb1".into(),
            format_note: Some("Storyboard".into()),
            ..Default::default()
        };
        assert!(sb_note.is_storyboard());
        let premium = FormatDescriptor {
            format_id: "616".into(),
            format_note: Some("1080p Premium".into()),
            ..Default::default()
        };
        assert!(premium.is_premium_only());
        assert!(!premium.is_storyboard());
    }

    #[test]
    fn parses_extractor_json_and_keeps_unknown_keys() {
        let json = r#"{
            "id": "abc",
            "title": "Clip",
            "webpage_url": "https://www.youtube.com/watch?v=abc",
            "extractor_key": "Youtube",
            "duration": 212.0,
            "view_count": 42,
            "formats": [
                {"format_id": "18", "ext": "mp4", "height": 360, "vcodec": "avc1", "acodec": "mp4a", "protocol": "https"}
            ],
            "entries": null
        }"#;
        let info: MediaInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.canonical_url(), Some("https://www.youtube.com/watch?v=abc"));
        assert_eq!(info.provider(), "Youtube");
        assert_eq!(info.extra.get("view_count"), Some(&serde_json::json!(42)));
        assert_eq!(info.formats.len(), 1);
        assert_eq!(
            info.formats[0].extra.get("protocol"),
            Some(&serde_json::json!("https"))
        );
        assert!(!info.is_playlist());
        assert_eq!(info.videos().len(), 1);
    }

    #[test]
    fn playlist_entries_skip_nulls() {
        let json = r#"{
            "id": "PL1",
            "entries": [
                {"id": "a", "url": "https://www.youtube.com/watch?v=a"},
                null,
                {"id": "b", "url": "https://www.youtube.com/watch?v=b"}
            ]
        }"#;
        let info: MediaInfo = serde_json::from_str(json).unwrap();
        assert!(info.is_playlist());
        let videos = info.videos();
        assert_eq!(videos.len(), 2);
        assert_eq!(videos[1].canonical_url(), Some("https://www.youtube.com/watch?v=b"));
    }

    #[test]
    fn quality_label_fallbacks() {
        let f = FormatDescriptor {
            format_id: "22".into(),
            height: Some(720),
            vcodec: Some("avc1".into()),
            ..Default::default()
        };
        assert_eq!(f.quality_label(), "720p");
        let a = FormatDescriptor {
            format_id: "251".into(),
            vcodec: Some("none".into()),
            acodec: Some("opus".into()),
            ..Default::default()
        };
        assert_eq!(a.quality_label(), "audio");
    }
}
