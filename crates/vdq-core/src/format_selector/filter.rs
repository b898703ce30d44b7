//! Deduplication and classification of raw formats.

use std::collections::HashSet;

use crate::media::FormatDescriptor;

/// Minimum height for a video format to be offered.
pub(super) const MIN_VIDEO_HEIGHT: u32 = 144;

/// What a raw format carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatClass {
    Video,
    AudioOnly,
    /// Neither a video nor an audio codec we recognize.
    Unclassifiable,
}

pub fn classify(f: &FormatDescriptor) -> FormatClass {
    if f.has_video() {
        FormatClass::Video
    } else if f.has_audio() {
        FormatClass::AudioOnly
    } else {
        FormatClass::Unclassifiable
    }
}

/// Splits formats into (video, audio) after dropping duplicates, storyboards,
/// unclassifiable entries and videos below the minimum height.
///
/// The first occurrence of a format id wins. Input order is preserved within
/// each group.
pub(super) fn partition(
    raw: &[FormatDescriptor],
) -> (Vec<&FormatDescriptor>, Vec<&FormatDescriptor>) {
    let mut seen: HashSet<&str> = HashSet::with_capacity(raw.len());
    let mut video = Vec::new();
    let mut audio = Vec::new();

    for f in raw {
        if !seen.insert(f.format_id.as_str()) {
            continue;
        }
        if f.is_storyboard() {
            continue;
        }
        match classify(f) {
            FormatClass::Video => {
                if f.height.is_some_and(|h| h >= MIN_VIDEO_HEIGHT) {
                    video.push(f);
                }
            }
            FormatClass::AudioOnly => audio.push(f),
            FormatClass::Unclassifiable => {}
        }
    }

    (video, audio)
}
