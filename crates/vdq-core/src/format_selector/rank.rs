//! Ordering of filtered formats and default-format choice.

use std::cmp::Ordering;

use crate::config::FormatLimits;
use crate::error::VdqError;
use crate::media::FormatDescriptor;

use super::filter::partition;

/// Descending by (height, has muxed audio, mp4 container, bitrate).
fn video_order(a: &FormatDescriptor, b: &FormatDescriptor) -> Ordering {
    b.height
        .unwrap_or(0)
        .cmp(&a.height.unwrap_or(0))
        .then_with(|| b.has_audio().cmp(&a.has_audio()))
        .then_with(|| b.is_mp4().cmp(&a.is_mp4()))
        .then_with(|| b.bitrate().total_cmp(&a.bitrate()))
}

fn audio_order(a: &FormatDescriptor, b: &FormatDescriptor) -> Ordering {
    b.audio_bitrate().total_cmp(&a.audio_bitrate())
}

/// Filter and rank with the default caps (60 video + 12 audio).
pub fn filter_and_rank(raw: &[FormatDescriptor]) -> Vec<FormatDescriptor> {
    filter_and_rank_with(raw, FormatLimits::default())
}

/// Filter raw formats and return ranked video formats followed by ranked
/// audio-only formats, each group truncated to its cap.
///
/// Sorting is stable, so applying this to its own output is a no-op.
pub fn filter_and_rank_with(raw: &[FormatDescriptor], limits: FormatLimits) -> Vec<FormatDescriptor> {
    let (mut video, mut audio) = partition(raw);

    video.sort_by(|a, b| video_order(a, b));
    audio.sort_by(|a, b| audio_order(a, b));
    video.truncate(limits.max_video);
    audio.truncate(limits.max_audio);

    video.into_iter().chain(audio).cloned().collect()
}

/// Pick the default format when the requester made no explicit choice:
/// mp4 first, then video over audio, then height. Earlier entries win ties.
pub fn choose_preferred(formats: &[FormatDescriptor]) -> Result<&FormatDescriptor, VdqError> {
    let rank = |f: &FormatDescriptor| (f.is_mp4(), !f.is_audio_only(), f.height.unwrap_or(0));

    let mut best: Option<&FormatDescriptor> = None;
    for f in formats {
        match best {
            Some(b) if rank(f) <= rank(b) => {}
            _ => best = Some(f),
        }
    }
    best.ok_or_else(|| VdqError::NoFormatsAvailable("no candidate formats to choose from".into()))
}
