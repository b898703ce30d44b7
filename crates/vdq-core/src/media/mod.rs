//! Typed media metadata.
//!
//! `descriptor` holds what the extractor reports (one `MediaInfo` per video or
//! playlist, one `FormatDescriptor` per candidate stream). `records` holds the
//! persisted rows a job references.

mod descriptor;
mod records;

pub use descriptor::{FormatDescriptor, MediaInfo};
pub use records::{MediaFormat, MediaSource, NewMediaFormat, NewMediaSource};
