pub mod scripted_extractor;

use tempfile::TempDir;
use uuid::Uuid;
use vdq_core::media::{FormatDescriptor, MediaInfo, NewMediaSource};
use vdq_core::store::JobStore;

/// Store backed by a file in a temp dir (real pool, several connections).
pub async fn temp_store() -> (TempDir, JobStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = JobStore::open_at(dir.path().join("jobs.db")).await.unwrap();
    (dir, store)
}

pub fn format(id: &str, height: Option<u32>, vcodec: &str, acodec: &str) -> FormatDescriptor {
    FormatDescriptor {
        format_id: id.into(),
        ext: Some(if vcodec == "none" { "m4a" } else { "mp4" }.into()),
        height,
        vcodec: Some(vcodec.into()),
        acodec: Some(acodec.into()),
        ..Default::default()
    }
}

/// A stored source offering 360p muxed, 720p muxed, 1080p video-only and m4a audio.
pub async fn seed_source(store: &JobStore, video_id: &str) -> Uuid {
    let info = MediaInfo {
        id: Some(video_id.into()),
        title: Some(format!("Clip {video_id}")),
        webpage_url: Some(format!("https://www.youtube.com/watch?v={video_id}")),
        extractor_key: Some("Youtube".into()),
        formats: vec![
            format("18", Some(360), "avc1", "mp4a"),
            format("22", Some(720), "avc1", "mp4a"),
            format("137", Some(1080), "avc1", "none"),
            format("140", None, "none", "mp4a"),
        ],
        ..Default::default()
    };
    let new = NewMediaSource::from_info(&info).unwrap();
    store.get_or_create_source(&new).await.unwrap().id
}
