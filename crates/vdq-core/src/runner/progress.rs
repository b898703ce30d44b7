//! Progress staging and persistence for a running job.

use tokio::sync::mpsc;

use crate::extractor::{ProgressEvent, ProgressSink};
use crate::store::{JobId, JobStore, ProgressSnapshot};

/// Sink handed to the extractor: only queues events, never touches the store.
pub(crate) struct ChannelSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelSink {
    fn on_progress(&self, event: ProgressEvent) {
        // The receiver only goes away when the job is being torn down.
        let _ = self.tx.send(event);
    }
}

impl From<ProgressEvent> for ProgressSnapshot {
    fn from(ev: ProgressEvent) -> Self {
        ProgressSnapshot {
            downloaded_bytes: ev.downloaded_bytes,
            total_bytes: ev.total_bytes,
            speed_kibps: ev.speed_bytes_per_sec.map(|b| b / 1024.0),
            eta_secs: ev.eta_secs,
        }
    }
}

/// Runs the progress persistence loop until every sink is dropped.
///
/// Events that queue up while a write is in flight are coalesced into the
/// latest one. Returns the number of store writes made.
pub(crate) async fn run_progress_persistence_loop(
    mut rx: mpsc::UnboundedReceiver<ProgressEvent>,
    store: JobStore,
    job_id: JobId,
) -> u64 {
    let mut writes = 0u64;
    while let Some(mut ev) = rx.recv().await {
        while let Ok(newer) = rx.try_recv() {
            ev = newer;
        }
        match store.append_progress(job_id, &ev.into()).await {
            Ok(_) => writes += 1,
            Err(e) => tracing::warn!(job_id = %job_id, "progress update failed: {}", e),
        }
    }
    writes
}
