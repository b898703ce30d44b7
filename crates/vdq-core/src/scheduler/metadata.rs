//! Background metadata fetches that callers poll by handle.
//!
//! `submit` validates the URL, registers a pending task and spawns the fetch.
//! The fetch is retried on transient extractor failures; on success the video
//! (or playlist) is stored as a media source so it can be enqueued later.
//! Finished results stay pollable for `keep_finished`, then are evicted on a
//! later `submit`.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::error::VdqError;
use crate::extractor::{Extractor, ExtractorError, FetchOptions};
use crate::media::{MediaInfo, NewMediaSource};
use crate::retry::{run_with_retry, RetryPolicy};
use crate::runner::auth_challenge_message;
use crate::store::JobStore;
use crate::url_model::validate_url;

/// Opaque id of a submitted metadata fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(Uuid);

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TaskHandle {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(TaskHandle)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskState {
    Pending,
    Succeeded {
        info: Box<MediaInfo>,
        source_id: Uuid,
    },
    Failed(String),
}

impl TaskState {
    pub fn is_pending(&self) -> bool {
        matches!(self, TaskState::Pending)
    }
}

/// Default time a finished result stays pollable.
const KEEP_FINISHED: Duration = Duration::from_secs(15 * 60);
/// Finished results kept at most; the oldest go first.
const MAX_FINISHED: usize = 1024;

#[derive(Debug, Clone)]
pub struct MetadataSettings {
    pub retry: RetryPolicy,
    /// Host allow-list applied at submit; empty allows any host.
    pub allowed_hosts: Vec<String>,
    /// Picks the auth-challenge message.
    pub cookies_configured: bool,
    pub keep_finished: Duration,
}

impl MetadataSettings {
    pub fn new(retry: RetryPolicy) -> Self {
        Self {
            retry,
            allowed_hosts: Vec::new(),
            cookies_configured: false,
            keep_finished: KEEP_FINISHED,
        }
    }
}

struct Entry {
    state: TaskState,
    finished_at: Option<Instant>,
}

struct Inner {
    store: JobStore,
    extractor: Arc<dyn Extractor>,
    settings: MetadataSettings,
    tasks: RwLock<HashMap<TaskHandle, Entry>>,
}

impl Inner {
    fn set(&self, handle: TaskHandle, state: TaskState) {
        let finished_at = (!state.is_pending()).then(Instant::now);
        self.tasks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(handle, Entry { state, finished_at });
    }

    /// Drop finished results older than `keep_finished`, then the oldest
    /// beyond `MAX_FINISHED`. Pending tasks are never evicted.
    fn evict_finished(&self) {
        let keep = self.settings.keep_finished;
        let mut tasks = self.tasks.write().unwrap_or_else(|e| e.into_inner());
        tasks.retain(|_, e| e.finished_at.map_or(true, |at| at.elapsed() < keep));

        let mut finished: Vec<(Instant, TaskHandle)> = tasks
            .iter()
            .filter_map(|(h, e)| e.finished_at.map(|at| (at, *h)))
            .collect();
        if finished.len() > MAX_FINISHED {
            finished.sort_unstable_by_key(|(at, _)| *at);
            let excess = finished.len() - MAX_FINISHED;
            for (_, h) in finished.into_iter().take(excess) {
                tasks.remove(&h);
            }
        }
    }

    async fn fetch(&self, url: &str, opts: FetchOptions) -> Result<(MediaInfo, Uuid), VdqError> {
        let mut info = run_with_retry(&self.settings.retry, |attempt| async move {
            tracing::debug!(url, attempt, "fetching metadata");
            self.extractor
                .fetch_metadata(url, opts)
                .await
                .map_err(|e| match e {
                    ExtractorError::AuthChallenge(detail) => {
                        tracing::warn!("auth challenge: {}", detail);
                        VdqError::AuthChallenge(auth_challenge_message(self.settings.cookies_configured))
                    }
                    other => other.into(),
                })
        })
        .await?;

        if info.canonical_url().is_none() {
            info.webpage_url = Some(url.to_string());
        }
        let new_source = NewMediaSource::from_info(&info)
            .ok_or_else(|| VdqError::ExtractionFailed(format!("no URL in metadata for {url}")))?;
        let source = self.store.get_or_create_source(&new_source).await?;
        Ok((info, source.id))
    }
}

/// Registry of metadata fetches. Cheap to clone; clones share tasks.
#[derive(Clone)]
pub struct MetadataTasks {
    inner: Arc<Inner>,
}

impl MetadataTasks {
    pub fn new(store: JobStore, extractor: Arc<dyn Extractor>, settings: MetadataSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                extractor,
                settings,
                tasks: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Start fetching metadata for `url`. Invalid URLs fail here, not in the task.
    pub fn submit(&self, url: &str, opts: FetchOptions) -> Result<TaskHandle, VdqError> {
        let url = validate_url(url, &self.inner.settings.allowed_hosts)?.to_string();
        self.inner.evict_finished();
        let handle = TaskHandle(Uuid::new_v4());
        self.inner.set(handle, TaskState::Pending);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let state = match inner.fetch(&url, opts).await {
                Ok((info, source_id)) => {
                    tracing::info!(task = %handle, %url, %source_id, "metadata fetched");
                    TaskState::Succeeded {
                        info: Box::new(info),
                        source_id,
                    }
                }
                Err(e) => {
                    tracing::warn!(task = %handle, %url, "metadata fetch failed: {}", e);
                    TaskState::Failed(e.to_string())
                }
            };
            inner.set(handle, state);
        });
        Ok(handle)
    }

    /// Current state, or None for an unknown handle.
    pub fn poll(&self, handle: TaskHandle) -> Option<TaskState> {
        self.inner
            .tasks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&handle)
            .map(|e| e.state.clone())
    }

    /// Poll until the task leaves `Pending`.
    pub async fn wait(&self, handle: TaskHandle) -> Option<TaskState> {
        loop {
            match self.poll(handle) {
                Some(TaskState::Pending) => tokio::time::sleep(Duration::from_millis(50)).await,
                other => return other,
            }
        }
    }

    /// Drop a finished task's result. Pending tasks are kept.
    pub fn forget(&self, handle: TaskHandle) -> bool {
        let mut tasks = self.inner.tasks.write().unwrap_or_else(|e| e.into_inner());
        match tasks.get(&handle) {
            Some(e) if !e.state.is_pending() => tasks.remove(&handle).is_some(),
            _ => false,
        }
    }
}
