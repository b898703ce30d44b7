//! Job submission: validation, format lookup and the policy gate.

use std::sync::Arc;

use uuid::Uuid;

use crate::config::FormatLimits;
use crate::error::VdqError;
use crate::extractor::{Extractor, FetchOptions};
use crate::format_selector::{choose_preferred, filter_and_rank_with};
use crate::media::{FormatDescriptor, MediaInfo, MediaSource, NewMediaFormat, NewMediaSource};
use crate::policy::{allowed_format_ids, FormatCandidate, PolicyEngine, Requester};
use crate::store::{JobId, JobSnapshot, JobStore};
use crate::url_model::validate_url;

/// Ranked formats of a source and the subset a requester may pick.
#[derive(Debug, Clone)]
pub struct FormatMenu {
    pub formats: Vec<FormatDescriptor>,
    pub allowed: Vec<String>,
    pub default: Option<String>,
}

/// A playlist entry that did not become a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub url: String,
    pub reason: String,
}

/// What `enqueue_playlist` did.
#[derive(Debug, Default)]
pub struct PlaylistReport {
    pub jobs: Vec<JobId>,
    pub skipped: Vec<SkippedEntry>,
    /// Set when the daily quota ran out; later entries were not tried.
    pub stopped: Option<VdqError>,
}

/// Accepts download requests and turns them into admitted jobs.
#[derive(Clone)]
pub struct JobQueue {
    store: JobStore,
    policies: PolicyEngine,
    extractor: Arc<dyn Extractor>,
    allowed_hosts: Vec<String>,
    limits: FormatLimits,
}

impl JobQueue {
    pub fn new(store: JobStore, policies: PolicyEngine, extractor: Arc<dyn Extractor>) -> Self {
        Self {
            store,
            policies,
            extractor,
            allowed_hosts: Vec::new(),
            limits: FormatLimits::default(),
        }
    }

    pub fn with_allowed_hosts(mut self, hosts: Vec<String>) -> Self {
        self.allowed_hosts = hosts;
        self
    }

    pub fn with_format_limits(mut self, limits: FormatLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    async fn load_source(&self, source_id: Uuid) -> Result<MediaSource, VdqError> {
        self.store
            .get_source(source_id)
            .await?
            .ok_or_else(|| VdqError::SourceNotFound(source_id.to_string()))
    }

    fn ranked_formats(&self, source: &MediaSource) -> Result<Vec<FormatDescriptor>, VdqError> {
        let info = source.info().map_err(|e| {
            VdqError::NoFormatsAvailable(format!("unreadable metadata for {}: {e}", source.canonical_url))
        })?;
        Ok(filter_and_rank_with(&info.formats, self.limits))
    }

    /// Formats offered for a source, filtered by what `requester` may pick.
    pub async fn format_menu(
        &self,
        requester: &Requester,
        source_id: Uuid,
    ) -> Result<FormatMenu, VdqError> {
        let source = self.load_source(source_id).await?;
        let formats = self.ranked_formats(&source)?;
        let (allowed, default) = allowed_format_ids(&self.policies.resolve(requester), &formats);
        Ok(FormatMenu {
            formats,
            allowed,
            default,
        })
    }

    /// Submit a download of `format_id` from a previously fetched source.
    ///
    /// Fails with `InvalidVideoUrl`, `NoFormatsAvailable`, `UnknownFormat`,
    /// `SourceNotFound`, or a policy denial; nothing is written on failure
    /// except the lazily created format row.
    pub async fn enqueue_download(
        &self,
        requester: &Requester,
        source_id: Uuid,
        format_id: &str,
    ) -> Result<JobId, VdqError> {
        let source = self.load_source(source_id).await?;
        validate_url(&source.canonical_url, &self.allowed_hosts)?;
        let formats = self.ranked_formats(&source)?;
        self.admit(requester, &source, &formats, format_id).await
    }

    async fn admit(
        &self,
        requester: &Requester,
        source: &MediaSource,
        ranked: &[FormatDescriptor],
        format_id: &str,
    ) -> Result<JobId, VdqError> {
        if ranked.is_empty() {
            return Err(VdqError::NoFormatsAvailable(source.canonical_url.clone()));
        }
        let desc = ranked
            .iter()
            .find(|f| f.format_id == format_id)
            .ok_or_else(|| VdqError::UnknownFormat {
                format_id: format_id.to_string(),
            })?;
        let format = self
            .store
            .get_or_create_format(source.id, &NewMediaFormat::from(desc))
            .await?;
        let policy = self.policies.resolve(requester);
        let job_id = self
            .store
            .admit_job(requester, &policy, source.id, &format)
            .await?;
        tracing::info!(
            job_id = %job_id,
            format_id = %format.format_id,
            url = %source.canonical_url,
            "job queued"
        );
        Ok(job_id)
    }

    /// Current state of a job.
    pub async fn poll_job(&self, job_id: JobId) -> Result<JobSnapshot, VdqError> {
        self.store
            .get_job(job_id)
            .await?
            .ok_or_else(|| VdqError::JobNotFound(job_id.to_string()))
    }

    /// Cancel a queued job. Returns false if it already started or finished.
    pub async fn cancel(&self, job_id: JobId) -> Result<bool, VdqError> {
        self.poll_job(job_id).await?;
        self.store.cancel_job(job_id).await
    }

    /// Enqueue one job per playlist entry (or for the single video).
    ///
    /// Each entry uses `format_id` when it offers it, else the preferred
    /// format among those the requester may pick. Entries without a URL or
    /// usable formats, or whose format is denied, are skipped. Running out of
    /// quota stops the loop.
    pub async fn enqueue_playlist(
        &self,
        requester: &Requester,
        info: &MediaInfo,
        format_id: Option<&str>,
    ) -> Result<PlaylistReport, VdqError> {
        let policy = self.policies.resolve(requester);
        let mut report = PlaylistReport::default();

        for entry in info.videos() {
            let Some(url) = entry.canonical_url().map(str::to_string) else {
                report.skipped.push(SkippedEntry {
                    url: entry.id.clone().unwrap_or_default(),
                    reason: "entry has no URL".to_string(),
                });
                continue;
            };
            let skip = |reason: String| SkippedEntry {
                url: url.clone(),
                reason,
            };
            if let Err(e) = validate_url(&url, &self.allowed_hosts) {
                report.skipped.push(skip(e.to_string()));
                continue;
            }

            // Flat listings carry no formats; resolve the entry itself.
            let fetched;
            let full = if entry.formats.is_empty() {
                match self.extractor.fetch_metadata(&url, FetchOptions::default()).await {
                    Ok(i) => {
                        fetched = i;
                        &fetched
                    }
                    Err(e) => {
                        report.skipped.push(skip(e.to_string()));
                        continue;
                    }
                }
            } else {
                entry
            };

            let Some(new_source) = NewMediaSource::from_info(full)
                .or_else(|| NewMediaSource::from_info(entry))
            else {
                report.skipped.push(skip("entry has no URL".to_string()));
                continue;
            };
            let source = self.store.get_or_create_source(&new_source).await?;
            let ranked = filter_and_rank_with(&full.formats, self.limits);

            let chosen = match format_id.filter(|id| ranked.iter().any(|f| f.format_id == *id)) {
                Some(id) => id.to_string(),
                None => {
                    let pickable: Vec<FormatDescriptor> = ranked
                        .iter()
                        .filter(|f| policy.check_format(FormatCandidate::from(*f)).is_ok())
                        .cloned()
                        .collect();
                    let pool = if pickable.is_empty() { &ranked } else { &pickable };
                    match choose_preferred(pool) {
                        Ok(f) => f.format_id.clone(),
                        Err(e) => {
                            report.skipped.push(skip(e.to_string()));
                            continue;
                        }
                    }
                }
            };

            match self.admit(requester, &source, &ranked, &chosen).await {
                Ok(id) => report.jobs.push(id),
                Err(e @ VdqError::RateLimitExceeded { .. }) => {
                    report.stopped = Some(e);
                    break;
                }
                // Quota is handled above; the remaining denials concern this entry only.
                Err(e) if e.is_policy_denial() || matches!(e, VdqError::NoFormatsAvailable(_)) => {
                    report.skipped.push(skip(e.to_string()));
                }
                Err(e) => return Err(e),
            }
        }

        Ok(report)
    }
}
