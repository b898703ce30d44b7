//! Execution of a single download job.
//!
//! The runner re-reads the job, re-checks the format against the requester's
//! current policy, walks the fallback chain through the extractor while a
//! side task persists progress, and records completion. Failures are returned
//! to the caller (the scheduler), which decides about retries and marks the
//! job failed.

mod fallback;
mod progress;

pub use fallback::{auth_challenge_message, build_fallback_chain, run_chain, signal_for, FallbackSignal};

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::VdqError;
use crate::extractor::{DownloadRequest, Extractor};
use crate::policy::{FormatCandidate, PolicyEngine};
use crate::store::{JobId, JobStatus, JobStore, TerminalOutcome};
use crate::url_model;

use progress::{run_progress_persistence_loop, ChannelSink};

/// Result of one successful `JobRunner::run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed { output_filename: String },
    /// The job was already terminal (e.g. cancelled before it started).
    Skipped { status: JobStatus },
}

/// Runs one job end to end. Cheap to clone.
#[derive(Clone)]
pub struct JobRunner {
    store: JobStore,
    extractor: Arc<dyn Extractor>,
    policies: PolicyEngine,
    download_dir: PathBuf,
    cookies_configured: bool,
}

impl JobRunner {
    pub fn new(
        store: JobStore,
        extractor: Arc<dyn Extractor>,
        policies: PolicyEngine,
        download_dir: PathBuf,
    ) -> Self {
        Self {
            store,
            extractor,
            policies,
            download_dir,
            cookies_configured: false,
        }
    }

    /// Tailors the auth-challenge message to whether cookies are configured.
    pub fn with_cookies_configured(mut self, configured: bool) -> Self {
        self.cookies_configured = configured;
        self
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Execute `job_id` once. Each call rebuilds the chain from the stored format.
    pub async fn run(&self, job_id: JobId) -> Result<RunOutcome, VdqError> {
        let job = self
            .store
            .get_job(job_id)
            .await?
            .ok_or_else(|| VdqError::JobNotFound(job_id.to_string()))?;
        if job.status.is_terminal() {
            return Ok(RunOutcome::Skipped { status: job.status });
        }

        let source = self
            .store
            .get_source(job.source_id)
            .await?
            .ok_or_else(|| VdqError::SourceNotFound(job.source_id.to_string()))?;
        let format = self
            .store
            .get_format(job.format_row_id)
            .await?
            .ok_or_else(|| VdqError::UnknownFormat {
                format_id: job.format_row_id.to_string(),
            })?;

        // Limits may have changed since submission.
        self.policies
            .resolve(&job.requester)
            .check_format(FormatCandidate::from(&format))?;

        let chain = build_fallback_chain(&format);
        let stem = url_model::output_stem(&source.title, job.id);
        tracing::info!(job_id = %job_id, format_id = %format.format_id, "starting download");

        let (sink, rx) = ChannelSink::new();
        let persist = tokio::spawn(run_progress_persistence_loop(
            rx,
            self.store.clone(),
            job_id,
        ));

        let result = run_chain(&chain, |selector| {
            let req = DownloadRequest {
                url: source.canonical_url.clone(),
                selector: selector.to_string(),
                output_dir: self.download_dir.clone(),
                output_stem: stem.clone(),
            };
            let sink = &sink;
            async move {
                tracing::debug!(job_id = %job_id, selector = %req.selector, "trying selector");
                self.extractor
                    .download(&req, sink)
                    .await
                    .map_err(|e| signal_for(e, self.cookies_configured))
            }
        })
        .await;

        // Flush staged progress before the terminal write.
        drop(sink);
        if let Err(e) = persist.await {
            tracing::warn!(job_id = %job_id, "progress task failed: {}", e);
        }

        let output = result?;
        let output_filename = url_model::output_filename(&stem, &output.extension);
        let outcome = TerminalOutcome::Completed {
            output_filename: output_filename.clone(),
        };
        if !self.store.mark_terminal(job_id, &outcome).await? {
            let status = self
                .store
                .get_job(job_id)
                .await?
                .map(|j| j.status)
                .unwrap_or(JobStatus::Failed);
            tracing::warn!(job_id = %job_id, %status, "download finished but job is no longer active");
            return Ok(RunOutcome::Skipped { status });
        }
        tracing::info!(job_id = %job_id, file = %output_filename, "job completed");
        Ok(RunOutcome::Completed { output_filename })
    }
}
