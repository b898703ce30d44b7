//! Run multiple jobs concurrently.
//!
//! Keeps up to `max_concurrent` jobs running at once; when one finishes,
//! the next queued job is claimed until the queue is empty.

use anyhow::Result;
use std::sync::Arc;
use tracing::Instrument;

use crate::logging::job_span;
use crate::retry::{run_with_retry, RetryPolicy};
use crate::runner::{JobRunner, RunOutcome};
use crate::store::{JobId, TerminalOutcome};

/// Counts of how claimed jobs ended in one scheduler run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub completed: u32,
    pub failed: u32,
    pub skipped: u32,
}

/// Run one claimed job with retries, recording every attempt, and mark it
/// failed once retries are exhausted or the error is fatal.
///
/// Attempt numbers continue from the attempts already recorded for the job,
/// so a job picked up again after a crash does not reuse numbers.
///
/// Returns the final outcome; `None` means the job ended up failed.
pub async fn execute_with_retry(
    runner: &JobRunner,
    job_id: JobId,
    policy: &RetryPolicy,
) -> Result<Option<RunOutcome>> {
    retry_job(runner, job_id, policy)
        .instrument(job_span(job_id))
        .await
}

async fn retry_job(
    runner: &JobRunner,
    job_id: JobId,
    policy: &RetryPolicy,
) -> Result<Option<RunOutcome>> {
    let prior = runner
        .store()
        .get_job(job_id)
        .await?
        .map(|job| job.attempts)
        .unwrap_or(0);

    let result = run_with_retry(policy, |attempt| async move {
        let attempt = prior + attempt;
        let r = runner.run(job_id).await;
        let recorded = match &r {
            Ok(RunOutcome::Skipped { .. }) => Ok(()),
            Ok(RunOutcome::Completed { .. }) => {
                runner.store().record_attempt(job_id, attempt, true, None).await
            }
            Err(e) => {
                tracing::warn!(attempt, "attempt failed: {}", e);
                runner
                    .store()
                    .record_attempt(job_id, attempt, false, Some(e.to_string().as_str()))
                    .await
            }
        };
        if let Err(e) = recorded {
            tracing::warn!("failed to record attempt: {}", e);
        }
        r
    })
    .await;

    match result {
        Ok(outcome) => Ok(Some(outcome)),
        Err(e) => {
            let reason = e.to_string();
            tracing::error!("job failed: {}", reason);
            runner
                .store()
                .mark_terminal(job_id, &TerminalOutcome::Failed { reason })
                .await?;
            Ok(None)
        }
    }
}

/// Runs `execute_with_retry` on its own task so a panic stays with the job.
async fn supervise(runner: Arc<JobRunner>, job_id: JobId, policy: RetryPolicy) -> JobEnd {
    let worker = Arc::clone(&runner);
    let handle =
        tokio::spawn(async move { execute_with_retry(&worker, job_id, &policy).await });
    let reason = match handle.await {
        Ok(Ok(Some(RunOutcome::Completed { .. }))) => return JobEnd::Completed,
        Ok(Ok(Some(RunOutcome::Skipped { .. }))) => return JobEnd::Skipped,
        Ok(Ok(None)) => return JobEnd::Failed,
        Ok(Err(e)) => format!("job error: {e}"),
        Err(e) if e.is_panic() => "job task panicked".to_string(),
        Err(e) => format!("job task ended: {e}"),
    };

    tracing::error!(job_id = %job_id, "{}", reason);
    // Failing the job also releases its claim.
    if let Err(e) = runner
        .store()
        .mark_terminal(job_id, &TerminalOutcome::Failed { reason })
        .await
    {
        tracing::error!(job_id = %job_id, "could not mark job failed: {}", e);
    }
    JobEnd::Failed
}

enum JobEnd {
    Completed,
    Failed,
    Skipped,
}

/// Runs queued jobs with up to `max_concurrent` jobs in flight at once.
///
/// Returns when no runnable job is left. A job that errors or panics is
/// counted as failed and does not stop its siblings. If claiming fails, no
/// new job is started; running jobs are drained and the claim error is
/// returned. Call `JobStore::recover_claimed_jobs` first so jobs stranded by
/// a previous crash are picked up.
pub async fn run_jobs_parallel(
    runner: Arc<JobRunner>,
    policy: RetryPolicy,
    max_concurrent: usize,
) -> Result<RunSummary> {
    let max_concurrent = max_concurrent.max(1);
    let mut summary = RunSummary::default();
    let mut join_set = tokio::task::JoinSet::new();
    let mut claim_error: Option<anyhow::Error> = None;

    loop {
        while claim_error.is_none() && join_set.len() < max_concurrent {
            match runner.store().claim_next_queued_job().await {
                Ok(Some(job_id)) => {
                    join_set.spawn(supervise(Arc::clone(&runner), job_id, policy));
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("claiming next job failed: {}", e);
                    claim_error = Some(e.into());
                }
            }
        }

        let Some(res) = join_set.join_next().await else {
            break;
        };
        match res {
            Ok(JobEnd::Completed) => summary.completed += 1,
            Ok(JobEnd::Skipped) => summary.skipped += 1,
            Ok(JobEnd::Failed) => summary.failed += 1,
            Err(e) => {
                tracing::error!("job supervisor ended: {}", e);
                summary.failed += 1;
            }
        }
    }

    match claim_error {
        Some(e) => Err(e),
        None => Ok(summary),
    }
}
