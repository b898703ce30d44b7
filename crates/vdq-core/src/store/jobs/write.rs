//! Job lifecycle writes: claim, progress, terminal states, removal.

use anyhow::Result;
use sqlx::{Row, SqliteConnection};

use super::super::db::{parse_uuid, unix_timestamp, JobStore};
use super::super::types::{JobId, JobStatus, ProgressSnapshot, TerminalOutcome};
use super::quota::credit_on;
use crate::error::VdqError;

fn to_i64(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

async fn mark_terminal_on(
    conn: &mut SqliteConnection,
    id: JobId,
    outcome: &TerminalOutcome,
) -> Result<bool, VdqError> {
    let now = unix_timestamp();
    let job_id = id.to_string();

    let Some(row) = sqlx::query("SELECT status, requester_key FROM jobs WHERE id = ?1")
        .bind(&job_id)
        .fetch_optional(&mut *conn)
        .await?
    else {
        return Ok(false);
    };
    let current = JobStatus::parse(row.get::<String, _>("status").as_str());
    if !current.can_transition(outcome.status()) {
        return Ok(false);
    }
    let requester_key: String = row.get("requester_key");

    // The caller holds the write lock, so the status read above is current.
    let changed = match outcome {
        TerminalOutcome::Completed { output_filename } => sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'completed',
                progress_percent = 100,
                bytes_downloaded = COALESCE(bytes_total, bytes_downloaded),
                eta_secs = 0,
                output_filename = ?1,
                failure_reason = NULL,
                started_at = COALESCE(started_at, ?2),
                completed_at = ?2,
                claimed = 0,
                updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(output_filename)
        .bind(now)
        .bind(&job_id)
        .execute(&mut *conn)
        .await?
        .rows_affected(),
        TerminalOutcome::Failed { reason } => sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'failed',
                failure_reason = ?1,
                claimed = 0,
                updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(reason)
        .bind(now)
        .bind(&job_id)
        .execute(&mut *conn)
        .await?
        .rows_affected(),
        TerminalOutcome::Cancelled => sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'cancelled',
                claimed = 0,
                updated_at = ?1
            WHERE id = ?2
            "#,
        )
        .bind(now)
        .bind(&job_id)
        .execute(&mut *conn)
        .await?
        .rows_affected(),
    };

    if changed == 0 {
        return Ok(false);
    }
    if matches!(outcome, TerminalOutcome::Completed { .. }) {
        credit_on(conn, &requester_key, id).await?;
    }
    Ok(true)
}

impl JobStore {
    /// Atomically lease the oldest runnable job to the calling worker.
    ///
    /// Returns None when nothing is runnable. Leases stranded by a crash are
    /// released by `recover_claimed_jobs()` before scheduling.
    pub async fn claim_next_queued_job(&self) -> Result<Option<JobId>> {
        let now = unix_timestamp();
        let row = sqlx::query(
            r#"
            UPDATE jobs
            SET claimed = 1,
                updated_at = ?1
            WHERE id = (
                SELECT id FROM jobs
                WHERE claimed = 0 AND status IN ('queued', 'downloading')
                ORDER BY created_at ASC, rowid ASC
                LIMIT 1
            )
            RETURNING id
            "#,
        )
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let id: String = row.get("id");
        Ok(Some(parse_uuid(&id)?))
    }

    /// Release leases held on unfinished jobs (e.g. after a crash).
    /// Returns the number of jobs released.
    pub async fn recover_claimed_jobs(&self) -> Result<u64> {
        let now = unix_timestamp();
        let r = sqlx::query(
            r#"
            UPDATE jobs
            SET claimed = 0,
                updated_at = ?1
            WHERE claimed = 1 AND status IN ('queued', 'downloading')
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected())
    }

    /// Apply one progress observation.
    ///
    /// Moves `queued` to `downloading` and stamps `started_at` once. Percent
    /// is `floor(downloaded / total * 100)` capped at 100 and never lower
    /// than the stored value; bytes are clamped to the known total. Returns
    /// false when the job is no longer active.
    pub async fn append_progress(&self, id: JobId, snap: &ProgressSnapshot) -> Result<bool> {
        let now = unix_timestamp();
        let r = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'downloading',
                started_at = COALESCE(started_at, ?1),
                bytes_total = COALESCE(?2, bytes_total),
                bytes_downloaded = CASE
                    WHEN COALESCE(?2, bytes_total) IS NULL THEN ?3
                    ELSE MIN(?3, COALESCE(?2, bytes_total))
                END,
                progress_percent = CASE
                    WHEN COALESCE(?2, bytes_total) > 0 THEN MAX(
                        progress_percent,
                        MIN(100, MIN(?3, COALESCE(?2, bytes_total)) * 100 / COALESCE(?2, bytes_total))
                    )
                    ELSE progress_percent
                END,
                speed_kibps = COALESCE(?4, speed_kibps),
                eta_secs = COALESCE(?5, eta_secs),
                updated_at = ?1
            WHERE id = ?6 AND status IN ('queued', 'downloading')
            "#,
        )
        .bind(now)
        .bind(snap.total_bytes.map(to_i64))
        .bind(to_i64(snap.downloaded_bytes))
        .bind(snap.speed_kibps.filter(|s| s.is_finite() && *s >= 0.0))
        .bind(snap.eta_secs.map(to_i64))
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected() > 0)
    }

    /// Move an active job to a terminal state.
    ///
    /// `Completed` sets progress to 100 and the output filename and credits
    /// the requester's daily usage in the same transaction. `Cancelled` only
    /// applies to queued jobs. Returns false when the job was not in a state
    /// that allows the transition.
    pub async fn mark_terminal(&self, id: JobId, outcome: &TerminalOutcome) -> Result<bool, VdqError> {
        let mut tx = self.begin_immediate().await?;
        let result = mark_terminal_on(&mut tx, id, outcome).await;
        let changed = tx.finish(result).await?;
        if changed {
            tracing::debug!(job_id = %id, status = %outcome.status(), "job finished");
        }
        Ok(changed)
    }

    /// Cancel a job that has not started. Running transfers are not interrupted.
    pub async fn cancel_job(&self, id: JobId) -> Result<bool, VdqError> {
        self.mark_terminal(id, &TerminalOutcome::Cancelled).await
    }

    /// Permanently remove a job and its attempt history.
    ///
    /// Output files and quota credits are left alone. Returns false if no such job.
    pub async fn remove_job(&self, id: JobId) -> Result<bool> {
        let job_id = id.to_string();
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM job_history WHERE job_id = ?1")
            .bind(&job_id)
            .execute(&mut *tx)
            .await?;
        let removed = sqlx::query("DELETE FROM jobs WHERE id = ?1")
            .bind(&job_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(removed > 0)
    }
}
