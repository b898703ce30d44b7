//! Admission and completion credit: the only operations that read and write
//! quota state in one transaction.

use anyhow::Context;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::super::db::{today, unix_timestamp, JobStore};
use super::super::types::{JobId, JobStatus};
use crate::error::VdqError;
use crate::media::MediaFormat;
use crate::policy::{FormatCandidate, Policy, Requester};

/// Completed credits today plus this requester's active jobs created today.
///
/// Active jobs are counted up front so parallel submissions cannot exceed
/// the limit before any of them finishes.
pub(super) async fn downloads_today_on(
    conn: &mut SqliteConnection,
    requester_key: &str,
    day: &str,
) -> Result<(u32, u32), sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT
            COALESCE(
                (SELECT success_count FROM usage_counters
                 WHERE requester_key = ?1 AND day = ?2),
                0
            ) AS success_count,
            (SELECT COUNT(*) FROM jobs
             WHERE requester_key = ?1
               AND created_day = ?2
               AND status IN ('queued', 'downloading')) AS active_count
        "#,
    )
    .bind(requester_key)
    .bind(day)
    .fetch_one(&mut *conn)
    .await?;
    let success: i64 = row.get("success_count");
    let active: i64 = row.get("active_count");
    Ok((success.max(0) as u32, active.max(0) as u32))
}

async fn insert_job_on(
    conn: &mut SqliteConnection,
    requester: &Requester,
    source_id: Uuid,
    format_row_id: Uuid,
) -> Result<JobId, VdqError> {
    let id = Uuid::new_v4();
    let now = unix_timestamp();
    let requester_json = serde_json::to_string(requester).context("serialize requester")?;

    sqlx::query(
        r#"
        INSERT INTO jobs (
            id, requester_key, requester_json, source_id, format_row_id,
            status, created_day, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
        "#,
    )
    .bind(id.to_string())
    .bind(requester.key())
    .bind(requester_json)
    .bind(source_id.to_string())
    .bind(format_row_id.to_string())
    .bind(JobStatus::Queued.as_str())
    .bind(today())
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(id)
}

/// Credit one completion to `requester_key` for today, at most once per job.
/// Returns true when this call added the credit.
pub(super) async fn credit_on(
    conn: &mut SqliteConnection,
    requester_key: &str,
    job_id: JobId,
) -> Result<bool, sqlx::Error> {
    let day = today();
    let inserted = sqlx::query(
        r#"
        INSERT OR IGNORE INTO quota_credits (job_id, requester_key, day, created_at)
        VALUES (?1, ?2, ?3, ?4)
        "#,
    )
    .bind(job_id.to_string())
    .bind(requester_key)
    .bind(&day)
    .bind(unix_timestamp())
    .execute(&mut *conn)
    .await?
    .rows_affected();
    if inserted == 0 {
        return Ok(false);
    }

    sqlx::query(
        r#"
        INSERT INTO usage_counters (requester_key, day, success_count)
        VALUES (?1, ?2, 1)
        ON CONFLICT (requester_key, day)
        DO UPDATE SET success_count = success_count + 1
        "#,
    )
    .bind(requester_key)
    .bind(&day)
    .execute(&mut *conn)
    .await?;
    Ok(true)
}

impl JobStore {
    /// Insert a queued job without consulting any policy.
    ///
    /// For administrative use and tests; submissions go through `admit_job`.
    pub async fn create_job(
        &self,
        requester: &Requester,
        source_id: Uuid,
        format_row_id: Uuid,
    ) -> Result<JobId, VdqError> {
        let mut conn = self.pool.acquire().await?;
        insert_job_on(&mut conn, requester, source_id, format_row_id).await
    }

    /// Gate and insert in one write transaction.
    ///
    /// The quota read and the job insert share SQLite's write lock, so two
    /// concurrent submissions for the same requester are serialized and
    /// cannot both see room under the limit. Nothing is written on denial.
    pub async fn admit_job(
        &self,
        requester: &Requester,
        policy: &Policy,
        source_id: Uuid,
        format: &MediaFormat,
    ) -> Result<JobId, VdqError> {
        let mut tx = self.begin_immediate().await?;
        let result: Result<JobId, VdqError> = async {
            if !policy.unlimited {
                let (success, active) =
                    downloads_today_on(&mut tx, &requester.key(), &today()).await?;
                policy.evaluate(success + active, FormatCandidate::from(format))?;
            }
            insert_job_on(&mut tx, requester, source_id, format.id).await
        }
        .await;
        let id = tx.finish(result).await?;
        tracing::debug!(job_id = %id, requester = %requester, "admitted job");
        Ok(id)
    }

    /// Credit a completed job to its requester's daily usage.
    ///
    /// Idempotent per job: repeated calls return false and change nothing.
    pub async fn record_completion_for_quota(
        &self,
        requester: &Requester,
        job_id: JobId,
    ) -> Result<bool, VdqError> {
        let mut tx = self.begin_immediate().await?;
        let result = credit_on(&mut tx, &requester.key(), job_id)
            .await
            .map_err(VdqError::from);
        tx.finish(result).await
    }
}
