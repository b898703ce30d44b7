//! Per-attempt outcome log.

use anyhow::Result;
use sqlx::Row;

use super::db::{parse_uuid, unix_timestamp, JobStore};
use super::types::{HistoryEntry, JobId};

impl JobStore {
    /// Record the outcome of attempt `attempt` and bump the job's attempt count.
    pub async fn record_attempt(
        &self,
        job_id: JobId,
        attempt: u32,
        success: bool,
        reason: Option<&str>,
    ) -> Result<()> {
        let now = unix_timestamp();
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO job_history (job_id, attempt, success, reason, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(job_id.to_string())
        .bind(i64::from(attempt))
        .bind(success)
        .bind(reason)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            r#"
            UPDATE jobs
            SET attempts = MAX(attempts, ?1),
                updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(i64::from(attempt))
        .bind(now)
        .bind(job_id.to_string())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    /// History rows, newest first; all jobs when `job_id` is None.
    pub async fn list_history(&self, job_id: Option<JobId>) -> Result<Vec<HistoryEntry>> {
        let rows = match job_id {
            Some(id) => {
                sqlx::query(
                    r#"
                    SELECT job_id, attempt, success, reason, created_at
                    FROM job_history
                    WHERE job_id = ?1
                    ORDER BY id DESC
                    "#,
                )
                .bind(id.to_string())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT job_id, attempt, success, reason, created_at
                    FROM job_history
                    ORDER BY id DESC
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let job_id: String = row.get("job_id");
            let attempt: i64 = row.get("attempt");
            out.push(HistoryEntry {
                job_id: parse_uuid(&job_id)?,
                attempt: attempt.max(0) as u32,
                success: row.get("success"),
                reason: row.get("reason"),
                created_at: row.get("created_at"),
            });
        }
        Ok(out)
    }
}
