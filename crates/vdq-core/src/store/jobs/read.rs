//! Job read operations: get, list and today's usage.

use anyhow::{Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::super::db::{parse_uuid, today, JobStore};
use super::super::types::{JobId, JobSnapshot, JobStatus, UsageToday};
use super::quota::downloads_today_on;
use crate::policy::Requester;

const JOB_COLUMNS: &str = r#"
    id, requester_json, source_id, format_row_id, status,
    progress_percent, bytes_downloaded, bytes_total, speed_kibps, eta_secs,
    output_filename, failure_reason, attempts, created_day,
    created_at, started_at, completed_at, updated_at
"#;

fn job_from_row(row: &SqliteRow) -> Result<JobSnapshot> {
    let id: String = row.get("id");
    let requester_json: String = row.get("requester_json");
    let source_id: String = row.get("source_id");
    let format_row_id: String = row.get("format_row_id");
    let status: String = row.get("status");
    let progress_percent: i64 = row.get("progress_percent");
    let bytes_downloaded: i64 = row.get("bytes_downloaded");
    let bytes_total: Option<i64> = row.get("bytes_total");
    let eta_secs: Option<i64> = row.get("eta_secs");
    let attempts: i64 = row.get("attempts");

    let requester: Requester = serde_json::from_str(&requester_json)
        .with_context(|| format!("invalid requester for job {id}"))?;

    Ok(JobSnapshot {
        id: parse_uuid(&id)?,
        requester,
        source_id: parse_uuid(&source_id)?,
        format_row_id: parse_uuid(&format_row_id)?,
        status: JobStatus::parse(&status),
        progress_percent: progress_percent.clamp(0, 100) as u8,
        bytes_downloaded: bytes_downloaded.max(0) as u64,
        bytes_total: bytes_total.map(|b| b.max(0) as u64),
        speed_kibps: row.get("speed_kibps"),
        eta_secs: eta_secs.map(|e| e.max(0) as u64),
        output_filename: row.get("output_filename"),
        failure_reason: row.get("failure_reason"),
        attempts: attempts.max(0) as u32,
        created_day: row.get("created_day"),
        created_at: row.get("created_at"),
        started_at: row.get("started_at"),
        completed_at: row.get("completed_at"),
        updated_at: row.get("updated_at"),
    })
}

impl JobStore {
    /// List all jobs, newest first.
    pub async fn list_jobs(&self) -> Result<Vec<JobSnapshot>> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs ORDER BY created_at DESC, rowid DESC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(job_from_row).collect()
    }

    /// Fetch a single job row.
    pub async fn get_job(&self, id: JobId) -> Result<Option<JobSnapshot>> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(job_from_row).transpose()
    }

    /// Usage the policy gate would see for `requester` right now.
    pub async fn usage_today(&self, requester: &Requester) -> Result<UsageToday> {
        let key = requester.key();
        let day = today();
        let mut conn = self.pool.acquire().await?;
        let (success_count, active_count) = downloads_today_on(&mut conn, &key, &day).await?;
        Ok(UsageToday {
            requester_key: key,
            day,
            success_count,
            active_count,
        })
    }
}
