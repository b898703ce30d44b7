//! Types used by the job store.

use uuid::Uuid;

use crate::policy::Requester;

/// Job identifier.
pub type JobId = Uuid;

/// Lifecycle state stored as a string in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Downloading,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Downloading => "downloading",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Unknown strings map to `Failed` so a corrupt row is never re-run.
    pub fn parse(s: &str) -> Self {
        match s {
            "queued" => JobStatus::Queued,
            "downloading" => JobStatus::Downloading,
            "completed" => JobStatus::Completed,
            "cancelled" => JobStatus::Cancelled,
            _ => JobStatus::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Counts against the daily quota while in this state.
    pub fn is_active(self) -> bool {
        matches!(self, JobStatus::Queued | JobStatus::Downloading)
    }

    /// Allowed edges of the job state machine.
    ///
    /// `downloading` may loop on itself (progress updates). Completion is
    /// allowed straight from `queued` for downloads that finish before any
    /// byte count was reported.
    pub fn can_transition(self, to: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, to),
            (Queued, Downloading)
                | (Downloading, Downloading)
                | (Queued | Downloading, Completed)
                | (Queued | Downloading, Failed)
                | (Queued, Cancelled)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// One progress observation from the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProgressSnapshot {
    pub downloaded_bytes: u64,
    /// Exact or estimated total, when the extractor knows it.
    pub total_bytes: Option<u64>,
    /// KiB per second.
    pub speed_kibps: Option<f64>,
    pub eta_secs: Option<u64>,
}

/// How a job left the active states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalOutcome {
    Completed { output_filename: String },
    Failed { reason: String },
    Cancelled,
}

impl TerminalOutcome {
    pub fn status(&self) -> JobStatus {
        match self {
            TerminalOutcome::Completed { .. } => JobStatus::Completed,
            TerminalOutcome::Failed { .. } => JobStatus::Failed,
            TerminalOutcome::Cancelled => JobStatus::Cancelled,
        }
    }
}

/// Full job row as seen by pollers, the runner and the CLI.
#[derive(Debug, Clone)]
pub struct JobSnapshot {
    pub id: JobId,
    pub requester: Requester,
    pub source_id: Uuid,
    pub format_row_id: Uuid,
    pub status: JobStatus,
    pub progress_percent: u8,
    pub bytes_downloaded: u64,
    pub bytes_total: Option<u64>,
    pub speed_kibps: Option<f64>,
    pub eta_secs: Option<u64>,
    pub output_filename: Option<String>,
    pub failure_reason: Option<String>,
    pub attempts: u32,
    /// UTC day (`YYYY-MM-DD`) the job counts against.
    pub created_day: String,
    pub created_at: i64,
    pub started_at: Option<i64>,
    pub completed_at: Option<i64>,
    pub updated_at: i64,
}

/// Outcome of one execution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub job_id: JobId,
    pub attempt: u32,
    pub success: bool,
    pub reason: Option<String>,
    pub created_at: i64,
}

/// Quota usage of one requester for the current UTC day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageToday {
    pub requester_key: String,
    pub day: String,
    /// Completed downloads credited today.
    pub success_count: u32,
    /// Jobs created today still queued or downloading.
    pub active_count: u32,
}

impl UsageToday {
    /// The count the policy gate compares against the daily limit.
    pub fn downloads_today(&self) -> u32 {
        self.success_count + self.active_count
    }
}
