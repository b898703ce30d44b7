//! Job scheduling: submission, parallel execution and metadata tasks.
//!
//! `JobQueue` turns a (requester, source, format) request into an admitted
//! job. `run_jobs_parallel` drains admitted jobs with a bounded worker pool,
//! retrying transient failures. `MetadataTasks` runs metadata fetches in the
//! background and lets callers poll for the result.

mod metadata;
mod parallel;
mod queue;

pub use metadata::{MetadataSettings, MetadataTasks, TaskHandle, TaskState};
pub use parallel::{execute_with_retry, run_jobs_parallel, RunSummary};
pub use queue::{FormatMenu, JobQueue, PlaylistReport, SkippedEntry};
