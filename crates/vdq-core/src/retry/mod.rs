//! Retry and backoff policy.
//!
//! This module classifies job errors into transient and fatal kinds and makes
//! exponential backoff decisions so the scheduler and the metadata tasks
//! share one policy.

mod classify;
mod policy;
mod run;

pub use classify::classify;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
