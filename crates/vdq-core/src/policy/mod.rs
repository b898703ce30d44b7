//! Quota and format-permission gate.
//!
//! `Requester` identifies who submits a job, `PolicyEngine` resolves the
//! limits for that requester from config, and `Policy::evaluate` is the pure
//! decision. The transactional half (counting today's downloads and inserting
//! the job under one write lock) lives in `store::JobStore::admit_job`.

mod gate;
mod requester;

pub use gate::{allowed_format_ids, FormatCandidate, Policy, PolicyEngine};
pub use requester::{Requester, Tier};
