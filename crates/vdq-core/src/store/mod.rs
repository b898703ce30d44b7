//! Persistent job store (SQLite via sqlx).
//!
//! Holds media sources and formats, download jobs, per-day usage counters,
//! quota credits and per-attempt history. Writes that must observe and
//! change state together (admission, completion credit) run inside
//! `BEGIN IMMEDIATE` transactions so SQLite's write lock serializes them.

pub mod types;
pub mod db;
mod history;
mod jobs;
mod media;

pub use types::*;
pub use db::*;

#[cfg(test)]
mod tests;
