//! CLI command handlers, one file per command group.

mod add;
mod fetch;
mod history;
mod remove;
mod run;
mod status;

pub use add::{run_add, run_playlist};
pub use fetch::{run_fetch, run_formats};
pub use history::{run_history, run_usage};
pub use remove::{run_cancel, run_remove};
pub use run::run_scheduler;
pub use status::{run_show, run_status};
