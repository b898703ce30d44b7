pub mod config;
pub mod error;
pub mod logging;

pub mod extractor;
pub mod format_selector;
pub mod media;
pub mod policy;
pub mod retry;
pub mod runner;
pub mod scheduler;
pub mod store;
pub mod url_model;

pub use error::VdqError;
