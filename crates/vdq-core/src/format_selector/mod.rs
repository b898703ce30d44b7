//! Format filtering and ranking.
//!
//! Turns the raw, provider-shaped format list into a short, ordered list a
//! requester can pick from, and picks a default when nobody chose.

mod filter;
mod rank;

pub use filter::{classify, FormatClass};
pub use rank::{choose_preferred, filter_and_rank, filter_and_rank_with};
