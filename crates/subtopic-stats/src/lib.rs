//! # subtopic-stats
//!
//! Error-propagated statistics over a batch of keyword search outcomes.
//!
//! ## Measures
//! - Found rate with an exact binomial standard error
//! - Average path length of found searches with its standard error
//! - Average branching factor per expansion step with its standard error
//! - Stability of repeated searches of the same keyword
//!
//! Under-sampled measures are `None` ("undefined"), never a panic.

pub mod binomial;
pub mod engine;
pub mod error;
pub mod outcome;
pub mod report;

pub use binomial::binomial_standard_error;
pub use engine::{compute_statistics, BatchStatistics, Estimate};
pub use error::StatsError;
pub use outcome::{read_outcomes, OutcomeLog, SearchOutcome};
