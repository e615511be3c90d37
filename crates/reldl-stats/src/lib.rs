//! reldl-stats - Weibull lifetime distributions, extended-precision
//! numerics, and the batch-mean sample aggregator.
//!
//! This is the only crate in the workspace that needs more than plain
//! `f64` arithmetic: hazard-rate evaluation for large x and the running
//! log-likelihood ratio of the importance-sampling simulator both call
//! into [`numeric`] to stay stable (spec.md §4.1, §4.6, §9).

pub mod aggregate;
pub mod numeric;
pub mod weibull;

pub use aggregate::{AggregateResult, SampleAggregator};
pub use numeric::CompensatedSum;
pub use weibull::Weibull;
