//! Stripe-to-disk placement and code-aware data-loss queries.
//!
//! Placement is re-derived once per simulated iteration: the cluster's
//! physical shape (`ClusterTopology`) and the code's chunk layout
//! (`Code`) are combined into a concrete `Placement` mapping stripes to
//! disks, under either the flat or hierarchical policy (spec.md §4.2).

pub mod engine;
pub mod topology;

pub use engine::Placement;
pub use topology::ClusterTopology;
