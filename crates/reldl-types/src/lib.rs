//! reldl-types - Shared types for reldl-sim
//!
//! Identifiers, erasure-code parameterization, run configuration, and the
//! common error type shared by every other crate in the workspace.

pub mod code;
pub mod config;
pub mod error;
pub mod ids;

pub use code::{ChunkRackConfig, Code, LrcSchema};
pub use config::{
    ImportanceSamplingParams, NetworkSetting, PlaceType, PowerOutageConfig, SimConfig, SimType,
    WeibullParams,
};
pub use error::{Error, Result};
pub use ids::{DiskId, DiskState, NodeId, NodeState, RackId, RackState, StripeId};
