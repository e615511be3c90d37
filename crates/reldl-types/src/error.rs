//! Error types for reldl-sim.
//!
//! Four kinds per spec.md §7: `ConfigError` (fatal, exit 2),
//! `PlacementError` (fatal for the iteration, indicates a config error
//! upstream), `NumericError` (recovered locally, logged), `TraceError`
//! (fatal when `use_trace` is set). Each crate that needs a narrower,
//! locally-meaningful error type (placement, trace parsing) defines its
//! own enum and converts into this one with `#[from]`, the same shape
//! ObjectIO's `ErasureError -> CommonError` conversion in
//! `objectio-erasure/src/codec.rs` uses.

use thiserror::Error;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {reason}")]
    Config { reason: String },

    #[error("invalid erasure code parameters: {reason}")]
    InvalidCodeParams { reason: String },

    #[error("insufficient racks for placement: have {available}, need {required}")]
    InsufficientRacks { available: usize, required: usize },

    #[error("insufficient nodes in rack for placement: have {available}, need {required}")]
    InsufficientNodesPerRack { available: usize, required: usize },

    #[error(
        "storage capacity shortfall: {required_mib} MiB required across {num_disks} disks, \
         {available_mib} MiB available"
    )]
    CapacityShortfall {
        required_mib: u64,
        available_mib: u64,
        num_disks: usize,
    },

    #[error("cross-rack bandwidth ({cross_rack}) must not exceed intra-rack bandwidth ({intra_rack})")]
    BandwidthOrdering { cross_rack: f64, intra_rack: f64 },

    #[error("total_iterations ({total}) is not divisible by num_processes ({processes})")]
    IterationShardMismatch { total: u64, processes: u64 },

    #[error("chunk_rack_config sum ({sum}) does not equal code_n ({n})")]
    ChunkRackConfigMismatch { sum: u8, n: u8 },

    #[error("placement is unsatisfiable for the given topology: {reason}")]
    Placement { reason: String },

    #[error("hazard-rate evaluation produced a non-finite value at t={t}, component={component}")]
    Numeric { t: f64, component: String },

    #[error("missing or malformed trace file for trace_id={trace_id}: {reason}")]
    Trace { trace_id: u32, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
