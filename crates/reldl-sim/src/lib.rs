//! reldl-sim - Entity state machines, event queue, trace adapter, and the
//! regular/UnifBFB simulators.
//!
//! One call to [`regular::run_iteration`] or [`unifbfb::run_iteration`] is
//! one complete, independent simulated mission: reset, run to either
//! mission_time or first data loss, and emit an [`Observation`]. Nothing
//! about either function depends on prior calls — the orchestrator crate
//! is what turns a sequence of calls into a batch estimate.

pub mod cluster;
pub mod events;
pub mod regular;
pub mod state;
pub mod trace;
pub mod unifbfb;

pub use cluster::ClusterState;
pub use events::{Event, EventKind, EventQueue};
pub use state::{DiskEntity, NodeEntity, RackEntity};
pub use trace::{TraceAdapter, TraceError, TraceEventKind};

/// The result of one simulated iteration (spec.md §3). `log_weight` is
/// `0.0` under the regular simulator (an unweighted sample); under UnifBFB
/// it is the running log-likelihood ratio, to be exponentiated only at
/// aggregation time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Observation {
    pub num_failed_stripes: u64,
    pub num_lost_chunks: u64,
    pub blocked_ratio: f64,
    pub single_chunk_repair_ratio: f64,
    pub log_weight: f64,
}

impl Observation {
    #[must_use]
    pub fn is_loss(&self) -> bool {
        self.num_failed_stripes > 0
    }

    /// This observation's weighted contribution to the PDL estimator:
    /// `(1 if loss else 0) * exp(log_weight)` (spec.md §4.6).
    #[must_use]
    pub fn pdl_contribution(&self) -> f64 {
        if self.is_loss() { self.log_weight.exp() } else { 0.0 }
    }
}

/// Dispatch to the configured simulator (spec.md §6's `-A sim_type`).
pub fn run_iteration(config: &reldl_types::SimConfig, seed: u64) -> reldl_types::Result<Observation> {
    match config.sim_type {
        reldl_types::SimType::Regular => regular::run_iteration(config, seed),
        reldl_types::SimType::UnifBfb => unifbfb::run_iteration(config, seed),
    }
}

#[cfg(test)]
mod scenario_tests {
    use super::*;
    use reldl_types::{Code, ImportanceSamplingParams, NetworkSetting, PlaceType, SimType, WeibullParams};

    fn scenario_1_config() -> reldl_types::SimConfig {
        reldl_types::SimConfig {
            total_iterations: 1000,
            num_processes: 1,
            rseed_plus: 10,
            mission_time: 87_600.0,
            num_racks: 32,
            nodes_per_rack: 32,
            disks_per_node: 1,
            capacity_per_disk_mib: 1 << 20,
            chunk_size_mib: 256,
            num_stripes: 349_524,
            code: Code::Rs { n: 9, k: 6 },
            code_free: 0,
            place_type: PlaceType::Flat,
            chunk_rack_config: None,
            rack_transient_fail_dist: WeibullParams::new(1.0, 87_600.0, 0.0),
            rack_transient_repair_dist: WeibullParams::new(1.0, 24.0, 10.0),
            node_fail_dist: WeibullParams::new(1.0, 91_250.0, 0.0),
            node_repair_dist: WeibullParams::new(1.0, 24.0, 0.5),
            node_transient_fail_dist: WeibullParams::new(1.0, 2890.8, 0.0),
            node_transient_repair_dist: WeibullParams::new(1.0, 0.25, 0.0),
            disk_fail_dist: WeibullParams::new(1.12, 87_600.0, 0.0),
            disk_repair_dist: Some(WeibullParams::new(1.0, 24.0, 0.0)),
            use_network: true,
            network_setting: Some(NetworkSetting { cross_rack_bw: 125.0, intra_rack_bw: 125.0 }),
            use_power_outage: false,
            power_outage: None,
            use_trace: false,
            trace_id: None,
            trace_dir: None,
            sim_type: SimType::Regular,
            importance_sampling: None,
            step_cap: 500_000,
        }
    }

    /// Scenario 1 (spec.md §8): 1000 full iterations over a 1024-disk
    /// cluster. Expensive enough (hundreds of thousands of simulated
    /// events) that it is skipped by default.
    #[test]
    #[ignore = "full 1000-iteration batch; run explicitly with --ignored"]
    fn scenario_1_pdl_lands_in_expected_band() {
        let config = scenario_1_config();
        let mut aggregator = reldl_stats::SampleAggregator::new();
        for i in 0..config.total_iterations {
            let obs = regular::run_iteration(&config, config.rseed_plus + i).unwrap();
            aggregator.record(if obs.is_loss() { 1.0 } else { 0.0 }, 1.0);
        }
        let result = aggregator.summarize();
        assert!(result.mean >= 1e-5 && result.mean <= 1e-3, "PDL {} outside [1e-5, 1e-3]", result.mean);
        assert!(result.relative_error_pct <= 30.0, "RE {}% exceeds 30%", result.relative_error_pct);
    }

    /// Scenario 2 (spec.md §8): UnifBFB over the same topology produces a
    /// finite, non-degenerate weighted estimate from only 4 iterations.
    #[test]
    fn scenario_2_unifbfb_produces_finite_weighted_estimate() {
        let mut config = scenario_1_config();
        config.use_network = false;
        config.network_setting = None;
        config.sim_type = SimType::UnifBfb;
        config.importance_sampling = Some(ImportanceSamplingParams { fb_prob: 0.5, beta: 0.61 });
        config.num_stripes = 5000; // scaled down so the test runs quickly

        let mut aggregator = reldl_stats::SampleAggregator::new();
        for i in 0..4 {
            let obs = unifbfb::run_iteration(&config, config.rseed_plus + i).unwrap();
            assert!(obs.log_weight.is_finite());
            aggregator.record(if obs.is_loss() { 1.0 } else { 0.0 }, obs.log_weight.exp());
        }
        assert_eq!(aggregator.num_samples(), 4);
    }

    /// Scenario 4 (spec.md §8): DRC forces chunk_rack_config=[3,3,3];
    /// fewer than 3 racks must fail placement.
    #[test]
    fn scenario_4_drc_rejects_too_few_racks() {
        let mut config = scenario_1_config();
        config.num_racks = 2;
        config.nodes_per_rack = 4;
        config.code = Code::Drc { n: 9, k: 6 };
        config.place_type = PlaceType::Hierarchical;
        config.chunk_rack_config = None;
        config.num_stripes = 10;

        let result = regular::run_iteration(&config, 1);
        assert!(matches!(result, Err(reldl_types::Error::InsufficientRacks { .. })));
    }

    /// Scenario 6 (spec.md §8): identical config and seed produce
    /// byte-identical observations.
    #[test]
    fn scenario_6_determinism_across_repeated_runs() {
        let mut config = scenario_1_config();
        config.num_stripes = 2000;
        let a = regular::run_iteration(&config, 10).unwrap();
        let b = regular::run_iteration(&config, 10).unwrap();
        assert_eq!(a, b);
    }
}
