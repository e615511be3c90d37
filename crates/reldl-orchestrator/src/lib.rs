//! Shard partitioning, seeded RNG streams, and batch aggregation (spec.md
//! §4.8).
//!
//! `run_batch` partitions `config.total_iterations` into
//! `config.num_processes` equal shards, fans them out via
//! `rayon::prelude::par_iter` (inter-iteration parallelism only — spec.md
//! §5), and merges per-shard results in shard order into one aggregated
//! `BatchResult`. Grounded on `examples/monistowl-gat`'s
//! `gat-batch/src/runner.rs::run_batch`, which fans independent jobs out
//! over a rayon `par_iter` and folds per-job outcomes into one manifest —
//! the same shape as shards folding into one aggregated result here.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use reldl_sim::Observation;
use reldl_stats::{AggregateResult, SampleAggregator};
use reldl_types::{Error, Result, SimConfig};

/// Aggregated batch result: one `AggregateResult` per output metric
/// (spec.md §4.7/§6), plus the ambient `failed_iterations` count spec.md
/// §7 requires ("aggregated batch records partial-success counts").
#[derive(Debug)]
pub struct BatchResult {
    pub pdl: AggregateResult,
    pub nomdl: AggregateResult,
    pub blocked_ratio: AggregateResult,
    pub single_chunk_repair_ratio: f64,
    pub total_iterations: u64,
    pub failed_iterations: u64,
}

/// Run the full batch described by `config`: shard, simulate, aggregate.
pub fn run_batch(config: &SimConfig) -> Result<BatchResult> {
    if config.num_processes == 0 || config.total_iterations % config.num_processes != 0 {
        return Err(Error::IterationShardMismatch {
            total: config.total_iterations,
            processes: config.num_processes,
        });
    }
    let iterations_per_shard = config.total_iterations / config.num_processes;
    let total_chunks = f64::from(config.code.n()) * config.num_stripes as f64;

    let shard_results: Vec<ShardResult> = (0..config.num_processes)
        .into_par_iter()
        .map(|shard_idx| run_shard(config, shard_idx, iterations_per_shard))
        .collect();

    let mut pdl_agg = SampleAggregator::new();
    let mut nomdl_agg = SampleAggregator::new();
    let mut br_agg = SampleAggregator::new();
    let mut single_chunk_total = 0.0_f64;
    let mut single_chunk_count = 0_u64;
    let mut failed_iterations = 0_u64;

    for shard in shard_results {
        failed_iterations += shard.failed;
        for obs in shard.observations {
            let weight = obs.log_weight.exp();
            pdl_agg.record(if obs.is_loss() { 1.0 } else { 0.0 }, weight);
            nomdl_agg.record(obs.num_lost_chunks as f64 / total_chunks, weight);
            br_agg.record(obs.blocked_ratio, 1.0);
            single_chunk_total += obs.single_chunk_repair_ratio;
            single_chunk_count += 1;
        }
    }

    Ok(BatchResult {
        pdl: pdl_agg.summarize(),
        nomdl: nomdl_agg.summarize(),
        blocked_ratio: br_agg.summarize(),
        single_chunk_repair_ratio: if single_chunk_count > 0 {
            single_chunk_total / single_chunk_count as f64
        } else {
            0.0
        },
        total_iterations: config.total_iterations,
        failed_iterations,
    })
}

struct ShardResult {
    observations: Vec<Observation>,
    failed: u64,
}

/// One shard's worth of iterations, run sequentially on a single rayon
/// worker. The shard's own `StdRng`, seeded from `rseed_plus + shard_idx`
/// (spec.md §4.8: "seeds both the native and scientific RNG with a
/// distinct deterministic seed derived from a base rseed_plus plus the
/// shard index"), draws one `u64` per iteration to seed that iteration's
/// own simulator RNG — so the result is bitwise-identical across runs
/// regardless of how many worker threads rayon happens to use (spec.md
/// §5's determinism contract).
fn run_shard(config: &SimConfig, shard_idx: u64, iterations_per_shard: u64) -> ShardResult {
    let mut shard_rng = StdRng::seed_from_u64(config.rseed_plus.wrapping_add(shard_idx));
    let mut observations = Vec::with_capacity(iterations_per_shard as usize);
    let mut failed = 0_u64;

    for _ in 0..iterations_per_shard {
        let iter_seed: u64 = shard_rng.gen();
        match reldl_sim::run_iteration(config, iter_seed) {
            Ok(obs) => observations.push(obs),
            Err(err) => {
                tracing::warn!(shard_idx, error = %err, "iteration failed, recording as partial failure");
                failed += 1;
            }
        }
    }

    ShardResult { observations, failed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reldl_types::{Code, PlaceType, SimType, WeibullParams};

    fn base_config() -> SimConfig {
        SimConfig {
            total_iterations: 8,
            num_processes: 2,
            rseed_plus: 10,
            mission_time: 87_600.0,
            num_racks: 16,
            nodes_per_rack: 8,
            disks_per_node: 1,
            capacity_per_disk_mib: 1 << 20,
            chunk_size_mib: 256,
            num_stripes: 500,
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
            use_network: false,
            network_setting: None,
            use_power_outage: false,
            power_outage: None,
            use_trace: false,
            trace_id: None,
            trace_dir: None,
            sim_type: SimType::Regular,
            importance_sampling: None,
            step_cap: 100_000,
        }
    }

    #[test]
    fn rejects_indivisible_shard_count() {
        let mut config = base_config();
        config.num_processes = 3;
        let result = run_batch(&config);
        assert!(matches!(result, Err(Error::IterationShardMismatch { .. })));
    }

    #[test]
    fn batch_runs_and_aggregates_every_iteration() {
        let config = base_config();
        let result = run_batch(&config).unwrap();
        assert_eq!(result.total_iterations, 8);
        assert_eq!(result.failed_iterations, 0);
        assert_eq!(result.pdl.num_samples, 8);
        assert_eq!(result.nomdl.num_samples, 8);
    }

    #[test]
    fn determinism_across_repeated_batches() {
        let config = base_config();
        let a = run_batch(&config).unwrap();
        let b = run_batch(&config).unwrap();
        assert!((a.pdl.mean - b.pdl.mean).abs() < 1e-15);
        assert!((a.nomdl.mean - b.nomdl.mean).abs() < 1e-15);
        assert!((a.blocked_ratio.mean - b.blocked_ratio.mean).abs() < 1e-15);
    }

    #[test]
    fn shard_count_does_not_change_internal_consistency() {
        let mut one_shard = base_config();
        one_shard.num_processes = 1;
        let mut two_shards = base_config();
        two_shards.num_processes = 2;
        // Both cover 8 iterations, just partitioned differently; the seed
        // stream each shard draws from depends on its own shard index, so
        // this checks each run is well-formed and deterministic rather
        // than asserting the two partitionings agree bit-for-bit.
        let a = run_batch(&one_shard).unwrap();
        let b = run_batch(&two_shards).unwrap();
        assert_eq!(a.pdl.num_samples, b.pdl.num_samples);
    }
}
