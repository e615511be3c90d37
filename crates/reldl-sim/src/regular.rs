//! Standard Monte-Carlo loop: draw events, apply, check loss (spec.md
//! §4.4). One call to [`run_iteration`] is one complete, independent
//! simulated mission — no state survives across calls.

use std::collections::HashSet;
use std::path::PathBuf;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use reldl_network::{NetworkModel, repair_traffic_per_chunk};
use reldl_placement::Placement;
use reldl_types::{DiskId, Error, Result, SimConfig};

use crate::Observation;
use crate::cluster::ClusterState;
use crate::events::{EventKind, EventQueue};
use crate::trace::{TraceAdapter, TraceEventKind};

/// Run one complete iteration under `config`, seeded deterministically
/// from `seed` (the orchestrator derives `seed` from `rseed_plus` plus the
/// shard/iteration index — spec.md §4.8/§5's determinism contract).
pub fn run_iteration(config: &SimConfig, seed: u64) -> Result<Observation> {
    let mut rng = SmallRng::seed_from_u64(seed);

    let mut cluster = ClusterState::new(config);
    let placement = Placement::new(
        cluster.topology,
        config.code.clone(),
        config.place_type,
        config.chunk_rack_config.clone(),
        config.num_stripes,
        &mut rng,
    )?;

    let mut network = match (config.use_network, config.network_setting) {
        (true, Some(setting)) => Some(NetworkModel::new(setting.cross_rack_bw, setting.intra_rack_bw)?),
        (true, None) => {
            return Err(Error::Config { reason: "use_network is set but network_setting is missing".into() });
        }
        (false, _) => None,
    };

    let mut queue = EventQueue::new();
    cluster.seed_initial_events(config, &mut queue, &mut rng);

    if config.use_trace {
        let trace_id = config
            .trace_id
            .ok_or_else(|| Error::Config { reason: "use_trace is set but trace_id is missing".into() })?;
        let dir = config.trace_dir.clone().unwrap_or_else(|| PathBuf::from("./traces"));
        let adapter = TraceAdapter::load(&dir, trace_id, config.mission_time)
            .map_err(|e| Error::Trace { trace_id, reason: e.to_string() })?;
        merge_trace_events(&adapter, &cluster, &mut queue);
    }

    // Lazy-deletion guard against the network model's rescheduling: a
    // `DiskRepair` event is only honored if its time still matches the
    // disk's latest scheduled completion. `on_repair_completion` revises
    // other disks' completion times without removing their now-stale heap
    // entries, so the authoritative time is tracked here instead.
    let mut disk_repair_due: Vec<Option<f64>> = vec![None; cluster.disks.len()];

    let mut curr_time = 0.0_f64;
    let mut steps = 0u64;
    let mut repairs_total = 0u64;
    let mut repairs_single_chunk = 0u64;
    let mut num_failed_stripes = 0u64;
    let mut num_lost_chunks = 0u64;

    while let Some(event) = queue.pop() {
        if steps >= config.step_cap {
            tracing::warn!(step_cap = config.step_cap, "regular simulator hit the step cap, ending iteration");
            break;
        }
        if event.time >= config.mission_time {
            curr_time = config.mission_time;
            break;
        }
        steps += 1;
        let dt = event.time - curr_time;
        curr_time = event.time;
        cluster.advance_clocks(curr_time, dt);

        match event.kind {
            EventKind::RackFail(id) => {
                cluster.racks[id.0].fail(curr_time);
                if let Some(dist) = cluster.racks[id.0].transient_repair_dist {
                    queue.push(curr_time + dist.draw(&mut rng), EventKind::RackRepair(id));
                }
            }
            EventKind::RackRepair(id) => {
                cluster.racks[id.0].repair(curr_time);
                if let Some(dist) = cluster.racks[id.0].transient_fail_dist {
                    queue.push(curr_time + dist.draw_inverse_transform(0.0, &mut rng), EventKind::RackFail(id));
                }
            }
            EventKind::PowerOutageStart => {
                for rack in &mut cluster.racks {
                    rack.fail(curr_time);
                }
                if let Some(outage) = &config.power_outage {
                    queue.push(curr_time + outage.duration_hours, EventKind::PowerOutageEnd);
                }
            }
            EventKind::PowerOutageEnd => {
                for rack in &mut cluster.racks {
                    rack.repair(curr_time);
                }
                if let Some(outage) = &config.power_outage {
                    let dist: reldl_stats::Weibull = outage.arrival_dist.into();
                    queue.push(curr_time + dist.draw(&mut rng), EventKind::PowerOutageStart);
                }
            }
            EventKind::NodeFail(id) => {
                cluster.nodes[id.0].fail(curr_time);
                let dist = cluster.nodes[id.0].repair_dist;
                queue.push(curr_time + dist.draw(&mut rng), EventKind::NodeRepair(id));
            }
            EventKind::NodeRepair(id) => {
                cluster.nodes[id.0].repair(curr_time);
                if !config.use_trace {
                    let dist = cluster.nodes[id.0].fail_dist;
                    queue.push(curr_time + dist.draw_inverse_transform(0.0, &mut rng), EventKind::NodeFail(id));
                }
            }
            EventKind::NodeTransientFail(id) => {
                cluster.nodes[id.0].transient_fail(curr_time);
                let dist = cluster.nodes[id.0].transient_repair_dist;
                queue.push(curr_time + dist.draw(&mut rng), EventKind::NodeTransientRepair(id));
            }
            EventKind::NodeTransientRepair(id) => {
                cluster.nodes[id.0].transient_repair(curr_time);
                if !config.use_trace {
                    let dist = cluster.nodes[id.0].transient_fail_dist;
                    queue.push(
                        curr_time + dist.draw_inverse_transform(0.0, &mut rng),
                        EventKind::NodeTransientFail(id),
                    );
                }
            }
            EventKind::DiskFail(id) => {
                cluster.disks[id.0].fail(curr_time);

                let failed = cluster.inaccessible_disk_ids();
                record_repair_granularity(&placement, &failed, id, &mut repairs_total, &mut repairs_single_chunk);

                if placement.check_data_loss(&failed) {
                    let (nf, nl) = placement.num_failed_status(&failed);
                    num_failed_stripes = nf as u64;
                    num_lost_chunks = nl as u64;
                    break;
                }

                if let Some(net) = network.as_mut() {
                    let traffic = repair_traffic_per_chunk(&config.code, config.chunk_size_mib as f64);
                    for (other, t) in net.schedule_repair(id, traffic, curr_time) {
                        disk_repair_due[other.0] = Some(t);
                        queue.push(t, EventKind::DiskRepair(other));
                    }
                } else if let Some(t) =
                    cluster.disks[id.0].repair_dist.map(|dist| curr_time + dist.draw(&mut rng))
                {
                    disk_repair_due[id.0] = Some(t);
                    queue.push(t, EventKind::DiskRepair(id));
                }
            }
            EventKind::DiskRepair(id) => {
                if disk_repair_due[id.0] != Some(event.time) {
                    continue; // stale entry superseded by a network reschedule
                }
                disk_repair_due[id.0] = None;
                cluster.disks[id.0].repair(curr_time);

                if let Some(net) = network.as_mut() {
                    for (other, t) in net.on_repair_completion(id, curr_time) {
                        if t < config.mission_time {
                            disk_repair_due[other.0] = Some(t);
                            queue.push(t, EventKind::DiskRepair(other));
                        }
                    }
                }

                let dist = cluster.disks[id.0].fail_dist;
                queue.push(curr_time + dist.draw_inverse_transform(0.0, &mut rng), EventKind::DiskFail(id));
            }
        }
    }

    let blocked_ratio = network.as_ref().map_or(0.0, |n| n.blocked_time() / config.mission_time);
    let single_chunk_repair_ratio =
        if repairs_total > 0 { repairs_single_chunk as f64 / repairs_total as f64 } else { 0.0 };

    Ok(Observation { num_failed_stripes, num_lost_chunks, blocked_ratio, single_chunk_repair_ratio, log_weight: 0.0 })
}

/// A disk failure's "repair granularity": of the stripes it touches, did
/// every one of them lose exactly one chunk (this disk, and no other
/// concurrently-failed disk in that stripe)? That is the simplest reading
/// of spec.md §4.4's "fraction of repairs whose lost-chunk count was 1" —
/// it isolates repairs that are a clean single-chunk reconstruction from
/// ones entangled with an already-ongoing multi-disk failure.
fn record_repair_granularity(
    placement: &Placement,
    failed: &[DiskId],
    just_failed: DiskId,
    repairs_total: &mut u64,
    repairs_single_chunk: &mut u64,
) {
    *repairs_total += 1;
    let failed_set: HashSet<DiskId> = failed.iter().copied().collect();
    let touched = placement.stripes_to_repair(just_failed);
    let all_single_chunk = touched.iter().all(|&stripe| {
        let disks = placement.stripe_location(stripe);
        disks.iter().filter(|d| failed_set.contains(d)).count() == 1
    });
    if all_single_chunk {
        *repairs_single_chunk += 1;
    }
}

fn merge_trace_events(adapter: &TraceAdapter, cluster: &ClusterState, queue: &mut EventQueue) {
    for node in &cluster.nodes {
        for &(time, kind) in adapter.events_for_node(node.id) {
            let event_kind = match kind {
                TraceEventKind::PermanentFail => EventKind::NodeFail(node.id),
                TraceEventKind::TransientFail => EventKind::NodeTransientFail(node.id),
                TraceEventKind::TransientRepair => EventKind::NodeTransientRepair(node.id),
            };
            queue.push(time, event_kind);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reldl_types::{Code, PlaceType, SimType, WeibullParams};

    fn base_config() -> SimConfig {
        SimConfig {
            total_iterations: 1,
            num_processes: 1,
            rseed_plus: 10,
            mission_time: 87_600.0,
            num_racks: 32,
            nodes_per_rack: 32,
            disks_per_node: 1,
            capacity_per_disk_mib: 1 << 20,
            chunk_size_mib: 256,
            num_stripes: 2000,
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
            step_cap: 200_000,
        }
    }

    #[test]
    fn an_iteration_completes_and_returns_an_observation() {
        let config = base_config();
        let obs = run_iteration(&config, 10).unwrap();
        assert!(obs.num_lost_chunks >= obs.num_failed_stripes);
        assert_eq!(obs.log_weight, 0.0);
    }

    #[test]
    fn same_seed_is_deterministic() {
        let config = base_config();
        let a = run_iteration(&config, 42).unwrap();
        let b = run_iteration(&config, 42).unwrap();
        assert_eq!(a.num_failed_stripes, b.num_failed_stripes);
        assert_eq!(a.num_lost_chunks, b.num_lost_chunks);
        assert!((a.blocked_ratio - b.blocked_ratio).abs() < 1e-15);
    }

    #[test]
    fn network_model_runs_without_error() {
        let mut config = base_config();
        config.use_network = true;
        config.network_setting =
            Some(reldl_types::NetworkSetting { cross_rack_bw: 125.0, intra_rack_bw: 125.0 });
        let obs = run_iteration(&config, 7).unwrap();
        assert!(obs.blocked_ratio >= 0.0);
    }

    #[test]
    fn missing_network_setting_is_a_config_error() {
        let mut config = base_config();
        config.use_network = true;
        let result = run_iteration(&config, 1);
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
