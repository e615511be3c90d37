//! Repair-bandwidth contention model.
//!
//! One `NetworkModel` lives for the duration of a single iteration and is a
//! pure function of the repairs currently active within that iteration
//! (spec.md §4.3, §9: "its locking discipline is simply the event-loop
//! serialization"). Concurrent repairs share each link's capacity equally
//! among their contenders on that link, recomputed whenever a repair
//! starts or completes.
//!
//! Grounded on `examples/original_source/simedc.py`'s `network_setting =
//! [cross_rack_repair_bwth, intra_rack_repair_bwth]` and spec.md §4.3's
//! `repair_traffic_per_chunk(code, n, k)` / `schedule_repair` /
//! `on_repair_completion` contract. The Python `network.py` module itself
//! was not retrieved with the original source, so the processor-sharing
//! mechanics below are this crate's own, spec-faithful construction
//! (documented further in DESIGN.md).

use std::collections::VecDeque;

use reldl_types::{Code, DiskId, Error, Result};

mod traffic;
pub use traffic::{RepairTraffic, drc_repair_traffic, repair_traffic_per_chunk};

/// A repair actively consuming bandwidth on both links.
#[derive(Debug, Clone, Copy)]
struct ActiveRepair {
    disk: DiskId,
    cross_remaining: f64,
    intra_remaining: f64,
}

/// A repair that arrived while the model was already at
/// `max_concurrent_repairs` capacity and is sitting in FIFO order.
#[derive(Debug, Clone, Copy)]
struct WaitingRepair {
    disk: DiskId,
    traffic: RepairTraffic,
    queued_at: f64,
}

/// Bandwidth-contention model for one iteration's repairs.
///
/// `max_concurrent_repairs` gates admission into the active, bandwidth-
/// sharing set: `None` (the default used throughout this workspace, since
/// neither spec.md nor the retrieved original source names a concrete
/// cap) means every repair is admitted immediately and all active repairs
/// share each link equally forever; `Some(cap)` caps admission and routes
/// the overflow through the FIFO wait-repair queue, so the data structure
/// is fully exercised even though the shipped configuration leaves it
/// unbounded (spec.md §9's "contention semantics are partially implicit"
/// open question, resolved here — see DESIGN.md).
#[derive(Debug)]
pub struct NetworkModel {
    cross_rack_bw: f64,
    intra_rack_bw: f64,
    max_concurrent_repairs: Option<usize>,
    active: Vec<ActiveRepair>,
    waiting: VecDeque<WaitingRepair>,
    last_recompute: f64,
    /// Accumulated wall-clock time during which the wait-repair queue was
    /// non-empty (spec.md §4.3's "blocked" interval).
    blocked_time: f64,
}

impl NetworkModel {
    /// `cross_rack_bw`/`intra_rack_bw` are in MiB/s; `cross_rack_bw` must
    /// not exceed `intra_rack_bw` (spec.md §4.3/§6).
    pub fn new(cross_rack_bw: f64, intra_rack_bw: f64) -> Result<Self> {
        if cross_rack_bw > intra_rack_bw {
            return Err(Error::BandwidthOrdering { cross_rack: cross_rack_bw, intra_rack: intra_rack_bw });
        }
        Ok(Self {
            cross_rack_bw,
            intra_rack_bw,
            max_concurrent_repairs: None,
            active: Vec::new(),
            waiting: VecDeque::new(),
            last_recompute: 0.0,
            blocked_time: 0.0,
        })
    }

    /// Override the admission cap (see struct docs). Builder-style, used
    /// by tests that exercise the wait-repair queue directly.
    #[must_use]
    pub const fn with_max_concurrent_repairs(mut self, cap: usize) -> Self {
        self.max_concurrent_repairs = Some(cap);
        self
    }

    #[must_use]
    pub fn is_blocked(&self) -> bool {
        !self.waiting.is_empty()
    }

    #[must_use]
    pub fn blocked_time(&self) -> f64 {
        self.blocked_time
    }

    fn advance(&mut self, curr_time: f64) {
        let dt = curr_time - self.last_recompute;
        if self.is_blocked() {
            self.blocked_time += dt.max(0.0);
        }
        if dt > 0.0 && !self.active.is_empty() {
            let n = self.active.len() as f64;
            let cross_share = self.cross_rack_bw / n;
            let intra_share = self.intra_rack_bw / n;
            for repair in &mut self.active {
                repair.cross_remaining = (repair.cross_remaining - cross_share * dt).max(0.0);
                repair.intra_remaining = (repair.intra_remaining - intra_share * dt).max(0.0);
            }
        }
        self.last_recompute = curr_time;
    }

    fn admit_waiting(&mut self) {
        while let Some(cap) = self.max_concurrent_repairs {
            if self.active.len() >= cap {
                break;
            }
            match self.waiting.pop_front() {
                Some(w) => self.active.push(ActiveRepair {
                    disk: w.disk,
                    cross_remaining: w.traffic.cross_bytes,
                    intra_remaining: w.traffic.intra_bytes,
                }),
                None => break,
            }
        }
    }

    /// Completion-time estimate for `disk` under the contention level at
    /// the moment of the call; callers must reschedule on every
    /// `on_repair_completion` (spec.md §4.3: "the model is recomputed
    /// whenever a repair starts or completes").
    fn estimate_completion(&self, disk: DiskId, curr_time: f64) -> Option<f64> {
        let repair = self.active.iter().find(|r| r.disk == disk)?;
        let n = self.active.len() as f64;
        let cross_share = self.cross_rack_bw / n;
        let intra_share = self.intra_rack_bw / n;
        let cross_time = if cross_share > 0.0 { repair.cross_remaining / cross_share } else { 0.0 };
        let intra_time = if intra_share > 0.0 { repair.intra_remaining / intra_share } else { 0.0 };
        Some(curr_time + cross_time.max(intra_time))
    }

    /// Begin repairing `disk`. Joining the active set changes every active
    /// repair's per-link share, so — mirroring `on_repair_completion` —
    /// this recomputes and returns the revised completion-time estimate
    /// for every repair now active, `disk` included (spec.md §4.3: "the
    /// model is recomputed whenever a repair starts or completes").
    /// Callers must reschedule each returned disk's pending `DiskRepair`
    /// event to its new time, including ones already in flight before this
    /// call. If admission is capped and already full, `disk` joins the
    /// FIFO wait-repair queue instead and an empty vec is returned, since
    /// no existing repair's share changes; call `on_repair_completion` for
    /// whichever repair frees a slot to find out when `disk` was admitted.
    pub fn schedule_repair(&mut self, disk: DiskId, traffic: RepairTraffic, curr_time: f64) -> Vec<(DiskId, f64)> {
        self.advance(curr_time);
        let at_capacity = self.max_concurrent_repairs.is_some_and(|cap| self.active.len() >= cap);
        if at_capacity {
            self.waiting.push_back(WaitingRepair { disk, traffic, queued_at: curr_time });
            return Vec::new();
        }
        self.active.push(ActiveRepair {
            disk,
            cross_remaining: traffic.cross_bytes,
            intra_remaining: traffic.intra_bytes,
        });
        self.active.iter().filter_map(|r| self.estimate_completion(r.disk, curr_time).map(|t| (r.disk, t))).collect()
    }

    /// `disk`'s repair has completed; remove it, admit any waiting
    /// repairs its departure frees capacity for, and return the revised
    /// completion-time estimate for every disk still (or newly) active.
    pub fn on_repair_completion(&mut self, disk: DiskId, curr_time: f64) -> Vec<(DiskId, f64)> {
        self.advance(curr_time);
        self.active.retain(|r| r.disk != disk);
        self.admit_waiting();
        self.active.iter().filter_map(|r| self.estimate_completion(r.disk, curr_time).map(|t| (r.disk, t))).collect()
    }

    #[must_use]
    pub fn num_active(&self) -> usize {
        self.active.len()
    }

    #[must_use]
    pub fn num_waiting(&self) -> usize {
        self.waiting.len()
    }
}

/// Compute the traffic for a single-chunk repair on `code`, given the
/// per-chunk size, and immediately schedule it — convenience wrapper
/// combining spec.md §4.3's two named operations for the common case of
/// a disk holding exactly one lost chunk.
pub fn schedule_single_chunk_repair(
    model: &mut NetworkModel,
    code: &Code,
    chunk_size_mib: f64,
    disk: DiskId,
    curr_time: f64,
) -> Vec<(DiskId, f64)> {
    let traffic = repair_traffic_per_chunk(code, chunk_size_mib);
    model.schedule_repair(disk, traffic, curr_time)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_cross_greater_than_intra() {
        let result = NetworkModel::new(200.0, 125.0);
        assert!(matches!(result, Err(Error::BandwidthOrdering { .. })));
    }

    #[test]
    fn single_repair_gets_full_bandwidth() {
        let mut model = NetworkModel::new(100.0, 100.0).unwrap();
        let traffic = RepairTraffic { cross_bytes: 500.0, intra_bytes: 0.0 };
        let revised = model.schedule_repair(DiskId(0), traffic, 0.0);
        let (_, completion) = revised.into_iter().find(|(d, _)| *d == DiskId(0)).unwrap();
        // 500 MiB / 100 MiB/s = 5s
        assert!((completion - 5.0).abs() < 1e-9);
    }

    #[test]
    fn two_concurrent_repairs_halve_the_share() {
        let mut model = NetworkModel::new(100.0, 100.0).unwrap();
        let traffic = RepairTraffic { cross_bytes: 500.0, intra_bytes: 0.0 };
        model.schedule_repair(DiskId(0), traffic, 0.0);
        let revised = model.schedule_repair(DiskId(1), traffic, 0.0);
        // both now share 50 MiB/s each -> 10s
        let (_, completion_1) = revised.into_iter().find(|(d, _)| *d == DiskId(1)).unwrap();
        assert!((completion_1 - 10.0).abs() < 1e-9);
    }

    #[test]
    fn starting_a_second_repair_reschedules_the_first() {
        let mut model = NetworkModel::new(100.0, 100.0).unwrap();
        let traffic = RepairTraffic { cross_bytes: 500.0, intra_bytes: 0.0 };
        model.schedule_repair(DiskId(0), traffic, 0.0);
        // at t=2, disk 0 alone had consumed 2s * 100 MiB/s = 200 MiB, 300 remain
        let revised = model.schedule_repair(DiskId(1), traffic, 2.0);
        // now shares 50 MiB/s each -> disk 0 needs 300/50 = 6s more, completing at t=8
        let (_, t0) = revised.iter().find(|(d, _)| *d == DiskId(0)).unwrap();
        assert!((t0 - 8.0).abs() < 1e-9);
    }

    #[test]
    fn completion_frees_bandwidth_for_remaining_repair() {
        let mut model = NetworkModel::new(100.0, 100.0).unwrap();
        let traffic = RepairTraffic { cross_bytes: 500.0, intra_bytes: 0.0 };
        model.schedule_repair(DiskId(0), traffic, 0.0);
        model.schedule_repair(DiskId(1), traffic, 0.0);
        // advance to t=4: each had consumed 4s * 50 MiB/s = 200 MiB, 300 remain
        let revised = model.on_repair_completion(DiskId(0), 4.0);
        // disk 1 is now alone: 300 MiB remaining / 100 MiB/s = 3s -> completes at t=7
        let (_, t) = revised.into_iter().find(|(d, _)| *d == DiskId(1)).unwrap();
        assert!((t - 7.0).abs() < 1e-9);
    }

    #[test]
    fn capped_model_queues_overflow_and_tracks_blocked_time() {
        let mut model = NetworkModel::new(100.0, 100.0).unwrap().with_max_concurrent_repairs(1);
        let traffic = RepairTraffic { cross_bytes: 500.0, intra_bytes: 0.0 };
        model.schedule_repair(DiskId(0), traffic, 0.0);
        let queued = model.schedule_repair(DiskId(1), traffic, 0.0);
        assert!(queued.is_empty());
        assert_eq!(model.num_waiting(), 1);
        assert!(model.is_blocked());

        let revised = model.on_repair_completion(DiskId(0), 5.0, );
        assert_eq!(model.num_waiting(), 0);
        assert_eq!(revised.len(), 1);
        assert!(model.blocked_time() >= 5.0 - 1e-9);
    }
}
