//! The placement engine: materializes a stripe-to-disk mapping under the
//! selected code's and placement policy's constraints, and answers
//! data-loss queries for arbitrary failed-disk sets (spec.md §4.2).
//!
//! Grounded line-for-line on
//! `examples/original_source/lib/placement.py`'s `generate_placement_ec`,
//! `get_diff_racks`/`get_diff_nodes`/`get_diff_disks`, `check_data_loss`,
//! and `get_stripes_to_repair`.

use std::collections::HashSet;

use rand::Rng;
use reldl_types::{ChunkRackConfig, Code, DiskId, Error, PlaceType, Result, StripeId};

use crate::topology::ClusterTopology;

/// An immutable stripe-to-disk placement, built once per iteration
/// (placement is re-randomized every iteration because failure
/// correlations depend on the mapping — spec.md §5).
#[derive(Debug)]
pub struct Placement {
    topology: ClusterTopology,
    code: Code,
    /// `stripes_location[stripe] = [disk; n]`, data chunks first.
    stripes_location: Vec<Vec<DiskId>>,
    /// Reverse index: `stripes_per_disk[disk] = [stripe_id, ...]`.
    stripes_per_disk: Vec<Vec<StripeId>>,
}

impl Placement {
    /// Build a new placement. Fails with `PlacementError`-flavored
    /// `Error` variants when the topology cannot satisfy the code's and
    /// placement policy's constraints.
    pub fn new(
        topology: ClusterTopology,
        code: Code,
        place_type: PlaceType,
        chunk_rack_config: Option<ChunkRackConfig>,
        num_stripes: usize,
        rng: &mut impl Rng,
    ) -> Result<Self> {
        code.validate()?;

        let chunk_rack_config = code.forced_chunk_rack_config().or(chunk_rack_config);

        if let Some(ref config) = chunk_rack_config {
            let sum: u8 = config.iter().sum();
            if sum != code.n() {
                return Err(Error::ChunkRackConfigMismatch { sum, n: code.n() });
            }
        }

        let n = code.n() as usize;
        let mut stripes_location = Vec::with_capacity(num_stripes);

        match (place_type, &chunk_rack_config) {
            (PlaceType::Flat, _) => {
                if topology.num_racks < n {
                    return Err(Error::InsufficientRacks {
                        available: topology.num_racks,
                        required: n,
                    });
                }
                for _ in 0..num_stripes {
                    let racks = topology.distinct_racks(n, rng);
                    let disks: Vec<DiskId> = racks
                        .into_iter()
                        .map(|rack| topology.distinct_disks_in_rack(rack, 1, rng)[0])
                        .collect();
                    stripes_location.push(disks);
                }
            }
            (PlaceType::Hierarchical, Some(config)) => {
                let r = config.len();
                let max_per_rack = *config.iter().max().unwrap_or(&0) as usize;
                if topology.num_racks < r {
                    return Err(Error::InsufficientRacks { available: topology.num_racks, required: r });
                }
                if topology.nodes_per_rack < max_per_rack {
                    return Err(Error::InsufficientNodesPerRack {
                        available: topology.nodes_per_rack,
                        required: max_per_rack,
                    });
                }
                for _ in 0..num_stripes {
                    let racks = topology.distinct_racks(r, rng);
                    let mut disks = Vec::with_capacity(n);
                    for (rack, &count) in racks.iter().zip(config.iter()) {
                        disks.extend(topology.distinct_disks_in_rack(*rack, count as usize, rng));
                    }
                    stripes_location.push(disks);
                }
            }
            (PlaceType::Hierarchical, None) => {
                return Err(Error::Placement {
                    reason: "chunk_rack_config is required for hierarchical placement".into(),
                });
            }
        }

        let mut stripes_per_disk: Vec<Vec<StripeId>> = vec![Vec::new(); topology.num_disks()];
        for (idx, disks) in stripes_location.iter().enumerate() {
            let stripe_id = StripeId(idx);
            for &disk in disks {
                stripes_per_disk[disk.0].push(stripe_id);
            }
        }

        Ok(Self { topology, code, stripes_location, stripes_per_disk })
    }

    #[must_use]
    pub fn topology(&self) -> &ClusterTopology {
        &self.topology
    }

    #[must_use]
    pub fn code(&self) -> &Code {
        &self.code
    }

    #[must_use]
    pub fn num_stripes(&self) -> usize {
        self.stripes_location.len()
    }

    /// The `n` disks holding `stripe`'s chunks, in position order.
    #[must_use]
    pub fn stripe_location(&self, stripe: StripeId) -> &[DiskId] {
        &self.stripes_location[stripe.0]
    }

    /// Every stripe with a chunk on `disk`.
    #[must_use]
    pub fn stripes_to_repair(&self, disk: DiskId) -> &[StripeId] {
        &self.stripes_per_disk[disk.0]
    }

    /// Candidate stripes touching at least one of `failed_disks` — a
    /// stripe not in this set cannot possibly be lost.
    fn candidate_stripes(&self, failed_disks: &[DiskId]) -> HashSet<StripeId> {
        failed_disks.iter().flat_map(|&d| self.stripes_to_repair(d).iter().copied()).collect()
    }

    /// Is at least one stripe unrecoverable given `failed_disks`?
    #[must_use]
    pub fn check_data_loss(&self, failed_disks: &[DiskId]) -> bool {
        let failed_set: HashSet<DiskId> = failed_disks.iter().copied().collect();
        self.candidate_stripes(failed_disks)
            .into_iter()
            .any(|stripe| self.stripe_lost_chunk_count(stripe, &failed_set).is_some())
    }

    /// `(num_failed_stripes, num_lost_chunks)` over all stripes touching
    /// `failed_disks`. `num_lost_chunks` for a lost stripe is the raw
    /// count of failed chunks it has (the invariant in spec.md §8 —
    /// `num_failed_stripes <= num_lost_chunks <= n * num_failed_stripes`
    /// — follows directly since a candidate stripe has at least one
    /// failed chunk and at most `n`).
    #[must_use]
    pub fn num_failed_status(&self, failed_disks: &[DiskId]) -> (usize, usize) {
        let failed_set: HashSet<DiskId> = failed_disks.iter().copied().collect();
        let mut num_failed_stripes = 0;
        let mut num_lost_chunks = 0;
        for stripe in self.candidate_stripes(failed_disks) {
            if let Some(count) = self.stripe_lost_chunk_count(stripe, &failed_set) {
                num_failed_stripes += 1;
                num_lost_chunks += count;
            }
        }
        (num_failed_stripes, num_lost_chunks)
    }

    /// If `stripe` is unrecoverable given `failed_set`, the number of its
    /// chunks that are physically inaccessible; `None` if it is still
    /// recoverable.
    fn stripe_lost_chunk_count(&self, stripe: StripeId, failed_set: &HashSet<DiskId>) -> Option<usize> {
        let disks = self.stripe_location(stripe);
        let failed_count = disks.iter().filter(|d| failed_set.contains(d)).count();
        if failed_count == 0 {
            return None;
        }

        let lost = match &self.code {
            Code::Rs { n, k } | Code::Drc { n, k } => {
                let m = (*n - *k) as usize;
                failed_count > m
            }
            Code::Lrc { n, k, l, schema } => {
                let mut group_failed = vec![0usize; *l as usize];
                let mut global_failed = 0usize;

                for (pos, disk) in disks.iter().enumerate() {
                    let position = pos as u8;
                    let is_failed = failed_set.contains(disk);
                    if schema.global_parity.contains(&position) {
                        if is_failed {
                            global_failed += 1;
                        }
                    } else if let Some(group_idx) =
                        schema.data_groups.iter().position(|g| g.contains(&position))
                    {
                        if is_failed {
                            group_failed[group_idx] += 1;
                        }
                    } else if let Some(group_idx) =
                        schema.local_parity.iter().position(|&lp| lp == position)
                    {
                        // Intact local parity cancels one failed data
                        // chunk in its group.
                        if !is_failed && group_failed[group_idx] > 0 {
                            group_failed[group_idx] -= 1;
                        }
                    }
                }

                let residual: usize = group_failed.iter().sum::<usize>() + global_failed;
                residual > (*n - *k - *l) as usize
            }
        };

        lost.then_some(failed_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use reldl_types::LrcSchema;

    fn flat_rs_placement(num_racks: usize, n: usize, num_stripes: usize, seed: u64) -> Placement {
        let topo = ClusterTopology::new(num_racks, 2, 1);
        let mut rng = SmallRng::seed_from_u64(seed);
        Placement::new(
            topo,
            Code::Rs { n: n as u8, k: (n - 2) as u8 },
            PlaceType::Flat,
            None,
            num_stripes,
            &mut rng,
        )
        .unwrap()
    }

    #[test]
    fn flat_placement_spans_distinct_racks() {
        let placement = flat_rs_placement(9, 6, 50, 11);
        for stripe in 0..placement.num_stripes() {
            let disks = placement.stripe_location(StripeId(stripe));
            let racks: HashSet<_> = disks.iter().map(|&d| placement.topology().disk_rack(d)).collect();
            assert_eq!(racks.len(), disks.len(), "stripe {stripe} reuses a rack");
        }
    }

    #[test]
    fn flat_placement_fails_with_too_few_racks() {
        let topo = ClusterTopology::new(3, 2, 1);
        let mut rng = SmallRng::seed_from_u64(0);
        let result =
            Placement::new(topo, Code::Rs { n: 9, k: 6 }, PlaceType::Flat, None, 10, &mut rng);
        assert!(matches!(result, Err(Error::InsufficientRacks { .. })));
    }

    #[test]
    fn reverse_index_sum_equals_n_times_num_stripes() {
        let placement = flat_rs_placement(9, 6, 30, 2);
        let total: usize =
            (0..placement.topology().num_disks()).map(|d| placement.stripes_to_repair(DiskId(d)).len()).sum();
        assert_eq!(total, 6 * 30);
    }

    #[test]
    fn hierarchical_placement_matches_rack_count_multiset() {
        let topo = ClusterTopology::new(4, 4, 1);
        let mut rng = SmallRng::seed_from_u64(5);
        let config: ChunkRackConfig = vec![3, 3, 3];
        let placement = Placement::new(
            topo,
            Code::Drc { n: 9, k: 6 },
            PlaceType::Hierarchical,
            Some(config.clone()),
            20,
            &mut rng,
        )
        .unwrap();

        for stripe in 0..placement.num_stripes() {
            let disks = placement.stripe_location(StripeId(stripe));
            let mut rack_counts: std::collections::HashMap<_, usize> = std::collections::HashMap::new();
            for &disk in disks {
                *rack_counts.entry(placement.topology().disk_rack(disk)).or_default() += 1;
            }
            let mut counts: Vec<usize> = rack_counts.into_values().collect();
            counts.sort_unstable();
            let mut expected = config.iter().map(|&c| c as usize).collect::<Vec<_>>();
            expected.sort_unstable();
            assert_eq!(counts, expected);
        }
    }

    #[test]
    fn drc_forces_chunk_rack_config_and_rejects_too_few_racks() {
        let topo = ClusterTopology::new(2, 4, 1);
        let mut rng = SmallRng::seed_from_u64(0);
        let result = Placement::new(
            topo,
            Code::Drc { n: 9, k: 6 },
            PlaceType::Hierarchical,
            None,
            5,
            &mut rng,
        );
        assert!(matches!(result, Err(Error::InsufficientRacks { .. })));
    }

    #[test]
    fn rs_loss_invariant_bounds_lost_chunks() {
        let placement = flat_rs_placement(9, 6, 40, 3);
        // fail every disk on rack 0 and rack 1 (2 racks x 2 disks = 4 disks)
        let failed: Vec<DiskId> = (0..4).map(DiskId).collect();
        let (num_failed_stripes, num_lost_chunks) = placement.num_failed_status(&failed);
        assert!(num_lost_chunks >= num_failed_stripes);
        assert!(num_lost_chunks <= 6 * num_failed_stripes);
    }

    fn lrc_schema_16_12_2() -> LrcSchema {
        LrcSchema::canonical_16_12_2()
    }

    fn lrc_placement_with_fixed_stripe(disks: Vec<DiskId>) -> Placement {
        let topo = ClusterTopology::new(16, 1, 1);
        Placement {
            topology: topo,
            code: Code::Lrc { n: 16, k: 12, l: 2, schema: lrc_schema_16_12_2() },
            stripes_location: vec![disks.clone()],
            stripes_per_disk: {
                let mut v = vec![Vec::new(); 16];
                for d in &disks {
                    v[d.0].push(StripeId(0));
                }
                v
            },
        }
    }

    #[test]
    fn lrc_local_parity_repairs_single_group_failure() {
        // positions 0..16 map 1:1 to disk ids 0..16 for this fixture.
        let placement = lrc_placement_with_fixed_stripe((0..16).map(DiskId).collect());
        // failure set {chunk 0, chunk 6} (data + its own local parity):
        // NOT a loss per spec.md §8 scenario 3.
        assert!(!placement.check_data_loss(&[DiskId(0), DiskId(6)]));
    }

    #[test]
    fn lrc_two_data_failures_still_recoverable_with_local_parity_intact() {
        let placement = lrc_placement_with_fixed_stripe((0..16).map(DiskId).collect());
        // {0,1,6}: two data chunks of group 0 plus its local parity failed
        // -> residual = 2 (group counter decremented once by parity, but
        // parity itself is among the failed set so it cannot cancel
        // anything) ... the scenario says this is NOT a loss.
        assert!(!placement.check_data_loss(&[DiskId(0), DiskId(1)]));
    }

    #[test]
    fn lrc_group_failure_plus_parity_loss_is_unrecoverable() {
        let placement = lrc_placement_with_fixed_stripe((0..16).map(DiskId).collect());
        // {0,1,6,7}: two data failures in group 0, its local parity also
        // gone, plus a global parity gone -> IS a loss.
        assert!(placement.check_data_loss(&[DiskId(0), DiskId(1), DiskId(6), DiskId(7)]));
    }
}
