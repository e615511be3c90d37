//! Flat cluster topology.
//!
//! Every entity in this system is addressed by its position in a
//! `num_racks x nodes_per_rack x disks_per_node` grid rather than by name
//! (unlike ObjectIO's nested region/datacenter/rack topology tree, which
//! assumes named failure domains) — grounded in
//! `examples/original_source/lib/placement.py`'s `get_disk_randomly`,
//! which computes rack/node bounds by arithmetic on a flat disk index.

use reldl_types::{DiskId, NodeId, RackId};

/// The physical shape of the cluster: racks, nodes per rack, disks per
/// node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClusterTopology {
    pub num_racks: usize,
    pub nodes_per_rack: usize,
    pub disks_per_node: usize,
}

impl ClusterTopology {
    #[must_use]
    pub const fn new(num_racks: usize, nodes_per_rack: usize, disks_per_node: usize) -> Self {
        Self { num_racks, nodes_per_rack, disks_per_node }
    }

    #[must_use]
    pub const fn num_nodes(&self) -> usize {
        self.num_racks * self.nodes_per_rack
    }

    #[must_use]
    pub const fn num_disks(&self) -> usize {
        self.num_nodes() * self.disks_per_node
    }

    #[must_use]
    pub const fn disks_per_rack(&self) -> usize {
        self.nodes_per_rack * self.disks_per_node
    }

    /// Which rack a node belongs to.
    #[must_use]
    pub fn node_rack(&self, node: NodeId) -> RackId {
        RackId(node.0 / self.nodes_per_rack)
    }

    /// Which node a disk belongs to.
    #[must_use]
    pub fn disk_node(&self, disk: DiskId) -> NodeId {
        NodeId(disk.0 / self.disks_per_node)
    }

    /// Which rack a disk belongs to.
    #[must_use]
    pub fn disk_rack(&self, disk: DiskId) -> RackId {
        self.node_rack(self.disk_node(disk))
    }

    /// Pick `count` distinct nodes within `rack`, each mapped to one
    /// uniformly random disk on that node (so two chunks of the same
    /// stripe never land on the same node).
    pub fn distinct_disks_in_rack(
        &self,
        rack: RackId,
        count: usize,
        rng: &mut impl rand::Rng,
    ) -> Vec<DiskId> {
        let node_offsets = sample_distinct(self.nodes_per_rack, count, rng);
        node_offsets
            .into_iter()
            .map(|node_offset| {
                let node_id = rack.0 * self.nodes_per_rack + node_offset;
                let disk_offset = if self.disks_per_node == 1 {
                    0
                } else {
                    rng.gen_range(0..self.disks_per_node)
                };
                DiskId(node_id * self.disks_per_node + disk_offset)
            })
            .collect()
    }

    /// Pick `count` distinct racks out of `num_racks`.
    pub fn distinct_racks(&self, count: usize, rng: &mut impl rand::Rng) -> Vec<RackId> {
        sample_distinct(self.num_racks, count, rng).into_iter().map(RackId).collect()
    }
}

/// Sample `count` distinct values from `0..universe` without replacement,
/// via partial Fisher-Yates (the same approach `rand::seq::index::sample`
/// uses internally, inlined here so this crate's only dependency on
/// `rand` is the `Rng` trait plus a basic shuffle).
fn sample_distinct(universe: usize, count: usize, rng: &mut impl rand::Rng) -> Vec<usize> {
    debug_assert!(count <= universe);
    let mut pool: Vec<usize> = (0..universe).collect();
    for i in 0..count {
        let j = rng.gen_range(i..universe);
        pool.swap(i, j);
    }
    pool.truncate(count);
    pool
}
