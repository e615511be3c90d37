//! One iteration's live cluster: topology plus the three entity vectors,
//! reset and rebuilt fresh at the start of every iteration (spec.md §4.4
//! step 1 — "reset all component clocks to 0, all states to NORMAL").

use rand::Rng;
use reldl_placement::ClusterTopology;
use reldl_types::{DiskId, DiskState, NodeId, NodeState, RackId, RackState, SimConfig};

use crate::state::{DiskEntity, NodeEntity, RackEntity};

/// A freshly initialized cluster for one iteration.
pub struct ClusterState {
    pub topology: ClusterTopology,
    pub racks: Vec<RackEntity>,
    pub nodes: Vec<NodeEntity>,
    pub disks: Vec<DiskEntity>,
}

impl ClusterState {
    /// Build every entity from `config`'s distributions. When
    /// `config.use_power_outage` is set, racks carry no transient dists of
    /// their own — a single shared outage process drives all of them
    /// together (grounded on the Python original's `Rack(None, None)`
    /// construction in power-outage mode).
    #[must_use]
    pub fn new(config: &SimConfig) -> Self {
        let topology =
            ClusterTopology::new(config.num_racks, config.nodes_per_rack, config.disks_per_node);

        let racks = (0..config.num_racks)
            .map(|i| {
                if config.use_power_outage {
                    RackEntity::new(RackId(i), None, None)
                } else {
                    RackEntity::new(
                        RackId(i),
                        Some(config.rack_transient_fail_dist.into()),
                        Some(config.rack_transient_repair_dist.into()),
                    )
                }
            })
            .collect();

        let nodes = (0..topology.num_nodes())
            .map(|i| {
                NodeEntity::new(
                    NodeId(i),
                    config.node_fail_dist.into(),
                    config.node_repair_dist.into(),
                    config.node_transient_fail_dist.into(),
                    config.node_transient_repair_dist.into(),
                )
            })
            .collect();

        let disks = (0..topology.num_disks())
            .map(|i| {
                DiskEntity::new(
                    DiskId(i),
                    config.disk_fail_dist.into(),
                    config.disk_repair_dist.map(Into::into),
                )
            })
            .collect();

        Self { topology, racks, nodes, disks }
    }

    #[must_use]
    pub fn rack_state(&self, rack: RackId) -> RackState {
        self.racks[rack.0].state
    }

    #[must_use]
    pub fn node_effective_state(&self, node: NodeId) -> NodeState {
        let rack = self.topology.node_rack(node);
        self.nodes[node.0].effective_state(self.rack_state(rack))
    }

    #[must_use]
    pub fn disk_effective_state(&self, disk: DiskId) -> DiskState {
        let node = self.topology.disk_node(disk);
        self.disks[disk.0].effective_state(self.node_effective_state(node))
    }

    /// Advance every entity's local clock by `dt` (spec.md §4.4 step 3b).
    pub fn advance_clocks(&mut self, curr_time: f64, dt: f64) {
        for rack in &mut self.racks {
            rack.update_clock(dt);
        }
        for node in &mut self.nodes {
            node.update_clock(curr_time, dt);
        }
        for disk in &mut self.disks {
            disk.update_clock(curr_time, dt);
        }
    }

    /// Every disk currently unreadable, whether because it is itself
    /// `Crashed` or because containment (node crash / rack outage) renders
    /// it `Unavailable`. This is the set the placement engine's data-loss
    /// queries are evaluated against.
    #[must_use]
    pub fn inaccessible_disk_ids(&self) -> Vec<DiskId> {
        (0..self.disks.len())
            .map(DiskId)
            .filter(|&d| self.disk_effective_state(d) != DiskState::Normal)
            .collect()
    }

    #[must_use]
    pub fn permanently_crashed_disk_ids(&self) -> Vec<DiskId> {
        self.disks.iter().filter(|d| d.state == DiskState::Crashed).map(|d| d.id).collect()
    }

    /// Draw every entity's first event and push it to `queue` (spec.md
    /// §4.4 step 2). Power outage mode seeds a single shared outage
    /// arrival instead of per-rack transient events; trace mode skips
    /// drawing node failures here (`trace::merge_into` handles it instead).
    pub fn seed_initial_events(
        &self,
        config: &SimConfig,
        queue: &mut crate::events::EventQueue,
        rng: &mut impl Rng,
    ) {
        use crate::events::EventKind;

        if config.use_power_outage {
            if let Some(outage) = &config.power_outage {
                let dist: reldl_stats::Weibull = outage.arrival_dist.into();
                queue.push(dist.draw(rng), EventKind::PowerOutageStart);
            }
        } else {
            for rack in &self.racks {
                if let Some(dist) = rack.transient_fail_dist {
                    queue.push(dist.draw(rng), EventKind::RackFail(rack.id));
                }
            }
        }

        for node in &self.nodes {
            if !config.use_trace {
                queue.push(node.fail_dist.draw(rng), EventKind::NodeFail(node.id));
                queue.push(node.transient_fail_dist.draw(rng), EventKind::NodeTransientFail(node.id));
            }
        }

        for disk in &self.disks {
            queue.push(disk.fail_dist.draw(rng), EventKind::DiskFail(disk.id));
        }
    }
}
