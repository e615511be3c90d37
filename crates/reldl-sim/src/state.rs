//! Rack/Node/Disk state machines: closed transitions plus the clock
//! family spec.md §3 requires (local wall clock, repair clock, unavail
//! clock, begin-time), grounded on
//! `examples/original_source/lib/smp_data_structures.py`'s `Rack`,
//! `Node`, `Disk` classes.
//!
//! Containment (a crashed node makes its disks inaccessible, an
//! unavailable rack makes its nodes inaccessible) is NOT modeled by
//! mutating a contained entity's own `state` — spec.md §4.5 is explicit
//! that "the disk ... does not itself transition" when its container
//! goes down. Instead each entity exposes `effective_state`, which layers
//! the container's state on top of its own without touching it, so a
//! permanent crash survives a container recovering (spec.md §4.5's
//! worked example).

use reldl_stats::Weibull;
use reldl_types::{DiskId, DiskState, NodeId, NodeState, RackId, RackState};

/// A rack: transient-only (spec.md §4.5 — racks never `Crashed`).
#[derive(Debug, Clone)]
pub struct RackEntity {
    pub id: RackId,
    pub state: RackState,
    pub transient_fail_dist: Option<Weibull>,
    pub transient_repair_dist: Option<Weibull>,
    pub local_clock: f64,
    pub unavail_clock: f64,
    unavail_start: f64,
}

impl RackEntity {
    #[must_use]
    pub const fn new(id: RackId, transient_fail_dist: Option<Weibull>, transient_repair_dist: Option<Weibull>) -> Self {
        Self {
            id,
            state: RackState::Normal,
            transient_fail_dist,
            transient_repair_dist,
            local_clock: 0.0,
            unavail_clock: 0.0,
            unavail_start: 0.0,
        }
    }

    pub fn update_clock(&mut self, dt: f64) {
        self.local_clock += dt;
    }

    /// Transient rack failure (also driven by a shared power-outage event
    /// — the caller decides when to call this, this entity doesn't care
    /// why it went down).
    pub fn fail(&mut self, curr_time: f64) {
        if self.state == RackState::Normal {
            self.unavail_start = curr_time;
        }
        self.state = RackState::Unavailable;
    }

    pub fn repair(&mut self, curr_time: f64) {
        if self.state == RackState::Unavailable {
            self.unavail_clock += curr_time - self.unavail_start;
        }
        self.state = RackState::Normal;
        self.local_clock = 0.0;
    }
}

/// A node: both a permanent crash cycle and an independent transient
/// cycle (spec.md §4.5).
#[derive(Debug, Clone)]
pub struct NodeEntity {
    pub id: NodeId,
    pub state: NodeState,
    pub fail_dist: Weibull,
    pub repair_dist: Weibull,
    pub transient_fail_dist: Weibull,
    pub transient_repair_dist: Weibull,
    pub local_clock: f64,
    pub repair_clock: f64,
    pub unavail_clock: f64,
    pub begin_time: f64,
    unavail_start: f64,
    repair_start: f64,
}

impl NodeEntity {
    #[must_use]
    pub const fn new(
        id: NodeId,
        fail_dist: Weibull,
        repair_dist: Weibull,
        transient_fail_dist: Weibull,
        transient_repair_dist: Weibull,
    ) -> Self {
        Self {
            id,
            state: NodeState::Normal,
            fail_dist,
            repair_dist,
            transient_fail_dist,
            transient_repair_dist,
            local_clock: 0.0,
            repair_clock: 0.0,
            unavail_clock: 0.0,
            begin_time: 0.0,
            unavail_start: 0.0,
            repair_start: 0.0,
        }
    }

    pub fn update_clock(&mut self, curr_time: f64, dt: f64) {
        self.local_clock += dt;
        self.repair_clock =
            if self.state == NodeState::Crashed { curr_time - self.repair_start } else { 0.0 };
    }

    /// Permanent node failure.
    pub fn fail(&mut self, curr_time: f64) {
        self.state = NodeState::Crashed;
        self.repair_clock = 0.0;
        self.repair_start = curr_time;
    }

    /// Repair from permanent failure: the node is brand-new afterward
    /// (clock resets to zero).
    pub fn repair(&mut self, curr_time: f64) {
        self.begin_time = curr_time;
        self.local_clock = 0.0;
        self.repair_clock = 0.0;
        self.state = NodeState::Normal;
    }

    pub fn transient_fail(&mut self, curr_time: f64) {
        if self.state == NodeState::Normal {
            self.state = NodeState::Unavailable;
            self.unavail_start = curr_time;
        }
    }

    pub fn transient_repair(&mut self, curr_time: f64) {
        if self.state == NodeState::Unavailable {
            self.unavail_clock += curr_time - self.unavail_start;
            self.state = NodeState::Normal;
        }
    }

    /// The node's effective state once `rack_state` is folded in: a
    /// permanent crash is sticky (checked first); otherwise an
    /// unavailable containing rack renders the node inaccessible without
    /// touching `self.state` (spec.md §4.5).
    #[must_use]
    pub fn effective_state(&self, rack_state: RackState) -> NodeState {
        if self.state == NodeState::Crashed {
            return NodeState::Crashed;
        }
        if rack_state == RackState::Unavailable {
            return NodeState::Unavailable;
        }
        self.state
    }
}

/// A disk: a single permanent crash/repair cycle (spec.md §4.5 — no
/// independent disk-level transient event exists; its "Unavailable"ness
/// is always inherited from its node/rack via `effective_state`).
#[derive(Debug, Clone)]
pub struct DiskEntity {
    pub id: DiskId,
    pub state: DiskState,
    pub fail_dist: Weibull,
    pub repair_dist: Option<Weibull>,
    pub local_clock: f64,
    pub repair_clock: f64,
    pub unavail_clock: f64,
    pub begin_time: f64,
    unavail_start: f64,
    repair_start: f64,
}

impl DiskEntity {
    #[must_use]
    pub const fn new(id: DiskId, fail_dist: Weibull, repair_dist: Option<Weibull>) -> Self {
        Self {
            id,
            state: DiskState::Normal,
            fail_dist,
            repair_dist,
            local_clock: 0.0,
            repair_clock: 0.0,
            unavail_clock: 0.0,
            begin_time: 0.0,
            unavail_start: 0.0,
            repair_start: 0.0,
        }
    }

    pub fn update_clock(&mut self, curr_time: f64, dt: f64) {
        self.local_clock += dt;
        self.repair_clock =
            if self.state == DiskState::Crashed { curr_time - self.repair_start } else { 0.0 };
    }

    pub fn fail(&mut self, curr_time: f64) {
        if self.state == DiskState::Normal {
            self.unavail_start = curr_time;
        }
        self.state = DiskState::Crashed;
        self.repair_clock = 0.0;
        self.repair_start = curr_time;
    }

    pub fn repair(&mut self, curr_time: f64) {
        self.unavail_clock += curr_time - self.unavail_start;
        self.begin_time = curr_time;
        self.local_clock = 0.0;
        self.repair_clock = 0.0;
        self.state = DiskState::Normal;
    }

    /// Fold in node/rack containment without mutating `self.state`
    /// (spec.md §4.5).
    #[must_use]
    pub fn effective_state(&self, node_state: NodeState) -> DiskState {
        if self.state == DiskState::Crashed {
            return DiskState::Crashed;
        }
        if node_state != NodeState::Normal {
            return DiskState::Unavailable;
        }
        self.state
    }
}
