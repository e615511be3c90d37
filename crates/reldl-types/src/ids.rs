//! Entity identifiers and the closed state machines each entity can be in.
//!
//! Unlike ObjectIO's UUID-keyed identifiers, every entity in a cluster
//! model is addressed by its position in a flat, fixed-size topology
//! (`rack_id * nodes_per_rack * disks_per_node + ...`), so identifiers here
//! are newtype wrappers over plain indices rather than UUIDs.

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Index of a rack, 0..num_racks.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, From, Into,
)]
pub struct RackId(pub usize);

/// Index of a node, 0..num_racks*nodes_per_rack.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, From, Into,
)]
pub struct NodeId(pub usize);

/// Index of a disk, 0..num_disks.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, From, Into,
)]
pub struct DiskId(pub usize);

/// Index of a stripe, 0..num_stripes.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, From, Into,
)]
pub struct StripeId(pub usize);

/// State of a disk. A disk never recovers from `Crashed` except through an
/// explicit `DiskRepair` event; it does not have a transient state of its
/// own, since transient unavailability is inherited from its node/rack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiskState {
    Normal,
    Unavailable,
    Crashed,
}

/// State of a node. `Crashed` is permanent (requires `NodeRepair`);
/// `Unavailable` is transient (requires `NodeTransientRepair`). Both are
/// represented here because, unlike a rack, a node can experience either.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeState {
    Normal,
    Unavailable,
    Crashed,
}

/// State of a rack. Racks never crash permanently in this model (spec.md
/// §4.5), so unlike `DiskState`/`NodeState` there is no `Crashed` variant —
/// an invalid state is made unrepresentable rather than checked at runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RackState {
    Normal,
    Unavailable,
}

impl Default for DiskState {
    fn default() -> Self {
        Self::Normal
    }
}

impl Default for NodeState {
    fn default() -> Self {
        Self::Normal
    }
}

impl Default for RackState {
    fn default() -> Self {
        Self::Normal
    }
}
