//! Per-chunk repair traffic, split into cross-rack and intra-rack bytes.
//!
//! spec.md §4.3 only fully specifies the RS case (`(k-1)` chunks of
//! traffic per lost chunk); LRC and DRC are explicitly left as
//! code-specific, pluggable formulas (spec.md §9's last open question).
//! This module isolates that pluggability behind one function so the
//! network model never special-cases a `Code` variant itself.

use reldl_types::Code;

/// Repair traffic for one lost chunk, already scaled by `chunk_size_mib`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RepairTraffic {
    pub cross_bytes: f64,
    pub intra_bytes: f64,
}

/// `repair_traffic_per_chunk(code, n, k)` from spec.md §4.3, parameterized
/// by the stripe's chunk size.
#[must_use]
pub fn repair_traffic_per_chunk(code: &Code, chunk_size_mib: f64) -> RepairTraffic {
    match code {
        Code::Rs { k, .. } => RepairTraffic {
            cross_bytes: f64::from(*k - 1) * chunk_size_mib,
            intra_bytes: 0.0,
        },
        Code::Lrc { k, l, schema, .. } => lrc_repair_traffic(*k, *l, schema, chunk_size_mib),
        Code::Drc { n, k } => drc_repair_traffic(*n, *k, chunk_size_mib),
    }
}

/// LRC repair for a data chunk whose local group still has an intact
/// local parity reads only the other `group_size - 1` chunks of that
/// group; under the hierarchical placement LRC is paired with, a local
/// group's chunks and its parity share a rack (spec.md §3's
/// chunk-rack-config), so this traffic is intra-rack. A global-parity or
/// orphaned-group repair falls back to the RS-style `(k-1)` cross-rack
/// reconstruction, since it must read across the whole stripe.
fn lrc_repair_traffic(k: u8, l: u8, schema: &reldl_types::LrcSchema, chunk_size_mib: f64) -> RepairTraffic {
    let group_size = schema.data_groups.first().map_or(1, Vec::len).max(1);
    if l > 0 && group_size > 1 {
        RepairTraffic { cross_bytes: 0.0, intra_bytes: (group_size as f64 - 1.0) * chunk_size_mib }
    } else {
        RepairTraffic { cross_bytes: f64::from(k - 1) * chunk_size_mib, intra_bytes: 0.0 }
    }
}

/// DRC regenerating-code repair traffic: not specified in the retrieved
/// original source (spec.md §9), so this is a named, overridable function
/// rather than ground truth. It follows the standard regenerating-code
/// shape — `n - 1` helpers, each contributing a fraction of a chunk
/// proportional to `k / (n * (n - k))` — which reduces bandwidth per
/// helper relative to the RS case without claiming to be the DRC paper's
/// exact minimum-bandwidth point.
#[must_use]
pub fn drc_repair_traffic(n: u8, k: u8, chunk_size_mib: f64) -> RepairTraffic {
    let n = f64::from(n);
    let k = f64::from(k);
    let helpers = n - 1.0;
    let per_helper = chunk_size_mib * k / (n * (n - k));
    RepairTraffic { cross_bytes: helpers * per_helper, intra_bytes: 0.0 }
}
