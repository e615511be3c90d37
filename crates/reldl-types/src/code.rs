//! Erasure-code parameterization.
//!
//! Mirrors the tagged-union dispatch ObjectIO's `ErasureType` uses for
//! MDS vs. LRC, generalized to the three families this system models and
//! to `is_lost`/`repair_traffic` being driven off `n`/`k`/`l` rather than
//! byte-level encode/decode (spec.md §9: "tagged union ... with a single
//! method `is_lost` ... avoid open inheritance").

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Locally Repairable Code position schema: which stripe positions are
/// data (grouped), local parity, or global parity.
///
/// The Python original hard-codes this for (n=16, k=12, l=2):
/// `data_groups = [[0..5], [8..13]]`, `local_parity = [6, 14]`,
/// `global_parity = [7, 15]`. This type generalizes that to arbitrary
/// (n, k, l) while keeping the schema an explicit, validated input rather
/// than something the placement engine infers (spec.md §9 open question).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LrcSchema {
    /// `data_groups[g]` is the list of stripe positions holding data
    /// chunks for local group `g`.
    pub data_groups: Vec<Vec<u8>>,
    /// `local_parity[g]` is the stripe position of group `g`'s local parity.
    pub local_parity: Vec<u8>,
    /// Stripe positions holding global parity chunks.
    pub global_parity: Vec<u8>,
}

impl LrcSchema {
    /// The canonical schema for (n=16, k=12, l=2), as used by the literal
    /// scenario in spec.md §8 (groups {0..5,8..13}, local parities
    /// {6,14}, global parities {7,15}).
    #[must_use]
    pub fn canonical_16_12_2() -> Self {
        Self {
            data_groups: vec![vec![0, 1, 2, 3, 4, 5], vec![8, 9, 10, 11, 12, 13]],
            local_parity: vec![6, 14],
            global_parity: vec![7, 15],
        }
    }

    /// Build the schema a caller would expect for an evenly-divisible
    /// (n, k, l): `l` groups of `k/l` data chunks each followed by one
    /// local parity, then `n - k - l` global parity positions at the end.
    pub fn even_groups(n: u8, k: u8, l: u8) -> Result<Self> {
        if l == 0 || k % l != 0 {
            return Err(Error::InvalidCodeParams {
                reason: format!("code_k={k} must be evenly divisible by code_l={l}"),
            });
        }
        let group_size = k / l;
        let mut data_groups = Vec::with_capacity(l as usize);
        let mut local_parity = Vec::with_capacity(l as usize);
        let mut pos: u8 = 0;
        for _ in 0..l {
            let group: Vec<u8> = (pos..pos + group_size).collect();
            pos += group_size;
            data_groups.push(group);
            local_parity.push(pos);
            pos += 1;
        }
        let global_parity: Vec<u8> = (pos..n).collect();
        Ok(Self {
            data_groups,
            local_parity,
            global_parity,
        })
    }

    /// Total positions accounted for by the schema.
    #[must_use]
    pub fn total_positions(&self) -> usize {
        self.data_groups.iter().map(Vec::len).sum::<usize>()
            + self.local_parity.len()
            + self.global_parity.len()
    }

    pub(crate) fn validate(&self, n: u8, k: u8, l: u8) -> Result<()> {
        if self.data_groups.len() != l as usize || self.local_parity.len() != l as usize {
            return Err(Error::InvalidCodeParams {
                reason: "lrc schema group count must equal code_l".into(),
            });
        }
        let data_total: usize = self.data_groups.iter().map(Vec::len).sum();
        if data_total != k as usize {
            return Err(Error::InvalidCodeParams {
                reason: format!("lrc schema has {data_total} data positions, code_k is {k}"),
            });
        }
        if self.total_positions() != n as usize {
            return Err(Error::InvalidCodeParams {
                reason: format!(
                    "lrc schema covers {} positions, code_n is {n}",
                    self.total_positions()
                ),
            });
        }
        Ok(())
    }
}

/// Chunk-to-rack distribution for `PlaceType::Hierarchical`:
/// `config[i]` chunks of every stripe land in the `i`-th participating rack.
pub type ChunkRackConfig = Vec<u8>;

/// An erasure code and its chunk-layout parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Code {
    /// Reed-Solomon: any `k` of `n` chunks reconstruct the stripe.
    Rs { n: u8, k: u8 },
    /// Locally Repairable Codes with `l` local groups.
    Lrc { n: u8, k: u8, l: u8, schema: LrcSchema },
    /// Double Regenerating Codes. Only (n=9, k∈{5,6}) is valid; placement
    /// forces `chunk_rack_config = [3, 3, 3]`.
    Drc { n: u8, k: u8 },
}

impl Code {
    /// Total chunks per stripe.
    #[must_use]
    pub const fn n(&self) -> u8 {
        match self {
            Self::Rs { n, .. } | Self::Lrc { n, .. } | Self::Drc { n, .. } => *n,
        }
    }

    /// Data chunks per stripe.
    #[must_use]
    pub const fn k(&self) -> u8 {
        match self {
            Self::Rs { k, .. } | Self::Lrc { k, .. } | Self::Drc { k, .. } => *k,
        }
    }

    /// Parity chunks per stripe (`n - k`).
    #[must_use]
    pub const fn m(&self) -> u8 {
        self.n() - self.k()
    }

    /// Validate the code's own internal consistency (not placement/topology
    /// fit, which the placement engine checks separately).
    pub fn validate(&self) -> Result<()> {
        if self.k() < 1 || self.n() <= self.k() {
            return Err(Error::InvalidCodeParams {
                reason: format!("require code_n > code_k >= 1, got n={}, k={}", self.n(), self.k()),
            });
        }
        match self {
            Self::Rs { .. } => Ok(()),
            Self::Lrc { n, k, l, schema } => {
                if *l == 0 {
                    return Err(Error::InvalidCodeParams {
                        reason: "code_l must be > 0 for LRC".into(),
                    });
                }
                schema.validate(*n, *k, *l)
            }
            Self::Drc { n, k } => {
                if *n != 9 || !(*k == 5 || *k == 6) {
                    return Err(Error::InvalidCodeParams {
                        reason: format!("DRC only supports (n=9, k in {{5,6}}), got (n={n}, k={k})"),
                    });
                }
                Ok(())
            }
        }
    }

    /// The forced chunk-rack distribution for codes that require one
    /// (currently only DRC, which always groups 3/3/3 across three racks).
    #[must_use]
    pub fn forced_chunk_rack_config(&self) -> Option<ChunkRackConfig> {
        match self {
            Self::Drc { .. } => Some(vec![3, 3, 3]),
            Self::Rs { .. } | Self::Lrc { .. } => None,
        }
    }
}
