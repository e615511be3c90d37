//! Trace-driven event source (spec.md §6, §9).
//!
//! Three per-trace files — permanent node failures, transient node
//! failures, transient node repairs — each a flat list of `node_id
//! time_hours` lines. `events_for_node` returns a node's event list
//! already merged and sorted; the caller folds these straight into the
//! `EventQueue` at iteration start (spec.md §9: "treated as another event
//! source that merges into the event queue at iteration start; the rest
//! of the simulator is unchanged"). The retrieved Python original's own
//! trace parser (`lib/tracelib/trace.py`) was not kept in
//! `original_source/`, so the concrete per-trace-id layout below
//! (`{dir}/s{trace_id}_{permanent,transient_fail,transient_repair}.txt`)
//! is this crate's own — adapted from the directory-naming convention
//! visible in `simedc.py`'s `trace_transient_path` construction
//! (`s<id>n0.txt` under `failure_events/`, `transient_events/`,
//! `transient_repair/`), flattened to one file per kind per trace rather
//! than one file per node.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use reldl_types::NodeId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("missing trace file: {path}")]
    MissingFile { path: PathBuf },
    #[error("malformed trace line in {path} at line {line_no}: {content:?}")]
    MalformedLine { path: PathBuf, line_no: usize, content: String },
    #[error("trace event time {time} outside [0, mission_time={mission_time}] in {path}")]
    TimeOutOfRange { path: PathBuf, time: f64, mission_time: f64 },
}

impl From<TraceError> for reldl_types::Error {
    fn from(err: TraceError) -> Self {
        match err {
            TraceError::MissingFile { path } => {
                Self::Trace { trace_id: 0, reason: format!("missing trace file: {}", path.display()) }
            }
            TraceError::MalformedLine { path, line_no, content } => Self::Trace {
                trace_id: 0,
                reason: format!("malformed line {line_no} in {}: {content:?}", path.display()),
            },
            TraceError::TimeOutOfRange { path, time, mission_time } => Self::Trace {
                trace_id: 0,
                reason: format!(
                    "time {time} outside [0, {mission_time}] in {}",
                    path.display()
                ),
            },
        }
    }
}

/// Which file a trace-sourced event came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraceEventKind {
    PermanentFail,
    TransientFail,
    TransientRepair,
}

/// Materialized node event streams for one `trace_id`.
#[derive(Debug, Default)]
pub struct TraceAdapter {
    events: HashMap<NodeId, Vec<(f64, TraceEventKind)>>,
}

impl TraceAdapter {
    /// Load and merge the three per-trace files under `dir` for
    /// `trace_id`, validating every timestamp lies in `[0, mission_time]`.
    pub fn load(dir: &Path, trace_id: u32, mission_time: f64) -> Result<Self, TraceError> {
        let mut events: HashMap<NodeId, Vec<(f64, TraceEventKind)>> = HashMap::new();
        for (suffix, kind) in [
            ("permanent", TraceEventKind::PermanentFail),
            ("transient_fail", TraceEventKind::TransientFail),
            ("transient_repair", TraceEventKind::TransientRepair),
        ] {
            let path = dir.join(format!("s{trace_id}_{suffix}.txt"));
            Self::load_file(&path, kind, mission_time, &mut events)?;
        }
        for list in events.values_mut() {
            list.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        }
        Ok(Self { events })
    }

    fn load_file(
        path: &Path,
        kind: TraceEventKind,
        mission_time: f64,
        events: &mut HashMap<NodeId, Vec<(f64, TraceEventKind)>>,
    ) -> Result<(), TraceError> {
        let contents =
            fs::read_to_string(path).map_err(|_| TraceError::MissingFile { path: path.to_path_buf() })?;
        for (line_no, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            let node_id = parts
                .next()
                .and_then(|s| s.parse::<usize>().ok())
                .ok_or_else(|| TraceError::MalformedLine {
                    path: path.to_path_buf(),
                    line_no: line_no + 1,
                    content: line.to_string(),
                })?;
            let time: f64 = parts
                .next()
                .and_then(|s| s.parse::<f64>().ok())
                .ok_or_else(|| TraceError::MalformedLine {
                    path: path.to_path_buf(),
                    line_no: line_no + 1,
                    content: line.to_string(),
                })?;
            if !(0.0..=mission_time).contains(&time) {
                return Err(TraceError::TimeOutOfRange { path: path.to_path_buf(), time, mission_time });
            }
            events.entry(NodeId(node_id)).or_default().push((time, kind));
        }
        Ok(())
    }

    /// `node_id`'s events, already time-sorted across all three kinds.
    #[must_use]
    pub fn events_for_node(&self, node_id: NodeId) -> &[(f64, TraceEventKind)] {
        self.events.get(&node_id).map_or(&[], Vec::as_slice)
    }
}
