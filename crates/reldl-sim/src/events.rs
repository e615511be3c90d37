//! Time-ordered future-event queue (spec.md §3, §9).
//!
//! A binary heap keyed on `(time, insertion_seq)` suffices — the
//! simulator is strictly single-threaded per iteration, so there is no
//! priority inversion to guard against (spec.md §9 design note).

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use reldl_types::{DiskId, NodeId, RackId};

/// The ten event kinds spec.md §3 enumerates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    RackFail(RackId),
    RackRepair(RackId),
    NodeFail(NodeId),
    NodeRepair(NodeId),
    NodeTransientFail(NodeId),
    NodeTransientRepair(NodeId),
    DiskFail(DiskId),
    DiskRepair(DiskId),
    PowerOutageStart,
    PowerOutageEnd,
}

#[derive(Clone, Copy, Debug)]
pub struct Event {
    pub time: f64,
    pub kind: EventKind,
    seq: u64,
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}
impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    /// Reversed so `BinaryHeap` (a max-heap) pops the smallest time
    /// first, ties broken by insertion order (smallest `seq` first).
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .partial_cmp(&self.time)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Future-event queue for one simulator iteration.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Event>,
    next_seq: u64,
}

impl EventQueue {
    #[must_use]
    pub fn new() -> Self {
        Self { heap: BinaryHeap::new(), next_seq: 0 }
    }

    pub fn push(&mut self, time: f64, kind: EventKind) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Event { time, kind, seq });
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.heap.pop()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[must_use]
    pub fn peek_time(&self) -> Option<f64> {
        self.heap.peek().map(|e| e.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_ascending_time_order() {
        let mut q = EventQueue::new();
        q.push(5.0, EventKind::DiskFail(DiskId(0)));
        q.push(1.0, EventKind::DiskFail(DiskId(1)));
        q.push(3.0, EventKind::DiskFail(DiskId(2)));

        assert_eq!(q.pop().unwrap().time, 1.0);
        assert_eq!(q.pop().unwrap().time, 3.0);
        assert_eq!(q.pop().unwrap().time, 5.0);
        assert!(q.pop().is_none());
    }

    #[test]
    fn ties_broken_by_insertion_order() {
        let mut q = EventQueue::new();
        q.push(1.0, EventKind::DiskFail(DiskId(0)));
        q.push(1.0, EventKind::DiskFail(DiskId(1)));
        q.push(1.0, EventKind::DiskFail(DiskId(2)));

        assert_eq!(q.pop().unwrap().kind, EventKind::DiskFail(DiskId(0)));
        assert_eq!(q.pop().unwrap().kind, EventKind::DiskFail(DiskId(1)));
        assert_eq!(q.pop().unwrap().kind, EventKind::DiskFail(DiskId(2)));
    }
}
