//! Search candidates and the two priority queues used by layer search.
//!
//! Both queues order by distance first and by discovery order second, so
//! equal distances always resolve to the candidate found first.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

/// A document together with its distance to the current query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HnswCandidate {
    pub docid: u32,
    pub distance: f64,
}

impl HnswCandidate {
    #[inline]
    pub fn new(docid: u32, distance: f64) -> Self {
        Self { docid, distance }
    }
}

/// One k-NN query result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub docid: u32,
    pub distance: f64,
}

impl From<HnswCandidate> for Neighbor {
    fn from(candidate: HnswCandidate) -> Self {
        Self {
            docid: candidate.docid,
            distance: candidate.distance,
        }
    }
}

#[derive(Clone, Copy)]
struct Ranked {
    candidate: HnswCandidate,
    seq: u64,
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.candidate
            .distance
            .total_cmp(&other.candidate.distance)
            .then(self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Bounded result set: the top is the furthest retained candidate.
#[derive(Default, Clone)]
pub(crate) struct FurthestPriQ {
    heap: BinaryHeap<Ranked>,
    next_seq: u64,
}

impl FurthestPriQ {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, candidate: HnswCandidate) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Ranked { candidate, seq });
    }

    #[inline]
    pub(crate) fn top(&self) -> Option<&HnswCandidate> {
        self.heap.peek().map(|r| &r.candidate)
    }

    pub(crate) fn pop(&mut self) -> Option<HnswCandidate> {
        self.heap.pop().map(|r| r.candidate)
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    /// Candidates nearest first, ties in discovery order. Leaves the queue empty.
    pub(crate) fn drain_sorted(&mut self) -> Vec<HnswCandidate> {
        let heap = std::mem::take(&mut self.heap);
        heap.into_sorted_vec()
            .into_iter()
            .map(|r| r.candidate)
            .collect()
    }
}

/// Frontier of candidates still to expand: the top is the nearest.
#[derive(Default)]
pub(crate) struct NearestPriQ {
    heap: BinaryHeap<Reverse<Ranked>>,
    next_seq: u64,
}

impl NearestPriQ {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, candidate: HnswCandidate) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Ranked { candidate, seq }));
    }

    #[inline]
    pub(crate) fn top(&self) -> Option<&HnswCandidate> {
        self.heap.peek().map(|r| &r.0.candidate)
    }

    pub(crate) fn pop(&mut self) -> Option<HnswCandidate> {
        self.heap.pop().map(|r| r.0.candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_furthest_top_is_worst() {
        let mut q = FurthestPriQ::new();
        q.push(HnswCandidate::new(1, 0.5));
        q.push(HnswCandidate::new(2, 3.0));
        q.push(HnswCandidate::new(3, 1.0));
        assert_eq!(q.top().map(|c| c.docid), Some(2));
        assert_eq!(q.pop().map(|c| c.docid), Some(2));
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn test_nearest_top_is_best() {
        let mut q = NearestPriQ::new();
        q.push(HnswCandidate::new(1, 0.5));
        q.push(HnswCandidate::new(2, 0.1));
        assert_eq!(q.pop().map(|c| c.docid), Some(2));
        assert_eq!(q.pop().map(|c| c.docid), Some(1));
        assert!(q.pop().is_none());
    }

    #[test]
    fn test_ties_resolve_by_discovery_order() {
        let mut q = FurthestPriQ::new();
        q.push(HnswCandidate::new(9, 1.0));
        q.push(HnswCandidate::new(4, 1.0));
        q.push(HnswCandidate::new(7, 1.0));
        let sorted: Vec<u32> = q.clone().drain_sorted().iter().map(|c| c.docid).collect();
        assert_eq!(sorted, vec![9, 4, 7]);
        // Evicting from a full set drops the most recently discovered tie.
        assert_eq!(q.pop().map(|c| c.docid), Some(7));

        let mut frontier = NearestPriQ::new();
        frontier.push(HnswCandidate::new(5, 2.0));
        frontier.push(HnswCandidate::new(3, 2.0));
        assert_eq!(frontier.pop().map(|c| c.docid), Some(5));
    }
}
