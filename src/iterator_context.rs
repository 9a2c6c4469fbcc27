//! Resumable search state for paginated k-NN, so a caller can fetch results
//! in pages without losing the graph traversal state between calls.
//!
//! Invariant this is built to uphold: if the same [`IteratorContext`] is
//! passed to successive `knn_search` calls with monotonically increasing
//! `k`, the concatenated results form a prefix of the ordering a single
//! large k-NN call with the max `k` would have produced (subject to the
//! inherent approximation of the graph).

use crate::hnsw::{Candidate, NodeId};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

/// Per-session pagination state for one logical k-NN request.
pub struct IteratorContext {
    /// Min-heap of unexplored candidates (nearest first).
    pub(crate) candidates: BinaryHeap<Reverse<Candidate>>,
    /// Max-heap of the current best results seen so far (furthest first).
    pub(crate) results: BinaryHeap<Candidate>,
    /// Nodes already expanded or enqueued, across every page so far.
    pub(crate) visited: HashSet<NodeId>,
    /// Ids already returned to the caller on a previous page; excluded from
    /// future pages even if revisited during traversal.
    pub(crate) discarded: HashSet<NodeId>,
    /// Number of expansion steps taken across all pages.
    pub(crate) depth: usize,
    /// Set once the caller indicates this is the final page: instructs the
    /// search to stop as soon as the result heap stops improving, rather
    /// than exhausting the full `ef` candidate budget.
    pub last_filter: bool,
}

impl IteratorContext {
    /// Creates an empty iterator context for a new paginated search.
    #[must_use]
    pub fn new() -> Self {
        Self {
            candidates: BinaryHeap::new(),
            results: BinaryHeap::new(),
            visited: HashSet::new(),
            discarded: HashSet::new(),
            depth: 0,
            last_filter: false,
        }
    }

    /// True if `node` has already been expanded or enqueued in a previous
    /// or the current page.
    #[must_use]
    pub fn is_visited(&self, node: NodeId) -> bool {
        self.visited.contains(&node)
    }

    /// Records `node` as visited for the remainder of this iterator's
    /// lifetime.
    pub fn mark_visited(&mut self, node: NodeId) {
        self.visited.insert(node);
    }

    /// Pulls up to `page_size` results not yet returned on a prior page,
    /// nearest-first, and marks them discarded so they aren't repeated.
    pub fn take_page(&mut self, page_size: usize) -> Vec<Candidate> {
        let mut out = Vec::with_capacity(page_size);
        let mut sorted: Vec<Candidate> = self.results.drain().collect();
        sorted.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        let mut carry_over = Vec::new();
        for candidate in sorted {
            if out.len() >= page_size {
                carry_over.push(candidate);
                continue;
            }
            if self.discarded.contains(&candidate.node_id) {
                continue;
            }
            self.discarded.insert(candidate.node_id);
            out.push(candidate);
        }
        self.results.extend(carry_over);
        self.depth += 1;
        out
    }
}

impl Default for IteratorContext {
    fn default() -> Self {
        Self::new()
    }
}
