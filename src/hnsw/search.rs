use super::graph::{GraphError, HnswIndex, NodeId, VectorId, VectorProvider};
use crate::metric::{l2_squared_u8, Cosine, DotProduct, L2Squared, Metric, MetricKind};
use crate::storage::VectorStorage;
use crate::visited::VisitedList;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::marker::PhantomData;

const MAX_TRAVERSAL_MULT: usize = 10;

/// Result of a search query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// The ID of the matching vector.
    pub vector_id: VectorId,
    /// The distance from the query vector.
    pub distance: f32,
}

/// A candidate node for search, containing its distance to the query and its ID.
#[derive(Clone, Copy, Debug)]
pub struct Candidate {
    /// Distance to the query vector.
    pub distance: f32,
    /// The node ID.
    pub node_id: NodeId,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance && self.node_id == other.node_id
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance.total_cmp(&other.distance)
    }
}

/// Context for search operations to reuse allocations.
pub struct SearchContext {
    /// Generation-counter visited set, sized to the graph on demand.
    pub visited: VisitedList,
    /// Min-heap of candidates to explore (nearest first).
    pub candidates: BinaryHeap<Reverse<Candidate>>,
    /// Max-heap of current top-k results (furthest first).
    pub results: BinaryHeap<Candidate>,
    /// Scratch buffer for neighbor selection (avoiding re-allocations).
    pub scratch: Vec<Candidate>,
    /// Scratch buffer for neighbor IDs (avoiding re-allocations).
    pub neighbor_scratch: Vec<NodeId>,
    /// Scratch buffer for raw neighbor IDs (u32) during decoding.
    pub neighbor_id_scratch: Vec<u32>,
    /// Scratch buffer for encoding.
    pub encoding_scratch: Vec<u8>,
    /// Quantized query buffer.
    pub quantized_query: Vec<u8>,
}

impl SearchContext {
    /// Creates a new search context.
    #[must_use]
    pub fn new() -> Self {
        Self {
            visited: VisitedList::new(0),
            candidates: BinaryHeap::new(),
            results: BinaryHeap::new(),
            scratch: Vec::new(),
            neighbor_scratch: Vec::new(),
            neighbor_id_scratch: Vec::new(),
            encoding_scratch: Vec::new(),
            quantized_query: Vec::new(),
        }
    }

    /// Clears the context for reuse.
    pub fn clear(&mut self) {
        self.visited.reset();
        self.candidates.clear();
        self.results.clear();
        self.scratch.clear();
        self.neighbor_scratch.clear();
        self.neighbor_id_scratch.clear();
        self.encoding_scratch.clear();
        // Do NOT clear quantized_query here, as it is reused across layers for the same query.
    }
}

impl Default for SearchContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Structure to perform search on HNSW graph.
pub struct Searcher<'a, M, P: VectorProvider + ?Sized> {
    graph: &'a HnswIndex,
    provider: &'a P,
    _phantom: PhantomData<M>,
}

impl<'a, M, P: VectorProvider + ?Sized> Searcher<'a, M, P>
where
    M: Metric<f32>,
{
    /// Creates a new searcher.
    pub fn new(graph: &'a HnswIndex, provider: &'a P) -> Self {
        Self {
            graph,
            provider,
            _phantom: PhantomData,
        }
    }

    /// Performs a greedy search on a specific layer.
    ///
    /// `predicate`, if given, is consulted the same way tombstones are:
    /// a node failing it still routes traversal (so graph connectivity
    /// through filtered-out nodes is preserved) but is excluded from
    /// `ctx.results`.
    ///
    /// # Errors
    /// Returns `GraphError` if node IDs are invalid or neighbor data is corrupted.
    #[inline]
    #[allow(clippy::cast_precision_loss)]
    pub fn search_layer(
        &self,
        ctx: &mut SearchContext,
        entry_points: impl IntoIterator<Item = NodeId>,
        query: &[f32],
        ef: usize,
        level: u8,
        predicate: Option<&dyn Fn(NodeId) -> bool>,
    ) -> Result<(), GraphError> {
        ctx.clear();
        ctx.visited.ensure_capacity(self.graph.node_count());

        // Quantized distance currently only applies to the L2 metric.
        let use_quantized = if matches!(self.graph.config.metric_kind(), MetricKind::L2Squared) {
            if ctx.quantized_query.is_empty() {
                self.provider
                    .quantize_query(query, &mut ctx.quantized_query);
            }
            !ctx.quantized_query.is_empty()
        } else {
            false
        };

        // 1. Initialize
        for ep in entry_points {
            let node = self
                .graph
                .get_node(ep)
                .ok_or(GraphError::NodeIdOutOfBounds)?;
            if node.max_layer < level {
                continue;
            }

            let dist = if use_quantized {
                if let Some(q_vec) = self.provider.get_quantized_vector(node.vector_id) {
                    l2_squared_u8(&ctx.quantized_query, q_vec) as f32
                } else {
                    let vector = self.provider.get_vector(node.vector_id);
                    M::distance(query, &vector)
                }
            } else {
                let vector = self.provider.get_vector(node.vector_id);
                M::distance(query, &vector)
            };

            let candidate = Candidate {
                distance: dist,
                node_id: ep,
            };

            ctx.candidates.push(Reverse(candidate));
            // Deleted or filtered-out nodes still route traversal but are
            // excluded from results.
            if node.deleted == 0 && predicate.is_none_or(|p| p(ep)) {
                ctx.results.push(candidate);
            }
            ctx.visited.visit(ep.0 as usize);
        }

        // Prune initial
        while ctx.results.len() > ef {
            ctx.results.pop();
        }

        let traversal_limit = ef.saturating_mul(MAX_TRAVERSAL_MULT);
        let mut traversed_count = 0;

        // 2. Greedy Search
        while let Some(Reverse(candidate)) = ctx.candidates.pop() {
            traversed_count += 1;
            if traversed_count > traversal_limit {
                log::warn!(
                    "HNSW search traversal limit exceeded (ef={ef}, limit={traversal_limit}). Stopping early."
                );
                break;
            }

            if let Some(furthest) = ctx.results.peek() {
                if candidate.distance > furthest.distance && ctx.results.len() >= ef {
                    break;
                }
            }

            let node = self
                .graph
                .get_node(candidate.node_id)
                .ok_or(GraphError::NodeIdOutOfBounds)?;

            // Access neighbors via pub(crate) fields
            let start = node.neighbor_offset as usize;
            let end = start + node.neighbor_len as usize;

            if end > self.graph.neighbors.buffer.len() {
                return Err(GraphError::NeighborError);
            }

            let slice = &self.graph.neighbors.buffer[start..end];
            let neighbor_iter = crate::hnsw::neighbor::NeighborPool::iter_layer(slice, level);

            for neighbor_id_u32 in neighbor_iter {
                let neighbor_id = NodeId(neighbor_id_u32);
                if !ctx.visited.is_visited(neighbor_id.0 as usize) {
                    ctx.visited.visit(neighbor_id.0 as usize);

                    let neighbor_node = self
                        .graph
                        .get_node(neighbor_id)
                        .ok_or(GraphError::NodeIdOutOfBounds)?;

                    let dist = if use_quantized {
                        if let Some(q_vec) =
                            self.provider.get_quantized_vector(neighbor_node.vector_id)
                        {
                            l2_squared_u8(&ctx.quantized_query, q_vec) as f32
                        } else {
                            let vector_data = self.provider.get_vector(neighbor_node.vector_id);
                            M::distance(query, &vector_data)
                        }
                    } else {
                        let vector_data = self.provider.get_vector(neighbor_node.vector_id);
                        M::distance(query, &vector_data)
                    };

                    let mut should_add = false;
                    if ctx.results.len() < ef {
                        should_add = true;
                    } else if let Some(furthest) = ctx.results.peek() {
                        if dist < furthest.distance {
                            should_add = true;
                        }
                    }

                    if should_add {
                        let new_candidate = Candidate {
                            distance: dist,
                            node_id: neighbor_id,
                        };
                        // Deleted or filtered-out nodes are still queued for
                        // routing ("ghosts").
                        ctx.candidates.push(Reverse(new_candidate));

                        if neighbor_node.deleted == 0 && predicate.is_none_or(|p| p(neighbor_id)) {
                            ctx.results.push(new_candidate);

                            if ctx.results.len() > ef {
                                ctx.results.pop();
                            }
                        }
                    }
                }
            }
        }

        // Return sorted results while preserving ctx capacity
        while let Some(c) = ctx.results.pop() {
            ctx.scratch.push(c);
        }
        // MaxHeap returns largest first, so reverse to get ascending order
        ctx.scratch.reverse();

        Ok(())
    }
}

/// Extension trait providing `Option::is_none_or` without relying on the
/// standard library version (stabilized after this crate's MSRV).
trait IsNoneOr<T> {
    fn is_none_or(self, f: impl FnOnce(T) -> bool) -> bool;
}

impl<T> IsNoneOr<T> for Option<T> {
    fn is_none_or(self, f: impl FnOnce(T) -> bool) -> bool {
        match self {
            Some(v) => f(v),
            None => true,
        }
    }
}

impl HnswIndex {
    /// Searches the index for the K nearest neighbors.
    ///
    /// Returns at most `k` results, or fewer if the index has fewer than `k`
    /// live (non-deleted) vectors reachable from the entry point.
    ///
    /// # Tombstone handling
    ///
    /// Deleted nodes are still traversed during graph navigation (preserving
    /// connectivity) but are excluded from the returned results; the search
    /// internally over-fetches via [`HnswIndex::adjusted_k`] to compensate.
    /// At high tombstone ratios, call [`HnswIndex::compact`] to rebuild.
    ///
    /// # Errors
    ///
    /// Returns `GraphError` if the query dimension doesn't match the index,
    /// or if the graph is otherwise inconsistent.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        storage: &VectorStorage,
    ) -> Result<Vec<SearchResult>, GraphError> {
        let mut pooled = self.visited_pool.acquire(self.node_count());
        let mut search_ctx = SearchContext::new();
        search_ctx.visited = std::mem::replace(&mut *pooled, VisitedList::new(0));
        let result = self.search_with_context(query, k, storage, &mut search_ctx);
        *pooled = std::mem::replace(&mut search_ctx.visited, VisitedList::new(0));
        result
    }

    /// Searches the index for the K nearest neighbors with a reusable context.
    ///
    /// Reusing `SearchContext` across searches avoids repeated allocation of
    /// hash sets and heaps, which matters for high-throughput callers.
    ///
    /// # Errors
    ///
    /// Returns `GraphError` if the query dimension doesn't match the index,
    /// or if the graph is otherwise inconsistent.
    pub fn search_with_context(
        &self,
        query: &[f32],
        k: usize,
        storage: &VectorStorage,
        ctx: &mut SearchContext,
    ) -> Result<Vec<SearchResult>, GraphError> {
        self.search_with_context_filtered(query, k, self.config.ef_search as usize, storage, ctx, None)
    }

    /// Searches with an explicit `ef_search` and an optional predicate over
    /// node ids, without mutating `self.config`. A node failing `predicate`
    /// is still traversed (for graph connectivity) but excluded from
    /// results, the same way a tombstoned node is.
    ///
    /// This is the entry point the facade layer uses so that per-call
    /// `ef_search` and filtering never require `&mut self`.
    ///
    /// # Errors
    ///
    /// Returns `GraphError` if the query dimension doesn't match the index,
    /// or if the graph is otherwise inconsistent.
    pub fn search_with_context_filtered(
        &self,
        query: &[f32],
        k: usize,
        ef_search: usize,
        storage: &VectorStorage,
        ctx: &mut SearchContext,
        predicate: Option<&dyn Fn(NodeId) -> bool>,
    ) -> Result<Vec<SearchResult>, GraphError> {
        if query.len() != self.config.dimensions as usize {
            return Err(GraphError::DimensionMismatch {
                expected: self.config.dimensions as usize,
                actual: query.len(),
            });
        }

        match self.config.metric_kind() {
            MetricKind::L2Squared => {
                self.search_impl_with_ef::<L2Squared>(query, k, ef_search, storage, ctx, predicate)
            }
            MetricKind::DotProduct => {
                self.search_impl_with_ef::<DotProduct>(query, k, ef_search, storage, ctx, predicate)
            }
            MetricKind::Cosine => {
                self.search_impl_with_ef::<Cosine>(query, k, ef_search, storage, ctx, predicate)
            }
        }
    }

    fn search_impl_with_ef<M: Metric<f32>>(
        &self,
        query: &[f32],
        k: usize,
        ef_search: usize,
        storage: &VectorStorage,
        search_ctx: &mut SearchContext,
        predicate: Option<&dyn Fn(NodeId) -> bool>,
    ) -> Result<Vec<SearchResult>, GraphError> {
        let Some(entry_point) = self.entry_point() else {
            return Ok(Vec::new());
        };

        let mut curr_ep = entry_point;
        let max_layer = self.max_layer();

        // 1. Zoom down from max_layer to 1. The entry point search never
        // filters: it is only choosing a good jumping-off node for layer 0.
        for lc in (1..=max_layer).rev() {
            let searcher = Searcher::<M, VectorStorage>::new(self, storage);
            searcher.search_layer(search_ctx, [curr_ep], query, 1, lc, None)?;
            if let Some(best) = search_ctx.scratch.first() {
                curr_ep = best.node_id;
            }
        }

        // 2. Search layer 0 with ef_search, widened to compensate for tombstones
        let adjusted_k = self.adjusted_k(k);
        let ef = adjusted_k.max(ef_search);
        let searcher = Searcher::<M, VectorStorage>::new(self, storage);
        searcher.search_layer(search_ctx, [curr_ep], query, ef, 0, predicate)?;

        // 3. Extract top K, filtering out deleted/filtered vectors.
        // search_layer already filters during candidate collection; this is
        // a second, cheap pass so the result is still correct if that
        // filtering logic changes.
        let mut results = Vec::with_capacity(k);
        for c in &search_ctx.scratch {
            if results.len() >= k {
                break;
            }
            let node = self
                .get_node(c.node_id)
                .ok_or(GraphError::NodeIdOutOfBounds)?;
            if node.deleted == 0 && predicate.is_none_or(|p| p(c.node_id)) {
                results.push(SearchResult {
                    vector_id: node.vector_id,
                    distance: c.distance,
                });
            }
        }

        Ok(results)
    }
}
