//! Uniform library contract shared by both index kinds: build/add/remove,
//! k-NN and range search, serialization, and stats, all keyed by
//! caller-supplied external labels rather than internal ids.

use crate::error::Error;
use crate::filter::{estimate_selectivity, select_strategy, FilterStrategy, EF_CAP};
use crate::hnsw::{HnswConfig, HnswIndex, NodeId, SearchContext};
use crate::iterator_context::IteratorContext;
use crate::label::{LabelTable, NOT_FOUND};
use crate::metric::{Cosine, DotProduct, L2Squared, Metric, MetricKind};
use crate::persistence::{read_snapshot, write_snapshot};
use crate::sindi::{search as sindi_search_fn, SindiConfig, SindiIndex, SindiSearchParams};
use crate::sparse::SparseVector;
use crate::stats::{IndexStats, QueryTimers};
use crate::storage::VectorStorage;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Caller-visible external identifier. Opaque to the index; unique among
/// live entries unless duplicate-label compression is in play.
pub type Label = i64;

/// Which vector representation a [`BuildParams`] configures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dtype {
    /// Fixed-dimension dense `f32` vectors, served by HGraph.
    Float32,
    /// Variable-length weighted term vectors, served by SINDI.
    Sparse,
}

/// Distance metric selector at the facade boundary, mapped onto
/// [`MetricKind`] for HGraph and SINDI's own `1 - inner_product` convention.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricType {
    /// Squared Euclidean distance.
    L2,
    /// Raw inner product (larger is closer at the algorithm level; the
    /// facade still reports smaller-is-closer scores).
    Ip,
    /// Cosine distance.
    Cosine,
}

impl From<MetricType> for MetricKind {
    fn from(metric: MetricType) -> Self {
        match metric {
            MetricType::L2 => MetricKind::L2Squared,
            MetricType::Ip => MetricKind::DotProduct,
            MetricType::Cosine => MetricKind::Cosine,
        }
    }
}

/// Build-time configuration, covering both index kinds; only the fields
/// relevant to the selected [`Dtype`] are consulted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildParams {
    /// Which index kind this configures.
    pub dtype: Dtype,
    /// Dense dimension. Informational only for `Dtype::Sparse`.
    pub dim: u32,
    /// Distance metric.
    pub metric_type: MetricType,
    /// HGraph: target out-degree above layer 0.
    pub hnsw_max_degree: u32,
    /// HGraph: candidate breadth during insertion.
    pub hnsw_ef_construction: u32,
    /// SINDI: enable two-stage reorder search.
    pub sindi_use_reorder: bool,
    /// SINDI: maximum allowed term id (exclusive upper bound).
    pub sindi_term_id_limit: u32,
    /// SINDI: fraction of each document's weight mass retained after
    /// pruning.
    pub sindi_doc_prune_ratio: f32,
    /// SINDI: enable 8-bit posting-weight quantization.
    pub sindi_use_quantization: bool,
    /// SINDI: accumulator-to-reorder candidate pool size.
    pub sindi_n_candidate: usize,
}

impl BuildParams {
    /// Dense-vector defaults for dimension `dim` under L2 distance.
    #[must_use]
    pub fn dense(dim: u32) -> Self {
        Self {
            dtype: Dtype::Float32,
            dim,
            metric_type: MetricType::L2,
            hnsw_max_degree: 12,
            hnsw_ef_construction: 100,
            sindi_use_reorder: false,
            sindi_term_id_limit: 0,
            sindi_doc_prune_ratio: 1.0,
            sindi_use_quantization: false,
            sindi_n_candidate: 1000,
        }
    }

    /// Sparse-vector defaults for a vocabulary of `term_id_limit` terms.
    #[must_use]
    pub fn sparse(term_id_limit: u32) -> Self {
        Self {
            dtype: Dtype::Sparse,
            dim: 0,
            metric_type: MetricType::Ip,
            hnsw_max_degree: 12,
            hnsw_ef_construction: 100,
            sindi_use_reorder: true,
            sindi_term_id_limit: term_id_limit,
            sindi_doc_prune_ratio: 0.95,
            sindi_use_quantization: true,
            sindi_n_candidate: 1000,
        }
    }

    /// Validates every field's accepted range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] naming the first violated field.
    pub fn validate(&self) -> Result<(), Error> {
        match self.dtype {
            Dtype::Float32 => {
                if self.dim == 0 {
                    return Err(Error::InvalidArgument("dim must be nonzero".into()));
                }
                if !(5..=64).contains(&self.hnsw_max_degree) {
                    return Err(Error::InvalidArgument(
                        "hnsw_max_degree must be in 5..=64".into(),
                    ));
                }
                if self.hnsw_ef_construction < self.hnsw_max_degree
                    || self.hnsw_ef_construction > 1000
                {
                    return Err(Error::InvalidArgument(
                        "hnsw_ef_construction must be >= max_degree and <= 1000".into(),
                    ));
                }
            }
            Dtype::Sparse => {
                if self.sindi_term_id_limit == 0 {
                    return Err(Error::InvalidArgument(
                        "sindi_term_id_limit must be nonzero".into(),
                    ));
                }
                if !(0.0..=1.0).contains(&self.sindi_doc_prune_ratio) {
                    return Err(Error::InvalidArgument(
                        "sindi_doc_prune_ratio must be in 0.0..=1.0".into(),
                    ));
                }
                if self.sindi_n_candidate == 0 {
                    return Err(Error::InvalidArgument(
                        "sindi_n_candidate must be nonzero".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Search-time configuration, covering both index kinds.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchParams {
    /// HGraph: candidate breadth during search (1..=1000).
    pub hnsw_ef_search: u32,
    /// SINDI: fraction of query terms retained (top by weight).
    pub sindi_query_prune_ratio: f32,
    /// SINDI: fraction of each consulted posting list retained.
    pub sindi_term_prune_ratio: f32,
    /// SINDI: reorder-set size, used only when the index was built with
    /// `sindi_use_reorder`.
    pub sindi_n_candidate: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            hnsw_ef_search: 50,
            sindi_query_prune_ratio: 1.0,
            sindi_term_prune_ratio: 1.0,
            sindi_n_candidate: 1000,
        }
    }
}

impl SearchParams {
    /// Validates every field's accepted range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] naming the first violated field.
    pub fn validate(&self) -> Result<(), Error> {
        if !(1..=1000).contains(&self.hnsw_ef_search) {
            return Err(Error::InvalidArgument(
                "hnsw_ef_search must be in 1..=1000".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.sindi_query_prune_ratio) {
            return Err(Error::InvalidArgument(
                "sindi_query_prune_ratio must be in 0.0..=1.0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.sindi_term_prune_ratio) {
            return Err(Error::InvalidArgument(
                "sindi_term_prune_ratio must be in 0.0..=1.0".into(),
            ));
        }
        Ok(())
    }
}

/// A single labeled match returned from search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    /// The caller's external label.
    pub label: Label,
    /// Distance/score, smaller is closer.
    pub distance: f32,
}

/// Metadata predicate applied alongside vector/term search.
///
/// A node failing the filter is still traversed for graph connectivity
/// (HGraph routes through it like a tombstone) but never returned in
/// results.
pub enum Filter<'a> {
    /// Only these labels are eligible. Small enumerated allow-lists are
    /// scored directly against `query` rather than paying for a graph
    /// traversal; see [`HgraphIndex::knn_search`].
    AllowList(&'a [Label]),
    /// Arbitrary predicate over labels.
    Predicate(&'a dyn Fn(Label) -> bool),
}

impl Filter<'_> {
    /// True if `label` passes this filter.
    #[must_use]
    pub fn matches(&self, label: Label) -> bool {
        match self {
            Filter::AllowList(labels) => labels.contains(&label),
            Filter::Predicate(f) => f(label),
        }
    }
}

/// Common contract implemented by both HGraph and SINDI facades.
pub trait Index {
    /// The per-record vector type this index accepts.
    type Vector;

    /// Bulk-inserts `records`, returning the labels that failed (the rest
    /// of the batch still commits).
    ///
    /// # Errors
    ///
    /// Returns [`Error::BuildTwice`] if the index already has data, or
    /// [`Error::DimensionMismatch`] on the first record's shape mismatch.
    fn build(&mut self, records: Vec<(Label, Self::Vector)>) -> Result<Vec<Label>, Error>;

    /// Inserts additional records into an already-built index. Same
    /// partial-success contract as [`Index::build`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] on the first record's shape
    /// mismatch.
    fn add(&mut self, records: Vec<(Label, Self::Vector)>) -> Result<Vec<Label>, Error>;

    /// Tombstones the entry for `label`. Returns `false` if it wasn't live.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying subsystem rejects the removal.
    fn remove(&mut self, label: Label) -> Result<bool, Error>;

    /// Retargets `old`'s entry to `new`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `old` doesn't exist or `new`
    /// is already in use.
    fn update_label(&mut self, old: Label, new: Label) -> Result<(), Error>;

    /// Finds the `k` nearest neighbors of `query`.
    ///
    /// `filter`, if given, restricts results to labels it matches; a node
    /// failing it is excluded from results but (for HGraph) still routes
    /// traversal. `iterator`, if given, turns this into one page of a
    /// resumable paginated search: the first call on a fresh
    /// [`IteratorContext`] primes it with a full traversal, and subsequent
    /// calls just drain the next page, so repeated calls with the same
    /// context and increasing `k` return a consistent, non-overlapping
    /// sequence of pages.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `query`'s shape doesn't
    /// match the index, [`Error::InvalidArgument`] if `params` fails
    /// validation, or if `iterator` is passed to an index kind that
    /// doesn't support pagination.
    fn knn_search(
        &mut self,
        query: &Self::Vector,
        k: usize,
        params: &SearchParams,
        filter: Option<&Filter>,
        iterator: Option<&mut IteratorContext>,
    ) -> Result<Vec<Hit>, Error>;

    /// Finds every live entry within `radius` of `query`, nearest first,
    /// truncated to `limit` if given.
    ///
    /// Implemented on top of [`Index::knn_search`]: HGraph and SINDI search
    /// internally rank by distance rather than cut off at a radius, so
    /// this requests a full-width k-NN pass and filters the tail.
    ///
    /// # Errors
    ///
    /// Same as [`Index::knn_search`].
    fn range_search(
        &mut self,
        query: &Self::Vector,
        radius: f32,
        params: &SearchParams,
        limit: Option<usize>,
        filter: Option<&Filter>,
    ) -> Result<Vec<Hit>, Error> {
        let k = limit.unwrap_or(self.num_elements() as usize).max(1);
        let hits = self.knn_search(query, k, params, filter, None)?;
        let mut hits: Vec<Hit> = hits.into_iter().filter(|h| h.distance <= radius).collect();
        if let Some(limit) = limit {
            hits.truncate(limit);
        }
        Ok(hits)
    }

    /// Serializes the index to a byte blob readable by [`Index::deserialize`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexEmpty`] if the index has no data, or a
    /// persistence error if encoding fails.
    fn serialize(&self) -> Result<Vec<u8>, Error>;

    /// Replaces this index's contents with a blob written by
    /// [`Index::serialize`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexNotEmpty`] if this index already has data, or
    /// a persistence error if the blob is corrupt.
    fn deserialize(&mut self, blob: &[u8]) -> Result<(), Error>;

    /// Number of live elements.
    fn num_elements(&self) -> u64;

    /// Approximate resident memory, in bytes.
    fn memory_usage(&self) -> u64;

    /// Renders `stats()` (§6.4) as a JSON string.
    fn stats(&self) -> String;
}

/// HGraph behind the uniform [`Index`] contract.
pub struct HgraphIndex {
    config: HnswConfig,
    index: Option<HnswIndex>,
    storage: VectorStorage,
    labels: LabelTable,
    timers: QueryTimers,
}

impl HgraphIndex {
    /// Creates an empty dense index from validated build parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `params` fails validation or
    /// isn't `Dtype::Float32`.
    pub fn new(params: &BuildParams) -> Result<Self, Error> {
        params.validate()?;
        if params.dtype != Dtype::Float32 {
            return Err(Error::InvalidArgument("expected Dtype::Float32".into()));
        }
        let config = HnswConfig {
            m: params.hnsw_max_degree,
            m0: params.hnsw_max_degree * 2,
            ef_construction: params.hnsw_ef_construction,
            ef_search: 50,
            dimensions: params.dim,
            ..HnswConfig::new(params.dim).with_metric(params.metric_type.into())
        };
        let storage = VectorStorage::new(&config);
        Ok(Self {
            config,
            index: None,
            storage,
            labels: LabelTable::new(),
            timers: QueryTimers::new(),
        })
    }

    fn insert_one(&mut self, label: Label, vector: Vec<f32>) -> Result<(), Error> {
        if self.index.is_none() {
            self.index = Some(HnswIndex::new(self.config.clone(), &self.storage)?);
        }
        let index = self.index.as_mut().expect("just initialized");
        let vector_id = index.insert(&vector, &mut self.storage)?;
        let node_id = NodeId((vector_id.0 - 1) as u32);
        self.labels.insert(node_id.0, label as u64);
        Ok(())
    }

    /// Scores `query` directly against each label in `labels`, skipping
    /// graph traversal entirely.
    ///
    /// Worthwhile only for small enumerated allow-lists: cost is linear in
    /// `labels.len()` rather than logarithmic in the index size, but it
    /// avoids widening `ef_search` to compensate for a restrictive filter.
    fn knn_search_allow_list(
        &self,
        query: &[f32],
        k: usize,
        labels: &[Label],
    ) -> Result<Vec<Hit>, Error> {
        if query.len() != self.config.dimensions as usize {
            return Err(Error::DimensionMismatch {
                expected: self.config.dimensions as usize,
                actual: query.len(),
            });
        }
        let index = self.index.as_ref().ok_or(Error::IndexEmpty)?;
        let metric = self.config.metric_kind();

        let mut scored: Vec<Hit> = Vec::with_capacity(labels.len());
        for &label in labels {
            let id = self.labels.get_id_by_label(label as u64, false);
            if id == NOT_FOUND {
                continue;
            }
            let Some(node) = index.get_node(NodeId(id)) else {
                continue;
            };
            if node.deleted != 0 {
                continue;
            }
            let vector = self.storage.get_vector(node.vector_id);
            let distance = match metric {
                MetricKind::L2Squared => L2Squared::distance(query, &vector),
                MetricKind::DotProduct => DotProduct::distance(query, &vector),
                MetricKind::Cosine => Cosine::distance(query, &vector),
            };
            scored.push(Hit { label, distance });
        }
        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored.truncate(k);
        Ok(scored)
    }
}

impl Index for HgraphIndex {
    type Vector = Vec<f32>;

    fn build(&mut self, records: Vec<(Label, Self::Vector)>) -> Result<Vec<Label>, Error> {
        if self.index.is_some() {
            return Err(Error::BuildTwice);
        }
        self.add(records)
    }

    fn add(&mut self, records: Vec<(Label, Self::Vector)>) -> Result<Vec<Label>, Error> {
        let mut failed = Vec::new();
        for (label, vector) in records {
            if vector.len() != self.config.dimensions as usize {
                if self.index.is_none() && failed.is_empty() {
                    return Err(Error::DimensionMismatch {
                        expected: self.config.dimensions as usize,
                        actual: vector.len(),
                    });
                }
                failed.push(label);
                continue;
            }
            if self.insert_one(label, vector).is_err() {
                failed.push(label);
            }
        }
        Ok(failed)
    }

    fn remove(&mut self, label: Label) -> Result<bool, Error> {
        let id = self.labels.get_id_by_label(label as u64, false);
        if id == NOT_FOUND {
            return Ok(false);
        }
        let vector_id = {
            let index = self.index.as_ref().ok_or(Error::IndexEmpty)?;
            index.get_node(NodeId(id)).ok_or(Error::IndexEmpty)?.vector_id
        };
        self.labels.mark_remove(&[label as u64]);
        let index = self.index.as_mut().ok_or(Error::IndexEmpty)?;
        Ok(index.delete(vector_id, &mut self.storage))
    }

    fn update_label(&mut self, old: Label, new: Label) -> Result<(), Error> {
        let id = self.labels.get_id_by_label(old as u64, false);
        if id == NOT_FOUND {
            return Err(Error::InvalidArgument(format!("label {old} not found")));
        }
        self.labels
            .update_label(id, new as u64)
            .map_err(|e| Error::InvalidArgument(e.to_string()))
    }

    fn knn_search(
        &mut self,
        query: &Self::Vector,
        k: usize,
        params: &SearchParams,
        filter: Option<&Filter>,
        iterator: Option<&mut IteratorContext>,
    ) -> Result<Vec<Hit>, Error> {
        params.validate()?;
        let started = Instant::now();

        if let Some(Filter::AllowList(labels)) = filter {
            let hits = self.knn_search_allow_list(query, k, labels)?;
            self.timers.knn.record(started.elapsed());
            return Ok(hits);
        }

        let labels_table = &self.labels;
        let predicate_fn = filter.map(|f| {
            move |node_id: NodeId| {
                labels_table
                    .label_of(node_id.0)
                    .is_some_and(|label| f.matches(label as Label))
            }
        });
        let predicate: Option<&dyn Fn(NodeId) -> bool> =
            predicate_fn.as_ref().map(|f| f as &dyn Fn(NodeId) -> bool);

        let index = self.index.as_ref().ok_or(Error::IndexEmpty)?;

        let ef_search = if let Some(pred) = predicate {
            let total = index.node_count();
            let estimate = estimate_selectivity(total, |i| pred(NodeId(i as u32)), None);
            let oversample = match select_strategy(estimate.selectivity) {
                FilterStrategy::PostFilter { oversample } => oversample,
                FilterStrategy::Hybrid { oversample_max, .. } => oversample_max,
                FilterStrategy::PreFilter | FilterStrategy::Auto => 1.0,
            };
            (((params.hnsw_ef_search as f32) * oversample).ceil() as usize).min(EF_CAP)
        } else {
            params.hnsw_ef_search as usize
        };

        let hits = match iterator {
            Some(it) => {
                if it.depth == 0 && it.results.is_empty() && it.candidates.is_empty() {
                    let mut ctx = SearchContext::new();
                    let wide_ef = ef_search.max(k).saturating_mul(4).min(EF_CAP);
                    index.search_with_context_filtered(
                        query,
                        wide_ef,
                        wide_ef,
                        &self.storage,
                        &mut ctx,
                        predicate,
                    )?;
                    it.candidates = ctx.candidates;
                    it.results = ctx.results;
                }
                it.take_page(k)
                    .into_iter()
                    .filter_map(|c| {
                        self.labels.label_of(c.node_id.0).map(|label| Hit {
                            label: label as i64,
                            distance: c.distance,
                        })
                    })
                    .collect()
            }
            None => {
                let mut ctx = SearchContext::new();
                let results = index.search_with_context_filtered(
                    query,
                    k,
                    ef_search,
                    &self.storage,
                    &mut ctx,
                    predicate,
                )?;
                results
                    .into_iter()
                    .filter_map(|r| {
                        let node_id = NodeId((r.vector_id.0 - 1) as u32);
                        self.labels.label_of(node_id.0).map(|label| Hit {
                            label: label as i64,
                            distance: r.distance,
                        })
                    })
                    .collect()
            }
        };

        self.timers.knn.record(started.elapsed());
        Ok(hits)
    }

    fn serialize(&self) -> Result<Vec<u8>, Error> {
        let index = self.index.as_ref().ok_or(Error::IndexEmpty)?;
        Ok(write_snapshot(index, &self.storage)?)
    }

    fn deserialize(&mut self, blob: &[u8]) -> Result<(), Error> {
        if self.index.is_some() {
            return Err(Error::IndexNotEmpty);
        }
        let (index, storage) = read_snapshot(blob)?;
        self.config = index.config.clone();
        self.storage = storage;
        self.index = Some(index);
        Ok(())
    }

    fn num_elements(&self) -> u64 {
        self.index
            .as_ref()
            .map_or(0, |i| (i.node_count() as u64).saturating_sub(u64::from(i.deleted_count)))
    }

    fn memory_usage(&self) -> u64 {
        self.index.as_ref().map_or(0, |i| i.memory_usage() as u64)
    }

    fn stats(&self) -> String {
        IndexStats {
            index_name: "hgraph",
            data_num: self.num_elements(),
            memory: self.memory_usage(),
            avg_knn_search_us: self.timers.knn.average().as_micros() as u64,
            avg_range_search_us: self.timers.range.average().as_micros() as u64,
        }
        .to_json()
    }
}

/// SINDI behind the uniform [`Index`] contract.
pub struct SindiFacade {
    index: SindiIndex,
    labels: LabelTable,
    timers: QueryTimers,
}

impl SindiFacade {
    /// Creates an empty sparse index from validated build parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `params` fails validation or
    /// isn't `Dtype::Sparse`.
    pub fn new(params: &BuildParams) -> Result<Self, Error> {
        params.validate()?;
        if params.dtype != Dtype::Sparse {
            return Err(Error::InvalidArgument("expected Dtype::Sparse".into()));
        }
        let config = SindiConfig::new(params.sindi_term_id_limit)
            .with_doc_retain_ratio(params.sindi_doc_prune_ratio)
            .with_quantization(params.sindi_use_quantization)
            .with_n_candidate(params.sindi_n_candidate);
        Ok(Self {
            index: SindiIndex::new(config)?,
            labels: LabelTable::new(),
            timers: QueryTimers::new(),
        })
    }
}

impl Index for SindiFacade {
    type Vector = SparseVector;

    fn build(&mut self, records: Vec<(Label, Self::Vector)>) -> Result<Vec<Label>, Error> {
        if self.index.num_documents() > 0 {
            return Err(Error::BuildTwice);
        }
        self.add(records)
    }

    fn add(&mut self, records: Vec<(Label, Self::Vector)>) -> Result<Vec<Label>, Error> {
        let mut failed = Vec::new();
        for (label, doc) in records {
            match self.index.add(&doc) {
                Ok(doc_id) => self.labels.insert(doc_id, label as u64),
                Err(_) => failed.push(label),
            }
        }
        if self.index.config.quantize {
            self.index.build_quantization();
        }
        Ok(failed)
    }

    fn remove(&mut self, label: Label) -> Result<bool, Error> {
        let id = self.labels.get_id_by_label(label as u64, false);
        if id == NOT_FOUND {
            return Ok(false);
        }
        self.labels.mark_remove(&[label as u64]);
        Ok(self.index.remove(id)?)
    }

    fn update_label(&mut self, old: Label, new: Label) -> Result<(), Error> {
        let id = self.labels.get_id_by_label(old as u64, false);
        if id == NOT_FOUND {
            return Err(Error::InvalidArgument(format!("label {old} not found")));
        }
        self.labels
            .update_label(id, new as u64)
            .map_err(|e| Error::InvalidArgument(e.to_string()))
    }

    fn knn_search(
        &mut self,
        query: &Self::Vector,
        k: usize,
        params: &SearchParams,
        filter: Option<&Filter>,
        iterator: Option<&mut IteratorContext>,
    ) -> Result<Vec<Hit>, Error> {
        if iterator.is_some() {
            return Err(Error::InvalidArgument(
                "sindi does not support paginated iterator search".into(),
            ));
        }
        params.validate()?;
        let started = Instant::now();
        let sindi_params = SindiSearchParams {
            query_prune_ratio: params.sindi_query_prune_ratio,
            term_prune_ratio: params.sindi_term_prune_ratio,
            n_candidate: params.sindi_n_candidate,
        };
        // Oversample enough to absorb post-hoc filtering; sindi has no
        // graph traversal to widen like hgraph's ef_search.
        let fetch_k = if filter.is_some() {
            (k * 10).max(k)
        } else {
            k
        };
        let results = sindi_search_fn(&self.index, query, fetch_k, &sindi_params);
        self.timers.knn.record(started.elapsed());

        let mut hits: Vec<Hit> = results
            .into_iter()
            .filter_map(|r| {
                self.labels.label_of(r.doc_id).map(|label| Hit {
                    label: label as i64,
                    distance: r.score,
                })
            })
            .filter(|hit| filter.map_or(true, |f| f.matches(hit.label)))
            .collect();
        hits.truncate(k);
        Ok(hits)
    }

    fn serialize(&self) -> Result<Vec<u8>, Error> {
        if self.index.num_documents() == 0 {
            return Err(Error::IndexEmpty);
        }
        postcard::to_allocvec(&self.index).map_err(|e| Error::InvalidArgument(e.to_string()))
    }

    fn deserialize(&mut self, blob: &[u8]) -> Result<(), Error> {
        if self.index.num_documents() > 0 {
            return Err(Error::IndexNotEmpty);
        }
        self.index =
            postcard::from_bytes(blob).map_err(|_| Error::InvalidBinary)?;
        Ok(())
    }

    fn num_elements(&self) -> u64 {
        self.index.num_live_documents() as u64
    }

    fn memory_usage(&self) -> u64 {
        self.index.memory_usage() as u64
    }

    fn stats(&self) -> String {
        IndexStats {
            index_name: "sindi",
            data_num: self.num_elements(),
            memory: self.memory_usage(),
            avg_knn_search_us: self.timers.knn.average().as_micros() as u64,
            avg_range_search_us: self.timers.range.average().as_micros() as u64,
        }
        .to_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_params_validates_degree_range() {
        let mut params = BuildParams::dense(16);
        params.hnsw_max_degree = 2;
        assert!(params.validate().is_err());
    }

    #[test]
    fn hgraph_facade_insert_search_roundtrip() {
        let params = BuildParams::dense(4);
        let mut index = HgraphIndex::new(&params).unwrap();
        let failed = index
            .build(vec![
                (1, vec![0.0, 0.0, 0.0, 0.0]),
                (2, vec![1.0, 1.0, 1.0, 1.0]),
            ])
            .unwrap();
        assert!(failed.is_empty());
        assert_eq!(index.num_elements(), 2);

        let hits = index
            .knn_search(&vec![0.0, 0.0, 0.0, 0.0], 1, &SearchParams::default(), None, None)
            .unwrap();
        assert_eq!(hits[0].label, 1);
    }

    #[test]
    fn hgraph_facade_remove_excludes_label() {
        let params = BuildParams::dense(4);
        let mut index = HgraphIndex::new(&params).unwrap();
        index
            .build(vec![(1, vec![0.0; 4]), (2, vec![1.0; 4])])
            .unwrap();
        assert!(index.remove(1).unwrap());
        assert_eq!(index.num_elements(), 1);

        let hits = index
            .knn_search(&vec![0.0; 4], 2, &SearchParams::default(), None, None)
            .unwrap();
        assert!(hits.iter().all(|h| h.label != 1));
    }

    #[test]
    fn sindi_facade_insert_search_roundtrip() {
        let params = BuildParams::sparse(100);
        let mut index = SindiFacade::new(&params).unwrap();
        let doc_a = SparseVector::from_pairs(&[(1, 1.0), (2, 0.5)], 100).unwrap();
        let doc_b = SparseVector::from_pairs(&[(3, 1.0), (4, 0.5)], 100).unwrap();
        index.build(vec![(10, doc_a), (20, doc_b)]).unwrap();

        let query = SparseVector::from_pairs(&[(1, 1.0)], 100).unwrap();
        let hits = index.knn_search(&query, 1, &SearchParams::default(), None, None).unwrap();
        assert_eq!(hits[0].label, 10);
    }

    #[test]
    fn range_search_filters_by_radius() {
        let params = BuildParams::dense(4);
        let mut index = HgraphIndex::new(&params).unwrap();
        index
            .build(vec![
                (1, vec![0.0; 4]),
                (2, vec![1.0, 0.0, 0.0, 0.0]),
                (3, vec![10.0; 4]),
            ])
            .unwrap();

        let hits = index
            .range_search(&vec![0.0; 4], 2.0, &SearchParams::default(), None, None)
            .unwrap();
        let labels: Vec<_> = hits.iter().map(|h| h.label).collect();
        assert!(labels.contains(&1));
        assert!(labels.contains(&2));
        assert!(!labels.contains(&3));
    }

    #[test]
    fn hgraph_allow_list_filter_restricts_to_named_labels() {
        let params = BuildParams::dense(4);
        let mut index = HgraphIndex::new(&params).unwrap();
        index
            .build(vec![
                (1, vec![0.0; 4]),
                (2, vec![0.1, 0.0, 0.0, 0.0]),
                (3, vec![0.2, 0.0, 0.0, 0.0]),
            ])
            .unwrap();

        let allowed = [2i64];
        let filter = Filter::AllowList(&allowed);
        let hits = index
            .knn_search(&vec![0.0; 4], 3, &SearchParams::default(), Some(&filter), None)
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].label, 2);
    }

    #[test]
    fn hgraph_predicate_filter_excludes_odd_labels() {
        let params = BuildParams::dense(4);
        let mut index = HgraphIndex::new(&params).unwrap();
        index
            .build(vec![
                (1, vec![0.0; 4]),
                (2, vec![0.1, 0.0, 0.0, 0.0]),
                (3, vec![0.2, 0.0, 0.0, 0.0]),
                (4, vec![0.3, 0.0, 0.0, 0.0]),
            ])
            .unwrap();

        let is_even = |label: Label| label % 2 == 0;
        let filter = Filter::Predicate(&is_even);
        let hits = index
            .knn_search(&vec![0.0; 4], 4, &SearchParams::default(), Some(&filter), None)
            .unwrap();
        assert!(hits.iter().all(|h| h.label % 2 == 0));
        assert!(!hits.is_empty());
    }

    #[test]
    fn hgraph_iterator_pages_are_disjoint_and_nearest_first() {
        let params = BuildParams::dense(4);
        let mut index = HgraphIndex::new(&params).unwrap();
        index
            .build(vec![
                (1, vec![0.0; 4]),
                (2, vec![1.0, 0.0, 0.0, 0.0]),
                (3, vec![2.0, 0.0, 0.0, 0.0]),
                (4, vec![3.0, 0.0, 0.0, 0.0]),
            ])
            .unwrap();

        let mut it = IteratorContext::new();
        let page1 = index
            .knn_search(&vec![0.0; 4], 2, &SearchParams::default(), None, Some(&mut it))
            .unwrap();
        let page2 = index
            .knn_search(&vec![0.0; 4], 2, &SearchParams::default(), None, Some(&mut it))
            .unwrap();

        assert_eq!(page1.len(), 2);
        let page1_labels: Vec<_> = page1.iter().map(|h| h.label).collect();
        let page2_labels: Vec<_> = page2.iter().map(|h| h.label).collect();
        assert!(page1_labels.iter().all(|l| !page2_labels.contains(l)));
        assert_eq!(page1[0].label, 1);
    }

    #[test]
    fn sindi_allow_list_filter_restricts_results() {
        let params = BuildParams::sparse(100);
        let mut index = SindiFacade::new(&params).unwrap();
        let doc_a = SparseVector::from_pairs(&[(1, 1.0)], 100).unwrap();
        let doc_b = SparseVector::from_pairs(&[(1, 1.0)], 100).unwrap();
        index.build(vec![(10, doc_a), (20, doc_b)]).unwrap();

        let query = SparseVector::from_pairs(&[(1, 1.0)], 100).unwrap();
        let allowed = [20i64];
        let filter = Filter::AllowList(&allowed);
        let hits = index
            .knn_search(&query, 2, &SearchParams::default(), Some(&filter), None)
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].label, 20);
    }

    #[test]
    fn sindi_rejects_iterator_pagination() {
        let params = BuildParams::sparse(100);
        let mut index = SindiFacade::new(&params).unwrap();
        let doc = SparseVector::from_pairs(&[(1, 1.0)], 100).unwrap();
        index.build(vec![(10, doc)]).unwrap();

        let query = SparseVector::from_pairs(&[(1, 1.0)], 100).unwrap();
        let mut it = IteratorContext::new();
        let result = index.knn_search(&query, 1, &SearchParams::default(), None, Some(&mut it));
        assert!(result.is_err());
    }
}
