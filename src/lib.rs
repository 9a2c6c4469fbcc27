//! Approximate nearest neighbor search over dense and sparse vectors.
//!
//! This crate implements two independent index kinds behind a common
//! snapshot/error story:
//!
//! - [`hnsw`] — HGraph, a hierarchical navigable small-world graph over
//!   dense f32 vectors, searched and inserted with a configurable distance
//!   [`metric`].
//! - [`sindi`] — SINDI, a term-major sparse inverted index for weighted
//!   term vectors (e.g. learned sparse embeddings), with document pruning,
//!   optional posting-weight quantization, and two-stage exact reorder.
//!
//! Both subsystems share [`storage`] (dense vector buffers),
//! [`quantization`] (scalar quantization of posting/vector weights),
//! [`persistence`] (the named-section snapshot container), [`filter`]
//! (metadata filter strategy selection for hybrid predicate + vector
//! search), and [`label`] (the external-label <-> internal-id map). The
//! [`facade`] module puts a uniform [`facade::Index`] contract in front of
//! both, so callers working by label rather than internal id can treat
//! HGraph and SINDI interchangeably.
//!
//! # Example
//!
//! ```rust
//! use annidx::{HnswConfig, HnswIndex, VectorStorage};
//!
//! let config = HnswConfig::new(128);
//! let mut storage = VectorStorage::new(&config);
//! let mut index = HnswIndex::new(config, &storage).expect("failed to create index");
//!
//! let vector = vec![0.5; 128];
//! let id = index.insert(&vector, &mut storage).expect("failed to insert");
//!
//! let query = vec![0.5; 128];
//! let results = index.search(&query, 10, &storage).expect("failed to search");
//! assert!(!results.is_empty());
//! assert_eq!(results[0].vector_id, id);
//! ```
//!
//! # Persistence Example
//!
//! ```rust
//! use annidx::{HnswConfig, HnswIndex, VectorStorage};
//! use annidx::persistence::{write_snapshot, read_snapshot};
//!
//! let config = HnswConfig::new(128);
//! let storage = VectorStorage::new(&config);
//! let index = HnswIndex::new(config, &storage).expect("failed to create");
//!
//! let blob = write_snapshot(&index, &storage).expect("failed to save");
//! let (loaded_index, loaded_storage) = read_snapshot(&blob).expect("failed to load");
//! assert_eq!(loaded_index.config, index.config);
//! let _ = loaded_storage;
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::pub_underscore_fields)]
#![allow(clippy::too_many_lines)]

/// Snapshot persistence (named-section container format).
pub mod persistence;

/// Unified error handling.
pub mod error;

/// Batch insertion API for HGraph.
pub mod batch;

/// HGraph: hierarchical navigable small-world graph over dense vectors.
pub mod hnsw;

/// Distance metrics.
pub mod metric;

/// Dense vector storage.
pub mod storage;

/// Scalar quantization, shared by dense storage and SINDI postings.
pub mod quantization;

/// SIMD capability detection and runtime backend selection.
pub mod simd;

/// Metadata filter strategy selection for hybrid vector + predicate search.
pub mod filter;

/// Bidirectional external label <-> internal id mapping, shared by HGraph
/// and SINDI.
pub mod label;

/// Pluggable memory allocation for large buffers.
pub mod allocator;

/// Fixed-record slab allocator backing per-node storage.
pub mod block;

/// Generation-counter visited-marking scratch, pooled across searches.
pub mod visited;

/// Resumable pagination state for paginated k-NN search.
pub mod iterator_context;

/// SINDI: sparse inverted-index engine for weighted term-vector search.
pub mod sindi;

/// Sparse vector representation and distance math, shared by SINDI's
/// document/query type.
pub mod sparse;

/// Rolling-window query timers and the JSON `stats()` shape.
pub mod stats;

/// Uniform `build`/`add`/`remove`/`knn_search`/serialize contract shared by
/// both index kinds, keyed by caller-facing labels.
pub mod facade;

pub use batch::BatchInsertable;
pub use error::{BatchError, Error};
pub use facade::{
    BuildParams, Dtype, Filter, HgraphIndex, Hit, Index, Label, MetricType, SearchParams,
    SindiFacade,
};
pub use iterator_context::IteratorContext;
pub use hnsw::{BatchDeleteError, BatchDeleteResult, HnswConfig, HnswIndex, SearchResult};
pub use label::{LabelError, LabelTable};
pub use metric::Metric;
pub use quantization::{QuantizerConfig, ScalarQuantizer};
pub use sindi::{SindiConfig, SindiIndex, SindiSearchResult};
pub use simd::{
    capabilities, detect_neon, select_backend, warn_if_suboptimal, SimdBackend, SimdCapabilities,
};
pub use stats::IndexStats;
pub use storage::VectorStorage;

/// The crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the crate version string.
///
/// # Example
///
/// ```rust
/// let version = annidx::version();
/// assert!(!version.is_empty());
/// ```
#[must_use]
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_not_empty() {
        assert!(!version().is_empty());
    }
}
