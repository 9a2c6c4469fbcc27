//! Unified error hierarchy for the crate.
//!
//! - [`Error`] — top-level error type wrapping both subsystems' errors
//! - [`BatchError`] — errors specific to batch insertion into an HGraph index
//!
//! # Batch Error Handling
//!
//! [`BatchError`] supports **best-effort semantics**:
//! - Fatal errors (dimension mismatch on first vector, capacity exceeded) abort immediately
//! - Non-fatal errors (duplicates, invalid vectors mid-batch) are skipped
//! - Partial success is returned via `Ok(Vec<u64>)`
//!
//! # Example
//!
//! ```ignore
//! use annidx::error::BatchError;
//!
//! fn handle_batch_error(err: BatchError) {
//!     match err {
//!         BatchError::DimensionMismatch { expected, actual, vector_id } => {
//!             eprintln!("Vector {} has {} dims, expected {}", vector_id, actual, expected);
//!         }
//!         BatchError::DuplicateId { vector_id } => {
//!             eprintln!("Duplicate ID: {}", vector_id);
//!         }
//!         BatchError::CapacityExceeded { current, max } => {
//!             eprintln!("Index full: {}/{}", current, max);
//!         }
//!         _ => eprintln!("Other error: {}", err),
//!     }
//! }
//! ```

use crate::hnsw::GraphError;
use crate::persistence::PersistenceError;
use crate::sindi::SindiError;
use thiserror::Error;

/// Top-level error type for both HGraph and SINDI index operations.
#[derive(Debug, Error)]
pub enum Error {
    /// An operation that requires a built index was called before `build`.
    #[error("index has not been built yet")]
    IndexEmpty,

    /// `build` was called on an index that was already built.
    #[error("index was already built")]
    BuildTwice,

    /// An operation that requires an empty index was called on a non-empty one.
    #[error("index is not empty")]
    IndexNotEmpty,

    /// A query or inserted vector's dimensionality didn't match the index.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension (or vocabulary size) the index was configured with.
        expected: usize,
        /// Dimension actually supplied.
        actual: usize,
    },

    /// Allocation failed or a configured memory budget was exceeded.
    #[error("out of memory")]
    OutOfMemory,

    /// A serialized blob could not be parsed as a valid snapshot.
    #[error("invalid binary format")]
    InvalidBinary,

    /// An argument was outside its accepted range (e.g. `k == 0`).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An operation not supported by the requested index kind.
    #[error("unsupported index operation: {0}")]
    UnsupportedIndex(String),

    /// I/O error reading or writing a snapshot.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot framing/serialization error.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// HGraph-specific error.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// SINDI-specific error.
    #[error(transparent)]
    Sindi(#[from] SindiError),
}

/// Errors that can occur during batch insertion operations.
///
/// This type represents errors specific to batch insertion workflows.
/// Unlike [`GraphError`], which handles single-vector operations,
/// `BatchError` provides context about which vector in a batch failed
/// and supports best-effort semantics (partial success).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BatchError {
    /// Empty batch provided (no vectors to insert).
    #[error("empty batch: cannot insert zero vectors")]
    EmptyBatch,

    /// Vector dimensionality does not match index configuration.
    #[error("dimension mismatch for vector {vector_id}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension from index
        expected: usize,
        /// Actual dimension of rejected vector
        actual: usize,
        /// ID of the problematic vector
        vector_id: u64,
    },

    /// Vector ID already exists in the index.
    #[error("duplicate vector ID: {vector_id}")]
    DuplicateId {
        /// Duplicate vector ID
        vector_id: u64,
    },

    /// Vector contains invalid floating-point values (NaN, Infinity).
    #[error("invalid vector {vector_id}: {reason}")]
    InvalidVector {
        /// ID of the invalid vector
        vector_id: u64,
        /// Description of the invalid value
        reason: String,
    },

    /// Index has reached maximum capacity.
    #[error("capacity exceeded: current={current}, max={max}")]
    CapacityExceeded {
        /// Current number of vectors
        current: usize,
        /// Maximum allowed vectors
        max: usize,
    },

    /// Internal HNSW invariant violated during insertion.
    #[error("internal error: {message}")]
    InternalError {
        /// Description of the violated invariant
        message: String,
    },
}
