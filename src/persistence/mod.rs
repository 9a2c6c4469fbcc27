//! Snapshot persistence: a named-section container format for whole-index
//! serialization, used by both HGraph and SINDI.
//!
//! There is no write-ahead log or incremental replay here (see the design
//! ledger): an index is snapshotted wholesale into a single blob on demand,
//! and loaded back wholesale. [`framing`] implements the section container
//! itself; [`snapshot`] builds the HGraph-specific section layout on top of
//! it.

/// Named-section container format (magic, footer, per-section CRC32).
pub mod framing;
/// Snapshot read/write for an `HnswIndex` + `VectorStorage` pair.
pub mod snapshot;

pub use framing::{read_sections, write_sections, FORMAT_VERSION, MAGIC};
pub use snapshot::{read_snapshot, write_snapshot};

use thiserror::Error;

/// Errors that can occur during persistence operations.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Buffer too small.
    #[error("buffer too small: expected {expected}, got {actual}")]
    BufferTooSmall {
        /// Expected size in bytes.
        expected: usize,
        /// Actual size in bytes.
        actual: usize,
    },

    /// Invalid magic number.
    #[error("invalid magic number: expected {expected:?}, got {actual:?}")]
    InvalidMagic {
        /// Expected magic bytes.
        expected: [u8; 4],
        /// Actual magic bytes.
        actual: [u8; 4],
    },

    /// Unsupported version.
    #[error("unsupported version: {0}.{1}")]
    UnsupportedVersion(u8, u8),

    /// Checksum mismatch.
    #[error("checksum mismatch: expected {expected:#x}, got {actual:#x}")]
    ChecksumMismatch {
        /// Expected CRC32.
        expected: u32,
        /// Actual CRC32.
        actual: u32,
    },

    /// Corrupted data.
    #[error("corrupted data: {0}")]
    Corrupted(String),

    /// Unsupported operation.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Component not initialized.
    #[error("not initialized")]
    NotInitialized,

    /// Truncated data (unexpected end of snapshot).
    #[error("truncated data: expected more bytes")]
    TruncatedData,

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    DeserializationError(String),
}
