//! Error types for the SINDI sparse inverted-index engine.

use thiserror::Error;

/// Errors raised by [`crate::sindi::SindiIndex`] construction, insertion, and search.
#[derive(Debug, Error)]
pub enum SindiError {
    /// A document referenced a term id at or beyond the configured vocabulary size.
    #[error("term id {term} out of range for vocabulary size {vocab_size}")]
    TermOutOfRange {
        /// The offending term id.
        term: u32,
        /// The index's configured vocabulary size.
        vocab_size: u32,
    },

    /// A document carried no non-zero terms.
    #[error("document vector is empty")]
    EmptyDocument,

    /// `doc_retain_ratio` was outside `(0.0, 1.0]`.
    #[error("doc retain ratio {0} must be in (0.0, 1.0]")]
    InvalidRetainRatio(f32),

    /// `n_candidate` was zero.
    #[error("n_candidate must be greater than zero")]
    InvalidCandidatePool,

    /// `vocab_size` was zero.
    #[error("vocab_size must be greater than zero")]
    EmptyVocabulary,

    /// The requested document id does not exist (or was already removed).
    #[error("document id {0} not found")]
    DocNotFound(u32),

    /// Document id space exhausted.
    #[error("document id overflow")]
    IdOverflow,
}
