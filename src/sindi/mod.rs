//! SINDI: a sparse inverted-index engine for weighted term-vector search
//! (e.g. learned sparse embeddings, BM25-style term weights).
//!
//! Documents are stored term-major: each term owns a posting list of
//! `(doc_id, weight)` pairs sorted by descending weight. Insertion prunes a
//! document's lowest-weight terms down to a configurable fraction of its
//! total weight mass before recording postings, bounding index size for
//! long-tailed term distributions. Search runs in two stages: an
//! approximate accumulator pass (optionally over 8-bit quantized weights)
//! narrows the field to a candidate pool, which is then rescored exactly
//! and truncated to the requested `k`.

mod config;
mod error;
mod index;
mod postings;
mod search;

pub use config::{SindiConfig, DEFAULT_DOC_RETAIN_RATIO, DEFAULT_N_CANDIDATE};
pub use error::SindiError;
pub use index::SindiIndex;
pub use search::{search, SindiSearchParams, SindiSearchResult};
