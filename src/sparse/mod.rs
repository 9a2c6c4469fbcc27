//! Sparse vector representation and distance math, shared by SINDI's
//! document/query type.

mod error;
mod metrics;
mod vector;

pub use error::SparseError;
pub use metrics::{sparse_cosine, sparse_dot_product, sparse_norm};
pub use vector::SparseVector;
