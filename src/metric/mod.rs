//! Distance metrics for dense vector search.
//!
//! Each metric is a zero-sized type implementing [`Metric`], so the compiler
//! can monomorphize the hot insert/search loops instead of dispatching
//! through a vtable on every distance computation. The graph picks a
//! concrete metric once at construction time (see [`MetricKind`]) and stays
//! on that code path for the lifetime of the index.

mod dot;
mod l2;
pub mod scalar;
mod simd;

pub use dot::DotProduct;
pub use l2::L2Squared;
pub use scalar::{dot_product_u8, l2_squared_u8};

/// A distance function over same-length `f32` slices.
///
/// Lower is "closer" for every metric used by the graph: cosine and dot
/// product are stored as their negation so that the min-heap search
/// machinery in `hnsw::search` never needs to know which direction is best.
pub trait Metric<T> {
    /// Computes the distance between two same-length slices.
    ///
    /// # Panics
    ///
    /// Panics if `a.len() != b.len()`, or if either slice contains NaN.
    fn distance(a: &[T], b: &[T]) -> T;
}

/// Cosine similarity, expressed as a [`Metric`] by normalizing inputs and
/// delegating to [`DotProduct`] negated so smaller is closer.
///
/// Vectors are normalized on the fly rather than requiring callers to
/// pre-normalize; this costs an extra pass over each vector but keeps the
/// public insert/search API metric-agnostic.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cosine;

impl Metric<f32> for Cosine {
    #[inline]
    fn distance(a: &[f32], b: &[f32]) -> f32 {
        assert_eq!(a.len(), b.len(), "dimension mismatch: {} != {}", a.len(), b.len());
        let dot = DotProduct::distance(a, b);
        let norm_a = DotProduct::distance(a, a).sqrt();
        let norm_b = DotProduct::distance(b, b).sqrt();
        let denom = norm_a * norm_b;
        if denom <= f32::EPSILON {
            return 0.0;
        }
        1.0 - (dot / denom)
    }
}

/// Runtime-selectable metric identifier, persisted in [`crate::hnsw::HnswConfig`].
///
/// An index resolves this once when the graph is constructed and dispatches
/// to the matching monomorphized [`Metric`] implementation from then on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum MetricKind {
    /// Squared Euclidean distance. Cheapest metric; skips the square root.
    L2Squared = 0,
    /// Cosine distance (`1 - cosine similarity`), vectors normalized on the fly.
    Cosine = 1,
    /// Negative dot product, for pre-normalized vectors or maximum inner product search.
    DotProduct = 2,
}

impl MetricKind {
    /// Decodes a [`MetricKind`] from the raw `u32` stored in [`crate::hnsw::HnswConfig`].
    ///
    /// # Errors
    ///
    /// Returns `None` if `raw` doesn't correspond to a known metric.
    #[must_use]
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::L2Squared),
            1 => Some(Self::Cosine),
            2 => Some(Self::DotProduct),
            _ => None,
        }
    }

    /// Encodes this metric kind as the raw `u32` stored in [`crate::hnsw::HnswConfig`].
    #[must_use]
    pub fn as_raw(self) -> u32 {
        self as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_identical_vectors_is_zero() {
        let a = vec![1.0, 2.0, 3.0];
        let d = Cosine::distance(&a, &a);
        assert!(d.abs() < 1e-5, "expected ~0, got {d}");
    }

    #[test]
    fn cosine_orthogonal_vectors_is_one() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        let d = Cosine::distance(&a, &b);
        assert!((d - 1.0).abs() < 1e-5, "expected ~1, got {d}");
    }

    #[test]
    fn cosine_zero_vector_does_not_divide_by_zero() {
        let a = vec![0.0, 0.0];
        let b = vec![1.0, 1.0];
        assert_eq!(Cosine::distance(&a, &b), 0.0);
    }

    #[test]
    fn metric_kind_roundtrip() {
        for kind in [MetricKind::L2Squared, MetricKind::Cosine, MetricKind::DotProduct] {
            assert_eq!(MetricKind::from_raw(kind.as_raw()), Some(kind));
        }
        assert_eq!(MetricKind::from_raw(99), None);
    }
}
