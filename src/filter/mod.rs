//! Metadata filter strategy selection for hybrid vector + predicate search.
//!
//! This module decides *how* a filter predicate should be combined with an
//! ANN search call (pre-filter, post-filter, or hybrid oversampling) based on
//! the predicate's estimated selectivity. It does not parse or evaluate
//! filter expressions itself; callers supply a predicate closure over vector
//! ids and this module only reasons about selectivity and strategy.
//!
//! # Example
//!
//! ```rust
//! use annidx::filter::{estimate_selectivity, select_strategy};
//!
//! let estimate = estimate_selectivity(10_000, |id| id % 20 == 0, Some(7));
//! let strategy = select_strategy(estimate.selectivity);
//! ```

/// Filter-related error types.
pub mod error;
/// Strategy selection and selectivity estimation.
pub mod strategy;

pub use error::FilterError;
pub use strategy::{
    calculate_oversample, estimate_selectivity, select_strategy, FilterStrategy,
    SelectivityEstimate, DEFAULT_OVERSAMPLE, EF_CAP, MAX_OVERSAMPLE, POSTFILTER_THRESHOLD,
    PREFILTER_THRESHOLD, SELECTIVITY_SAMPLE_SIZE,
};
