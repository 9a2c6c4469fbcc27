//! Quantization logic for vector compression.
//!
//! This module provides vector quantization for memory-efficient storage
//! and fast similarity computation.
//!
//! # Available Quantizers
//!
//! - [`ScalarQuantizer`]: SQ8 quantization (f32 -> u8), 4x compression,
//!   used by dense HNSW storage and by SINDI for posting-list weights.
//!
//! # Example
//!
//! ```
//! use annidx::quantization::ScalarQuantizer;
//!
//! let sample = [0.1f32, 0.9, -0.3, 0.4];
//! let quantizer = ScalarQuantizer::train(&[&sample[..]]);
//! let quantized = quantizer.quantize(&sample);
//! assert_eq!(quantized.len(), 4);
//! ```

/// Scalar quantization (SQ8) implementation.
pub mod scalar;

pub use scalar::{QuantizerConfig, ScalarQuantizer};
