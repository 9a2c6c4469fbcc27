//! Vector storage: contiguous full-precision and quantized buffers plus tombstones.
//!
//! # Memory layout
//!
//! - `data_f32`: flat `Vec<f32>` storing all vector data contiguously.
//! - `quantized_data`: flat `Vec<u8>`, populated instead of `data_f32` when
//!   the storage is configured for scalar quantization.
//! - `deleted`: one bit per vector, set by [`VectorStorage::mark_deleted`].
//!
//! Durability is handled at a coarser grain than per-insert appends: the
//! whole graph is snapshotted via [`crate::persistence`] rather than
//! replayed from a write-ahead log, so this module has no I/O of its own.

use crate::hnsw::graph::VectorProvider;
use crate::hnsw::{HnswConfig, VectorId};
use crate::quantization::{QuantizerConfig, ScalarQuantizer};
use bitvec::prelude::*;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Dimension mismatch between vector and storage config.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions.
        expected: u32,
        /// Actual dimensions provided.
        actual: u32,
    },

    /// Invalid data encountered during recovery.
    #[error("corrupted data: {0}")]
    Corrupted(String),
}

/// Configuration for vector storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub enum StorageType {
    /// Store full precision f32 vectors.
    #[default]
    Float32,
    /// Store 8-bit quantized vectors.
    QuantizedU8(QuantizerConfig),
}

/// Contiguous vector storage backing an [`crate::hnsw::HnswIndex`].
#[derive(Serialize, Deserialize)]
pub struct VectorStorage {
    /// Full precision vector data (layout: [`v0_d0`, ..., `v1_d0`, ...]).
    /// Populated if `storage_type` is `Float32` (or in dual mode).
    #[serde(default)]
    pub(crate) data_f32: Vec<f32>,

    /// Quantized vector data (layout: [`v0_d0`, ..., `v1_d0`, ...]).
    /// Populated if `storage_type` is `QuantizedU8`.
    #[serde(default)]
    pub(crate) quantized_data: Vec<u8>,

    /// Storage configuration.
    #[serde(default)]
    pub(crate) config: StorageType,

    /// Quantizer instance (derived from config).
    #[serde(skip)]
    pub(crate) quantizer: Option<ScalarQuantizer>,

    /// Tombstones for deleted vectors (1 bit per vector).
    pub(crate) deleted: BitVec,
    /// Number of dimensions per vector.
    pub(crate) dimensions: u32,
    /// Next available ID.
    pub(crate) next_id: u64,
}

impl VectorStorage {
    /// Creates a new, empty `VectorStorage` sized for `config.dimensions`.
    #[must_use]
    pub fn new(config: &HnswConfig) -> Self {
        Self {
            data_f32: Vec::new(),
            quantized_data: Vec::new(),
            config: StorageType::Float32,
            quantizer: None,
            deleted: BitVec::new(),
            dimensions: config.dimensions,
            next_id: 1, // Start at 1 because 0 is reserved sentinel
        }
    }

    /// Set the storage type (e.g. to enable quantization).
    ///
    /// Note: This does not convert existing data. It only affects future inserts.
    pub fn set_storage_type(&mut self, config: StorageType) {
        if let StorageType::QuantizedU8(q_config) = &config {
            self.quantizer = Some(ScalarQuantizer::new(*q_config));
        }
        self.config = config;
    }

    /// Inserts a vector into storage, returning its newly assigned [`VectorId`].
    ///
    /// # Errors
    ///
    /// Returns `StorageError::DimensionMismatch` if `vector.len()` doesn't match
    /// the configured dimensionality.
    ///
    /// # Panics
    ///
    /// Panics if quantizer is `None` in `QuantizedU8` storage mode (logic error).
    pub fn insert(&mut self, vector: &[f32]) -> Result<VectorId, StorageError> {
        if let Ok(len) = u32::try_from(vector.len()) {
            if len != self.dimensions {
                return Err(StorageError::DimensionMismatch {
                    expected: self.dimensions,
                    actual: len,
                });
            }
        } else {
            return Err(StorageError::DimensionMismatch {
                expected: self.dimensions,
                actual: u32::MAX,
            });
        }

        let id = self.next_id;

        match &self.config {
            StorageType::Float32 => {
                self.data_f32.extend_from_slice(vector);
            }
            StorageType::QuantizedU8(config) => {
                // Ensure quantizer is initialized
                if self.quantizer.is_none() {
                    self.quantizer = Some(ScalarQuantizer::new(*config));
                }
                let q = self
                    .quantizer
                    .as_ref()
                    .expect("quantizer initialized above");
                let quantized = q.quantize(vector);
                self.quantized_data.extend_from_slice(&quantized);
            }
        }

        self.deleted.push(false);
        self.next_id += 1;

        Ok(VectorId(id))
    }

    /// Inserts a pre-quantized vector into storage.
    ///
    /// # Arguments
    ///
    /// * `data` - The quantized vector data slice.
    ///
    /// # Returns
    ///
    /// The new `VectorId` or `StorageError`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::DimensionMismatch` if `data.len()` doesn't match
    /// the configured dimensions. Returns `StorageError::Corrupted` if storage
    /// is not in quantized mode.
    pub fn insert_quantized(&mut self, data: &[u8]) -> Result<VectorId, StorageError> {
        // Step 1: Validate dimensions
        if let Ok(len) = u32::try_from(data.len()) {
            if len != self.dimensions {
                return Err(StorageError::DimensionMismatch {
                    expected: self.dimensions,
                    actual: len,
                });
            }
        } else {
            return Err(StorageError::DimensionMismatch {
                expected: self.dimensions,
                actual: u32::MAX,
            });
        }

        // Ensure we are in Quantized mode
        if !matches!(self.config, StorageType::QuantizedU8(_)) {
            // Alternatively, we could auto-switch, but strict is better.
            // For now, if we are in Float32, we cannot store quantized data reliably without dequantizing (which we can't do without config).
            // We'll return an error or panic. Let's return error.
            return Err(StorageError::Corrupted(
                "Cannot insert quantized data into Float32 storage".into(),
            ));
        }

        let id = self.next_id;

        self.quantized_data.extend_from_slice(data);
        self.deleted.push(false);
        self.next_id += 1;

        Ok(VectorId(id))
    }

    /// Returns the number of vectors stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.deleted.len()
    }

    /// Returns true if the storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deleted.is_empty()
    }

    /// Returns the vector dimensionality.
    #[must_use]
    pub fn dimensions(&self) -> u32 {
        self.dimensions
    }

    /// Returns the vector slice for a given ID.
    ///
    /// # Panics
    ///
    /// Panics if the vector ID is invalid (0).
    /// Panics if data is missing for the configured storage type.
    #[must_use]
    pub fn get_vector(&self, id: VectorId) -> Cow<'_, [f32]> {
        assert!(
            id != VectorId::INVALID,
            "attempted to access invalid vector id 0"
        );
        #[allow(clippy::cast_possible_truncation)]
        // IDs start at 1, so index is id - 1
        let idx = (id.0 as usize) - 1;
        let dim = self.dimensions as usize;
        let start = idx * dim;
        let end = start + dim;

        match &self.config {
            StorageType::Float32 => {
                assert!(
                    !self.data_f32.is_empty(),
                    "get_vector called on storage without f32 data"
                );
                assert!(
                    end <= self.data_f32.len(),
                    "get_vector: VectorId {} out of bounds (idx={}, end={}, data_len={})",
                    id.0,
                    idx,
                    end,
                    self.data_f32.len()
                );
                Cow::Borrowed(&self.data_f32[start..end])
            }
            StorageType::QuantizedU8(_) => {
                assert!(
                    !self.quantized_data.is_empty(),
                    "get_vector called on storage without quantized data"
                );
                assert!(
                    end <= self.quantized_data.len(),
                    "get_vector: VectorId {} out of bounds (idx={}, end={}, data_len={})",
                    id.0,
                    idx,
                    end,
                    self.quantized_data.len()
                );
                let q_data = &self.quantized_data[start..end];
                let q = self
                    .quantizer
                    .as_ref()
                    .expect("quantizer not initialized in QuantizedU8 mode");
                Cow::Owned(q.dequantize(q_data))
            }
        }
    }

    /// Returns the quantized vector slice for a given ID.
    ///
    /// # Panics
    ///
    /// Panics if `quantized_data` is empty.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn get_quantized_vector(&self, id: VectorId) -> &[u8] {
        assert!(
            id != VectorId::INVALID,
            "attempted to access invalid vector id 0"
        );
        let idx = (id.0 as usize) - 1;
        let dim = self.dimensions as usize;
        let start = idx * dim;

        assert!(
            !self.quantized_data.is_empty(),
            "get_quantized_vector called on storage without quantized data"
        );
        &self.quantized_data[start..start + dim]
    }

    /// Marks a vector as deleted.
    ///
    /// # Arguments
    ///
    /// * `id` - The vector ID to delete.
    ///
    /// # Returns
    ///
    /// `true` if the vector was active and is now deleted.
    /// `false` if it was already deleted.
    ///
    /// # Panics
    ///
    /// Panics if the ID is invalid (0). If ID is out of bounds, returns false (robustness).
    #[allow(clippy::cast_possible_truncation)]
    pub fn mark_deleted(&mut self, id: VectorId) -> bool {
        assert!(id != VectorId::INVALID, "invalid vector id 0");
        let idx = (id.0 as usize) - 1;

        // Robustness: If ID is out of bounds, treat as "already deleted" (not found)
        // This allows graph operations to be robust against speculative deletes.
        if idx >= self.deleted.len() {
            return false;
        }

        let was_active = !self.deleted[idx];
        self.deleted.set(idx, true);
        was_active
    }

    /// Checks if a vector is deleted.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn is_deleted(&self, id: VectorId) -> bool {
        if id == VectorId::INVALID {
            return false;
        }
        let idx = (id.0 as usize) - 1;
        if idx >= self.deleted.len() {
            return false;
        }
        self.deleted[idx]
    }

    /// Compacts internal buffers to minimize memory usage.
    pub fn compact(&mut self) {
        self.data_f32.shrink_to_fit();
        self.quantized_data.shrink_to_fit();
        self.deleted.shrink_to_fit();
    }

    /// Returns the raw vector data slice (internal use).
    pub(crate) fn raw_data(&self) -> &[f32] {
        &self.data_f32
    }
}

impl VectorProvider for VectorStorage {
    fn get_vector(&self, id: VectorId) -> Cow<'_, [f32]> {
        self.get_vector(id)
    }

    fn is_deleted(&self, id: VectorId) -> bool {
        self.is_deleted(id)
    }

    fn get_quantized_vector(&self, id: VectorId) -> Option<&[u8]> {
        match self.config {
            StorageType::QuantizedU8(_) => Some(self.get_quantized_vector(id)),
            StorageType::Float32 => None,
        }
    }

    fn quantize_query<'a>(&self, query: &[f32], output: &'a mut Vec<u8>) -> Option<&'a [u8]> {
        match &self.config {
            StorageType::QuantizedU8(_) => {
                if let Some(q) = &self.quantizer {
                    *output = q.quantize(query);
                    Some(output)
                } else {
                    None
                }
            }
            StorageType::Float32 => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_insert_and_retrieve() {
        let config = HnswConfig::new(2); // 2D vectors
        let mut storage = VectorStorage::new(&config);

        let vec1 = vec![1.0, 2.0];
        let id1 = storage.insert(&vec1).unwrap();

        assert_eq!(id1.0, 1);
        let retrieved = storage.get_vector(id1);
        assert_eq!(&retrieved[..], &[1.0, 2.0]);
    }

    #[test]
    fn test_dimension_mismatch() {
        let config = HnswConfig::new(2);
        let mut storage = VectorStorage::new(&config);
        let vec = vec![1.0, 2.0, 3.0]; // 3D
        let res = storage.insert(&vec);
        assert!(matches!(res, Err(StorageError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_quantized_storage() {
        let config = HnswConfig::new(2);
        let mut storage = VectorStorage::new(&config);

        let q_config = QuantizerConfig {
            min: 0.0,
            max: 10.0,
        };
        storage.set_storage_type(StorageType::QuantizedU8(q_config));

        let vec = vec![0.0, 10.0];
        let id = storage.insert(&vec).unwrap();

        // Check quantized data
        let q_vec = storage.get_quantized_vector(id);
        assert_eq!(q_vec, &[0, 255]);

        // Check f32 data access works via dequantization (Cow::Owned)
        let vec_out = storage.get_vector(id);
        assert!(matches!(vec_out, Cow::Owned(_)));
        let slice: &[f32] = &vec_out;

        // Quantization introduces error, check proximity
        // 0.0 -> 0 -> 0.0
        // 10.0 -> 255 -> 10.0
        // Should be exact for endpoints in this case
        assert!((slice[0] - 0.0).abs() < 1e-5);
        assert!((slice[1] - 10.0).abs() < 1e-5);
    }

    #[test]
    fn test_insert_quantized() {
        let config = HnswConfig::new(2);
        let mut storage = VectorStorage::new(&config);

        let q_config = QuantizerConfig { min: 0.0, max: 1.0 };
        storage.set_storage_type(StorageType::QuantizedU8(q_config));

        let q_vec = vec![0, 255];
        let id = storage.insert_quantized(&q_vec).unwrap();

        assert_eq!(storage.get_quantized_vector(id), &[0, 255]);
    }
}
