//! HGraph snapshot: serializes an `HnswIndex` + `VectorStorage` pair into the
//! named-section container and reconstructs them from it.

use crate::hnsw::HnswIndex;
use crate::persistence::framing::{read_sections, write_sections};
use crate::persistence::PersistenceError;
use crate::storage::VectorStorage;

/// Section holding the postcard-encoded `HnswIndex` (nodes, neighbors, config).
const SECTION_INDEX: &str = "hnsw_data";
/// Section holding the postcard-encoded `VectorStorage` (vector buffers, tombstones).
const SECTION_STORAGE: &str = "vector_storage";

/// Serializes `index` and `storage` into a single section-framed blob.
///
/// # Errors
///
/// Returns `PersistenceError::SerializationError` if postcard encoding fails,
/// or a framing error if the resulting sections can't be packed.
pub fn write_snapshot(
    index: &HnswIndex,
    storage: &VectorStorage,
) -> Result<Vec<u8>, PersistenceError> {
    let index_bytes =
        postcard::to_allocvec(index).map_err(|e| PersistenceError::SerializationError(e.to_string()))?;
    let storage_bytes = postcard::to_allocvec(storage)
        .map_err(|e| PersistenceError::SerializationError(e.to_string()))?;

    write_sections(&[
        (SECTION_INDEX, &index_bytes),
        (SECTION_STORAGE, &storage_bytes),
    ])
}

/// Reconstructs an `(HnswIndex, VectorStorage)` pair from a blob written by
/// [`write_snapshot`].
///
/// # Errors
///
/// Returns a framing error if the container is malformed or fails checksum
/// validation, or `PersistenceError::Corrupted` if either expected section is
/// missing, or `PersistenceError::DeserializationError` if postcard decoding
/// fails.
pub fn read_snapshot(data: &[u8]) -> Result<(HnswIndex, VectorStorage), PersistenceError> {
    let sections = read_sections(data)?;

    let index_bytes = sections
        .get(SECTION_INDEX)
        .ok_or_else(|| PersistenceError::Corrupted(format!("missing section '{SECTION_INDEX}'")))?;
    let storage_bytes = sections.get(SECTION_STORAGE).ok_or_else(|| {
        PersistenceError::Corrupted(format!("missing section '{SECTION_STORAGE}'"))
    })?;

    let index: HnswIndex = postcard::from_bytes(index_bytes)
        .map_err(|e| PersistenceError::DeserializationError(e.to_string()))?;
    let storage: VectorStorage = postcard::from_bytes(storage_bytes)
        .map_err(|e| PersistenceError::DeserializationError(e.to_string()))?;

    Ok((index, storage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hnsw::HnswConfig;

    #[test]
    fn roundtrip_empty_index() {
        let config = HnswConfig::new(8);
        let storage = VectorStorage::new(&config);
        let index = HnswIndex::new(config, &storage).unwrap();

        let blob = write_snapshot(&index, &storage).unwrap();
        let (index2, storage2) = read_snapshot(&blob).unwrap();

        assert_eq!(index2.config, index.config);
        assert_eq!(storage2.len(), storage.len());
    }

    #[test]
    fn roundtrip_populated_index() {
        let config = HnswConfig::new(4);
        let mut storage = VectorStorage::new(&config);
        for i in 0..16 {
            storage.insert(&[i as f32, 0.0, 0.0, 0.0]).unwrap();
        }
        let index = HnswIndex::new(config, &storage).unwrap();

        let blob = write_snapshot(&index, &storage).unwrap();
        let (index2, storage2) = read_snapshot(&blob).unwrap();

        assert_eq!(storage2.len(), 16);
        assert_eq!(index2.config.dimensions, 4);
    }

    #[test]
    fn read_rejects_missing_sections() {
        let blob = write_sections(&[("unrelated", &[1, 2, 3])]).unwrap();
        let result = read_snapshot(&blob);
        assert!(matches!(result, Err(PersistenceError::Corrupted(_))));
    }

    fn write_sections(sections: &[(&str, &[u8])]) -> Result<Vec<u8>, PersistenceError> {
        crate::persistence::framing::write_sections(sections)
    }
}
