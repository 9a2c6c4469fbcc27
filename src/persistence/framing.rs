//! Named-section container format used to persist an index to a single blob.
//!
//! Layout:
//!
//! ```text
//! [section]* [footer]
//! ```
//!
//! Each section is `(name_len: u32, name: bytes, payload_len: u64, payload: bytes)`,
//! all little-endian. The footer is a fixed [`FOOTER_SIZE`]-byte trailer holding
//! the magic, format version, and a JSON manifest of section offsets/lengths/
//! checksums, so a reader can validate the container and seek directly to any
//! section without scanning from the front.
//!
//! A reader must check the magic and version before trusting any section.

use crate::persistence::PersistenceError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Magic bytes identifying this container format, padded to 8 bytes.
pub const MAGIC: [u8; 8] = *b"CGPH\0\0\0\0";

/// Format version written into the footer.
pub const FORMAT_VERSION: &str = "1.0";

/// Fixed size of the trailing footer, in bytes.
pub const FOOTER_SIZE: usize = 4096;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SectionEntry {
    name: String,
    offset: u64,
    len: u64,
    crc32: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FooterBody {
    version: String,
    sections: Vec<SectionEntry>,
}

/// Serializes named sections into a single container blob.
///
/// # Errors
///
/// Returns [`PersistenceError::Corrupted`] if the footer manifest cannot be
/// serialized (this should not happen for well-formed section names).
pub fn write_sections(sections: &[(&str, &[u8])]) -> Result<Vec<u8>, PersistenceError> {
    let mut buffer = Vec::new();
    let mut entries = Vec::with_capacity(sections.len());

    for (name, payload) in sections {
        let offset = buffer.len() as u64;
        let name_bytes = name.as_bytes();
        // SAFETY: section names are short, static strings chosen by this crate.
        #[allow(clippy::cast_possible_truncation)]
        let name_len = name_bytes.len() as u32;
        buffer.extend_from_slice(&name_len.to_le_bytes());
        buffer.extend_from_slice(name_bytes);
        buffer.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        buffer.extend_from_slice(payload);

        entries.push(SectionEntry {
            name: (*name).to_string(),
            offset,
            len: payload.len() as u64,
            crc32: crc32fast::hash(payload),
        });
    }

    let body = FooterBody {
        version: FORMAT_VERSION.to_string(),
        sections: entries,
    };
    let manifest = serde_json::to_vec(&body)
        .map_err(|e| PersistenceError::SerializationError(e.to_string()))?;

    if manifest.len() + MAGIC.len() > FOOTER_SIZE {
        return Err(PersistenceError::Corrupted(
            "section manifest exceeds footer capacity".into(),
        ));
    }

    let mut footer = vec![0u8; FOOTER_SIZE];
    footer[..MAGIC.len()].copy_from_slice(&MAGIC);
    footer[MAGIC.len()..MAGIC.len() + manifest.len()].copy_from_slice(&manifest);

    buffer.extend_from_slice(&footer);
    Ok(buffer)
}

/// Reads back a container written by [`write_sections`].
///
/// Validates the magic, decodes the footer manifest, then verifies every
/// section's CRC32 before returning the map of section name to payload
/// bytes.
///
/// # Errors
///
/// - [`PersistenceError::TruncatedData`] if the blob is shorter than the footer.
/// - [`PersistenceError::InvalidMagic`] if the magic bytes don't match.
/// - [`PersistenceError::DeserializationError`] if the manifest JSON is malformed.
/// - [`PersistenceError::ChecksumMismatch`] if a section's payload fails CRC32.
/// - [`PersistenceError::Corrupted`] if a section's recorded range is out of bounds.
pub fn read_sections(data: &[u8]) -> Result<HashMap<String, Vec<u8>>, PersistenceError> {
    if data.len() < FOOTER_SIZE {
        return Err(PersistenceError::TruncatedData);
    }

    let footer_start = data.len() - FOOTER_SIZE;
    let footer = &data[footer_start..];

    let magic: [u8; 8] = footer[..8].try_into().expect("slice is exactly 8 bytes");
    if magic != MAGIC {
        let mut actual = [0u8; 4];
        actual.copy_from_slice(&magic[..4]);
        let mut expected = [0u8; 4];
        expected.copy_from_slice(&MAGIC[..4]);
        return Err(PersistenceError::InvalidMagic { expected, actual });
    }

    let manifest_bytes = &footer[8..];
    let nul = manifest_bytes
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(manifest_bytes.len());
    let body: FooterBody = serde_json::from_slice(&manifest_bytes[..nul])
        .map_err(|e| PersistenceError::DeserializationError(e.to_string()))?;

    if body.version != FORMAT_VERSION {
        return Err(PersistenceError::Corrupted(format!(
            "unsupported container version: {}",
            body.version
        )));
    }

    let body_data = &data[..footer_start];
    let mut sections = HashMap::with_capacity(body.sections.len());

    for entry in body.sections {
        let start = entry.offset as usize;
        let end = start
            .checked_add(entry.len as usize)
            .ok_or_else(|| PersistenceError::Corrupted("section range overflow".into()))?;
        if end > body_data.len() {
            return Err(PersistenceError::Corrupted(format!(
                "section '{}' range [{start}, {end}) exceeds container size {}",
                entry.name,
                body_data.len()
            )));
        }

        let payload = &body_data[start..end];
        let crc = crc32fast::hash(payload);
        if crc != entry.crc32 {
            return Err(PersistenceError::ChecksumMismatch {
                expected: entry.crc32,
                actual: crc,
            });
        }

        sections.insert(entry.name, payload.to_vec());
    }

    Ok(sections)
}
