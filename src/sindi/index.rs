//! The SINDI inverted index: a term-major posting-list store over sparse
//! document vectors, with per-document pruning and optional posting-weight
//! quantization.

use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

use crate::quantization::{QuantizerConfig, ScalarQuantizer};
use crate::sindi::config::SindiConfig;
use crate::sindi::error::SindiError;
use crate::sindi::postings::{prune_document, PostingList};
use crate::sparse::SparseVector;

/// A term-major sparse inverted index.
///
/// Documents are assigned monotonically increasing ids on insertion, but
/// each term's postings are kept sorted by descending weight rather than
/// by id, so query-time pruning can truncate a prefix instead of sorting.
#[derive(Debug, Serialize, Deserialize)]
pub struct SindiIndex {
    /// Build and search parameters.
    pub config: SindiConfig,
    pub(crate) terms: Vec<PostingList>,
    pub(crate) deleted: BitVec,
    pub(crate) quantizer_config: Option<QuantizerConfig>,
    doc_count: u32,
}

impl SindiIndex {
    /// Creates an empty index with one posting list per vocabulary term.
    ///
    /// # Errors
    ///
    /// Returns a [`SindiError`] if `config` fails validation.
    pub fn new(config: SindiConfig) -> Result<Self, SindiError> {
        config.validate()?;
        let terms = (0..config.vocab_size).map(|_| PostingList::default()).collect();
        Ok(Self {
            config,
            terms,
            deleted: BitVec::new(),
            quantizer_config: None,
            doc_count: 0,
        })
    }

    /// Number of documents ever inserted (including tombstoned ones).
    #[must_use]
    pub fn num_documents(&self) -> usize {
        self.doc_count as usize
    }

    /// Number of live (non-tombstoned) documents.
    #[must_use]
    pub fn num_live_documents(&self) -> usize {
        self.num_documents() - self.deleted.count_ones()
    }

    #[must_use]
    pub fn is_deleted(&self, doc_id: u32) -> bool {
        let idx = doc_id as usize;
        idx >= self.deleted.len() || self.deleted[idx]
    }

    /// Inserts a document, pruning its smallest-weight terms per
    /// `config.doc_retain_ratio` before recording the survivors into each
    /// term's postings.
    ///
    /// # Errors
    ///
    /// Returns [`SindiError::EmptyDocument`] if the vector has no non-zero
    /// terms, [`SindiError::TermOutOfRange`] if a term id is beyond the
    /// configured vocabulary, or [`SindiError::IdOverflow`] if the document
    /// id space is exhausted.
    pub fn add(&mut self, doc: &SparseVector) -> Result<u32, SindiError> {
        let pairs = doc.to_pairs();
        if pairs.is_empty() {
            return Err(SindiError::EmptyDocument);
        }
        for &(term, _) in &pairs {
            if term >= self.config.vocab_size {
                return Err(SindiError::TermOutOfRange {
                    term,
                    vocab_size: self.config.vocab_size,
                });
            }
        }

        if self.doc_count == u32::MAX {
            return Err(SindiError::IdOverflow);
        }
        let doc_id = self.doc_count;

        let kept = prune_document(pairs, self.config.doc_retain_ratio);
        for (term, weight) in kept {
            let postings = &mut self.terms[term as usize];
            postings.push(doc_id, weight);
            postings.sort_by_weight_desc();
        }

        self.deleted.push(false);
        self.doc_count += 1;
        Ok(doc_id)
    }

    /// Tombstones a document so it's skipped by future searches. Returns
    /// `false` if it was already removed.
    ///
    /// # Errors
    ///
    /// Returns [`SindiError::DocNotFound`] if `doc_id` was never assigned.
    pub fn remove(&mut self, doc_id: u32) -> Result<bool, SindiError> {
        let idx = doc_id as usize;
        if idx >= self.deleted.len() {
            return Err(SindiError::DocNotFound(doc_id));
        }
        let was_live = !self.deleted[idx];
        self.deleted.set(idx, true);
        Ok(was_live)
    }

    /// Trains a single global scalar quantizer over every retained posting
    /// weight and populates each term's `weights_q` byte array from it.
    ///
    /// Idempotent: call again after bulk inserts to refresh quantization.
    pub fn build_quantization(&mut self) {
        if !self.config.quantize {
            return;
        }
        let refs: Vec<&[f32]> = self
            .terms
            .iter()
            .map(|p| p.weights.as_slice())
            .filter(|w| !w.is_empty())
            .collect();
        let quantizer = ScalarQuantizer::train(&refs);
        for term in &mut self.terms {
            term.weights_q = quantizer.quantize(&term.weights);
        }
        self.quantizer_config = Some(quantizer.config());
    }

    pub(crate) fn quantizer(&self) -> Option<ScalarQuantizer> {
        self.quantizer_config.map(ScalarQuantizer::new)
    }

    /// Approximate memory footprint in bytes.
    #[must_use]
    pub fn memory_usage(&self) -> usize {
        let postings: usize = self.terms.iter().map(PostingList::memory_usage).sum();
        postings + (self.deleted.capacity() + 7) / 8
    }

    /// Total non-zero postings retained across all terms, after pruning.
    #[must_use]
    pub fn total_postings(&self) -> usize {
        self.terms.iter().map(PostingList::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(pairs: &[(u32, f32)]) -> SparseVector {
        SparseVector::from_pairs(pairs, 100).unwrap()
    }

    #[test]
    fn add_assigns_sequential_ids() {
        let mut index = SindiIndex::new(SindiConfig::new(100)).unwrap();
        let id0 = index.add(&doc(&[(1, 1.0), (2, 2.0)])).unwrap();
        let id1 = index.add(&doc(&[(1, 0.5)])).unwrap();
        assert_eq!(id0, 0);
        assert_eq!(id1, 1);
        assert_eq!(index.num_documents(), 2);
    }

    #[test]
    fn add_rejects_out_of_range_term() {
        let mut index = SindiIndex::new(SindiConfig::new(10)).unwrap();
        let result = index.add(&doc(&[(50, 1.0)]));
        assert!(matches!(result, Err(SindiError::TermOutOfRange { .. })));
    }

    #[test]
    fn postings_stay_sorted_by_descending_weight() {
        let mut index = SindiIndex::new(SindiConfig::new(10)).unwrap();
        for i in 0..5 {
            index.add(&doc(&[(3, i as f32)])).unwrap();
        }
        assert_eq!(index.terms[3].ids, vec![4, 3, 2, 1, 0]);
        assert_eq!(
            index.terms[3].weights,
            vec![4.0, 3.0, 2.0, 1.0, 0.0]
        );
    }

    #[test]
    fn remove_tombstones_and_reports_prior_state() {
        let mut index = SindiIndex::new(SindiConfig::new(10)).unwrap();
        let id = index.add(&doc(&[(1, 1.0)])).unwrap();
        assert!(index.remove(id).unwrap());
        assert!(index.is_deleted(id));
        assert!(!index.remove(id).unwrap());
    }

    #[test]
    fn build_quantization_populates_quantized_weights() {
        let mut index = SindiIndex::new(SindiConfig::new(10)).unwrap();
        index.add(&doc(&[(1, 1.0), (2, 5.0)])).unwrap();
        index.build_quantization();
        assert!(index.quantizer_config.is_some());
        assert_eq!(index.terms[1].weights_q.len(), 1);
        assert_eq!(index.terms[2].weights_q.len(), 1);
    }
}
