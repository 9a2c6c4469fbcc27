//! Build- and search-time parameters for a [`crate::sindi::SindiIndex`].

use serde::{Deserialize, Serialize};

use crate::sindi::SindiError;

/// Default fraction of a document's total weight mass kept after pruning.
pub const DEFAULT_DOC_RETAIN_RATIO: f32 = 0.95;
/// Default number of accumulator-stage candidates carried into exact reorder.
pub const DEFAULT_N_CANDIDATE: usize = 1000;

/// Parameters governing document pruning, quantization, and two-stage search
/// for a [`crate::sindi::SindiIndex`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SindiConfig {
    /// Size of the term vocabulary; term ids must be in `[0, vocab_size)`.
    pub vocab_size: u32,
    /// Fraction of a document's total weight mass to retain after pruning
    /// the smallest-weight terms. `1.0` disables pruning.
    pub doc_retain_ratio: f32,
    /// Whether posting weights are also stored 8-bit scalar-quantized for a
    /// cheaper accumulator pass.
    pub quantize: bool,
    /// Number of candidates carried from the accumulator stage into exact
    /// full-precision reorder.
    pub n_candidate: usize,
}

impl SindiConfig {
    /// Creates a config with default pruning, quantization, and candidate
    /// pool settings for the given vocabulary size.
    #[must_use]
    pub fn new(vocab_size: u32) -> Self {
        Self {
            vocab_size,
            doc_retain_ratio: DEFAULT_DOC_RETAIN_RATIO,
            quantize: true,
            n_candidate: DEFAULT_N_CANDIDATE,
        }
    }

    /// Sets the document weight-retention ratio.
    #[must_use]
    pub fn with_doc_retain_ratio(mut self, ratio: f32) -> Self {
        self.doc_retain_ratio = ratio;
        self
    }

    /// Enables or disables posting-weight quantization.
    #[must_use]
    pub fn with_quantization(mut self, quantize: bool) -> Self {
        self.quantize = quantize;
        self
    }

    /// Sets the accumulator-to-reorder candidate pool size.
    #[must_use]
    pub fn with_n_candidate(mut self, n_candidate: usize) -> Self {
        self.n_candidate = n_candidate;
        self
    }

    /// Validates the configuration, returning the specific invariant that
    /// was violated.
    pub fn validate(&self) -> Result<(), SindiError> {
        if self.vocab_size == 0 {
            return Err(SindiError::EmptyVocabulary);
        }
        if !(self.doc_retain_ratio > 0.0 && self.doc_retain_ratio <= 1.0) {
            return Err(SindiError::InvalidRetainRatio(self.doc_retain_ratio));
        }
        if self.n_candidate == 0 {
            return Err(SindiError::InvalidCandidatePool);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(SindiConfig::new(1000).validate().is_ok());
    }

    #[test]
    fn rejects_zero_vocab() {
        assert!(matches!(
            SindiConfig::new(0).validate(),
            Err(SindiError::EmptyVocabulary)
        ));
    }

    #[test]
    fn rejects_out_of_range_retain_ratio() {
        let cfg = SindiConfig::new(10).with_doc_retain_ratio(0.0);
        assert!(matches!(
            cfg.validate(),
            Err(SindiError::InvalidRetainRatio(_))
        ));
        let cfg = SindiConfig::new(10).with_doc_retain_ratio(1.5);
        assert!(matches!(
            cfg.validate(),
            Err(SindiError::InvalidRetainRatio(_))
        ));
    }

    #[test]
    fn rejects_zero_candidate_pool() {
        let cfg = SindiConfig::new(10).with_n_candidate(0);
        assert!(matches!(
            cfg.validate(),
            Err(SindiError::InvalidCandidatePool)
        ));
    }
}
