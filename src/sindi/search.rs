//! Two-stage SINDI retrieval: an approximate accumulator pass over posting
//! lists (optionally quantized), then exact full-precision reorder of the
//! surviving candidates.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::sindi::config::DEFAULT_N_CANDIDATE;
use crate::sindi::index::SindiIndex;
use crate::sparse::SparseVector;

/// A single SINDI search hit.
///
/// `score` follows the same convention as HGraph distances: it is
/// `1 - inner_product`, so smaller is closer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SindiSearchResult {
    /// Internal document id.
    pub doc_id: u32,
    /// `1 - inner_product` against the query.
    pub score: f32,
}

/// Search-time knobs for [`search`], independent of the index's build-time
/// [`crate::sindi::SindiConfig`].
#[derive(Clone, Debug, PartialEq)]
pub struct SindiSearchParams {
    /// Fraction of the query's terms, kept by descending absolute weight,
    /// to probe against the index. `1.0` probes every query term.
    pub query_prune_ratio: f32,
    /// Fraction of each probed term's postings to scan during the
    /// accumulator pass. Since postings are sorted descending by weight,
    /// this keeps the highest-weight documents for that term. `1.0` scans
    /// every posting.
    pub term_prune_ratio: f32,
    /// Number of accumulator-stage candidates carried into exact reorder.
    pub n_candidate: usize,
}

impl Default for SindiSearchParams {
    fn default() -> Self {
        Self {
            query_prune_ratio: 1.0,
            term_prune_ratio: 1.0,
            n_candidate: DEFAULT_N_CANDIDATE,
        }
    }
}

/// Runs a top-`k` search: an approximate accumulator pass over a (possibly
/// pruned) subset of the query's terms and their (possibly pruned) postings
/// selects up to `params.n_candidate` candidates, which are then rescored
/// exactly and truncated to `k`.
#[must_use]
pub fn search(
    index: &SindiIndex,
    query: &SparseVector,
    k: usize,
    params: &SindiSearchParams,
) -> Vec<SindiSearchResult> {
    if k == 0 {
        return Vec::new();
    }

    let mut query_pairs = query.to_pairs();
    if params.query_prune_ratio < 1.0 && query_pairs.len() > 1 {
        query_pairs.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
        let keep = ((query_pairs.len() as f32) * params.query_prune_ratio)
            .ceil()
            .max(1.0) as usize;
        query_pairs.truncate(keep);
    }
    let quantizer = index.quantizer();

    let mut accum: HashMap<u32, f32> = HashMap::new();
    for &(term, q_weight) in &query_pairs {
        let Some(postings) = index.terms.get(term as usize) else {
            continue;
        };

        let probe_len = if params.term_prune_ratio < 1.0 {
            ((postings.len() as f32) * params.term_prune_ratio)
                .ceil()
                .max(0.0) as usize
        } else {
            postings.len()
        }
        .min(postings.len());

        if let Some(quantizer) = quantizer.as_ref().filter(|_| !postings.weights_q.is_empty()) {
            for (i, &doc_id) in postings.ids.iter().take(probe_len).enumerate() {
                if index.is_deleted(doc_id) {
                    continue;
                }
                let weight = quantizer.dequantize_value(postings.weights_q[i]);
                *accum.entry(doc_id).or_insert(0.0) += q_weight * weight;
            }
        } else {
            for (i, &doc_id) in postings.ids.iter().take(probe_len).enumerate() {
                if index.is_deleted(doc_id) {
                    continue;
                }
                *accum.entry(doc_id).or_insert(0.0) += q_weight * postings.weights[i];
            }
        }
    }

    let n_candidate = params.n_candidate.max(k);
    let mut candidates: Vec<(u32, f32)> = accum.into_iter().collect();
    candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    candidates.truncate(n_candidate);

    let mut reordered: Vec<(u32, f32)> = candidates
        .into_iter()
        .map(|(doc_id, _)| {
            let exact: f32 = query_pairs
                .iter()
                .filter_map(|&(term, q_weight)| {
                    index
                        .terms
                        .get(term as usize)
                        .and_then(|p| p.weight_for(doc_id))
                        .map(|w| q_weight * w)
                })
                .sum();
            (doc_id, exact)
        })
        .collect();
    reordered.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    reordered.truncate(k);

    reordered
        .into_iter()
        .map(|(doc_id, inner_product)| SindiSearchResult {
            doc_id,
            score: 1.0 - inner_product,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sindi::config::SindiConfig;

    fn doc(pairs: &[(u32, f32)]) -> SparseVector {
        SparseVector::from_pairs(pairs, 100).unwrap()
    }

    #[test]
    fn finds_exact_match_first() {
        let mut index = SindiIndex::new(SindiConfig::new(100)).unwrap();
        index.add(&doc(&[(1, 1.0), (2, 1.0)])).unwrap();
        index.add(&doc(&[(5, 1.0)])).unwrap();

        let query = doc(&[(1, 1.0), (2, 1.0)]);
        let results = search(&index, &query, 2, &SindiSearchParams::default());
        assert_eq!(results[0].doc_id, 0);
        assert!(results[0].score < results.get(1).map_or(f32::MAX, |r| r.score));
    }

    #[test]
    fn respects_k() {
        let mut index = SindiIndex::new(SindiConfig::new(100)).unwrap();
        for i in 0..10 {
            index.add(&doc(&[(0, 1.0 + i as f32)])).unwrap();
        }
        let results = search(&index, &doc(&[(0, 1.0)]), 3, &SindiSearchParams::default());
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn skips_tombstoned_documents() {
        let mut index = SindiIndex::new(SindiConfig::new(100)).unwrap();
        let id = index.add(&doc(&[(1, 1.0)])).unwrap();
        index.add(&doc(&[(1, 0.5)])).unwrap();
        index.remove(id).unwrap();

        let results = search(&index, &doc(&[(1, 1.0)]), 5, &SindiSearchParams::default());
        assert!(results.iter().all(|r| r.doc_id != id));
    }

    #[test]
    fn quantized_and_exact_agree_on_ranking() {
        let mut index = SindiIndex::new(SindiConfig::new(100).with_quantization(true)).unwrap();
        for i in 0..20 {
            index
                .add(&doc(&[(1, i as f32), (2, (20 - i) as f32)]))
                .unwrap();
        }
        index.build_quantization();

        let results = search(&index, &doc(&[(1, 1.0)]), 5, &SindiSearchParams::default());
        assert_eq!(results.len(), 5);
        // Stage-1 used quantized weights, but the top candidate after exact
        // reorder must be the true highest-weight document for term 1.
        assert_eq!(results[0].doc_id, 19);
    }

    #[test]
    fn term_pruning_still_finds_the_top_weighted_document() {
        let mut index = SindiIndex::new(SindiConfig::new(100)).unwrap();
        for i in 0..20 {
            index.add(&doc(&[(0, i as f32)])).unwrap();
        }
        let params = SindiSearchParams {
            query_prune_ratio: 1.0,
            term_prune_ratio: 0.1,
            n_candidate: 50,
        };
        let results = search(&index, &doc(&[(0, 1.0)]), 1, &params);
        assert_eq!(results[0].doc_id, 19);
    }

    #[test]
    fn query_pruning_drops_the_lowest_weight_query_terms() {
        let mut index = SindiIndex::new(SindiConfig::new(100)).unwrap();
        index.add(&doc(&[(0, 1.0), (1, 1.0)])).unwrap();
        index.add(&doc(&[(2, 1.0)])).unwrap();

        let params = SindiSearchParams {
            query_prune_ratio: 0.5,
            term_prune_ratio: 1.0,
            n_candidate: 50,
        };
        // term 2 has a far larger query weight, so pruning to half the
        // query terms should drop term 0 and only match doc 1.
        let results = search(&index, &doc(&[(0, 0.01), (2, 10.0)]), 2, &params);
        assert_eq!(results[0].doc_id, 1);
    }
}
