//! Term-major posting lists: per-term parallel arrays of document id and
//! weight, kept sorted by descending weight so query-time pruning (keep
//! the top fraction of a term's postings) is a prefix truncation rather
//! than a sort on every search.

use serde::{Deserialize, Serialize};

/// The postings for a single term: documents that carry a non-zero (and
/// unpruned) weight for this term, sorted descending by weight.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub(crate) struct PostingList {
    pub(crate) ids: Vec<u32>,
    pub(crate) weights: Vec<f32>,
    #[serde(default)]
    pub(crate) weights_q: Vec<u8>,
}

impl PostingList {
    #[inline]
    pub(crate) fn push(&mut self, doc_id: u32, weight: f32) {
        self.ids.push(doc_id);
        self.weights.push(weight);
    }

    /// Re-sorts `ids`/`weights` (and `weights_q`, if already populated) by
    /// descending weight. Call after appending new postings for a term;
    /// quantization is expected to run after this, so `weights_q` is
    /// usually still empty when this is called.
    pub(crate) fn sort_by_weight_desc(&mut self) {
        let len = self.ids.len();
        let mut order: Vec<usize> = (0..len).collect();
        order.sort_by(|&a, &b| self.weights[b].total_cmp(&self.weights[a]));

        let ids = std::mem::take(&mut self.ids);
        let weights = std::mem::take(&mut self.weights);
        let weights_q = std::mem::take(&mut self.weights_q);
        let has_q = weights_q.len() == len;

        self.ids = order.iter().map(|&i| ids[i]).collect();
        self.weights = order.iter().map(|&i| weights[i]).collect();
        self.weights_q = if has_q {
            order.iter().map(|&i| weights_q[i]).collect()
        } else {
            weights_q
        };
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.ids.len()
    }

    /// Exact full-precision weight for `doc_id`, if this term's postings
    /// carry one. A linear scan, since postings are ordered by weight
    /// rather than by id.
    pub(crate) fn weight_for(&self, doc_id: u32) -> Option<f32> {
        self.ids
            .iter()
            .position(|&id| id == doc_id)
            .map(|i| self.weights[i])
    }

    pub(crate) fn memory_usage(&self) -> usize {
        self.ids.capacity() * std::mem::size_of::<u32>()
            + self.weights.capacity() * std::mem::size_of::<f32>()
            + self.weights_q.capacity()
    }
}

/// Keeps the smallest prefix of `(term, weight)` pairs, ordered by
/// descending absolute weight, whose cumulative weight mass reaches
/// `retain_ratio` of the document's total. `retain_ratio >= 1.0` is a no-op.
pub(crate) fn prune_document(mut pairs: Vec<(u32, f32)>, retain_ratio: f32) -> Vec<(u32, f32)> {
    if retain_ratio >= 1.0 || pairs.len() <= 1 {
        return pairs;
    }

    let total: f32 = pairs.iter().map(|(_, w)| w.abs()).sum();
    if total <= 0.0 {
        return pairs;
    }

    pairs.sort_by(|a, b| {
        b.1.abs()
            .partial_cmp(&a.1.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let target = retain_ratio * total;
    let mut cumulative = 0.0f32;
    let mut cutoff = pairs.len();
    for (i, (_, w)) in pairs.iter().enumerate() {
        cumulative += w.abs();
        if cumulative >= target {
            cutoff = i + 1;
            break;
        }
    }
    pairs.truncate(cutoff);
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_for_finds_present_doc() {
        let mut p = PostingList::default();
        p.push(3, 1.0);
        p.push(7, 2.0);
        p.push(9, 3.0);
        assert_eq!(p.weight_for(7), Some(2.0));
        assert_eq!(p.weight_for(4), None);
    }

    #[test]
    fn sort_by_weight_desc_reorders_ids_and_weights_together() {
        let mut p = PostingList::default();
        p.push(0, 1.0);
        p.push(1, 3.0);
        p.push(2, 2.0);
        p.sort_by_weight_desc();
        assert_eq!(p.ids, vec![1, 2, 0]);
        assert_eq!(p.weights, vec![3.0, 2.0, 1.0]);
        assert_eq!(p.weight_for(0), Some(1.0));
        assert_eq!(p.weight_for(1), Some(3.0));
    }

    #[test]
    fn prune_keeps_everything_at_ratio_one() {
        let pairs = vec![(0, 1.0), (1, 2.0), (2, 3.0)];
        let kept = prune_document(pairs.clone(), 1.0);
        assert_eq!(kept.len(), pairs.len());
    }

    #[test]
    fn prune_drops_low_weight_tail() {
        // total = 10, retaining 0.8 -> need cumulative >= 8: 5 + 3 = 8 suffices.
        let pairs = vec![(0, 5.0), (1, 3.0), (2, 1.0), (3, 1.0)];
        let kept = prune_document(pairs, 0.8);
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().any(|(t, _)| *t == 0));
        assert!(kept.iter().any(|(t, _)| *t == 1));
    }

    #[test]
    fn prune_single_term_is_unchanged() {
        let pairs = vec![(5, 1.0)];
        let kept = prune_document(pairs.clone(), 0.5);
        assert_eq!(kept, pairs);
    }
}
