//! Weighted reciprocal-rank fusion of per-backend ranked lists.

use std::cmp::Ordering;
use std::collections::HashMap;

use grimoire_core::types::{FragmentId, SearchHit};

/// Standard reciprocal-rank constant. Dampens the gap between top ranks so
/// a fragment ranked #1 by one backend cannot drown out consensus picks.
pub const RRF_K: f32 = 60.0;

#[derive(Debug, Clone)]
pub struct RankedHit {
    pub id: FragmentId,
    pub score: f32,
}

/// Merge the dense and sparse ranked lists into one combined ranking.
///
/// Each backend contributes `weight / (RRF_K + rank)` per fragment, rank
/// 1-indexed; fragments present in only one list receive that list's
/// contribution only. The output is deduplicated by id and sorted by
/// combined score descending. Equal scores keep first-seen order with the
/// dense list processed first, so repeated invocations over the same
/// inputs return identical output.
pub fn fuse(
    dense: &[SearchHit],
    sparse: &[SearchHit],
    dense_weight: f32,
    sparse_weight: f32,
) -> Vec<RankedHit> {
    let mut order: Vec<FragmentId> = Vec::new();
    let mut scores: HashMap<FragmentId, f32> = HashMap::new();
    for (weight, hits) in [(dense_weight, dense), (sparse_weight, sparse)] {
        for (rank, hit) in hits.iter().enumerate() {
            let contribution = weight / (RRF_K + (rank + 1) as f32);
            match scores.get_mut(&hit.id) {
                Some(score) => *score += contribution,
                None => {
                    order.push(hit.id.clone());
                    scores.insert(hit.id.clone(), contribution);
                }
            }
        }
    }
    let mut fused: Vec<RankedHit> = order
        .into_iter()
        .map(|id| {
            let score = scores.get(&id).copied().unwrap_or_default();
            RankedHit { id, score }
        })
        .collect();
    // stable sort keeps first-seen order for ties
    fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    fused
}

#[cfg(test)]
mod tests {
    use super::*;
    use grimoire_core::types::SourceKind;

    fn hit(id: &str, score: f32, ordinal: usize, source: SourceKind) -> SearchHit {
        SearchHit { id: id.to_string(), score, ordinal, source }
    }

    fn dense(id: &str, score: f32, ordinal: usize) -> SearchHit {
        hit(id, score, ordinal, SourceKind::Dense)
    }

    fn sparse(id: &str, score: f32, ordinal: usize) -> SearchHit {
        hit(id, score, ordinal, SourceKind::Sparse)
    }

    #[test]
    fn fragments_in_both_lists_rank_first() {
        let dense_hits = vec![dense("a", 0.9, 0), dense("b", 0.8, 1), dense("c", 0.7, 2)];
        let sparse_hits = vec![sparse("c", 12.0, 2), sparse("d", 5.0, 3)];
        let fused = fuse(&dense_hits, &sparse_hits, 0.6, 0.4);
        assert_eq!(fused.len(), 4);
        assert_eq!(fused[0].id, "c", "consensus pick wins");
    }

    #[test]
    fn contributions_follow_the_weighted_formula() {
        let dense_hits = vec![dense("a", 0.9, 0)];
        let sparse_hits = vec![sparse("a", 3.0, 0), sparse("b", 2.0, 1)];
        let fused = fuse(&dense_hits, &sparse_hits, 0.6, 0.4);
        let a = fused.iter().find(|h| h.id == "a").expect("a");
        let b = fused.iter().find(|h| h.id == "b").expect("b");
        let expected_a = 0.6 / (RRF_K + 1.0) + 0.4 / (RRF_K + 1.0);
        let expected_b = 0.4 / (RRF_K + 2.0);
        assert!((a.score - expected_a).abs() < 1e-6);
        assert!((b.score - expected_b).abs() < 1e-6);
    }

    #[test]
    fn raw_backend_scores_do_not_leak_in() {
        // BM25 scores are on a wildly different scale than cosine
        // similarity; only ranks may matter.
        let dense_hits = vec![dense("a", 0.01, 0)];
        let sparse_hits = vec![sparse("b", 900.0, 1)];
        let fused = fuse(&dense_hits, &sparse_hits, 0.6, 0.4);
        assert_eq!(fused[0].id, "a", "rank 1 at weight 0.6 beats rank 1 at weight 0.4");
    }

    #[test]
    fn equal_scores_keep_dense_first_order() {
        let dense_hits = vec![dense("a", 0.5, 0)];
        let sparse_hits = vec![sparse("b", 0.5, 1)];
        let fused = fuse(&dense_hits, &sparse_hits, 0.5, 0.5);
        assert_eq!(fused[0].id, "a");
        assert_eq!(fused[1].id, "b");
        assert!((fused[0].score - fused[1].score).abs() < 1e-9);
    }

    #[test]
    fn repeated_invocations_are_identical() {
        let dense_hits = vec![dense("a", 0.9, 0), dense("b", 0.8, 1)];
        let sparse_hits = vec![sparse("b", 4.0, 1), sparse("c", 3.0, 2), sparse("d", 2.0, 3)];
        let first: Vec<String> = fuse(&dense_hits, &sparse_hits, 0.6, 0.4).into_iter().map(|h| h.id).collect();
        for _ in 0..20 {
            let again: Vec<String> =
                fuse(&dense_hits, &sparse_hits, 0.6, 0.4).into_iter().map(|h| h.id).collect();
            assert_eq!(first, again);
        }
    }

    #[test]
    fn empty_lists_fuse_to_empty() {
        assert!(fuse(&[], &[], 0.6, 0.4).is_empty());
    }
}
