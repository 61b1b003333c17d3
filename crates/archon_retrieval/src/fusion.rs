//! Reciprocal-rank fusion (spec §4.7 step 5).

use std::collections::HashMap;

use archon_protocol::PageId;

pub const K_RRF: f64 = 60.0;
const MISSING_RANK: usize = 999;

/// Fuses two rankings into `(page_id, rrf_score, vector_similarity)`
/// triples, sorted by `rrf_score` descending. `vector_similarity` is
/// `None` for a candidate that appeared only in the lexical ranking; it
/// feeds the "higher vector similarity wins" tie-break at the assembly
/// stage.
pub fn fuse(vector: &[(PageId, f64)], text: &[(PageId, f64)]) -> Vec<(PageId, f64, Option<f64>)> {
    let mut vector_rank: HashMap<PageId, usize> = HashMap::new();
    let mut vector_similarity: HashMap<PageId, f64> = HashMap::new();
    for (rank, (id, score)) in vector.iter().enumerate() {
        vector_rank.insert(*id, rank + 1);
        vector_similarity.insert(*id, *score);
    }

    let mut text_rank: HashMap<PageId, usize> = HashMap::new();
    for (rank, (id, _)) in text.iter().enumerate() {
        text_rank.insert(*id, rank + 1);
    }

    let mut ids: Vec<PageId> = vector_rank.keys().copied().collect();
    for id in text_rank.keys() {
        if !vector_rank.contains_key(id) {
            ids.push(*id);
        }
    }

    let mut fused: Vec<(PageId, f64, Option<f64>)> = ids
        .into_iter()
        .map(|id| {
            let vr = vector_rank.get(&id).copied().unwrap_or(MISSING_RANK);
            let tr = text_rank.get(&id).copied().unwrap_or(MISSING_RANK);
            let rrf = 1.0 / (K_RRF + vr as f64) + 1.0 / (K_RRF + tr as f64);
            (id, rrf, vector_similarity.get(&id).copied())
        })
        .collect();

    fused.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    fused
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u128) -> PageId {
        PageId(uuid::Uuid::from_u128(n))
    }

    #[test]
    fn doc_in_both_rankings_outranks_doc_in_one() {
        let vector = vec![(id(1), 0.9), (id(2), 0.5)];
        let text = vec![(id(1), 3.0)];
        let fused = fuse(&vector, &text);
        assert_eq!(fused[0].0, id(1));
    }

    #[test]
    fn missing_document_does_not_reorder_others() {
        let vector = vec![(id(1), 0.9), (id(2), 0.5)];
        let text = vec![(id(1), 3.0), (id(2), 1.0)];
        let before = fuse(&vector, &text);

        let vector2 = vec![(id(1), 0.9), (id(2), 0.5), (id(3), 0.1)];
        let text2 = vec![(id(1), 3.0), (id(2), 1.0)];
        let after = fuse(&vector2, &text2);

        let before_order: Vec<_> = before.iter().map(|r| r.0).collect();
        let after_order: Vec<_> = after.iter().filter(|r| r.0 != id(3)).map(|r| r.0).collect();
        assert_eq!(before_order, after_order);
    }

    #[test]
    fn text_only_candidate_gets_no_vector_similarity() {
        let vector = vec![(id(1), 0.9)];
        let text = vec![(id(2), 3.0)];
        let fused = fuse(&vector, &text);
        let text_only = fused.iter().find(|r| r.0 == id(2)).unwrap();
        assert_eq!(text_only.2, None);
    }
}
