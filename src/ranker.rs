//! Similarity ranking
//! Cosine similarity between vectors and top-k selection over stored items

use crate::store::StoredItem;
use crate::vector::{dot_product, magnitude};
use serde::Serialize;

/// A stored item scored against one query vector
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredItem {
    #[serde(flatten)]
    pub item: StoredItem,
    pub similarity: f64,
}

/// Cosine similarity
/// cos = dot(a, b) / (||a|| * ||b||)
///
/// Vectors of different lengths and zero vectors have no direction to
/// compare, so both score 0 instead of failing.
///
/// # Examples
///
/// ```
/// use vecviz::ranker::cosine_similarity;
///
/// assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-12);
/// assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
/// assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
/// assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
/// ```
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mag_a = magnitude(a);
    let mag_b = magnitude(b);
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    (dot_product(a, b) / (mag_a * mag_b)).clamp(-1.0, 1.0)
}

/// Returns the `k` items most similar to `query`, best first.
///
/// Items with equal scores keep their relative order from `items`. Asking
/// for more items than exist returns all of them ranked; `k == 0` returns
/// nothing. The input slice is left untouched.
pub fn top_k(query: &[f64], items: &[StoredItem], k: usize) -> Vec<ScoredItem> {
    if k == 0 {
        return Vec::new();
    }

    let mut ranked: Vec<ScoredItem> = Vec::with_capacity(k.min(items.len()) + 1);
    for item in items {
        let similarity = cosine_similarity(query, item.vector());
        // insert after every equal score so earlier inputs stay ahead
        let position = ranked.partition_point(|scored| scored.similarity >= similarity);
        if position < k {
            ranked.insert(position, ScoredItem { item: item.clone(), similarity });
            ranked.truncate(k);
        }
    }

    ranked
}
