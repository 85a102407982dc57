//! Similarity metrics over sparse rating vectors.

use data_loader::ProductId;
use std::collections::HashMap;

/// Cosine similarity between two sparse vectors, restricted to the keys
/// both vectors share (the co-rated products).
///
/// Users with no co-rated products get 0.0, as do zero-norm overlaps.
/// Symmetric by construction: `cosine(u, v) == cosine(v, u)`.
pub fn cosine_similarity(
    u: &HashMap<ProductId, f64>,
    v: &HashMap<ProductId, f64>,
) -> f64 {
    // Iterate the smaller map; the product of norms is order-independent.
    let (small, large) = if u.len() <= v.len() { (u, v) } else { (v, u) };

    let mut dot = 0.0;
    let mut norm_small = 0.0;
    let mut norm_large = 0.0;
    for (key, &a) in small {
        if let Some(&b) = large.get(key) {
            dot += a * b;
            norm_small += a * a;
            norm_large += b * b;
        }
    }

    if norm_small == 0.0 || norm_large == 0.0 {
        return 0.0;
    }
    dot / (norm_small.sqrt() * norm_large.sqrt())
}
