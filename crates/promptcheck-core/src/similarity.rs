//! Embedding similarity.
//!
//! Cosine similarity lies in [-1, 1]; text-embedding models in practice
//! produce values in [0, 1]. Arithmetic is done in f64.

/// Cosine similarity of two vectors.
///
/// Returns 0.0 for vectors of different length, empty vectors, or a zero
/// norm on either side.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    // sqrt(a*b) rather than sqrt(a)*sqrt(b): identical vectors give exactly 1.
    (dot / (norm_a * norm_b).sqrt()).clamp(-1.0, 1.0)
}

/// Mean cosine similarity over all C(n, 2) distinct pairs.
///
/// `None` when fewer than two vectors are given.
pub fn mean_pairwise_similarity(vectors: &[Vec<f32>]) -> Option<f64> {
    if vectors.len() < 2 {
        return None;
    }

    let mut sum = 0.0;
    let mut pairs = 0usize;
    for i in 0..vectors.len() {
        for j in (i + 1)..vectors.len() {
            sum += cosine_similarity(&vectors[i], &vectors[j]);
            pairs += 1;
        }
    }

    Some(sum / pairs as f64)
}
