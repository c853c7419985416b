//! Cosine similarity, plain and Fisher-importance-weighted.

/// Calculate cosine similarity between two vectors.
///
/// Returns a value in [-1, 1]. Mismatched dimensions, empty vectors, and
/// zero-norm inputs all yield 0.0 rather than an error, so callers can
/// rank candidates without special-casing degenerate rows.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}

/// Cosine similarity with every coordinate scaled by `1 + importance[i]`.
///
/// Dimensions the Fisher matrix marks as important dominate both the dot
/// product and the norms, so two vectors that agree on consequential
/// dimensions rank above two that agree on noise. An importance slice
/// shorter than the vectors is treated as zero-extended.
#[must_use]
pub fn importance_weighted_similarity(a: &[f32], b: &[f32], importance: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot_product = 0.0f32;
    let mut magnitude_a = 0.0f32;
    let mut magnitude_b = 0.0f32;

    for i in 0..a.len() {
        let weight = 1.0 + importance.get(i).copied().unwrap_or(0.0);
        dot_product += weight * a[i] * b[i];
        magnitude_a += weight * a[i] * a[i];
        magnitude_b += weight * b[i] * b[i];
    }

    let magnitude_a = magnitude_a.sqrt();
    let magnitude_b = magnitude_b.sqrt();
    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_vectors() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_orthogonal_vectors() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_opposite_vectors() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![-1.0, -2.0, -3.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_vector_similarity_is_zero() {
        let a = vec![1.0, 2.0];
        let zero = vec![0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &zero), 0.0);
    }

    #[test]
    fn test_mismatched_dimensions() {
        let a = vec![1.0, 2.0];
        let b = vec![1.0, 2.0, 3.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
        assert_eq!(importance_weighted_similarity(&a, &b, &[]), 0.0);
    }

    #[test]
    fn test_uniform_importance_matches_plain_cosine() {
        let a = vec![0.3, -0.7, 0.2];
        let b = vec![0.1, 0.5, -0.9];
        let importance = vec![0.0, 0.0, 0.0];
        let plain = cosine_similarity(&a, &b);
        let weighted = importance_weighted_similarity(&a, &b, &importance);
        assert!((plain - weighted).abs() < 1e-6);
    }

    #[test]
    fn test_importance_shifts_ranking() {
        // a and b agree on dimension 0 and disagree on dimension 1.
        let query = vec![1.0, 1.0];
        let a = vec![1.0, -1.0];
        let baseline = cosine_similarity(&query, &a);

        // Weighting dimension 0 heavily should pull the pair closer.
        let weighted = importance_weighted_similarity(&query, &a, &[10.0, 0.0]);
        assert!(weighted > baseline);

        // Weighting the disagreeing dimension pushes them apart.
        let penalized = importance_weighted_similarity(&query, &a, &[0.0, 10.0]);
        assert!(penalized < baseline);
    }

    #[test]
    fn test_weighted_self_similarity_is_one() {
        let v = vec![0.5, 0.25, -0.75];
        let importance = vec![2.0, 0.1, 5.0];
        assert!((importance_weighted_similarity(&v, &v, &importance) - 1.0).abs() < 1e-6);
    }
}
