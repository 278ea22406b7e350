//! L2 normalization and inner-product math
//!
//! Every vector that enters the index — at build time or at query time —
//! passes through here first. For unit-norm vectors, dot product equals
//! cosine similarity:
//!
//! ```text
//! cos(θ) = A · B  when ||A|| = ||B|| = 1
//! ```
//!
//! Two explicit entry points (`normalize_one`, `normalize_batch`) share the
//! single in-place routine, so the single-vector and batch paths produce
//! bit-identical results for the same input.
//!
//! Zero vectors (norm below `f32::EPSILON`) are returned unchanged rather
//! than divided by zero, so no NaN can leak into similarity scores.

/// Inner product of two equal-length vectors.
///
/// Scalar loop; LLVM auto-vectorizes this with `-C target-cpu=native`.
#[inline(always)]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vector length mismatch");
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// L2 norm (Euclidean length) of a vector.
#[inline]
pub fn l2_norm(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}

/// Normalize a vector to unit length in place.
///
/// Zero vectors are left untouched.
pub fn normalize_in_place(v: &mut [f32]) {
    let norm = l2_norm(v);
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Normalize a single vector, returning a new unit-length vector.
pub fn normalize_one(v: &[f32]) -> Vec<f32> {
    let mut out = v.to_vec();
    normalize_in_place(&mut out);
    out
}

/// Normalize a batch of vectors, preserving order.
pub fn normalize_batch(batch: &[Vec<f32>]) -> Vec<Vec<f32>> {
    batch.iter().map(|v| normalize_one(v)).collect()
}

/// Check whether a vector is unit length within `tolerance`.
#[inline]
pub fn is_normalized(v: &[f32], tolerance: f32) -> bool {
    (dot(v, v) - 1.0).abs() < tolerance
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_basic() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [5.0, 6.0, 7.0, 8.0];

        // 1*5 + 2*6 + 3*7 + 4*8 = 70
        assert!((dot(&a, &b) - 70.0).abs() < 1e-6);
    }

    #[test]
    fn test_dot_orthogonal_and_self() {
        let a = normalize_one(&[1.0, 0.0, 0.0]);
        let b = normalize_one(&[0.0, 1.0, 0.0]);

        assert!((dot(&a, &b) - 0.0).abs() < 1e-6);
        assert!((dot(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_direction_preserved() {
        let v = normalize_one(&[3.0, 4.0]);

        // 3-4-5 triangle: 3/5, 4/5
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_unit_length() {
        for raw in [
            vec![1.0f32, 2.0, 3.0],
            vec![-7.5, 0.25, 100.0, 0.001],
            vec![1e-3; 384],
        ] {
            let v = normalize_one(&raw);
            assert!(
                (l2_norm(&v) - 1.0).abs() < 1e-5,
                "norm was {}",
                l2_norm(&v)
            );
        }
    }

    #[test]
    fn test_normalize_idempotent() {
        let once = normalize_one(&[0.3, -1.2, 4.5]);
        let twice = normalize_one(&once);

        for (a, b) in once.iter().zip(&twice) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_normalize_zero_vector_unchanged() {
        let v = normalize_one(&[0.0; 64]);
        assert!(v.iter().all(|&x| x == 0.0), "zero vector must stay zero");
        assert!(v.iter().all(|x| x.is_finite()), "no NaN/Inf allowed");
    }

    #[test]
    fn test_batch_matches_single() {
        let batch = vec![vec![1.0, 1.0], vec![0.0, 0.0], vec![-2.0, 5.0]];
        let normalized = normalize_batch(&batch);

        assert_eq!(normalized.len(), 3);
        for (row, raw) in normalized.iter().zip(&batch) {
            assert_eq!(row, &normalize_one(raw));
        }
    }

    #[test]
    fn test_is_normalized() {
        assert!(is_normalized(&normalize_one(&[1.0, 2.0, 3.0]), 1e-5));
        assert!(!is_normalized(&[1.0, 2.0, 3.0], 1e-5));
        assert!(is_normalized(&[1.0, 0.0], 1e-6));
    }
}
