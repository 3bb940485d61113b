//! Distance functions consumed by the graph engine.
//!
//! The engine only sees the [`DistanceFunction`] trait; the host picks a
//! concrete metric when it constructs the index. All metrics return a
//! distance where **lower is closer**.
//!
//! Kernels accumulate in eight independent lanes so LLVM can turn them into
//! packed SIMD without explicit intrinsics:
//!
//! | Metric                       | Value                 | Range      |
//! |------------------------------|-----------------------|------------|
//! | [`SquaredEuclideanDistance`] | `‖a - b‖²`            | `[0, ∞)`   |
//! | [`AngularDistance`]          | `1 - cos(a, b)`       | `[0, 2]`   |
//! | [`InnerProductDistance`]     | `1 - a · b`           | unit input |

use std::sync::Arc;

const LANES: usize = 8;

/// Pluggable distance between two vectors.
///
/// Implementations must behave as a (quasi-)metric over the vector space,
/// otherwise the neighbor selection heuristic prunes the wrong links.
pub trait DistanceFunction: Send + Sync {
    /// Distance between `lhs` and `rhs`.
    fn calc(&self, lhs: &[f32], rhs: &[f32]) -> f64;
}

impl<T: DistanceFunction + ?Sized> DistanceFunction for Arc<T> {
    #[inline]
    fn calc(&self, lhs: &[f32], rhs: &[f32]) -> f64 {
        (**self).calc(lhs, rhs)
    }
}

/// Squared L2 distance. Ordering is identical to L2, without the `sqrt`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SquaredEuclideanDistance;

impl DistanceFunction for SquaredEuclideanDistance {
    #[inline]
    fn calc(&self, lhs: &[f32], rhs: &[f32]) -> f64 {
        l2_distance_squared(lhs, rhs) as f64
    }
}

/// Cosine distance for vectors of arbitrary length.
#[derive(Debug, Default, Clone, Copy)]
pub struct AngularDistance;

impl DistanceFunction for AngularDistance {
    fn calc(&self, lhs: &[f32], rhs: &[f32]) -> f64 {
        let dot = dot_product(lhs, rhs) as f64;
        let norms = (dot_product(lhs, lhs) as f64 * dot_product(rhs, rhs) as f64).sqrt();
        if norms <= f64::EPSILON {
            return 1.0;
        }
        1.0 - (dot / norms).clamp(-1.0, 1.0)
    }
}

/// `1 - dot(a, b)`; equals cosine distance when both inputs are unit length.
#[derive(Debug, Default, Clone, Copy)]
pub struct InnerProductDistance;

impl DistanceFunction for InnerProductDistance {
    #[inline]
    fn calc(&self, lhs: &[f32], rhs: &[f32]) -> f64 {
        1.0 - dot_product(lhs, rhs) as f64
    }
}

/// Dot product of two equally sized vectors.
#[inline]
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vector length mismatch");
    let mut acc = [0.0f32; LANES];
    let a_chunks = a.chunks_exact(LANES);
    let b_chunks = b.chunks_exact(LANES);
    let tail: f32 = a_chunks
        .remainder()
        .iter()
        .zip(b_chunks.remainder())
        .map(|(x, y)| x * y)
        .sum();
    for (ca, cb) in a_chunks.zip(b_chunks) {
        for i in 0..LANES {
            acc[i] += ca[i] * cb[i];
        }
    }
    acc.iter().sum::<f32>() + tail
}

/// Squared L2 distance, `‖a - b‖²`.
#[inline]
pub fn l2_distance_squared(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vector length mismatch");
    let mut acc = [0.0f32; LANES];
    let a_chunks = a.chunks_exact(LANES);
    let b_chunks = b.chunks_exact(LANES);
    let tail: f32 = a_chunks
        .remainder()
        .iter()
        .zip(b_chunks.remainder())
        .map(|(x, y)| (x - y) * (x - y))
        .sum();
    for (ca, cb) in a_chunks.zip(b_chunks) {
        for i in 0..LANES {
            let d = ca[i] - cb[i];
            acc[i] += d * d;
        }
    }
    acc.iter().sum::<f32>() + tail
}

/// L2 normalize a vector, returning a new vector. Zero vectors are returned unchanged.
pub fn l2_normalized(v: &[f32]) -> Vec<f32> {
    let norm = dot_product(v, v).sqrt();
    if norm > f32::EPSILON {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_product_basic() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [5.0, 6.0, 7.0, 8.0];
        assert!((dot_product(&a, &b) - 70.0).abs() < 1e-6);
    }

    #[test]
    fn test_dot_product_matches_naive_past_lane_width() {
        let a: Vec<f32> = (0..131).map(|i| i as f32 * 0.5).collect();
        let b: Vec<f32> = (0..131).map(|i| (130 - i) as f32).collect();
        let expected: f32 = a.iter().zip(&b).map(|(x, y)| x * y).sum();
        assert!((dot_product(&a, &b) - expected).abs() / expected.abs() < 1e-5);
    }

    #[test]
    fn test_squared_euclidean() {
        let d = SquaredEuclideanDistance.calc(&[0.0, 0.0, 0.0], &[3.0, 4.0, 0.0]);
        assert!((d - 25.0).abs() < 1e-9);
        assert_eq!(SquaredEuclideanDistance.calc(&[1.5, -2.0], &[1.5, -2.0]), 0.0);
    }

    #[test]
    fn test_angular_orthogonal_and_identical() {
        let d = AngularDistance.calc(&[1.0, 0.0], &[0.0, 2.0]);
        assert!((d - 1.0).abs() < 1e-9);
        let d = AngularDistance.calc(&[3.0, 4.0], &[6.0, 8.0]);
        assert!(d.abs() < 1e-6);
    }

    #[test]
    fn test_angular_zero_vector_is_neutral() {
        assert_eq!(AngularDistance.calc(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }

    #[test]
    fn test_inner_product_on_unit_vectors() {
        let a = l2_normalized(&[1.0, 1.0]);
        let d = InnerProductDistance.calc(&a, &a);
        assert!(d.abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalized_zero_vector() {
        let v = vec![0.0f32; 16];
        assert!(l2_normalized(&v).iter().all(|&x| x == 0.0));
    }
}
