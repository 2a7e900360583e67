//! Vector arithmetic shared by the index and the scoring layer.

/// Added to the norm before dividing so zero vectors stay finite.
pub const NORM_EPSILON: f32 = 1e-12;

/// Euclidean norm of a vector.
pub fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Inner product of two vectors.
///
/// Only the common prefix is used when lengths differ; callers validate
/// dimensions before getting here.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Scale `v` to unit length in place.
pub fn l2_normalize_in_place(v: &mut [f32]) {
    let n = norm(v) + NORM_EPSILON;
    for x in v.iter_mut() {
        *x /= n;
    }
}

/// Return a unit-length copy of `v`.
///
/// A zero vector maps to a zero vector.
pub fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let mut out = v.to_vec();
    l2_normalize_in_place(&mut out);
    out
}

/// Cosine similarity of two arbitrary vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    dot(&l2_normalize(a), &l2_normalize(b))
}
