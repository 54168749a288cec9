//! Vector math used for ranking
//!
//! Pure functions over borrowed slices; safe to call from any thread.

use consult_common::{ConsultError, Result};

/// Dot product of two equal-length vectors
pub fn dot(a: &[f32], b: &[f32]) -> Result<f32> {
    check_lengths(a, b)?;
    Ok(a.iter().zip(b).map(|(x, y)| x * y).sum())
}

/// Euclidean (L2) norm
pub fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity `dot(a, b) / (|a| * |b|)`.
///
/// Fails with `DimensionMismatch` when lengths differ and with
/// `DegenerateVector` when either vector has zero norm (or the inputs are not
/// finite), so callers never see a NaN score. The result is clamped to
/// `[-1, 1]` to absorb rounding.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    check_lengths(a, b)?;

    let mut dot_product = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot_product += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let magnitude = norm_a.sqrt() * norm_b.sqrt();
    if magnitude == 0.0 || !magnitude.is_finite() {
        return Err(ConsultError::DegenerateVector);
    }

    let similarity = dot_product / magnitude;
    if !similarity.is_finite() {
        return Err(ConsultError::DegenerateVector);
    }

    Ok(similarity.clamp(-1.0, 1.0))
}

fn check_lengths(a: &[f32], b: &[f32]) -> Result<()> {
    if a.len() != b.len() {
        return Err(ConsultError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    Ok(())
}
