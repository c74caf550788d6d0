//! Affine maps and the rule that picks which of them fire.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// A contractive affine map `p' = M p + offset` with a selection weight.
///
/// `matrix` is row-major: `x' = m[0][0] x + m[0][1] y + offset[0]`.
/// A weight of 0 means the map only takes part in deterministic fan-out.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform {
    pub matrix: [[f32; 2]; 2],
    pub offset: [f32; 2],
    #[serde(default)]
    pub weight: f32,
}

impl AffineTransform {
    pub const fn new(matrix: [[f32; 2]; 2], offset: [f32; 2]) -> Self {
        Self {
            matrix,
            offset,
            weight: 0.0,
        }
    }

    /// Uniform scale by `s` followed by a translation.
    pub const fn scale(s: f32, offset: [f32; 2]) -> Self {
        Self::new([[s, 0.0], [0.0, s]], offset)
    }

    pub const fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    pub fn apply(&self, p: (f32, f32)) -> (f32, f32) {
        let m = &self.matrix;
        (
            m[0][0] * p.0 + m[0][1] * p.1 + self.offset[0],
            m[1][0] * p.0 + m[1][1] * p.1 + self.offset[1],
        )
    }
}

/// How the iterate pass chooses transforms for an active pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionMode {
    /// Every transform fires for every active pixel.
    FanOut,
    /// One transform per sample, drawn by weight.
    Probabilistic,
}

/// Probabilistic only when at least one weight is strictly positive.
pub fn selection_mode(transforms: &[AffineTransform]) -> SelectionMode {
    if transforms.iter().any(|t| t.weight > 0.0) {
        SelectionMode::Probabilistic
    } else {
        SelectionMode::FanOut
    }
}

pub fn validate_transforms(transforms: &[AffineTransform]) -> Result<(), ConfigError> {
    if transforms.is_empty() {
        return Err(ConfigError::NoTransforms);
    }
    for (index, t) in transforms.iter().enumerate() {
        if !t.weight.is_finite() || t.weight < 0.0 {
            return Err(ConfigError::InvalidWeight {
                index,
                weight: t.weight,
            });
        }
    }
    Ok(())
}

/// Normalized cumulative weights, one entry per transform.
///
/// Entries from the last positively weighted transform onwards are exactly
/// 1.0, so a draw in [0, 1) can never land on a trailing zero-weight map.
/// Returns an all-ones table when no weight is positive.
pub fn cumulative_weights(transforms: &[AffineTransform]) -> Vec<f32> {
    let total: f64 = transforms.iter().map(|t| t.weight.max(0.0) as f64).sum();
    if total <= 0.0 {
        return vec![1.0; transforms.len()];
    }

    let last_positive = transforms
        .iter()
        .rposition(|t| t.weight > 0.0)
        .unwrap_or(transforms.len().saturating_sub(1));

    let mut running = 0.0_f64;
    transforms
        .iter()
        .enumerate()
        .map(|(i, t)| {
            running += t.weight.max(0.0) as f64;
            if i >= last_positive {
                1.0
            } else {
                (running / total) as f32
            }
        })
        .collect()
}

/// Inverse-CDF lookup: first index whose cumulative weight exceeds `r`.
pub fn select_transform(cdf: &[f32], r: f32) -> usize {
    cdf.iter()
        .position(|&c| r < c)
        .unwrap_or(cdf.len().saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weighted(weights: &[f32]) -> Vec<AffineTransform> {
        weights
            .iter()
            .map(|&w| AffineTransform::scale(0.5, [0.0, 0.0]).with_weight(w))
            .collect()
    }

    #[test]
    fn all_zero_weights_select_fan_out() {
        assert_eq!(selection_mode(&weighted(&[0.0, 0.0, 0.0])), SelectionMode::FanOut);
        assert_eq!(
            selection_mode(&weighted(&[0.0, 0.3, 0.0])),
            SelectionMode::Probabilistic
        );
    }

    #[test]
    fn single_positive_weight_always_selected() {
        for position in 0..3 {
            let mut w = [0.0; 3];
            w[position] = 1.0;
            let cdf = cumulative_weights(&weighted(&w));
            for i in 0..1000 {
                let r = i as f32 / 1000.0;
                assert_eq!(select_transform(&cdf, r), position);
            }
            assert_eq!(select_transform(&cdf, 0.999_999_9), position);
        }
    }

    #[test]
    fn cdf_is_normalized_and_monotone() {
        let cdf = cumulative_weights(&weighted(&[0.01, 0.85, 0.07, 0.07]));
        assert_eq!(cdf.len(), 4);
        assert!((cdf[0] - 0.01).abs() < 1e-6);
        assert!((cdf[1] - 0.86).abs() < 1e-6);
        assert!((cdf[2] - 0.93).abs() < 1e-6);
        assert_eq!(cdf[3], 1.0);
        assert!(cdf.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn selection_frequencies_follow_weights() {
        let cdf = cumulative_weights(&weighted(&[1.0, 3.0]));
        let n = 10_000;
        let picks = (0..n)
            .filter(|&i| select_transform(&cdf, (i as f32 + 0.5) / n as f32) == 1)
            .count();
        assert!((picks as f64 / n as f64 - 0.75).abs() < 0.01);
    }

    #[test]
    fn rejects_empty_and_negative() {
        assert_eq!(validate_transforms(&[]), Err(ConfigError::NoTransforms));
        assert!(matches!(
            validate_transforms(&weighted(&[0.5, -0.1])),
            Err(ConfigError::InvalidWeight { index: 1, .. })
        ));
        assert!(validate_transforms(&weighted(&[0.0, 0.0])).is_ok());
    }

    #[test]
    fn apply_uses_row_major_matrix() {
        let t = AffineTransform::new([[0.85, 0.04], [-0.04, 0.85]], [0.0, 1.6]);
        let (x, y) = t.apply((1.0, 2.0));
        assert!((x - (0.85 + 0.08)).abs() < 1e-6);
        assert!((y - (-0.04 + 1.7 + 1.6)).abs() < 1e-6);
    }
}
