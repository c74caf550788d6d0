//! How the point-count grid is seeded before the first iteration.

use serde::{Deserialize, Serialize};

/// Seed description for the affine engine.
///
/// `points` are fractal-space coordinates snapped to their nearest pixel.
/// `distribution` is a WGSL scalar expression over `x` and `y` in [0, 1]
/// giving the probability that a pixel is seeded.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InitialSet {
    #[serde(default)]
    pub points: Vec<(f64, f64)>,
    #[serde(default)]
    pub distribution: Option<String>,
}

/// Derived from which fields of an [`InitialSet`] are populated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitialSetKind {
    Points,
    Distribution,
    Both,
    Invalid,
}

impl InitialSet {
    pub fn points(points: Vec<(f64, f64)>) -> Self {
        Self {
            points,
            distribution: None,
        }
    }

    pub fn distribution(expression: impl Into<String>) -> Self {
        Self {
            points: Vec::new(),
            distribution: Some(expression.into()),
        }
    }

    pub fn both(points: Vec<(f64, f64)>, expression: impl Into<String>) -> Self {
        Self {
            points,
            distribution: Some(expression.into()),
        }
    }

    /// The single point at the origin.
    pub fn origin() -> Self {
        Self::points(vec![(0.0, 0.0)])
    }

    /// Distribution expression, if present and not blank.
    pub fn expression(&self) -> Option<&str> {
        self.distribution
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }

    pub fn kind(&self) -> InitialSetKind {
        match (!self.points.is_empty(), self.expression().is_some()) {
            (true, true) => InitialSetKind::Both,
            (true, false) => InitialSetKind::Points,
            (false, true) => InitialSetKind::Distribution,
            (false, false) => InitialSetKind::Invalid,
        }
    }

    /// Replace an empty seed with the origin point; anything else is kept.
    pub fn normalized(self) -> Self {
        if self.kind() == InitialSetKind::Invalid {
            log::warn!("Initial set has neither points nor a distribution, seeding the origin");
            Self::origin()
        } else {
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_derived_from_fields() {
        assert_eq!(InitialSet::origin().kind(), InitialSetKind::Points);
        assert_eq!(
            InitialSet::distribution("x * y").kind(),
            InitialSetKind::Distribution
        );
        assert_eq!(
            InitialSet::both(vec![(0.5, 0.5)], "1.0").kind(),
            InitialSetKind::Both
        );
        assert_eq!(InitialSet::default().kind(), InitialSetKind::Invalid);
    }

    #[test]
    fn blank_expression_counts_as_absent() {
        let set = InitialSet::distribution("   ");
        assert_eq!(set.kind(), InitialSetKind::Invalid);
        assert_eq!(set.expression(), None);
    }

    #[test]
    fn invalid_normalizes_to_origin() {
        assert_eq!(InitialSet::default().normalized(), InitialSet::origin());
        let kept = InitialSet::distribution("x");
        assert_eq!(kept.clone().normalized(), kept);
    }
}
