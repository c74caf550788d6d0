//! Configuration validation errors.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Invalid viewport: left={left}, right={right}, bottom={bottom}, top={top}")]
    InvalidViewport {
        left: f64,
        right: f64,
        bottom: f64,
        top: f64,
    },

    #[error("Size must be nonzero in both dimensions, got {0}x{1}")]
    ZeroSize(u32, u32),

    #[error("At least one affine transform is required")]
    NoTransforms,

    #[error("Transform {index} has invalid weight {weight} (must be finite and >= 0)")]
    InvalidWeight { index: usize, weight: f32 },

    #[error("Oversampling must be at least 1")]
    ZeroOversampling,

    #[error("{0}")]
    Other(String),
}
