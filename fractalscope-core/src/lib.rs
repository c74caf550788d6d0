//! Shared types and CPU reference algorithms for the fractal engines.
//!
//! Nothing in this crate touches the GPU. The GPU crate generates shaders
//! whose per-pixel arithmetic mirrors the functions here, so tests can run
//! the same configuration on both sides and compare results.

pub mod affine;
pub mod config;
pub mod error;
pub mod escape_time;
pub mod ifs;
pub mod initial_set;
pub mod packed;
pub mod palette;
pub mod pixel_grid;
pub mod random;
pub mod viewport;

pub use affine::{cumulative_weights, select_transform, selection_mode, AffineTransform, SelectionMode};
pub use config::{
    barnsley_fern, barnsley_fern_chaos, sierpinski_carpet, sierpinski_triangle, AffineConfig,
    FractalKind, MandelbrotConfig, DEFAULT_AFFINE_SIZE,
};
pub use error::ConfigError;
pub use escape_time::{EscapeGrid, PixelState, ESCAPE_RADIUS_SQ};
pub use ifs::{GridFrame, IfsGrid};
pub use initial_set::{InitialSet, InitialSetKind};
pub use palette::{AffineColors, Color, EscapePalette, Falloff};
pub use pixel_grid::{find_best_index, find_best_pixel};
pub use viewport::Viewport;
