//! GPU fractal engines built on wgpu.
//!
//! Two engines implement [`Fractal`]: an affine IFS renderer over a
//! point-count grid, and an incremental escape-time Mandelbrot renderer with
//! packed double precision. [`Session`] holds the per-window state a shell
//! drives each frame.

mod affine_engine;
mod buffers;
mod device;
mod error;
mod fractal;
mod mandelbrot_engine;
mod presenter;
mod program;
mod readback;
pub mod shaders;
mod session;
mod target;
#[cfg(test)]
mod tests;

pub use affine_engine::AffineEngine;
pub use buffers::{
    packed_bounds, AffineUniforms, MandelbrotUniforms, PresentUniforms, ReprojectUniforms,
    COLOR_FORMAT,
};
pub use device::{GpuAvailability, GpuContext};
pub use error::GpuError;
pub use fractal::{is_escape_time, ActiveFractal, Fractal, FractalOptions, OptionEdit};
pub use mandelbrot_engine::{MandelbrotEngine, MAX_STEPS_PER_DISPATCH};
pub use program::ProgramBuilder;
pub use session::Session;
pub use target::{OffscreenTarget, RenderTarget};
