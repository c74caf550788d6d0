//! WGSL source generation.
//!
//! Every function here is pure: it turns configuration into source text and
//! touches no GPU state, so the output can be checked without a device.

pub mod affine;
pub mod mandelbrot;
pub mod present;

/// Edge length of the square compute workgroups used by every program.
pub const WORKGROUP_SIZE: u32 = 8;

/// Workgroup counts covering a grid of `size` pixels.
pub fn dispatch_size(size: (u32, u32)) -> (u32, u32) {
    (size.0.div_ceil(WORKGROUP_SIZE), size.1.div_ceil(WORKGROUP_SIZE))
}

/// WGSL `f32` literal that parses back to exactly `value`.
///
/// `Debug` prints the shortest representation that round-trips, which keeps
/// baked coefficients identical to the values the CPU side uses.
pub fn wgsl_f32(value: f32) -> String {
    if value.is_finite() {
        format!("{value:?}f")
    } else {
        log::warn!("Non-finite shader constant {value} replaced with 0");
        "0.0f".into()
    }
}
