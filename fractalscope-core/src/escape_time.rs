//! CPU reference of the incremental escape-time state.
//!
//! Each pixel carries a packed z value and two counters: the running
//! iteration count, and the count at which the pixel was last known to
//! escape. The GPU engine keeps the same layout; this module is its oracle.

use crate::packed::{escaped_complex, is_escaped, pack_complex, unpack_complex};
use crate::palette::{Color, EscapePalette};
use crate::Viewport;

/// Escape when |z|² exceeds this bound (|z| > 2).
pub const ESCAPE_RADIUS_SQ: f64 = 4.0;

/// Per-pixel state in the GPU buffer layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelState {
    /// Packed z as `[re_lo, re_hi, im_lo, im_hi]`.
    pub z: [u32; 4],
    /// `[running, last_escape]`; `last_escape == 0` means unknown.
    pub iterations: [u32; 2],
}

impl Default for PixelState {
    fn default() -> Self {
        Self {
            z: [0; 4],
            iterations: [0; 2],
        }
    }
}

impl PixelState {
    pub fn escaped(&self) -> bool {
        is_escaped(self.z)
    }

    pub fn running(&self) -> u32 {
        self.iterations[0]
    }

    pub fn last_escape(&self) -> u32 {
        self.iterations[1]
    }

    /// Fresh state that remembers an escape estimate from a previous layout.
    pub fn with_estimate(last_escape: u32) -> Self {
        Self {
            z: [0; 4],
            iterations: [0, last_escape],
        }
    }

    /// Run up to `n` steps of z ← z² + c. Escaped pixels are left untouched.
    pub fn advance(&mut self, c: (f64, f64), n: u32) {
        if self.escaped() {
            return;
        }

        let (mut zr, mut zi) = unpack_complex(self.z);
        let mut running = self.iterations[0];

        for _ in 0..n {
            let next_r = zr * zr - zi * zi + c.0;
            let next_i = 2.0 * zr * zi + c.1;
            zr = next_r;
            zi = next_i;
            running += 1;

            if zr * zr + zi * zi > ESCAPE_RADIUS_SQ {
                self.z = escaped_complex();
                self.iterations = [running, running];
                return;
            }
        }

        self.z = pack_complex(zr, zi);
        self.iterations[0] = running;
    }

    pub fn color(&self, palette: &EscapePalette, counter: u32) -> Color {
        palette.display(self.escaped(), self.running(), self.last_escape(), counter)
    }
}

/// A grid of pixel states over a viewport.
#[derive(Clone, Debug)]
pub struct EscapeGrid {
    size: (u32, u32),
    viewport: Viewport,
    states: Vec<PixelState>,
    counter: u32,
}

impl EscapeGrid {
    pub fn new(size: (u32, u32), viewport: Viewport) -> Self {
        Self {
            size,
            viewport,
            states: vec![PixelState::default(); (size.0 * size.1) as usize],
            counter: 0,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn states(&self) -> &[PixelState] {
        &self.states
    }

    pub fn state_at(&self, px: u32, py: u32) -> &PixelState {
        &self.states[(py * self.size.0 + px) as usize]
    }

    pub fn iterate(&mut self, n: u32) {
        let (w, _) = self.size;
        for (index, state) in self.states.iter_mut().enumerate() {
            let px = index as u32 % w;
            let py = index as u32 / w;
            state.advance(self.viewport.pixel_center(px, py, self.size), n);
        }
        self.counter += n;
    }

    /// Resample into a new layout by nearest-pixel lookup.
    ///
    /// Every new pixel starts from z = 0 with a zero running count and
    /// inherits the old pixel's escape estimate; pixels that map outside
    /// the old viewport start with no estimate.
    pub fn reproject(&self, size: (u32, u32), viewport: Viewport) -> EscapeGrid {
        let mut states = Vec::with_capacity((size.0 * size.1) as usize);
        for py in 0..size.1 {
            for px in 0..size.0 {
                let screen = self.viewport.to_screen(viewport.pixel_center(px, py, size));
                let estimate = nearest_pixel(screen, self.size)
                    .map(|(ox, oy)| self.state_at(ox, oy).last_escape())
                    .unwrap_or(0);
                states.push(PixelState::with_estimate(estimate));
            }
        }
        EscapeGrid {
            size,
            viewport,
            states,
            counter: 0,
        }
    }

    pub fn colors(&self, palette: &EscapePalette) -> Vec<Color> {
        self.states
            .iter()
            .map(|s| s.color(palette, self.counter))
            .collect()
    }
}

/// Pixel of a `size` grid containing normalized screen coordinate `screen`.
pub fn nearest_pixel(screen: (f64, f64), size: (u32, u32)) -> Option<(u32, u32)> {
    let x = (screen.0 * size.0 as f64).floor();
    let y = (screen.1 * size.1 as f64).floor();
    if x >= 0.0 && y >= 0.0 && x < size.0 as f64 && y < size.1 as f64 {
        Some((x as u32, y as u32))
    } else {
        None
    }
}
