//! CPU reference of the point-count grid.
//!
//! Mirrors the generated seed and iterate shaders step for step, in the same
//! f32 arithmetic, and is the oracle for the GPU engine tests.

use crate::affine::{cumulative_weights, select_transform, selection_mode, AffineTransform, SelectionMode};
use crate::pixel_grid::find_best_pixel;
use crate::random::pixel_random;
use crate::Viewport;

/// Cell value of a pixel that has never been reached.
///
/// Claims merge by taking the minimum, so this must compare above every step.
pub const UNVISITED: u32 = u32::MAX;

/// Counter value of a freshly seeded grid; seeded cells hold this value.
pub const FIRST_STEP: u32 = 1;

/// Salt used for the seeding draw, distinct from any sample index.
pub const SEED_SALT: u32 = 0xFFFF_FFFF;

/// Viewport reduced to the f32 origin and extent baked into the shaders.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridFrame {
    pub origin: (f32, f32),
    pub extent: (f32, f32),
}

impl GridFrame {
    pub fn new(viewport: &Viewport) -> Self {
        Self {
            origin: (viewport.left as f32, viewport.bottom as f32),
            extent: (viewport.width() as f32, viewport.height() as f32),
        }
    }

    /// Fractal-space center of pixel (px, py).
    pub fn pixel_position(&self, px: u32, py: u32, size: (u32, u32)) -> (f32, f32) {
        let sx = (px as f32 + 0.5) / size.0 as f32;
        let sy = (py as f32 + 0.5) / size.1 as f32;
        (
            self.origin.0 + sx * self.extent.0,
            self.origin.1 + sy * self.extent.1,
        )
    }

    /// Pixel containing `pos`, or `None` when it falls outside the grid.
    pub fn pixel_of(&self, pos: (f32, f32), size: (u32, u32)) -> Option<(u32, u32)> {
        let sx = (pos.0 - self.origin.0) / self.extent.0 * size.0 as f32;
        let sy = (pos.1 - self.origin.1) / self.extent.1 * size.1 as f32;
        // Negated comparisons also reject NaN.
        if !(sx >= 0.0 && sy >= 0.0 && sx < size.0 as f32 && sy < size.1 as f32) {
            return None;
        }
        Some((sx as u32, sy as u32))
    }
}

/// Point-count grid advanced on the CPU.
#[derive(Clone, Debug)]
pub struct IfsGrid {
    size: (u32, u32),
    viewport: Viewport,
    cells: Vec<u32>,
    counter: u32,
}

impl IfsGrid {
    pub fn new(size: (u32, u32), viewport: Viewport) -> Self {
        Self {
            size,
            viewport,
            cells: vec![UNVISITED; (size.0 * size.1) as usize],
            counter: FIRST_STEP,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn cells(&self) -> &[u32] {
        &self.cells
    }

    pub fn value_at(&self, px: u32, py: u32) -> u32 {
        self.cells[(py * self.size.0 + px) as usize]
    }

    pub fn visited_count(&self) -> usize {
        self.cells.iter().filter(|&&v| v != UNVISITED).count()
    }

    /// Mark the pixel nearest to each point as seeded.
    pub fn seed_points(&mut self, points: &[(f64, f64)]) {
        for &point in points {
            let (px, py) = find_best_pixel(self.size, &self.viewport, point);
            let index = (py * self.size.0 + px) as usize;
            self.cells[index] = FIRST_STEP;
        }
    }

    /// Mark each pixel whose density at its normalized center beats a random draw.
    pub fn seed_density(&mut self, density: impl Fn(f32, f32) -> f32, seed: u32) {
        let (w, h) = self.size;
        for py in 0..h {
            for px in 0..w {
                let x = (px as f32 + 0.5) / w as f32;
                let y = (py as f32 + 0.5) / h as f32;
                if density(x, y) > pixel_random(px, py, seed, SEED_SALT) {
                    self.cells[(py * w + px) as usize] = FIRST_STEP;
                }
            }
        }
    }

    /// Advance one step: active pixels (value == counter) claim their images
    /// with value counter + 1. Claimed cells are never overwritten.
    pub fn step(&mut self, transforms: &[AffineTransform], samples_per_point: u32, seed: u32) {
        let frame = GridFrame::new(&self.viewport);
        let active = self.counter;
        let next = self.counter + 1;
        let mode = selection_mode(transforms);
        let cdf = cumulative_weights(transforms);
        let (w, h) = self.size;

        for py in 0..h {
            for px in 0..w {
                if self.cells[(py * w + px) as usize] != active {
                    continue;
                }
                let pos = frame.pixel_position(px, py, self.size);
                match mode {
                    SelectionMode::FanOut => {
                        for t in transforms {
                            self.claim(&frame, t.apply(pos), next);
                        }
                    }
                    SelectionMode::Probabilistic => {
                        for sample in 0..samples_per_point {
                            let r = pixel_random(px, py, seed, sample);
                            let t = &transforms[select_transform(&cdf, r)];
                            self.claim(&frame, t.apply(pos), next);
                        }
                    }
                }
            }
        }
        self.counter = next;
    }

    /// Smallest step wins, matching `atomicMin` on the GPU.
    fn claim(&mut self, frame: &GridFrame, pos: (f32, f32), value: u32) {
        if let Some((dx, dy)) = frame.pixel_of(pos, self.size) {
            let cell = &mut self.cells[(dy * self.size.0 + dx) as usize];
            *cell = (*cell).min(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::sierpinski_triangle;

    #[test]
    fn seeding_origin_marks_corner_pixel() {
        let mut grid = IfsGrid::new((100, 100), Viewport::new(0.0, 1.0, 0.0, 1.0));
        grid.seed_points(&[(0.0, 0.0)]);
        assert_eq!(grid.value_at(0, 0), FIRST_STEP);
        assert_eq!(grid.visited_count(), 1);
    }

    #[test]
    fn overlapping_images_claim_once_with_step_value() {
        // Two identical maps hit the same destination in the same step.
        let transforms = [
            AffineTransform::scale(0.5, [0.5, 0.5]),
            AffineTransform::scale(0.5, [0.5, 0.5]),
        ];
        let mut grid = IfsGrid::new((16, 16), Viewport::new(0.0, 1.0, 0.0, 1.0));
        grid.seed_points(&[(0.5, 0.5)]);
        grid.step(&transforms, 1, 0);
        assert_eq!(grid.visited_count(), 2);
        let claimed: Vec<u32> = grid.cells().iter().copied().filter(|&v| v == 2).collect();
        assert_eq!(claimed.len(), 1);
    }

    #[test]
    fn claim_keeps_the_earliest_step() {
        let vp = Viewport::new(0.0, 1.0, 0.0, 1.0);
        let frame = GridFrame::new(&vp);
        let mut grid = IfsGrid::new((8, 8), vp);
        grid.seed_points(&[(0.0, 0.0)]);
        let origin = frame.pixel_position(0, 0, grid.size());
        grid.claim(&frame, origin, 4);
        assert_eq!(grid.value_at(0, 0), FIRST_STEP);
        let far = frame.pixel_position(7, 7, grid.size());
        grid.claim(&frame, far, 4);
        grid.claim(&frame, far, 3);
        grid.claim(&frame, far, 5);
        assert_eq!(grid.value_at(7, 7), 3);
    }

    #[test]
    fn claimed_cells_are_never_overwritten() {
        let config = sierpinski_triangle((64, 64));
        let mut grid = IfsGrid::new(config.size, config.viewport);
        grid.seed_points(&[(0.0, 0.0)]);
        let mut history: Vec<Vec<u32>> = vec![grid.cells().to_vec()];
        for _ in 0..10 {
            grid.step(&config.transforms, 1, 0);
            history.push(grid.cells().to_vec());
        }
        for pair in history.windows(2) {
            for (before, after) in pair[0].iter().zip(&pair[1]) {
                if *before != UNVISITED {
                    assert_eq!(before, after);
                }
            }
        }
    }

    #[test]
    fn density_seeding_respects_extremes() {
        let vp = Viewport::new(0.0, 1.0, 0.0, 1.0);
        let mut full = IfsGrid::new((20, 20), vp);
        full.seed_density(|_, _| 1.0, 3);
        assert_eq!(full.visited_count(), 400);

        let mut none = IfsGrid::new((20, 20), vp);
        none.seed_density(|_, _| 0.0, 3);
        assert_eq!(none.visited_count(), 0);

        let mut left_half = IfsGrid::new((20, 20), vp);
        left_half.seed_density(|x, _| if x < 0.5 { 1.0 } else { 0.0 }, 3);
        assert_eq!(left_half.visited_count(), 200);
        assert_eq!(left_half.value_at(19, 0), UNVISITED);
    }

    #[test]
    fn probabilistic_step_claims_at_most_samples_per_active_pixel() {
        let transforms = [
            AffineTransform::scale(0.5, [0.0, 0.0]).with_weight(0.5),
            AffineTransform::scale(0.5, [0.5, 0.5]).with_weight(0.5),
        ];
        let mut grid = IfsGrid::new((32, 32), Viewport::new(0.0, 1.0, 0.0, 1.0));
        grid.seed_density(|_, _| 1.0, 1);
        let active = grid.visited_count();
        assert_eq!(active, 1024);
        grid.step(&transforms, 1, 9);
        // Everything was already claimed, nothing new can appear.
        assert_eq!(grid.visited_count(), active);
        assert_eq!(grid.counter(), 2);
    }

    #[test]
    fn frame_rejects_outside_and_nan() {
        let frame = GridFrame::new(&Viewport::new(0.0, 1.0, 0.0, 1.0));
        assert_eq!(frame.pixel_of((1.0, 0.5), (10, 10)), None);
        assert_eq!(frame.pixel_of((-0.01, 0.5), (10, 10)), None);
        assert_eq!(frame.pixel_of((f32::NAN, 0.5), (10, 10)), None);
        assert_eq!(frame.pixel_of((0.95, 0.05), (10, 10)), Some((9, 0)));
    }
}
