use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in fractal space.
///
/// Normalized screen coordinates run from (0, 0) at the bottom-left corner
/// to (1, 1) at the top-right corner. Both engines map between the two
/// spaces exclusively through [`Viewport::from_screen`] and
/// [`Viewport::to_screen`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
    pub top: f64,
}

impl Viewport {
    pub const fn new(left: f64, right: f64, bottom: f64, top: f64) -> Self {
        Self {
            left,
            right,
            bottom,
            top,
        }
    }

    /// Viewport centered on `center` with the given extents.
    pub fn from_center(center: (f64, f64), width: f64, height: f64) -> Self {
        Self {
            left: center.0 - width / 2.0,
            right: center.0 + width / 2.0,
            bottom: center.1 - height / 2.0,
            top: center.1 + height / 2.0,
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    pub fn center(&self) -> (f64, f64) {
        (
            self.left + self.width() / 2.0,
            self.bottom + self.height() / 2.0,
        )
    }

    /// True when all bounds are finite and the rectangle has positive area.
    pub fn is_valid(&self) -> bool {
        [self.left, self.right, self.bottom, self.top]
            .iter()
            .all(|v| v.is_finite())
            && self.left < self.right
            && self.bottom < self.top
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(ConfigError::InvalidViewport {
                left: self.left,
                right: self.right,
                bottom: self.bottom,
                top: self.top,
            })
        }
    }

    /// Map a normalized screen coordinate to fractal space.
    pub fn from_screen(&self, screen: (f64, f64)) -> (f64, f64) {
        (
            self.left + screen.0 * self.width(),
            self.bottom + screen.1 * self.height(),
        )
    }

    /// Map a fractal-space coordinate to normalized screen space.
    pub fn to_screen(&self, pos: (f64, f64)) -> (f64, f64) {
        (
            (pos.0 - self.left) / self.width(),
            (pos.1 - self.bottom) / self.height(),
        )
    }

    /// Fractal-space position of the center of pixel (px, py) on a grid of `size`.
    pub fn pixel_center(&self, px: u32, py: u32, size: (u32, u32)) -> (f64, f64) {
        self.from_screen((
            (px as f64 + 0.5) / size.0 as f64,
            (py as f64 + 0.5) / size.1 as f64,
        ))
    }

    /// Shift by a fraction of the current extent. (0.5, 0.0) moves right by half a screen.
    pub fn pan(&self, dx: f64, dy: f64) -> Self {
        let (sx, sy) = (dx * self.width(), dy * self.height());
        Self::new(
            self.left + sx,
            self.right + sx,
            self.bottom + sy,
            self.top + sy,
        )
    }

    /// Zoom around a normalized screen anchor that stays fixed.
    ///
    /// `factor > 1` zooms in, `factor < 1` zooms out.
    pub fn zoom(&self, factor: f64, anchor: (f64, f64)) -> Self {
        let fixed = self.from_screen(anchor);
        let width = self.width() / factor;
        let height = self.height() / factor;
        let left = fixed.0 - anchor.0 * width;
        let bottom = fixed.1 - anchor.1 * height;
        Self::new(left, left + width, bottom, bottom + height)
    }

    /// Grow the shorter axis so the viewport matches the aspect ratio of `resolution`.
    pub fn fit_to_aspect(&self, resolution: (u32, u32)) -> Self {
        if resolution.0 == 0 || resolution.1 == 0 {
            return *self;
        }
        let target = resolution.0 as f64 / resolution.1 as f64;
        let current = self.width() / self.height();
        let center = self.center();
        if current < target {
            Self::from_center(center, self.height() * target, self.height())
        } else {
            Self::from_center(center, self.width(), self.width() / target)
        }
    }

    /// Bounds in (left, right, bottom, top) order.
    pub fn to_array(&self) -> [f64; 4] {
        [self.left, self.right, self.bottom, self.top]
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(0.0, 1.0, 0.0, 1.0)
    }
}
