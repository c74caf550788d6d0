//! Color rules for both engines, mirrored by the colorize shaders.

use serde::{Deserialize, Serialize};

use crate::ifs::UNVISITED;

/// Linear RGBA color with components in [0, 1].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn lerp(self, other: Color, t: f32) -> Color {
        Color {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }

    /// Quantize to 8-bit RGBA the way an `rgba8unorm` store does.
    pub fn to_rgba8(self) -> [u8; 4] {
        self.to_array()
            .map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
    }
}

/// How earlier-visited pixels fade relative to the current step.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Falloff {
    /// Secondary color regardless of age.
    Flat,
    /// Secondary blended toward background by `exp(-age / rate)`.
    Exponential { rate: f32 },
}

/// Colors for the point-count grid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AffineColors {
    pub primary: Color,
    pub secondary: Color,
    pub background: Color,
    pub falloff: Falloff,
}

impl Default for AffineColors {
    fn default() -> Self {
        Self {
            primary: Color::rgb(1.0, 1.0, 1.0),
            secondary: Color::rgb(0.1, 0.8, 0.3),
            background: Color::BLACK,
            falloff: Falloff::Exponential { rate: 10.0 },
        }
    }
}

impl AffineColors {
    /// Color of a cell holding `value` when the engine is at step `counter`.
    pub fn shade(&self, value: u32, counter: u32) -> Color {
        if value == UNVISITED || value > counter {
            return self.background;
        }
        if value == counter {
            return self.primary;
        }
        match self.falloff {
            Falloff::Flat => self.secondary,
            Falloff::Exponential { rate } => {
                let age = (counter - value) as f32;
                let weight = (-age / rate.max(f32::MIN_POSITIVE)).exp();
                self.background.lerp(self.secondary, weight)
            }
        }
    }

    /// Falloff rate for the shader uniform; 0 encodes a flat falloff.
    pub fn falloff_rate(&self) -> f32 {
        match self.falloff {
            Falloff::Flat => 0.0,
            Falloff::Exponential { rate } => rate.max(f32::MIN_POSITIVE),
        }
    }
}

/// Smooth periodic palette for escape counts: `sin²(frequency * k + phase)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EscapePalette {
    pub frequency: f32,
    pub phase: [f32; 3],
    pub interior: Color,
}

impl Default for EscapePalette {
    fn default() -> Self {
        Self {
            frequency: 0.1,
            phase: [0.0, 0.6, 1.0],
            interior: Color::BLACK,
        }
    }
}

impl EscapePalette {
    /// Color for a pixel that escaped after `iterations` steps.
    pub fn escaped(&self, iterations: u32) -> Color {
        let t = self.frequency * iterations as f32;
        let channel = |phase: f32| {
            let s = (t + phase).sin();
            s * s
        };
        Color::rgb(
            channel(self.phase[0]),
            channel(self.phase[1]),
            channel(self.phase[2]),
        )
    }

    /// Display color for a pixel state at global step `counter`.
    ///
    /// Escaped pixels use their recorded count and ignore `counter`. An
    /// unescaped pixel carrying a stale escape estimate keeps that color
    /// until the counter passes the estimate; otherwise it is interior.
    pub fn display(&self, escaped: bool, running: u32, last_escape: u32, counter: u32) -> Color {
        if escaped {
            self.escaped(running)
        } else if last_escape > counter {
            self.escaped(last_escape)
        } else {
            self.interior
        }
    }
}
