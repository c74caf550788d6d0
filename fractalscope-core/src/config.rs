//! Fractal configurations and the built-in presets.
//!
//! Configurations are plain data: engines take them by value, and the shell
//! edits a copy and hands it back. Everything here is serializable so a
//! session can be saved and restored by an external caller.

use crate::affine::{selection_mode, validate_transforms, AffineTransform, SelectionMode};
use crate::error::ConfigError;
use crate::initial_set::InitialSet;
use crate::palette::{AffineColors, EscapePalette};
use crate::Viewport;
use serde::{Deserialize, Serialize};

/// Default point-count grid size for the affine presets.
pub const DEFAULT_AFFINE_SIZE: (u32, u32) = (1024, 1024);

/// Configuration of an affine iterated function system.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AffineConfig {
    pub name: String,
    /// Point-count grid size in pixels.
    pub size: (u32, u32),
    /// Fractal-space region covered by the grid.
    pub viewport: Viewport,
    pub transforms: Vec<AffineTransform>,
    pub initial_set: InitialSet,
    #[serde(default)]
    pub colors: AffineColors,
    /// Draws per active pixel in probabilistic mode.
    #[serde(default = "default_samples")]
    pub samples_per_point: u32,
    /// Fixed seed for per-call shader seeds; `None` seeds from entropy.
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

fn default_samples() -> u32 {
    1
}

impl AffineConfig {
    pub fn new(
        name: impl Into<String>,
        size: (u32, u32),
        viewport: Viewport,
        transforms: Vec<AffineTransform>,
    ) -> Self {
        Self {
            name: name.into(),
            size,
            viewport,
            transforms,
            initial_set: InitialSet::origin(),
            colors: AffineColors::default(),
            samples_per_point: 1,
            rng_seed: None,
        }
    }

    pub fn with_initial_set(mut self, initial_set: InitialSet) -> Self {
        self.initial_set = initial_set;
        self
    }

    pub fn with_size(mut self, size: (u32, u32)) -> Self {
        self.size = size;
        self
    }

    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn mode(&self) -> SelectionMode {
        selection_mode(&self.transforms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size.0 == 0 || self.size.1 == 0 {
            return Err(ConfigError::ZeroSize(self.size.0, self.size.1));
        }
        self.viewport.validate()?;
        validate_transforms(&self.transforms)?;
        if self.samples_per_point == 0 {
            return Err(ConfigError::Other(
                "samples_per_point must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration of the escape-time engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MandelbrotConfig {
    pub viewport: Viewport,
    /// Internal samples per display pixel along each axis.
    pub oversampling: u32,
    /// Suggested `iterate` budget per frame.
    pub iterations_per_frame: u32,
    #[serde(default)]
    pub palette: EscapePalette,
}

impl Default for MandelbrotConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::new(-2.5, 1.0, -1.25, 1.25),
            oversampling: 1,
            iterations_per_frame: 64,
            palette: EscapePalette::default(),
        }
    }
}

impl MandelbrotConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.viewport.validate()?;
        if self.oversampling == 0 {
            return Err(ConfigError::ZeroOversampling);
        }
        Ok(())
    }
}

/// The fixed set of fractals the shell can select.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FractalKind {
    Sierpinski,
    SierpinskiCarpet,
    BarnsleyFern,
    BarnsleyFernChaos,
    Mandelbrot,
}

impl FractalKind {
    pub const ALL: [FractalKind; 5] = [
        FractalKind::Sierpinski,
        FractalKind::SierpinskiCarpet,
        FractalKind::BarnsleyFern,
        FractalKind::BarnsleyFernChaos,
        FractalKind::Mandelbrot,
    ];

    /// Stable identifier for persistence and lookup.
    pub fn id(&self) -> &'static str {
        match self {
            FractalKind::Sierpinski => "sierpinski",
            FractalKind::SierpinskiCarpet => "sierpinski_carpet",
            FractalKind::BarnsleyFern => "barnsley_fern",
            FractalKind::BarnsleyFernChaos => "barnsley_fern_chaos",
            FractalKind::Mandelbrot => "mandelbrot",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            FractalKind::Sierpinski => "Sierpinski Triangle",
            FractalKind::SierpinskiCarpet => "Sierpinski Carpet",
            FractalKind::BarnsleyFern => "Barnsley Fern",
            FractalKind::BarnsleyFernChaos => "Barnsley Fern (Chaos Game)",
            FractalKind::Mandelbrot => "Mandelbrot Set",
        }
    }

    pub fn from_id(id: &str) -> Option<FractalKind> {
        Self::ALL.iter().copied().find(|k| k.id() == id)
    }

    /// Preset configuration for affine kinds, `None` for Mandelbrot.
    pub fn affine_config(&self, size: (u32, u32)) -> Option<AffineConfig> {
        match self {
            FractalKind::Sierpinski => Some(sierpinski_triangle(size)),
            FractalKind::SierpinskiCarpet => Some(sierpinski_carpet(size)),
            FractalKind::BarnsleyFern => Some(barnsley_fern(size)),
            FractalKind::BarnsleyFernChaos => Some(barnsley_fern_chaos(size)),
            FractalKind::Mandelbrot => None,
        }
    }
}

/// Three half-scale maps onto the corners of the unit square.
pub fn sierpinski_triangle(size: (u32, u32)) -> AffineConfig {
    AffineConfig::new(
        "Sierpinski Triangle",
        size,
        Viewport::new(0.0, 1.0, 0.0, 1.0),
        vec![
            AffineTransform::scale(0.5, [0.0, 0.0]),
            AffineTransform::scale(0.5, [0.5, 0.0]),
            AffineTransform::scale(0.5, [0.0, 0.5]),
        ],
    )
}

/// Eight third-scale maps around an empty center cell.
pub fn sierpinski_carpet(size: (u32, u32)) -> AffineConfig {
    let third = 1.0 / 3.0;
    let transforms = (0..3)
        .flat_map(|j| (0..3).map(move |i| (i, j)))
        .filter(|&(i, j)| !(i == 1 && j == 1))
        .map(|(i, j)| AffineTransform::scale(third, [i as f32 * third, j as f32 * third]))
        .collect();
    AffineConfig::new(
        "Sierpinski Carpet",
        size,
        Viewport::new(0.0, 1.0, 0.0, 1.0),
        transforms,
    )
}

fn fern_transforms() -> Vec<AffineTransform> {
    vec![
        AffineTransform::new([[0.00, 0.00], [0.00, 0.16]], [0.0, 0.0]),
        AffineTransform::new([[0.85, 0.04], [-0.04, 0.85]], [0.0, 1.6]),
        AffineTransform::new([[0.20, -0.26], [0.23, 0.22]], [0.0, 1.6]),
        AffineTransform::new([[-0.15, 0.28], [0.26, 0.24]], [0.0, 0.44]),
    ]
}

/// Barnsley fern with every map applied each step.
pub fn barnsley_fern(size: (u32, u32)) -> AffineConfig {
    AffineConfig::new(
        "Barnsley Fern",
        size,
        Viewport::new(-2.2, 2.7, 0.0, 10.0),
        fern_transforms(),
    )
}

/// Barnsley fern rendered as a chaos game with the classic weights.
pub fn barnsley_fern_chaos(size: (u32, u32)) -> AffineConfig {
    let weights = [0.01, 0.85, 0.07, 0.07];
    let transforms = fern_transforms()
        .into_iter()
        .zip(weights)
        .map(|(t, w)| t.with_weight(w))
        .collect();
    let mut config = AffineConfig::new(
        "Barnsley Fern (Chaos Game)",
        size,
        Viewport::new(-2.2, 2.7, 0.0, 10.0),
        transforms,
    );
    config.initial_set = InitialSet::distribution("0.02");
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_validate() {
        for kind in FractalKind::ALL {
            if let Some(config) = kind.affine_config((64, 64)) {
                assert!(config.validate().is_ok(), "{} invalid", kind.id());
            }
        }
        assert!(MandelbrotConfig::default().validate().is_ok());
    }

    #[test]
    fn preset_modes() {
        assert_eq!(sierpinski_triangle((8, 8)).mode(), SelectionMode::FanOut);
        assert_eq!(barnsley_fern((8, 8)).mode(), SelectionMode::FanOut);
        assert_eq!(
            barnsley_fern_chaos((8, 8)).mode(),
            SelectionMode::Probabilistic
        );
        assert_eq!(sierpinski_carpet((8, 8)).transforms.len(), 8);
    }

    #[test]
    fn ids_round_trip() {
        for kind in FractalKind::ALL {
            assert_eq!(FractalKind::from_id(kind.id()), Some(kind));
        }
        assert_eq!(FractalKind::from_id("julia"), None);
    }

    #[test]
    fn validate_rejects_bad_fields() {
        let config = sierpinski_triangle((0, 10));
        assert_eq!(config.validate(), Err(ConfigError::ZeroSize(0, 10)));

        let mut config = sierpinski_triangle((10, 10));
        config.viewport = Viewport::new(1.0, 0.0, 0.0, 1.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidViewport { .. })
        ));

        let mut config = sierpinski_triangle((10, 10));
        config.transforms.clear();
        assert_eq!(config.validate(), Err(ConfigError::NoTransforms));

        let config = MandelbrotConfig {
            oversampling: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroOversampling));
    }

    #[test]
    fn config_survives_json() {
        let config = barnsley_fern_chaos((128, 256)).with_rng_seed(7);
        let json = serde_json::to_string(&config).unwrap();
        let restored: AffineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, config);
    }
}
