//! The contract the application shell drives every frame.

use crate::affine_engine::AffineEngine;
use crate::error::GpuError;
use crate::mandelbrot_engine::MandelbrotEngine;
use crate::target::RenderTarget;
use fractalscope_core::{
    AffineColors, AffineConfig, AffineTransform, ConfigError, EscapePalette, FractalKind,
    InitialSet, MandelbrotConfig, Viewport,
};

/// A fractal engine owning all of its GPU state.
pub trait Fractal {
    /// Advance the simulation by `count` steps.
    fn iterate(&mut self, count: u32) -> Result<(), GpuError>;

    /// Draw the current state into `target` as seen through `viewport`.
    fn render(&mut self, target: &RenderTarget, viewport: &Viewport) -> Result<(), GpuError>;

    /// Return to the initial state of the current configuration.
    fn reset(&mut self) -> Result<(), GpuError>;

    fn preferred_viewport(&self) -> Viewport;

    fn preferred_iterations_per_frame(&self) -> u32;

    /// Snapshot of the editable parameters, for the shell's parameter UI.
    fn options(&self) -> FractalOptions;

    /// Apply one parameter edit. On error the previous state is kept.
    fn apply(&mut self, edit: OptionEdit) -> Result<(), GpuError>;
}

/// Editable parameters of the active engine.
#[derive(Clone, Debug, PartialEq)]
pub enum FractalOptions {
    Affine(AffineConfig),
    Mandelbrot(MandelbrotConfig),
}

/// A single edit from the parameter UI.
#[derive(Clone, Debug, PartialEq)]
pub enum OptionEdit {
    // affine
    Size((u32, u32)),
    Viewport(Viewport),
    Transforms(Vec<AffineTransform>),
    InitialSet(InitialSet),
    Colors(AffineColors),
    SamplesPerPoint(u32),
    // escape-time
    Oversampling(u32),
    Palette(EscapePalette),
    IterationsPerFrame(u32),
}

impl OptionEdit {
    pub(crate) fn unsupported(&self, engine: &str) -> GpuError {
        GpuError::InvalidConfig(ConfigError::Other(format!(
            "{self:?} does not apply to the {engine} engine"
        )))
    }
}

/// The closed set of engines a session can hold.
pub enum ActiveFractal {
    Affine(AffineEngine),
    Mandelbrot(MandelbrotEngine),
}

impl ActiveFractal {
    pub fn as_affine(&self) -> Option<&AffineEngine> {
        match self {
            ActiveFractal::Affine(engine) => Some(engine),
            ActiveFractal::Mandelbrot(_) => None,
        }
    }

    pub fn as_mandelbrot(&self) -> Option<&MandelbrotEngine> {
        match self {
            ActiveFractal::Mandelbrot(engine) => Some(engine),
            ActiveFractal::Affine(_) => None,
        }
    }

    pub fn as_affine_mut(&mut self) -> Option<&mut AffineEngine> {
        match self {
            ActiveFractal::Affine(engine) => Some(engine),
            ActiveFractal::Mandelbrot(_) => None,
        }
    }

    pub fn as_mandelbrot_mut(&mut self) -> Option<&mut MandelbrotEngine> {
        match self {
            ActiveFractal::Mandelbrot(engine) => Some(engine),
            ActiveFractal::Affine(_) => None,
        }
    }

    fn inner(&self) -> &dyn Fractal {
        match self {
            ActiveFractal::Affine(engine) => engine,
            ActiveFractal::Mandelbrot(engine) => engine,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Fractal {
        match self {
            ActiveFractal::Affine(engine) => engine,
            ActiveFractal::Mandelbrot(engine) => engine,
        }
    }
}

impl Fractal for ActiveFractal {
    fn iterate(&mut self, count: u32) -> Result<(), GpuError> {
        self.inner_mut().iterate(count)
    }

    fn render(&mut self, target: &RenderTarget, viewport: &Viewport) -> Result<(), GpuError> {
        self.inner_mut().render(target, viewport)
    }

    fn reset(&mut self) -> Result<(), GpuError> {
        self.inner_mut().reset()
    }

    fn preferred_viewport(&self) -> Viewport {
        self.inner().preferred_viewport()
    }

    fn preferred_iterations_per_frame(&self) -> u32 {
        self.inner().preferred_iterations_per_frame()
    }

    fn options(&self) -> FractalOptions {
        self.inner().options()
    }

    fn apply(&mut self, edit: OptionEdit) -> Result<(), GpuError> {
        self.inner_mut().apply(edit)
    }
}

/// Engine kind a preset is rendered with.
pub fn is_escape_time(kind: FractalKind) -> bool {
    matches!(kind, FractalKind::Mandelbrot)
}
