//! Per-window state the application shell keeps between frames.

use crate::affine_engine::AffineEngine;
use crate::device::GpuContext;
use crate::error::GpuError;
use crate::fractal::{ActiveFractal, Fractal, OptionEdit};
use crate::mandelbrot_engine::MandelbrotEngine;
use crate::target::RenderTarget;
use fractalscope_core::{FractalKind, MandelbrotConfig, Viewport, DEFAULT_AFFINE_SIZE};
use std::sync::Arc;

/// Selected fractal, view and iteration settings of one window.
pub struct Session {
    context: Arc<GpuContext>,
    kind: FractalKind,
    fractal: ActiveFractal,
    viewport: Viewport,
    resolution: (u32, u32),
    affine_size: (u32, u32),
    iterate_enabled: bool,
    iterations_per_frame: u32,
}

impl Session {
    pub fn new(
        context: Arc<GpuContext>,
        kind: FractalKind,
        resolution: (u32, u32),
    ) -> Result<Self, GpuError> {
        Self::with_affine_size(context, kind, resolution, DEFAULT_AFFINE_SIZE)
    }

    /// Like [`Session::new`] with a custom point-count grid size for affine presets.
    pub fn with_affine_size(
        context: Arc<GpuContext>,
        kind: FractalKind,
        resolution: (u32, u32),
        affine_size: (u32, u32),
    ) -> Result<Self, GpuError> {
        let fractal = build_fractal(&context, kind, resolution, affine_size)?;
        let viewport = fractal.preferred_viewport().fit_to_aspect(resolution);
        let iterations_per_frame = fractal.preferred_iterations_per_frame();
        log::info!("Session started with {}", kind.display_name());
        Ok(Self {
            context,
            kind,
            fractal,
            viewport,
            resolution,
            affine_size,
            iterate_enabled: true,
            iterations_per_frame,
        })
    }

    pub fn kind(&self) -> FractalKind {
        self.kind
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn fractal(&self) -> &ActiveFractal {
        &self.fractal
    }

    pub fn fractal_mut(&mut self) -> &mut ActiveFractal {
        &mut self.fractal
    }

    pub fn iterate_enabled(&self) -> bool {
        self.iterate_enabled
    }

    pub fn set_iterate_enabled(&mut self, enabled: bool) {
        self.iterate_enabled = enabled;
    }

    pub fn iterations_per_frame(&self) -> u32 {
        self.iterations_per_frame
    }

    pub fn set_iterations_per_frame(&mut self, iterations: u32) {
        self.iterations_per_frame = iterations;
    }

    /// Switch to another preset. The current fractal stays if construction fails.
    pub fn select(&mut self, kind: FractalKind) -> Result<(), GpuError> {
        let fractal = match build_fractal(&self.context, kind, self.resolution, self.affine_size) {
            Ok(fractal) => fractal,
            Err(e) => {
                log::warn!("Could not switch to {}: {e}", kind.display_name());
                return Err(e);
            }
        };
        log::info!("Switched to {}", kind.display_name());
        self.kind = kind;
        self.fractal = fractal;
        self.iterations_per_frame = self.fractal.preferred_iterations_per_frame();
        self.reset_view();
        Ok(())
    }

    /// Iterate when enabled, then draw into `target`.
    pub fn frame(&mut self, target: &RenderTarget) -> Result<(), GpuError> {
        if !target.is_empty() && target.size != self.resolution {
            self.resize(target.size);
        }
        if self.iterate_enabled && self.iterations_per_frame > 0 {
            self.fractal.iterate(self.iterations_per_frame)?;
        }
        self.fractal.render(target, &self.viewport)
    }

    /// Keep the center and vertical extent, widen or narrow to the new aspect.
    fn resize(&mut self, resolution: (u32, u32)) {
        let aspect = resolution.0 as f64 / resolution.1 as f64;
        let height = self.viewport.height();
        self.viewport = Viewport::from_center(self.viewport.center(), height * aspect, height);
        self.resolution = resolution;
    }

    /// Shift the view by a fraction of its extent.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.viewport = self.viewport.pan(dx, dy);
    }

    /// Zoom around a normalized screen anchor; `factor > 1` zooms in.
    pub fn zoom(&mut self, factor: f64, anchor: (f64, f64)) {
        if factor > 0.0 && factor.is_finite() {
            self.viewport = self.viewport.zoom(factor, anchor);
        } else {
            log::warn!("Ignoring zoom factor {factor}");
        }
    }

    pub fn reset(&mut self) -> Result<(), GpuError> {
        self.fractal.reset()
    }

    /// Return to the fractal's preferred viewport, fitted to the window.
    pub fn reset_view(&mut self) {
        self.viewport = self.fractal.preferred_viewport().fit_to_aspect(self.resolution);
    }

    /// Route an option edit. The per-frame step count is a session setting
    /// for either engine; everything else goes to the active fractal.
    pub fn apply(&mut self, edit: OptionEdit) -> Result<(), GpuError> {
        match edit {
            OptionEdit::IterationsPerFrame(iterations) => {
                if let Some(engine) = self.fractal.as_mandelbrot_mut() {
                    engine.set_iterations_per_frame(iterations);
                }
                self.iterations_per_frame = iterations;
                Ok(())
            }
            other => self.fractal.apply(other),
        }
    }
}

fn build_fractal(
    context: &Arc<GpuContext>,
    kind: FractalKind,
    resolution: (u32, u32),
    affine_size: (u32, u32),
) -> Result<ActiveFractal, GpuError> {
    match kind.affine_config(affine_size) {
        Some(config) => Ok(ActiveFractal::Affine(AffineEngine::new(
            Arc::clone(context),
            config,
        )?)),
        None => Ok(ActiveFractal::Mandelbrot(MandelbrotEngine::new(
            Arc::clone(context),
            resolution,
            MandelbrotConfig::default(),
        )?)),
    }
}
