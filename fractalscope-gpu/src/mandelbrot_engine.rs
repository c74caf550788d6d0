//! GPU engine for incremental escape-time rendering of the Mandelbrot set.
//!
//! State lives in two buffers per internal pixel: packed z and the pair
//! `(running, last_escape)`. A second state set is kept in a buffered slot
//! so a resize can resample the old results instead of starting from black,
//! and toggling between two sizes reuses the allocation.

use crate::buffers::{
    color_output_entry, color_texture, storage_buffer, storage_entry, uniform_buffer,
    uniform_entry, MandelbrotUniforms, PresentUniforms, ReprojectUniforms,
};
use crate::device::GpuContext;
use crate::error::GpuError;
use crate::fractal::{Fractal, FractalOptions, OptionEdit};
use crate::presenter::Presenter;
use crate::program::ProgramBuilder;
use crate::readback::read_buffer;
use crate::shaders::{dispatch_size, mandelbrot};
use crate::target::RenderTarget;
use fractalscope_core::packed::unpack_complex;
use fractalscope_core::{ConfigError, EscapePalette, MandelbrotConfig, Viewport};
use std::sync::Arc;

/// Upper bound on iterations per dispatch, to keep single submissions short.
pub const MAX_STEPS_PER_DISPATCH: u32 = 256;

/// Bytes of state per internal pixel: packed z plus the two counters.
const Z_BYTES: u64 = 16;
const ITERATION_BYTES: u64 = 8;

/// One complete state set at a fixed internal size and viewport.
struct EscapeState {
    size: (u32, u32),
    viewport: Viewport,
    z: wgpu::Buffer,
    iterations: wgpu::Buffer,
    uniforms: wgpu::Buffer,
    display_view: wgpu::TextureView,
    bind_group: wgpu::BindGroup,
}

impl EscapeState {
    fn allocate(
        context: &GpuContext,
        layout: &wgpu::BindGroupLayout,
        size: (u32, u32),
        viewport: Viewport,
    ) -> Result<Self, GpuError> {
        let pixels = size.0 as u64 * size.1 as u64;
        let z = storage_buffer(context, "escape_z", pixels * Z_BYTES)?;
        let iterations = storage_buffer(context, "escape_iterations", pixels * ITERATION_BYTES)?;
        let uniforms = uniform_buffer::<MandelbrotUniforms>(context, "escape_uniforms");
        let display = color_texture(context, "escape_display", size)?;
        let display_view = display.create_view(&wgpu::TextureViewDescriptor::default());

        let bind_group = context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("escape_state_bind_group"),
                layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniforms.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: z.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: iterations.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::TextureView(&display_view),
                    },
                ],
            });

        log::info!("Allocated escape-time state {}x{}", size.0, size.1);

        Ok(Self {
            size,
            viewport,
            z,
            iterations,
            uniforms,
            display_view,
            bind_group,
        })
    }
}

/// Escape-time renderer with packed double precision and oversampling.
pub struct MandelbrotEngine {
    context: Arc<GpuContext>,
    config: MandelbrotConfig,
    state_layout: wgpu::BindGroupLayout,
    reproject_layout: wgpu::BindGroupLayout,
    iterate_pipeline: wgpu::ComputePipeline,
    colorize_pipeline: wgpu::ComputePipeline,
    reproject_pipeline: wgpu::ComputePipeline,
    reproject_uniforms: wgpu::Buffer,
    presenter: Presenter,
    current: EscapeState,
    buffered: Option<EscapeState>,
    resolution: (u32, u32),
    applied_oversampling: u32,
    counter: u32,
}

impl MandelbrotEngine {
    pub fn new(
        context: Arc<GpuContext>,
        resolution: (u32, u32),
        config: MandelbrotConfig,
    ) -> Result<Self, GpuError> {
        context.require_f64()?;
        config.validate()?;
        let size = internal_size(resolution, config.oversampling)?;

        let state_layout =
            context
                .device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("escape_state_layout"),
                    entries: &[
                        uniform_entry(0),
                        storage_entry(1, false),
                        storage_entry(2, false),
                        color_output_entry(3),
                    ],
                });
        let reproject_layout =
            context
                .device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("escape_reproject_layout"),
                    entries: &[
                        uniform_entry(0),
                        storage_entry(1, false),
                        storage_entry(2, false),
                        storage_entry(3, true),
                    ],
                });

        let builder = ProgramBuilder::new(&context.device);
        let iterate_pipeline = builder.compute(
            "escape_iterate",
            &mandelbrot::iterate_source(),
            &[&state_layout],
        )?;
        let colorize_pipeline = builder.compute(
            "escape_colorize",
            &mandelbrot::colorize_source(),
            &[&state_layout],
        )?;
        let reproject_pipeline = builder.compute(
            "escape_reproject",
            &mandelbrot::reproject_source(),
            &[&reproject_layout],
        )?;

        let reproject_uniforms = uniform_buffer::<ReprojectUniforms>(&context, "escape_reproject");
        let presenter = Presenter::new(&context, "escape_present", wgpu::FilterMode::Linear)?;
        let current = EscapeState::allocate(&context, &state_layout, size, config.viewport)?;

        log::info!(
            "Mandelbrot engine at {}x{} (oversampling {}), {} iterations per frame",
            resolution.0,
            resolution.1,
            config.oversampling,
            config.iterations_per_frame
        );

        let applied_oversampling = config.oversampling;
        let mut engine = Self {
            context,
            config,
            state_layout,
            reproject_layout,
            iterate_pipeline,
            colorize_pipeline,
            reproject_pipeline,
            reproject_uniforms,
            presenter,
            current,
            buffered: None,
            resolution,
            applied_oversampling,
            counter: 0,
        };
        engine.reset()?;
        Ok(engine)
    }

    pub fn config(&self) -> &MandelbrotConfig {
        &self.config
    }

    /// Global running iteration counter of the current state.
    pub fn iteration_counter(&self) -> u32 {
        self.counter
    }

    /// Size of the current state: resolution times oversampling.
    pub fn internal_size(&self) -> (u32, u32) {
        self.current.size
    }

    pub fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    /// Viewport the current state was computed for.
    pub fn viewport(&self) -> Viewport {
        self.current.viewport
    }

    pub fn has_buffered_state(&self) -> bool {
        self.buffered.is_some()
    }

    pub fn buffered_size(&self) -> Option<(u32, u32)> {
        self.buffered.as_ref().map(|state| state.size)
    }

    /// Takes effect at the next `render`, through the resize path.
    pub fn set_oversampling(&mut self, oversampling: u32) -> Result<(), GpuError> {
        if oversampling == 0 {
            return Err(ConfigError::ZeroOversampling.into());
        }
        self.config.oversampling = oversampling;
        Ok(())
    }

    pub fn set_palette(&mut self, palette: EscapePalette) {
        self.config.palette = palette;
        self.recolor();
    }

    pub fn set_iterations_per_frame(&mut self, iterations: u32) {
        self.config.iterations_per_frame = iterations;
    }

    /// `(running, last_escape)` per internal pixel, row 0 at the bottom.
    pub async fn read_iterations(&self) -> Result<Vec<[u32; 2]>, GpuError> {
        read_buffer(&self.context, &self.current.iterations).await
    }

    /// Unpacked z per internal pixel; escaped pixels read as NaN.
    pub async fn read_z(&self) -> Result<Vec<(f64, f64)>, GpuError> {
        let packed: Vec<[u32; 4]> = read_buffer(&self.context, &self.current.z).await?;
        Ok(packed.into_iter().map(unpack_complex).collect())
    }

    fn write_state_uniforms(&self, state: &EscapeState, steps: u32) {
        let uniforms = MandelbrotUniforms::new(
            state.size,
            &state.viewport,
            steps,
            self.counter,
            &self.config.palette,
        );
        self.context
            .queue
            .write_buffer(&state.uniforms, 0, bytemuck::bytes_of(&uniforms));
    }

    fn encode_pass(
        encoder: &mut wgpu::CommandEncoder,
        label: &str,
        pipeline: &wgpu::ComputePipeline,
        bind_group: &wgpu::BindGroup,
        size: (u32, u32),
    ) {
        let (x, y) = dispatch_size(size);
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(label),
            timestamp_writes: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.dispatch_workgroups(x, y, 1);
    }

    fn encoder(&self, label: &str) -> wgpu::CommandEncoder {
        self.context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }

    /// Regenerate the current display image from state and counter.
    fn recolor(&self) {
        self.write_state_uniforms(&self.current, 0);
        let mut encoder = self.encoder("escape_recolor");
        Self::encode_pass(
            &mut encoder,
            "escape_colorize",
            &self.colorize_pipeline,
            &self.current.bind_group,
            self.current.size,
        );
        self.context.queue.submit(std::iter::once(encoder.finish()));
    }

    fn needs_update(&self, resolution: (u32, u32), viewport: &Viewport) -> bool {
        resolution != self.resolution
            || *viewport != self.current.viewport
            || self.config.oversampling != self.applied_oversampling
    }

    /// Move to a new resolution, viewport or oversampling by resampling the
    /// current state into a new one, which then becomes current.
    fn update(&mut self, resolution: (u32, u32), viewport: Viewport) -> Result<(), GpuError> {
        viewport.validate()?;
        let size = internal_size(resolution, self.config.oversampling)?;

        let reuse = matches!(&self.buffered, Some(state) if state.size == size);
        let mut next = match self.buffered.take() {
            Some(state) if reuse => {
                log::info!("Reusing buffered state {}x{}", size.0, size.1);
                state
            }
            stale => {
                let fresh = EscapeState::allocate(&self.context, &self.state_layout, size, viewport);
                // Keep the spare around if allocation failed.
                if fresh.is_err() {
                    self.buffered = stale;
                }
                fresh?
            }
        };
        next.viewport = viewport;

        let reproject = ReprojectUniforms::new(
            next.size,
            &next.viewport,
            self.current.size,
            &self.current.viewport,
        );
        self.context.queue.write_buffer(
            &self.reproject_uniforms,
            0,
            bytemuck::bytes_of(&reproject),
        );

        let bind_group = self
            .context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("escape_reproject_bind_group"),
                layout: &self.reproject_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: self.reproject_uniforms.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: next.z.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: next.iterations.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: self.current.iterations.as_entire_binding(),
                    },
                ],
            });

        self.counter = 0;
        self.write_state_uniforms(&next, 0);

        let mut encoder = self.encoder("escape_update");
        Self::encode_pass(
            &mut encoder,
            "escape_reproject",
            &self.reproject_pipeline,
            &bind_group,
            next.size,
        );
        Self::encode_pass(
            &mut encoder,
            "escape_colorize",
            &self.colorize_pipeline,
            &next.bind_group,
            next.size,
        );
        self.context.queue.submit(std::iter::once(encoder.finish()));

        log::info!(
            "Escape-time update to {}x{} (oversampling {}), viewport {:?}",
            resolution.0,
            resolution.1,
            self.config.oversampling,
            viewport.to_array()
        );

        self.buffered = Some(std::mem::replace(&mut self.current, next));
        self.resolution = resolution;
        self.applied_oversampling = self.config.oversampling;
        Ok(())
    }
}

/// `resolution * oversampling`, rejecting empty or overflowing sizes.
fn internal_size(resolution: (u32, u32), oversampling: u32) -> Result<(u32, u32), GpuError> {
    if resolution.0 == 0 || resolution.1 == 0 {
        return Err(ConfigError::ZeroSize(resolution.0, resolution.1).into());
    }
    match (
        resolution.0.checked_mul(oversampling),
        resolution.1.checked_mul(oversampling),
    ) {
        (Some(w), Some(h)) => Ok((w, h)),
        _ => Err(GpuError::ResourceCreation {
            label: "escape_state".into(),
            log: format!(
                "{}x{} at oversampling {oversampling} overflows",
                resolution.0, resolution.1
            ),
        }),
    }
}

impl Fractal for MandelbrotEngine {
    fn iterate(&mut self, count: u32) -> Result<(), GpuError> {
        let mut remaining = count;
        while remaining > 0 {
            let steps = remaining.min(MAX_STEPS_PER_DISPATCH);
            self.write_state_uniforms(&self.current, steps);
            let mut encoder = self.encoder("escape_iterate");
            Self::encode_pass(
                &mut encoder,
                "escape_iterate",
                &self.iterate_pipeline,
                &self.current.bind_group,
                self.current.size,
            );
            self.context.queue.submit(std::iter::once(encoder.finish()));
            self.counter += steps;
            remaining -= steps;
        }
        self.recolor();
        log::debug!("Escape-time iterate x{count}, counter now {}", self.counter);
        Ok(())
    }

    /// Presents the current image first, then resamples if the request
    /// changed, so a resize shows up one frame late.
    fn render(&mut self, target: &RenderTarget, viewport: &Viewport) -> Result<(), GpuError> {
        if target.is_empty() {
            log::debug!("Skipping escape-time render into empty target");
            return Ok(());
        }

        let mapping = PresentUniforms::mapping(
            &self.current.viewport,
            viewport,
            self.config.palette.interior,
        );
        let mut encoder = self.encoder("escape_render");
        self.presenter.draw(
            &self.context,
            &mut encoder,
            target,
            &self.current.display_view,
            mapping,
        )?;
        self.context.queue.submit(std::iter::once(encoder.finish()));

        if self.needs_update(target.size, viewport) {
            self.update(target.size, *viewport)?;
        }
        Ok(())
    }

    fn reset(&mut self) -> Result<(), GpuError> {
        let mut encoder = self.encoder("escape_reset");
        encoder.clear_buffer(&self.current.z, 0, None);
        encoder.clear_buffer(&self.current.iterations, 0, None);
        self.context.queue.submit(std::iter::once(encoder.finish()));
        self.counter = 0;
        self.recolor();
        log::debug!("Escape-time state cleared");
        Ok(())
    }

    fn preferred_viewport(&self) -> Viewport {
        self.config.viewport
    }

    fn preferred_iterations_per_frame(&self) -> u32 {
        self.config.iterations_per_frame
    }

    fn options(&self) -> FractalOptions {
        FractalOptions::Mandelbrot(self.config.clone())
    }

    fn apply(&mut self, edit: OptionEdit) -> Result<(), GpuError> {
        match edit {
            OptionEdit::Oversampling(oversampling) => self.set_oversampling(oversampling),
            OptionEdit::Palette(palette) => {
                self.set_palette(palette);
                Ok(())
            }
            OptionEdit::IterationsPerFrame(iterations) => {
                self.set_iterations_per_frame(iterations);
                Ok(())
            }
            OptionEdit::Viewport(viewport) => {
                viewport.validate()?;
                self.config.viewport = viewport;
                Ok(())
            }
            other => Err(other.unsupported("escape-time")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_size_scales_by_oversampling() {
        assert_eq!(internal_size((100, 50), 1).unwrap(), (100, 50));
        assert_eq!(internal_size((100, 50), 3).unwrap(), (300, 150));
    }

    #[test]
    fn internal_size_rejects_empty_and_overflow() {
        assert!(matches!(
            internal_size((0, 10), 2),
            Err(GpuError::InvalidConfig(ConfigError::ZeroSize(0, 10)))
        ));
        assert!(matches!(
            internal_size((u32::MAX, 1), 2),
            Err(GpuError::ResourceCreation { .. })
        ));
    }
}
