//! GPU engine for affine iterated function systems.
//!
//! The only persistent state is the point-count buffer: one `u32` per pixel
//! holding the step at which the pixel was first reached, or 0. Every
//! structural edit regenerates the three programs and reseeds the buffer.

use crate::buffers::{
    color_output_entry, color_texture, storage_buffer, storage_entry, uniform_buffer,
    uniform_entry, AffineUniforms, PresentUniforms,
};
use crate::device::GpuContext;
use crate::error::GpuError;
use crate::fractal::{Fractal, FractalOptions, OptionEdit};
use crate::presenter::Presenter;
use crate::program::ProgramBuilder;
use crate::readback::read_buffer;
use crate::shaders::{affine, dispatch_size};
use crate::target::RenderTarget;
use fractalscope_core::ifs::{FIRST_STEP, UNVISITED};
use fractalscope_core::{AffineColors, AffineConfig, AffineTransform, InitialSet, Viewport};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

/// Programs and resources built for one configuration.
///
/// Built as a whole and only then swapped in, so a failed edit leaves the
/// running setup untouched.
struct AffineSetup {
    config: AffineConfig,
    seed: wgpu::ComputePipeline,
    iterate: wgpu::ComputePipeline,
    colorize: wgpu::ComputePipeline,
    counts: wgpu::Buffer,
    uniforms: wgpu::Buffer,
    color_view: wgpu::TextureView,
    bind_group: wgpu::BindGroup,
}

impl AffineSetup {
    fn build(
        context: &GpuContext,
        layout: &wgpu::BindGroupLayout,
        mut config: AffineConfig,
    ) -> Result<Self, GpuError> {
        config.validate()?;
        config.initial_set = config.initial_set.normalized();

        let sources = affine::generate(&config);
        let builder = ProgramBuilder::new(&context.device);
        let seed = builder.compute("affine_seed", &sources.seed, &[layout])?;
        let iterate = builder.compute("affine_iterate", &sources.iterate, &[layout])?;
        let colorize = builder.compute("affine_colorize", &sources.colorize, &[layout])?;

        let (width, height) = config.size;
        let cell_count = width as u64 * height as u64;
        let counts = storage_buffer(
            context,
            "affine_counts",
            cell_count * std::mem::size_of::<u32>() as u64,
        )?;
        let uniforms = uniform_buffer::<AffineUniforms>(context, "affine_uniforms");
        let color = color_texture(context, "affine_color", config.size)?;
        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());

        let bind_group = context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("affine_bind_group"),
                layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniforms.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: counts.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(&color_view),
                    },
                ],
            });

        log::info!(
            "Built affine setup '{}': {}x{}, {} transforms, {:?} mode, seed {:?}",
            config.name,
            width,
            height,
            config.transforms.len(),
            config.mode(),
            config.initial_set.kind()
        );

        Ok(Self {
            config,
            seed,
            iterate,
            colorize,
            counts,
            uniforms,
            color_view,
            bind_group,
        })
    }
}

/// Chaos-game and fan-out IFS renderer over a GPU point-count grid.
pub struct AffineEngine {
    context: Arc<GpuContext>,
    layout: wgpu::BindGroupLayout,
    setup: AffineSetup,
    presenter: Presenter,
    counter: u32,
    rng: StdRng,
}

impl AffineEngine {
    pub fn new(context: Arc<GpuContext>, config: AffineConfig) -> Result<Self, GpuError> {
        context.require_compute()?;

        let layout = context
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("affine_layout"),
                entries: &[uniform_entry(0), storage_entry(1, false), color_output_entry(2)],
            });

        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let setup = AffineSetup::build(&context, &layout, config)?;
        let presenter = Presenter::new(&context, "affine_present", wgpu::FilterMode::Nearest)?;

        let mut engine = Self {
            context,
            layout,
            setup,
            presenter,
            counter: FIRST_STEP,
            rng,
        };
        engine.reset()?;
        Ok(engine)
    }

    pub fn config(&self) -> &AffineConfig {
        &self.setup.config
    }

    pub fn size(&self) -> (u32, u32) {
        self.setup.config.size
    }

    /// Current step; cells holding this value are the active frontier.
    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn set_size(&mut self, size: (u32, u32)) -> Result<(), GpuError> {
        self.edit(|config| config.size = size)
    }

    pub fn set_viewport(&mut self, viewport: Viewport) -> Result<(), GpuError> {
        self.edit(|config| config.viewport = viewport)
    }

    pub fn set_transforms(&mut self, transforms: Vec<AffineTransform>) -> Result<(), GpuError> {
        self.edit(|config| config.transforms = transforms)
    }

    pub fn set_initial_set(&mut self, initial_set: InitialSet) -> Result<(), GpuError> {
        self.edit(|config| config.initial_set = initial_set)
    }

    pub fn set_samples_per_point(&mut self, samples: u32) -> Result<(), GpuError> {
        self.edit(|config| config.samples_per_point = samples)
    }

    /// Colors only feed a uniform; no rebuild.
    pub fn set_colors(&mut self, colors: AffineColors) {
        self.setup.config.colors = colors;
    }

    /// Apply `change` to a copy of the configuration and rebuild from it.
    fn edit(&mut self, change: impl FnOnce(&mut AffineConfig)) -> Result<(), GpuError> {
        let mut config = self.setup.config.clone();
        change(&mut config);
        match AffineSetup::build(&self.context, &self.layout, config) {
            Ok(setup) => {
                self.setup = setup;
                self.reset()
            }
            Err(e) => {
                log::warn!(
                    "Rejected edit of '{}', keeping previous configuration: {e}",
                    self.setup.config.name
                );
                Err(e)
            }
        }
    }

    /// Point-count cells, row-major with row 0 at the bottom of the viewport.
    pub async fn read_counts(&self) -> Result<Vec<u32>, GpuError> {
        read_buffer(&self.context, &self.setup.counts).await
    }

    pub async fn visited_count(&self) -> Result<usize, GpuError> {
        let counts = self.read_counts().await?;
        Ok(counts.iter().filter(|&&v| v != UNVISITED).count())
    }

    fn write_uniforms(&self, seed: u32) {
        let uniforms =
            AffineUniforms::new(self.size(), self.counter, seed, &self.setup.config.colors);
        self.context
            .queue
            .write_buffer(&self.setup.uniforms, 0, bytemuck::bytes_of(&uniforms));
    }

    fn encode_pass(&self, encoder: &mut wgpu::CommandEncoder, label: &str, pipeline: &wgpu::ComputePipeline) {
        let (x, y) = dispatch_size(self.size());
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(label),
            timestamp_writes: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.setup.bind_group, &[]);
        pass.dispatch_workgroups(x, y, 1);
    }

    /// Run one program in its own submission.
    fn submit_pass(&self, label: &str, pipeline: &wgpu::ComputePipeline) {
        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) });
        self.encode_pass(&mut encoder, label, pipeline);
        self.context.queue.submit(std::iter::once(encoder.finish()));
    }
}

impl Fractal for AffineEngine {
    /// One submission per step. Uniform writes are ordered with submissions,
    /// so step k+1 sees its own counter and every claim made by step k.
    fn iterate(&mut self, count: u32) -> Result<(), GpuError> {
        for _ in 0..count {
            let seed: u32 = self.rng.gen();
            self.write_uniforms(seed);
            self.submit_pass("affine_iterate", &self.setup.iterate);
            self.counter += 1;
        }
        log::debug!("Affine iterate x{count}, counter now {}", self.counter);
        Ok(())
    }

    fn render(&mut self, target: &RenderTarget, viewport: &Viewport) -> Result<(), GpuError> {
        if target.is_empty() {
            log::debug!("Skipping affine render into empty target");
            return Ok(());
        }

        self.write_uniforms(0);
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("affine_render"),
                });
        self.encode_pass(&mut encoder, "affine_colorize", &self.setup.colorize);

        let mapping = PresentUniforms::mapping(
            &self.setup.config.viewport,
            viewport,
            self.setup.config.colors.background,
        );
        self.presenter.draw(
            &self.context,
            &mut encoder,
            target,
            &self.setup.color_view,
            mapping,
        )?;
        self.context.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn reset(&mut self) -> Result<(), GpuError> {
        self.counter = FIRST_STEP;
        let seed: u32 = self.rng.gen();
        self.write_uniforms(seed);
        self.submit_pass("affine_seed", &self.setup.seed);
        log::debug!("Affine reset with seed {seed:#010x}");
        Ok(())
    }

    fn preferred_viewport(&self) -> Viewport {
        self.setup.config.viewport
    }

    fn preferred_iterations_per_frame(&self) -> u32 {
        1
    }

    fn options(&self) -> FractalOptions {
        FractalOptions::Affine(self.setup.config.clone())
    }

    fn apply(&mut self, edit: OptionEdit) -> Result<(), GpuError> {
        match edit {
            OptionEdit::Size(size) => self.set_size(size),
            OptionEdit::Viewport(viewport) => self.set_viewport(viewport),
            OptionEdit::Transforms(transforms) => self.set_transforms(transforms),
            OptionEdit::InitialSet(initial_set) => self.set_initial_set(initial_set),
            OptionEdit::SamplesPerPoint(samples) => self.set_samples_per_point(samples),
            OptionEdit::Colors(colors) => {
                self.set_colors(colors);
                Ok(())
            }
            other => Err(other.unsupported("affine")),
        }
    }
}
