//! Compiles generated WGSL into pipelines, turning validation failures into errors.
//!
//! wgpu reports shader and pipeline errors asynchronously through the device.
//! Every creation here runs inside a validation error scope so a bad program
//! surfaces as [`GpuError::ShaderCompilation`] instead of the default
//! uncaptured-error panic.

use crate::error::GpuError;

pub struct ProgramBuilder<'a> {
    device: &'a wgpu::Device,
}

impl<'a> ProgramBuilder<'a> {
    pub fn new(device: &'a wgpu::Device) -> Self {
        Self { device }
    }

    /// Compute pipeline with entry point `main`.
    pub fn compute(
        &self,
        label: &str,
        source: &str,
        layouts: &[&wgpu::BindGroupLayout],
    ) -> Result<wgpu::ComputePipeline, GpuError> {
        log::debug!("Compiling compute program '{label}' ({} bytes)", source.len());
        self.scoped(label, || {
            let module = self.module(label, source);
            let layout = self.pipeline_layout(label, layouts);
            self.device
                .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some(label),
                    layout: Some(&layout),
                    module: &module,
                    entry_point: Some("main"),
                    compilation_options: Default::default(),
                    cache: None,
                })
        })
    }

    /// Render pipeline with entry points `vs_main` and `fs_main` drawing to `format`.
    pub fn present(
        &self,
        label: &str,
        source: &str,
        layout: &wgpu::BindGroupLayout,
        format: wgpu::TextureFormat,
    ) -> Result<wgpu::RenderPipeline, GpuError> {
        log::debug!("Compiling present program '{label}' for {format:?}");
        self.scoped(label, || {
            let module = self.module(label, source);
            let pipeline_layout = self.pipeline_layout(label, &[layout]);
            self.device
                .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some(label),
                    layout: Some(&pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: &module,
                        entry_point: Some("vs_main"),
                        compilation_options: Default::default(),
                        buffers: &[],
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: &module,
                        entry_point: Some("fs_main"),
                        compilation_options: Default::default(),
                        targets: &[Some(wgpu::ColorTargetState {
                            format,
                            blend: None,
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                    }),
                    primitive: wgpu::PrimitiveState::default(),
                    depth_stencil: None,
                    multisample: wgpu::MultisampleState::default(),
                    multiview: None,
                    cache: None,
                })
        })
    }

    fn module(&self, label: &str, source: &str) -> wgpu::ShaderModule {
        self.device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
    }

    fn pipeline_layout(
        &self,
        label: &str,
        layouts: &[&wgpu::BindGroupLayout],
    ) -> wgpu::PipelineLayout {
        self.device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(label),
                bind_group_layouts: layouts,
                push_constant_ranges: &[],
            })
    }

    fn scoped<T>(&self, label: &str, create: impl FnOnce() -> T) -> Result<T, GpuError> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let created = create();
        match pollster::block_on(self.device.pop_error_scope()) {
            None => Ok(created),
            Some(error) => {
                log::warn!("Program '{label}' rejected by the device");
                Err(GpuError::ShaderCompilation {
                    label: label.into(),
                    log: error.to_string(),
                })
            }
        }
    }
}
