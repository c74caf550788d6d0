//! Draws an engine's color image into a render target.

use crate::buffers::{uniform_buffer, PresentUniforms};
use crate::device::GpuContext;
use crate::error::GpuError;
use crate::program::ProgramBuilder;
use crate::shaders::present::PRESENT_SOURCE;
use crate::target::RenderTarget;
use std::collections::HashMap;

/// Bind layout, sampler, and one render pipeline per target format seen so far.
pub(crate) struct Presenter {
    label: &'static str,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    uniforms: wgpu::Buffer,
    pipelines: HashMap<wgpu::TextureFormat, wgpu::RenderPipeline>,
}

impl Presenter {
    /// `filter` decides how the image is resampled: nearest keeps grid cells
    /// crisp, linear averages oversampled pixels.
    pub fn new(
        context: &GpuContext,
        label: &'static str,
        filter: wgpu::FilterMode,
    ) -> Result<Self, GpuError> {
        let layout = context
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let sampler = context.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter,
            min_filter: filter,
            ..Default::default()
        });

        let mut presenter = Self {
            label,
            layout,
            sampler,
            uniforms: uniform_buffer::<PresentUniforms>(context, label),
            pipelines: HashMap::new(),
        };
        // Most callers present to rgba8, so surface compile errors at construction.
        presenter.ensure_pipeline(context, wgpu::TextureFormat::Rgba8Unorm)?;
        Ok(presenter)
    }

    fn ensure_pipeline(
        &mut self,
        context: &GpuContext,
        format: wgpu::TextureFormat,
    ) -> Result<(), GpuError> {
        if !self.pipelines.contains_key(&format) {
            let pipeline = ProgramBuilder::new(&context.device).present(
                self.label,
                PRESENT_SOURCE,
                &self.layout,
                format,
            )?;
            self.pipelines.insert(format, pipeline);
        }
        Ok(())
    }

    /// Record a pass drawing `image` into `target` through `mapping`.
    pub fn draw(
        &mut self,
        context: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        target: &RenderTarget,
        image: &wgpu::TextureView,
        mapping: PresentUniforms,
    ) -> Result<(), GpuError> {
        self.ensure_pipeline(context, target.format)?;
        let pipeline = self.pipelines.get(&target.format).ok_or_else(|| {
            GpuError::Unavailable(format!("no present pipeline for {:?}", target.format))
        })?;

        context
            .queue
            .write_buffer(&self.uniforms, 0, bytemuck::bytes_of(&mapping));

        let bind_group = context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(self.label),
                layout: &self.layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: self.uniforms.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(image),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                ],
            });

        let [r, g, b, a] = mapping.background;
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(self.label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: r as f64,
                        g: g as f64,
                        b: b as f64,
                        a: a as f64,
                    }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.draw(0..3, 0..1);
        Ok(())
    }
}
