//! Uniform layouts and GPU resource allocation shared by the engines.

use crate::device::GpuContext;
use crate::error::GpuError;
use bytemuck::{Pod, Zeroable};
use fractalscope_core::packed::pack_bounds;
use fractalscope_core::{AffineColors, Color, EscapePalette, Viewport};

/// Format of every color image the engines produce.
pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Uniforms for the affine seed, iterate and colorize programs.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct AffineUniforms {
    pub size: [u32; 2],
    pub counter: u32,
    pub seed: u32,
    pub primary: [f32; 4],
    pub secondary: [f32; 4],
    pub background: [f32; 4],
    pub falloff_rate: f32,
    pub _pad: [u32; 3],
}

impl AffineUniforms {
    pub fn new(size: (u32, u32), counter: u32, seed: u32, colors: &AffineColors) -> Self {
        Self {
            size: [size.0, size.1],
            counter,
            seed,
            primary: colors.primary.to_array(),
            secondary: colors.secondary.to_array(),
            background: colors.background.to_array(),
            falloff_rate: colors.falloff_rate(),
            _pad: [0; 3],
        }
    }
}

/// Uniforms for the escape-time iterate and colorize programs.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct MandelbrotUniforms {
    pub size: [u32; 2],
    pub steps: u32,
    pub counter: u32,
    // [left, right] and [bottom, top] as packed doubles
    pub bounds: [[u32; 4]; 2],
    pub phase: [f32; 4],
    pub interior: [f32; 4],
    pub frequency: f32,
    pub _pad: [u32; 3],
}

impl MandelbrotUniforms {
    pub fn new(
        size: (u32, u32),
        viewport: &Viewport,
        steps: u32,
        counter: u32,
        palette: &EscapePalette,
    ) -> Self {
        Self {
            size: [size.0, size.1],
            steps,
            counter,
            bounds: packed_bounds(viewport),
            phase: [palette.phase[0], palette.phase[1], palette.phase[2], 0.0],
            interior: palette.interior.to_array(),
            frequency: palette.frequency,
            _pad: [0; 3],
        }
    }
}

/// Uniforms for resampling one escape-time state into another layout.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ReprojectUniforms {
    pub size: [u32; 2],
    pub old_size: [u32; 2],
    pub bounds: [[u32; 4]; 2],
    pub old_bounds: [[u32; 4]; 2],
}

impl ReprojectUniforms {
    pub fn new(
        size: (u32, u32),
        viewport: &Viewport,
        old_size: (u32, u32),
        old_viewport: &Viewport,
    ) -> Self {
        Self {
            size: [size.0, size.1],
            old_size: [old_size.0, old_size.1],
            bounds: packed_bounds(viewport),
            old_bounds: packed_bounds(old_viewport),
        }
    }
}

/// Affine map from target screen coordinates to source image coordinates.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct PresentUniforms {
    pub scale: [f32; 2],
    pub offset: [f32; 2],
    pub background: [f32; 4],
}

impl PresentUniforms {
    /// Show the image covering `source` inside a target showing `target`.
    ///
    /// The map is composed in f64 and only the relative result is narrowed,
    /// so deep viewports do not lose precision here.
    pub fn mapping(source: &Viewport, target: &Viewport, background: Color) -> Self {
        let scale_x = target.width() / source.width();
        let scale_y = target.height() / source.height();
        let offset_x = (target.left - source.left) / source.width();
        let offset_y = (target.bottom - source.bottom) / source.height();
        Self {
            scale: [scale_x as f32, scale_y as f32],
            offset: [offset_x as f32, offset_y as f32],
            background: background.to_array(),
        }
    }
}

/// Viewport bounds as two `vec4<u32>`: `[left, right]` and `[bottom, top]`.
pub fn packed_bounds(viewport: &Viewport) -> [[u32; 4]; 2] {
    let [l, r, b, t] = pack_bounds(viewport.to_array());
    [[l[0], l[1], r[0], r[1]], [b[0], b[1], t[0], t[1]]]
}

pub(crate) fn uniform_buffer<T: Pod>(context: &GpuContext, label: &str) -> wgpu::Buffer {
    context.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: std::mem::size_of::<T>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Storage buffer that can be cleared, uploaded to and read back.
pub(crate) fn storage_buffer(
    context: &GpuContext,
    label: &str,
    bytes: u64,
) -> Result<wgpu::Buffer, GpuError> {
    context.check_buffer_size(label, bytes)?;
    Ok(context.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: bytes,
        usage: wgpu::BufferUsages::STORAGE
            | wgpu::BufferUsages::COPY_SRC
            | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    }))
}

/// Color image written by a compute pass and sampled by the present pass.
pub(crate) fn color_texture(
    context: &GpuContext,
    label: &str,
    size: (u32, u32),
) -> Result<wgpu::Texture, GpuError> {
    context.check_texture_size(label, size)?;
    Ok(context.device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size.0,
            height: size.1,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: COLOR_FORMAT,
        usage: wgpu::TextureUsages::STORAGE_BINDING
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    }))
}

pub(crate) fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

pub(crate) fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

pub(crate) fn color_output_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::StorageTexture {
            access: wgpu::StorageTextureAccess::WriteOnly,
            format: COLOR_FORMAT,
            view_dimension: wgpu::TextureViewDimension::D2,
        },
        count: None,
    }
}
