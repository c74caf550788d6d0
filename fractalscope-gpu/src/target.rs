//! Where engines draw their frames.

use crate::device::GpuContext;
use crate::error::GpuError;
use crate::readback::map_and_collect;

/// A texture view the caller wants a frame drawn into.
#[derive(Clone, Copy, Debug)]
pub struct RenderTarget<'a> {
    pub view: &'a wgpu::TextureView,
    pub format: wgpu::TextureFormat,
    /// Resolution in pixels.
    pub size: (u32, u32),
}

impl<'a> RenderTarget<'a> {
    pub fn new(view: &'a wgpu::TextureView, format: wgpu::TextureFormat, size: (u32, u32)) -> Self {
        Self { view, format, size }
    }

    pub fn is_empty(&self) -> bool {
        self.size.0 == 0 || self.size.1 == 0
    }
}

/// A render target backed by an owned texture whose pixels can be read back.
pub struct OffscreenTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: (u32, u32),
}

impl OffscreenTarget {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    pub fn new(context: &GpuContext, size: (u32, u32)) -> Result<Self, GpuError> {
        context.check_texture_size("offscreen_target", size)?;
        let texture = context.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("offscreen_target"),
            size: wgpu::Extent3d {
                width: size.0,
                height: size.1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(Self {
            texture,
            view,
            size,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn target(&self) -> RenderTarget<'_> {
        RenderTarget::new(&self.view, Self::FORMAT, self.size)
    }

    /// Row-major RGBA pixels, top row first.
    pub async fn read_pixels(&self, context: &GpuContext) -> Result<Vec<[u8; 4]>, GpuError> {
        let (width, height) = self.size;
        let unpadded = width * 4;
        let padded = unpadded.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        let staging = context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("offscreen_staging"),
            size: padded as u64 * height as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("offscreen_readback"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &staging,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        context.queue.submit(std::iter::once(encoder.finish()));

        let bytes: Vec<u8> = map_and_collect(context, &staging).await?;
        let pixels = bytes
            .chunks(padded as usize)
            .flat_map(|row| {
                row[..unpadded as usize]
                    .chunks_exact(4)
                    .map(|p| [p[0], p[1], p[2], p[3]])
            })
            .collect();
        Ok(pixels)
    }
}
