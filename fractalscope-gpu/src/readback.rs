//! Copying GPU buffers back to the CPU.

use crate::device::GpuContext;
use crate::error::GpuError;
use bytemuck::Pod;

/// Copy `source` into a fresh staging buffer and return its contents.
pub(crate) async fn read_buffer<T: Pod>(
    context: &GpuContext,
    source: &wgpu::Buffer,
) -> Result<Vec<T>, GpuError> {
    let size = source.size();
    let staging = context.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("readback_staging"),
        size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = context
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("readback_encoder"),
        });
    encoder.copy_buffer_to_buffer(source, 0, &staging, 0, size);
    context.queue.submit(std::iter::once(encoder.finish()));

    map_and_collect(context, &staging).await
}

/// Map an already filled MAP_READ buffer and return its contents.
pub(crate) async fn map_and_collect<T: Pod>(
    context: &GpuContext,
    buffer: &wgpu::Buffer,
) -> Result<Vec<T>, GpuError> {
    let slice = buffer.slice(..);

    let (tx, rx) = futures_channel::oneshot::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });

    context.device.poll(wgpu::Maintain::Wait);

    rx.await
        .map_err(|_| GpuError::Unavailable("Channel closed".into()))?
        .map_err(GpuError::BufferMap)?;

    let data = {
        let view = slice.get_mapped_range();
        bytemuck::cast_slice(&view).to_vec()
    };
    buffer.unmap();

    Ok(data)
}
