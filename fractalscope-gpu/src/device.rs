//! GPU device initialization and capability detection.

use crate::error::GpuError;

/// Minimum storage buffers per compute stage used by any engine.
const REQUIRED_STORAGE_BUFFERS: u32 = 4;

/// Holds the wgpu device and queue, plus what the adapter can do.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    features: wgpu::Features,
    downlevel: wgpu::DownlevelCapabilities,
    storage_texture_rgba8: bool,
}

/// Result of GPU initialization attempt.
pub enum GpuAvailability {
    Available(GpuContext),
    Unavailable(String),
}

impl GpuContext {
    /// Attempt to initialize GPU. Returns Unavailable on any failure.
    pub async fn try_init() -> GpuAvailability {
        match Self::init_internal().await {
            Ok(ctx) => GpuAvailability::Available(ctx),
            Err(e) => {
                log::warn!("GPU initialization failed: {e}");
                GpuAvailability::Unavailable(e.to_string())
            }
        }
    }

    async fn init_internal() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        log::info!("GPU adapter: {:?}", adapter.get_info());

        // Double precision is optional here; only the escape-time engine needs it.
        let features = adapter.features() & wgpu::Features::SHADER_F64;
        if features.is_empty() {
            log::info!("Adapter lacks SHADER_F64, escape-time engine disabled");
        }

        let downlevel = adapter.get_downlevel_capabilities();
        let storage_texture_rgba8 = adapter
            .get_texture_format_features(wgpu::TextureFormat::Rgba8Unorm)
            .allowed_usages
            .contains(wgpu::TextureUsages::STORAGE_BINDING);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("fractalscope"),
                    required_features: features,
                    required_limits: adapter.limits(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        Ok(Self {
            device,
            queue,
            features,
            downlevel,
            storage_texture_rgba8,
        })
    }

    pub fn supports_f64(&self) -> bool {
        self.features.contains(wgpu::Features::SHADER_F64)
    }

    /// Compute shaders, enough storage buffers, and writable rgba8 storage textures.
    pub fn require_compute(&self) -> Result<(), GpuError> {
        if !self
            .downlevel
            .flags
            .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS)
        {
            return Err(GpuError::MissingCapability("compute shaders".into()));
        }
        let storage_buffers = self.device.limits().max_storage_buffers_per_shader_stage;
        if storage_buffers < REQUIRED_STORAGE_BUFFERS {
            return Err(GpuError::MissingCapability(format!(
                "{REQUIRED_STORAGE_BUFFERS} storage buffers per stage (adapter has {storage_buffers})"
            )));
        }
        if !self.storage_texture_rgba8 {
            return Err(GpuError::MissingCapability(
                "rgba8unorm storage textures".into(),
            ));
        }
        Ok(())
    }

    pub fn require_f64(&self) -> Result<(), GpuError> {
        self.require_compute()?;
        if !self.supports_f64() {
            return Err(GpuError::MissingCapability("SHADER_F64".into()));
        }
        Ok(())
    }

    /// Fail with `ResourceCreation` when a storage buffer of `bytes` cannot be bound.
    pub fn check_buffer_size(&self, label: &str, bytes: u64) -> Result<(), GpuError> {
        let limits = self.device.limits();
        let max = (limits.max_storage_buffer_binding_size as u64).min(limits.max_buffer_size);
        if bytes == 0 || bytes > max {
            return Err(GpuError::ResourceCreation {
                label: label.into(),
                log: format!("buffer of {bytes} bytes outside supported range 1..={max}"),
            });
        }
        Ok(())
    }

    /// Fail with `ResourceCreation` when a 2D texture of `size` is not supported.
    pub fn check_texture_size(&self, label: &str, size: (u32, u32)) -> Result<(), GpuError> {
        let max = self.device.limits().max_texture_dimension_2d;
        if size.0 == 0 || size.1 == 0 || size.0 > max || size.1 > max {
            return Err(GpuError::ResourceCreation {
                label: label.into(),
                log: format!("texture {}x{} outside supported range 1..={max}", size.0, size.1),
            });
        }
        Ok(())
    }
}
