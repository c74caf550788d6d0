//! GPU error types.

use fractalscope_core::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("No GPU adapter found")]
    NoAdapter,

    #[error("Failed to create device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),

    #[error("Buffer mapping failed: {0}")]
    BufferMap(#[from] wgpu::BufferAsyncError),

    #[error("Missing GPU capability: {0}")]
    MissingCapability(String),

    #[error("Shader program '{label}' failed to compile:\n{log}")]
    ShaderCompilation { label: String, log: String },

    #[error("Failed to create resource '{label}': {log}")]
    ResourceCreation { label: String, log: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("GPU unavailable: {0}")]
    Unavailable(String),
}
