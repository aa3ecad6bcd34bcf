//! GPU error types.

use ash::vk;
use thiserror::Error;

/// Errors produced while bringing the presentation stack up or rebuilding
/// parts of it.
#[derive(Error, Debug)]
pub enum GpuError {
    /// Vulkan error.
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),

    /// The loader or driver did not expose a required entry point.
    #[error("Missing Vulkan entry point: {0}")]
    MissingEntryPoint(String),

    /// No physical device has a queue family that can render and present.
    #[error("No suitable GPU adapter found")]
    NoSuitableAdapter,

    /// The Vulkan loader library could not be opened.
    #[error("Failed to load Vulkan library: {0}")]
    LibraryLoad(#[from] ash::LoadingError),

    /// Surface creation failed.
    #[error("Surface creation failed: {0}")]
    SurfaceCreation(String),
}

/// Result type for GPU operations.
pub type Result<T> = std::result::Result<T, GpuError>;
