//! Vulkan presentation bootstrap.
//!
//! Brings a rendering context up from nothing and keeps its presentable
//! surface valid for the life of the application:
//!
//! - dispatch table loading with all-or-nothing entry point resolution
//! - instance creation with windowing-layer surface extensions
//! - positional adapter (physical device + queue family) selection
//! - logical device bring-up with a single graphics queue
//! - swapchain lifecycle across resizes, minimizes and background
//!   transitions, with backing storage carried between generations
//!
//! All teardown is explicit and runs in reverse construction order.

pub mod adapter;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod instance;
pub mod surface;
pub mod swapchain;

pub use adapter::{select_adapter, Adapter};
pub use device::Device;
pub use error::{GpuError, Result};
pub use instance::Instance;
pub use surface::{Surface, SurfaceFns};
pub use swapchain::{Swapchain, SwapchainFns};
