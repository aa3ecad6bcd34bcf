//! Application framework for glint.
//!
//! This crate provides a trait-based application framework that handles
//! the presentation boilerplate:
//! - Window creation and management
//! - Vulkan instance, adapter and device bring-up
//! - Swapchain creation and recreation across resizes
//! - Surface teardown and restore on background/foreground transitions
//! - Event loop handling and ordered shutdown
//!
//! # Example
//!
//! ```no_run
//! use glint_app::{run, AppConfig, GlintApp, RenderContext};
//!
//! struct MyApp {
//!     // Application state
//! }
//!
//! impl GlintApp for MyApp {
//!     fn init(ctx: &mut RenderContext) -> anyhow::Result<Self> {
//!         Ok(MyApp {})
//!     }
//!
//!     fn swapchain_rebuilt(&mut self, ctx: &RenderContext) -> anyhow::Result<()> {
//!         // Recreate size-dependent resources here
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     run::<MyApp>(AppConfig::default())
//! }
//! ```

mod app;
mod context;
mod runner;

pub use app::GlintApp;
pub use context::RenderContext;
pub use runner::{run, AppConfig};

// Re-export commonly used types for convenience
pub use glint_gpu::{Adapter, Device, GpuError, Instance, Surface, Swapchain};
pub use winit::event::WindowEvent;
