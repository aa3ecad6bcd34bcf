//! `GlintApp` trait definition.

use winit::event::WindowEvent;

use crate::context::RenderContext;

/// Trait for applications driven by the glint runner.
///
/// The framework owns the window, the Vulkan object graph and the
/// swapchain lifecycle: applications implement this trait to hook into
/// those moments and attach their own resources on top.
pub trait GlintApp: Sized {
    /// Initialize the application.
    ///
    /// Called once, after the window and render context have been
    /// created and the initial swapchain exists (or is absent, when the
    /// window opened with a zero drawable size).
    fn init(ctx: &mut RenderContext) -> anyhow::Result<Self>;

    /// Handle a swapchain change.
    ///
    /// Called after the framework rebuilds the swapchain for a resize or
    /// a return from the background, so size-dependent resources can
    /// follow. `ctx.swapchain()` is `None` when the window currently has
    /// a zero drawable size.
    ///
    /// Default implementation does nothing.
    #[allow(unused_variables)]
    fn swapchain_rebuilt(&mut self, ctx: &RenderContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// Handle window events.
    ///
    /// Called for each window event before the framework's own handling.
    /// Return `true` if the event was handled and should not be
    /// processed further.
    ///
    /// Default implementation does nothing and returns `false`.
    #[allow(unused_variables)]
    fn on_event(&mut self, event: &WindowEvent) -> bool {
        false
    }

    /// Cleanup resources before shutdown.
    ///
    /// Called right before the render context is torn down. The device
    /// will be idle when this is called, so it is safe to destroy GPU
    /// resources.
    ///
    /// Default implementation does nothing.
    #[allow(unused_variables)]
    fn shutdown(&mut self, ctx: &mut RenderContext) {}
}
