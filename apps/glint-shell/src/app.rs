//! Shell application: reports presentation state and nothing else.

use glint_app::{GlintApp, RenderContext};
use tracing::info;

pub struct Shell;

impl GlintApp for Shell {
    fn init(ctx: &mut RenderContext) -> anyhow::Result<Self> {
        let adapter = ctx.adapter();
        info!(
            "Presenting on queue family {}",
            adapter.queue_family_index
        );

        match ctx.swapchain() {
            Some(swapchain) => info!(
                "Initial swapchain: {}x{} ({} images)",
                swapchain.extent().width,
                swapchain.extent().height,
                swapchain.image_count()
            ),
            None => info!("Initial swapchain absent (zero-sized window)"),
        }

        Ok(Self)
    }

    fn swapchain_rebuilt(&mut self, ctx: &RenderContext) -> anyhow::Result<()> {
        match ctx.swapchain() {
            Some(swapchain) => info!(
                "Swapchain now {}x{} ({} images)",
                swapchain.extent().width,
                swapchain.extent().height,
                swapchain.image_count()
            ),
            None => info!("Swapchain absent (zero-sized window)"),
        }
        Ok(())
    }

    fn shutdown(&mut self, _ctx: &mut RenderContext) {
        info!("Shell closing");
    }
}
