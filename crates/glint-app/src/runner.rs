//! Application runner and event loop.

use std::sync::Arc;

use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

use glint_platform::{PlatformConfig, PlatformError};

use crate::app::GlintApp;
use crate::context::RenderContext;

/// Application configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// Window title, also used as the Vulkan application name.
    pub title: String,
    /// Initial window width.
    pub width: u32,
    /// Initial window height.
    pub height: u32,
    /// Whether the window can be resized.
    pub resizable: bool,
    /// Enable Vulkan validation layers (default: debug builds only).
    pub validation: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "glint".to_string(),
            width: 1280,
            height: 720,
            resizable: true,
            validation: cfg!(debug_assertions),
        }
    }
}

impl AppConfig {
    /// Create a new config with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Set the window dimensions.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Allow or forbid window resizing.
    pub fn with_resizable(mut self, resizable: bool) -> Self {
        self.resizable = resizable;
        self
    }

    /// Enable or disable validation layers.
    pub fn with_validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }
}

/// Run a [`GlintApp`] with the given configuration.
///
/// Initializes logging, then drives the event loop: the window and
/// render context are created on the first resume, the surface follows
/// background/foreground transitions, and the whole graph is torn down
/// before this returns. Initialization and swapchain recreation failures
/// end the loop and surface here as errors.
pub fn run<A: GlintApp + 'static>(config: AppConfig) -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("{} starting...", config.title);

    let event_loop =
        EventLoop::new().map_err(|e| PlatformError::EventLoop(e.to_string()))?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut runner = Runner::<A> {
        config,
        state: None,
        fatal: None,
    };

    event_loop.run_app(&mut runner)?;

    match runner.fatal {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Internal runner implementing winit's `ApplicationHandler`.
struct Runner<A: GlintApp> {
    config: AppConfig,
    state: Option<AppState<A>>,
    /// First fatal error observed; returned from `run` after the loop ends.
    fatal: Option<anyhow::Error>,
}

/// Internal application state.
struct AppState<A: GlintApp> {
    ctx: RenderContext,
    app: A,
}

impl<A: GlintApp + 'static> ApplicationHandler for Runner<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_none() {
            info!("Creating render context...");
            match self.create_state(event_loop) {
                Ok(state) => {
                    self.state = Some(state);
                    info!("Render context ready");
                }
                Err(e) => self.abort(event_loop, e.context("failed to initialize")),
            }
            return;
        }

        // Returning from the background: new surface, fresh swapchain.
        if let Err(e) = self.foreground() {
            self.abort(event_loop, e.context("failed to return to foreground"));
        }
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &mut self.state {
            info!("Entering background");
            state.ctx.suspend();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        // Let the app handle the event first
        if let Some(state) = &mut self.state {
            if state.app.on_event(&event) {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested");
                if let Some(mut state) = self.state.take() {
                    state.shutdown();
                }
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Err(e) = self.resize(size.width, size.height) {
                    self.abort(event_loop, e.context("swapchain recreation failed"));
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(mut state) = self.state.take() {
            state.shutdown();
        }
    }
}

impl<A: GlintApp + 'static> Runner<A> {
    fn create_state(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<AppState<A>> {
        let window = Arc::new(glint_platform::create_window(
            event_loop,
            &PlatformConfig {
                title: self.config.title.clone(),
                width: self.config.width,
                height: self.config.height,
                resizable: self.config.resizable,
            },
        )?);

        // SAFETY: the window is alive with valid handles and is kept
        // alive by the context itself.
        let mut ctx =
            unsafe { RenderContext::new(window, &self.config.title, self.config.validation)? };

        let app = A::init(&mut ctx)?;

        Ok(AppState { ctx, app })
    }

    fn foreground(&mut self) -> anyhow::Result<()> {
        if let Some(state) = &mut self.state {
            state.ctx.resume()?;
            state.app.swapchain_rebuilt(&state.ctx)?;
        }
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> anyhow::Result<()> {
        if let Some(state) = &mut self.state {
            debug!("Window resized to {width}x{height}");
            state.ctx.rebuild_swapchain()?;
            state.app.swapchain_rebuilt(&state.ctx)?;
        }
        Ok(())
    }

    /// Record the first fatal error, tear everything down and end the
    /// event loop.
    fn abort(&mut self, event_loop: &ActiveEventLoop, e: anyhow::Error) {
        error!("{e:#}");
        if let Some(mut state) = self.state.take() {
            state.shutdown();
        }
        if self.fatal.is_none() {
            self.fatal = Some(e);
        }
        event_loop.exit();
    }
}

impl<A: GlintApp> AppState<A> {
    fn shutdown(&mut self) {
        info!("Starting shutdown...");
        if let Err(e) = self.ctx.wait_idle() {
            error!("Failed to wait idle: {e}");
        }

        // Let the app release its resources first
        self.app.shutdown(&mut self.ctx);

        // Then tear down the context itself
        self.ctx.teardown();
        info!("Shutdown complete");
    }
}
