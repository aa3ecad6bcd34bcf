//! Platform abstraction for glint.
//!
//! Provides window creation and size queries via winit.

use thiserror::Error;
use winit::dpi::PhysicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::Window;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Window creation failed: {0}")]
    WindowCreation(String),
    #[error("Event loop error: {0}")]
    EventLoop(String),
}

pub type Result<T> = std::result::Result<T, PlatformError>;

/// Window configuration.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            title: "glint".to_string(),
            width: 1280,
            height: 720,
            resizable: true,
        }
    }
}

/// Create the application window.
///
/// Must be called from inside the event loop, after the application has
/// been resumed.
pub fn create_window(event_loop: &ActiveEventLoop, config: &PlatformConfig) -> Result<Window> {
    let attributes = Window::default_attributes()
        .with_title(&config.title)
        .with_inner_size(PhysicalSize::new(config.width, config.height))
        .with_resizable(config.resizable);

    let window = event_loop
        .create_window(attributes)
        .map_err(|e| PlatformError::WindowCreation(e.to_string()))?;

    tracing::debug!("Window created: {}x{}", config.width, config.height);
    Ok(window)
}

/// The window's current drawable size in pixels.
///
/// Reports exactly what the window system says, zero dimensions included;
/// a minimized window is allowed to be 0x0.
pub fn drawable_size(window: &Window) -> (u32, u32) {
    let size = window.inner_size();
    (size.width, size.height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_resizable_hd() {
        let config = PlatformConfig::default();
        assert_eq!(config.width, 1280);
        assert_eq!(config.height, 720);
        assert!(config.resizable);
    }
}
