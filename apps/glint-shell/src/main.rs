//! glint presentation shell
//!
//! Opens a window and keeps a presentable Vulkan context alive through
//! resizes, minimizes and background/foreground transitions. Renders
//! nothing; useful for validating a machine's presentation bring-up and
//! as the smallest possible starting point for an application.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p glint-shell
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

mod app;

use glint_app::{run, AppConfig};

use crate::app::Shell;

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;

fn main() -> anyhow::Result<()> {
    run::<Shell>(AppConfig::new("glint shell").with_size(WIDTH, HEIGHT))
}
