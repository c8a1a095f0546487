use anyhow::{Context, Result};
use winit::event_loop::EventLoop;

use offscreen_engine::logging::init_logging;

mod app;
mod bindings;
mod config;

use app::DemoApp;
use config::DemoConfig;

fn main() -> Result<()> {
    let config = DemoConfig::default();
    init_logging(config.logging.clone());

    let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
    let mut app = DemoApp::new(config);

    event_loop
        .run_app(&mut app)
        .context("winit event loop terminated with error")?;

    app.finish()
}
