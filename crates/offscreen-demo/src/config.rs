use std::time::Duration;

use offscreen_engine::device::GpuInit;
use offscreen_engine::logging::LoggingConfig;
use offscreen_engine::swapchain::Extent;

/// Demo owner configuration.
#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub title: String,
    /// Initial inner size in physical pixels.
    pub initial_size: Extent,
    /// How often the owner loop wakes to check on the render thread.
    pub tick: Duration,
    pub gpu: GpuInit,
    pub logging: LoggingConfig,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            title: "offscreen render thread".to_string(),
            initial_size: Extent::new(800, 600),
            tick: Duration::from_millis(8),
            gpu: GpuInit::default(),
            logging: LoggingConfig::default(),
        }
    }
}
