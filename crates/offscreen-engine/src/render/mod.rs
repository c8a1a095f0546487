//! wgpu implementation of the frame loop backend.
//!
//! - `particles`: GPU data layouts and initial particle placement
//! - `resources`: pipelines, buffers, bind groups and swapchain (re)creation
//!
//! Convention: positions are in NDC; the graphics pass converts the point size
//! from physical pixels using the render-params uniform.

pub mod particles;
mod resources;

use std::sync::Arc;

pub use resources::{FrameImage, GpuResources, WgpuFactory};

use crate::assets::AssetLocator;
use crate::device::GpuInit;
use crate::swapchain::Extent;
use crate::thread::RenderThread;

impl RenderThread<WgpuFactory> {
    /// Controller for a render thread that draws into the owner's surface.
    pub fn with_surface(
        instance: wgpu::Instance,
        surface: Arc<wgpu::Surface<'static>>,
        extent: Extent,
        init: GpuInit,
        assets: AssetLocator,
    ) -> Self {
        let factory = WgpuFactory::new(instance, surface, init.clone(), assets);
        RenderThread::new(factory, extent, init)
    }
}
