use crate::device::GpuInit;

use super::extent::{choose_extent, Extent, SurfaceBounds};
use super::surface;

/// Negotiated swapchain parameters.
///
/// Owned and mutated only by the render thread. A resize never edits this in
/// place; [`SwapchainState::negotiate`] produces a whole new state with the next
/// generation number.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapchainState {
    pub extent: Extent,
    pub format: wgpu::TextureFormat,
    pub present_mode: wgpu::PresentMode,
    pub alpha_mode: wgpu::CompositeAlphaMode,
    /// Maximum number of images queued for presentation.
    pub image_count: u32,
    /// Incremented on every (re)creation, starting at 0.
    pub generation: u64,
}

impl SwapchainState {
    /// Chooses format, present mode and extent from the surface capabilities.
    ///
    /// Returns `None` when the surface offers no formats at all.
    pub fn negotiate(
        caps: &wgpu::SurfaceCapabilities,
        bounds: &SurfaceBounds,
        requested: Extent,
        init: &GpuInit,
        generation: u64,
    ) -> Option<Self> {
        let format = surface::choose_surface_format(caps, init.prefer_srgb)?;
        Some(Self {
            extent: choose_extent(bounds, requested),
            format,
            present_mode: surface::choose_present_mode(caps, &init.present_modes),
            alpha_mode: surface::choose_alpha_mode(caps, init.alpha_mode),
            image_count: init.frames_in_flight() as u32,
            generation,
        })
    }

    pub fn surface_configuration(&self) -> wgpu::SurfaceConfiguration {
        wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: self.format,
            width: self.extent.width,
            height: self.extent.height,
            present_mode: self.present_mode,
            alpha_mode: self.alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: self.image_count,
        }
    }
}
