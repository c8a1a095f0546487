//! Swapchain parameters and their negotiation with the surface.
//!
//! wgpu hides the presentable images behind `Surface::configure`; what the
//! render thread owns is the configuration plus a generation counter. A resize
//! throws the old state away and negotiates a fresh one.

mod extent;
mod state;
mod surface;

pub use extent::{choose_extent, Extent, SurfaceBounds};
pub use state::SwapchainState;
