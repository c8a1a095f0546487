use crate::error::Result;
use crate::swapchain::{Extent, SwapchainState};
use crate::sync::LedgerReport;

/// Result of acquiring the next presentable image.
#[derive(Debug)]
pub enum Acquired<I> {
    Ready(I),
    /// The surface no longer matches the swapchain (outdated, lost or suboptimal).
    Stale,
    /// Acquisition timed out or failed transiently; the frame is skipped.
    Skip,
}

/// Result of presenting an image.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Presented {
    Done,
    /// Presented, but the swapchain should be recreated before the next frame.
    Stale,
}

/// GPU work the frame loop drives, one call per loop step.
///
/// Implementations own every GPU object except the synchronization set, and
/// are only ever used from the render thread. Slots are indices into the
/// frame-in-flight ring.
pub trait FrameBackend {
    /// Token identifying one queue submission; what a fence waits on.
    type Submission;

    /// An acquired presentable image.
    type Image;

    fn swapchain(&self) -> &SwapchainState;

    fn adapter_name(&self) -> String;

    /// Blocks until `submission` completes. `fence` and `slot` label errors.
    fn wait(&mut self, submission: Self::Submission, fence: &'static str, slot: usize) -> Result<()>;

    /// Records and submits the compute pass for `slot`.
    fn submit_compute(&mut self, slot: usize, dt: f32) -> Result<Self::Submission>;

    /// Destroys and rebuilds the swapchain and everything that depends on it.
    ///
    /// Returns the extent actually chosen, which may differ from `requested`
    /// after clamping to the surface bounds.
    fn recreate_swapchain(&mut self, requested: Extent) -> Result<Extent>;

    fn acquire(&mut self, slot: usize) -> Result<Acquired<Self::Image>>;

    /// Records and submits the graphics pass for `slot` into `image`.
    fn submit_graphics(&mut self, slot: usize, image: &Self::Image) -> Result<Self::Submission>;

    fn present(&mut self, slot: usize, image: Self::Image) -> Result<Presented>;

    /// Set once the device can no longer complete work.
    fn device_lost(&self) -> Option<String>;

    /// Blocks until the device has finished all submitted work.
    fn wait_idle(&mut self) -> Result<()>;

    /// Releases every GPU object, newest first.
    fn teardown(self) -> LedgerReport;
}

/// Builds the backend on the render thread.
///
/// Shared by the controller across restarts; everything it hands out is used
/// on the render thread only.
pub trait BackendFactory: Send + Sync + 'static {
    type Backend: FrameBackend;

    fn create(&self, extent: Extent, frames_in_flight: usize) -> Result<Self::Backend>;
}
