use parking_lot::Mutex;

use crate::swapchain::Extent;

#[derive(Debug)]
struct Shared {
    running: bool,
    requested: Option<Extent>,
    current: Extent,
}

/// State shared between the owner thread and the render thread.
///
/// Everything lives behind one lock so a reader never sees a request and the
/// extent it produced out of step. The lock is never held across GPU work.
#[derive(Debug)]
pub struct RenderThreadState {
    shared: Mutex<Shared>,
}

impl RenderThreadState {
    pub fn new(initial: Extent) -> Self {
        Self {
            shared: Mutex::new(Shared { running: false, requested: None, current: initial }),
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().running
    }

    pub fn set_running(&self, running: bool) {
        self.shared.lock().running = running;
    }

    /// Records a resize request, replacing any request not yet applied.
    ///
    /// Returns the request that was replaced.
    pub fn request_resize(&self, extent: Extent) -> Option<Extent> {
        self.shared.lock().requested.replace(extent)
    }

    /// Removes the pending request, if any.
    pub fn take_request(&self) -> Option<Extent> {
        self.shared.lock().requested.take()
    }

    pub fn pending_request(&self) -> Option<Extent> {
        self.shared.lock().requested
    }

    /// Extent of the swapchain the render thread is presenting with.
    pub fn current_extent(&self) -> Extent {
        self.shared.lock().current
    }

    pub fn publish_extent(&self, extent: Extent) {
        self.shared.lock().current = extent;
    }
}
