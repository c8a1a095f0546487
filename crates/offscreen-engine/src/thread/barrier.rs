use std::sync::mpsc::{self, Receiver, SyncSender};

use crate::error::{RenderError, Result};
use crate::frame::FrameBackend;
use crate::swapchain::Extent;

/// What the render thread reports once its GPU resources exist.
#[derive(Debug, Clone, PartialEq)]
pub struct StartupInfo {
    pub adapter: String,
    pub extent: Extent,
    pub format: wgpu::TextureFormat,
    pub present_mode: wgpu::PresentMode,
    pub frames_in_flight: usize,
}

impl StartupInfo {
    pub fn from_backend<B: FrameBackend>(backend: &B, frames_in_flight: usize) -> Self {
        let swapchain = backend.swapchain();
        Self {
            adapter: backend.adapter_name(),
            extent: swapchain.extent,
            format: swapchain.format,
            present_mode: swapchain.present_mode,
            frames_in_flight,
        }
    }
}

/// Creates a one-shot startup barrier.
pub fn startup_barrier() -> (StartupSignal, StartupWait) {
    let (tx, rx) = mpsc::sync_channel(1);
    (StartupSignal { tx }, StartupWait { rx })
}

/// Render-thread side. Consumed by [`StartupSignal::fire`], so it fires at most once.
pub struct StartupSignal {
    tx: SyncSender<Result<StartupInfo>>,
}

impl StartupSignal {
    pub fn fire(self, status: Result<StartupInfo>) {
        if self.tx.send(status).is_err() {
            log::debug!("startup status dropped: nobody is waiting");
        }
    }
}

/// Owner side.
pub struct StartupWait {
    rx: Receiver<Result<StartupInfo>>,
}

impl StartupWait {
    /// Blocks until the render thread reports.
    ///
    /// A signal dropped without firing (the thread panicked or returned early)
    /// yields [`RenderError::StartupAbandoned`].
    pub fn wait(self) -> Result<StartupInfo> {
        self.rx.recv().unwrap_or(Err(RenderError::StartupAbandoned))
    }
}
