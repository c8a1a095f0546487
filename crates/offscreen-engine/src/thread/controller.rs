use std::any::Any;
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::device::GpuInit;
use crate::error::{RenderError, Result};
use crate::frame::{BackendFactory, FrameBackend, FrameLoop, LoopStats};
use crate::swapchain::Extent;
use crate::sync::LedgerReport;

use super::barrier::{startup_barrier, StartupInfo, StartupSignal, StartupWait};
use super::state::RenderThreadState;

/// Lifecycle of the render thread as seen by its owner.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ControllerState {
    Idle,
    Initializing,
    Running,
    Stopping,
    Stopped,
}

/// What a render thread did before it was joined.
#[derive(Debug, Default)]
pub struct ShutdownReport {
    pub frames_rendered: u64,
    pub frames_skipped: u64,
    pub recreations: u64,
    /// The error that ended the loop, if it did not end on request.
    pub fatal: Option<RenderError>,
    pub ledger: LedgerReport,
}

/// A window the owner can resize on request.
pub trait WindowResize {
    fn request_size(&self, extent: Extent);
}

impl WindowResize for winit::window::Window {
    fn request_size(&self, extent: Extent) {
        if let Some(applied) = self.request_inner_size(winit::dpi::PhysicalSize::from(extent)) {
            log::debug!("window resized immediately to {}", Extent::from(applied));
        }
    }
}

/// Owner-side handle to the offscreen render thread.
///
/// All methods are called from the owner thread. The render thread only ever
/// sees the shared [`RenderThreadState`] and the objects its factory builds.
pub struct RenderThread<F: BackendFactory> {
    factory: Arc<F>,
    init: GpuInit,
    shared: Arc<RenderThreadState>,
    state: ControllerState,
    handle: Option<JoinHandle<Option<ShutdownReport>>>,
    startup: Option<StartupWait>,
    info: Option<StartupInfo>,
}

impl<F: BackendFactory> RenderThread<F> {
    pub fn new(factory: F, extent: Extent, init: GpuInit) -> Self {
        Self {
            factory: Arc::new(factory),
            init,
            shared: Arc::new(RenderThreadState::new(extent)),
            state: ControllerState::Idle,
            handle: None,
            startup: None,
            info: None,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Status reported by the running thread.
    pub fn info(&self) -> Option<&StartupInfo> {
        self.info.as_ref()
    }

    /// Extent of the live swapchain.
    pub fn current_extent(&self) -> Extent {
        self.shared.current_extent()
    }

    pub fn shared(&self) -> &Arc<RenderThreadState> {
        &self.shared
    }

    /// Spawns the render thread and blocks until it reports its startup status.
    ///
    /// Returns `Ok(None)` if the thread is already initializing or running.
    pub fn start(&mut self) -> Result<Option<StartupInfo>> {
        if !self.spawn()? {
            return Ok(None);
        }
        self.wait_ready()
    }

    /// Spawns the render thread without waiting for it.
    ///
    /// Returns `false` if it is already initializing or running.
    pub fn spawn(&mut self) -> Result<bool> {
        if matches!(self.state, ControllerState::Initializing | ControllerState::Running) {
            return Ok(false);
        }

        let extent = self.shared.current_extent();
        let frames_in_flight = self.init.frames_in_flight();
        let max_stale_retries = self.init.max_stale_retries;
        let factory = Arc::clone(&self.factory);
        let shared = Arc::clone(&self.shared);
        let (signal, wait) = startup_barrier();

        shared.take_request();
        shared.set_running(true);

        let spawned = std::thread::Builder::new()
            .name(self.init.thread_name.clone())
            .spawn(move || {
                render_main(&*factory, &shared, extent, frames_in_flight, max_stale_retries, signal)
            });

        match spawned {
            Ok(handle) => {
                log::info!("render thread '{}' spawned at {extent}", self.init.thread_name);
                self.handle = Some(handle);
                self.startup = Some(wait);
                self.state = ControllerState::Initializing;
                Ok(true)
            }
            Err(e) => {
                self.shared.set_running(false);
                Err(RenderError::ThreadSpawn(e))
            }
        }
    }

    /// Blocks on the startup barrier of a spawned thread.
    ///
    /// Returns `Ok(None)` when no thread is initializing. On failure the thread
    /// is joined and the controller is left `Stopped`, so `start` can be retried.
    pub fn wait_ready(&mut self) -> Result<Option<StartupInfo>> {
        let Some(wait) = self.startup.take() else {
            return Ok(None);
        };

        match wait.wait() {
            Ok(info) => {
                log::info!(
                    "render thread running on {} at {} ({:?}, {:?}, {} frames in flight)",
                    info.adapter,
                    info.extent,
                    info.format,
                    info.present_mode,
                    info.frames_in_flight
                );
                self.info = Some(info.clone());
                self.state = ControllerState::Running;
                Ok(Some(info))
            }
            Err(e) => {
                if let Some(handle) = self.handle.take() {
                    if let Err(payload) = handle.join() {
                        log::error!("render thread panicked during startup: {}", panic_message(&*payload));
                    }
                }
                self.shared.set_running(false);
                self.state = ControllerState::Stopped;
                Err(e)
            }
        }
    }

    /// Stops and joins a running render thread.
    ///
    /// Returns `None` unless the thread was running.
    pub fn stop(&mut self) -> Option<ShutdownReport> {
        if self.state != ControllerState::Running {
            return None;
        }

        self.state = ControllerState::Stopping;
        self.shared.set_running(false);

        let report = match self.handle.take().map(JoinHandle::join) {
            Some(Ok(Some(report))) => report,
            Some(Ok(None)) | None => ShutdownReport::default(),
            Some(Err(payload)) => {
                let msg = panic_message(&*payload);
                log::error!("render thread panicked: {msg}");
                ShutdownReport { fatal: Some(RenderError::ThreadPanicked(msg)), ..Default::default() }
            }
        };

        self.state = ControllerState::Stopped;
        self.info = None;
        log::info!(
            "render thread stopped after {} frames ({} recreations, {} handles released)",
            report.frames_rendered,
            report.recreations,
            report.ledger.released.len()
        );
        Some(report)
    }

    /// Whether a started thread has already returned, e.g. after a fatal error.
    pub fn has_exited(&self) -> bool {
        self.handle.as_ref().is_some_and(JoinHandle::is_finished)
    }

    /// Requests a swapchain of the given size. Never blocks on GPU work.
    ///
    /// Accepted once the thread has been spawned; a request made while it is
    /// still initializing is applied before its first acquisition. Requests
    /// made before the render thread applies the previous one replace it.
    pub fn resize_swap_chain(&self, width: u32, height: u32) {
        let extent = Extent::new(width, height);
        if !matches!(self.state, ControllerState::Initializing | ControllerState::Running) {
            log::debug!("resize to {extent} ignored: render thread not running");
            return;
        }
        if let Some(replaced) = self.shared.request_resize(extent) {
            log::debug!("resize to {extent} replaces pending {replaced}");
        }
    }

    /// Resizes the window, then requests the matching swapchain.
    pub fn resize_window(&self, window: &impl WindowResize, width: u32, height: u32) {
        window.request_size(Extent::new(width, height));
        self.resize_swap_chain(width, height);
    }
}

impl<F: BackendFactory> Drop for RenderThread<F> {
    fn drop(&mut self) {
        if self.state == ControllerState::Initializing {
            let _ = self.wait_ready();
        }
        self.stop();
    }
}

fn render_main<F: BackendFactory>(
    factory: &F,
    shared: &RenderThreadState,
    extent: Extent,
    frames_in_flight: usize,
    max_stale_retries: u32,
    signal: StartupSignal,
) -> Option<ShutdownReport> {
    let mut backend = match factory.create(extent, frames_in_flight) {
        Ok(backend) => backend,
        Err(e) => {
            log::error!("render thread initialization failed: {e}");
            shared.set_running(false);
            signal.fire(Err(e));
            return None;
        }
    };

    shared.publish_extent(backend.swapchain().extent);
    signal.fire(Ok(StartupInfo::from_backend(&backend, frames_in_flight)));

    let exit = FrameLoop::new(&mut backend, shared, frames_in_flight, max_stale_retries).run();
    shared.set_running(false);

    let fatal = exit.result.err();
    if let Some(e) = &fatal {
        log::error!("render loop ended: {e}");
    }

    let unusable = fatal.as_ref().is_some_and(RenderError::is_device_fatal) || backend.device_lost().is_some();
    if unusable {
        log::warn!("skipping device idle wait: device is unusable");
    } else if let Err(e) = backend.wait_idle() {
        log::warn!("device idle wait failed ({e}); releasing resources anyway");
    }

    let ledger = backend.teardown();
    if !ledger.is_clean() {
        log::warn!(
            "teardown left {} live handles and {} failures",
            ledger.leaked.len(),
            ledger.failures.len()
        );
    }

    Some(ShutdownReport { fatal, ledger, ..exit.stats.into() })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl From<LoopStats> for ShutdownReport {
    fn from(stats: LoopStats) -> Self {
        Self {
            frames_rendered: stats.presented,
            frames_skipped: stats.skipped,
            recreations: stats.recreations,
            ..Default::default()
        }
    }
}
