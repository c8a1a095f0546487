//! Recording in-memory backend for driving the frame loop and controller
//! without a GPU.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::{RenderError, Result};
use crate::swapchain::{choose_extent, Extent, SurfaceBounds, SwapchainState};
use crate::sync::{GpuObject, HandleLedger, LedgerReport, Teardown, Tracked};

use super::backend::{Acquired, BackendFactory, FrameBackend, Presented};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum Call {
    WaitCompute { slot: usize, submission: u64 },
    WaitGraphics { slot: usize, submission: u64 },
    Compute { slot: usize, submission: u64 },
    Recreate { requested: Extent, chosen: Extent },
    Acquire { slot: usize, extent: Extent },
    Graphics { slot: usize, submission: u64, extent: Extent },
    Present { slot: usize, extent: Extent },
    WaitIdle,
}

impl Call {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Call::WaitCompute { .. } => "wait_compute",
            Call::WaitGraphics { .. } => "wait_graphics",
            Call::Compute { .. } => "compute",
            Call::Recreate { .. } => "recreate",
            Call::Acquire { .. } => "acquire",
            Call::Graphics { .. } => "graphics",
            Call::Present { .. } => "present",
            Call::WaitIdle => "wait_idle",
        }
    }
}

/// Behaviour injected into the fake backend.
#[derive(Debug, Default)]
pub(crate) struct Script {
    /// Forced acquisition results, consumed one per acquire; `Ready` otherwise.
    pub acquire: VecDeque<Acquired<()>>,
    /// Forced present results, consumed one per present; `Done` otherwise.
    pub present: VecDeque<Presented>,
    pub lost: Option<String>,
    pub timeout_waits: bool,
    pub fail_create: Option<String>,
    pub panic_create: bool,
    pub panic_graphics: bool,
    pub bounds: Option<SurfaceBounds>,
    pub frame_delay: Duration,
}

#[derive(Default)]
struct ProbeInner {
    calls: Mutex<Vec<Call>>,
    violations: Mutex<Vec<String>>,
    script: Mutex<Script>,
    reports: Mutex<Vec<LedgerReport>>,
    presented: AtomicU64,
    created: AtomicU64,
}

/// Test-side view of every fake backend built from it.
#[derive(Clone, Default)]
pub(crate) struct Probe {
    inner: Arc<ProbeInner>,
}

impl Probe {
    pub(crate) fn calls(&self) -> Vec<Call> {
        self.inner.calls.lock().clone()
    }

    pub(crate) fn violations(&self) -> Vec<String> {
        self.inner.violations.lock().clone()
    }

    pub(crate) fn reports(&self) -> Vec<LedgerReport> {
        self.inner.reports.lock().clone()
    }

    pub(crate) fn backends_created(&self) -> u64 {
        self.inner.created.load(Ordering::SeqCst)
    }

    pub(crate) fn script(&self, edit: impl FnOnce(&mut Script)) {
        edit(&mut *self.inner.script.lock());
    }

    pub(crate) fn presented(&self) -> u64 {
        self.inner.presented.load(Ordering::SeqCst)
    }

    /// Blocks until `count` more frames have been presented.
    pub(crate) fn wait_for_presents(&self, count: u64) -> bool {
        let target = self.presented() + count;
        let deadline = Instant::now() + Duration::from_secs(5);
        while self.presented() < target {
            if Instant::now() > deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        true
    }

    fn record(&self, call: Call) {
        self.inner.calls.lock().push(call);
    }

    fn violation(&self, msg: String) {
        self.inner.violations.lock().push(msg);
    }
}

pub(crate) struct FakeHandle;

impl GpuObject for FakeHandle {
    const KIND: &'static str = "fake";
}

#[derive(Debug)]
pub(crate) struct FakeImage {
    generation: u64,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash)]
enum Queue {
    Compute,
    Graphics,
}

pub(crate) struct FakeBackend {
    probe: Probe,
    swapchain: SwapchainState,
    bounds: SurfaceBounds,
    ledger: HandleLedger,
    persistent: Vec<Tracked<FakeHandle>>,
    per_swapchain: Vec<Tracked<FakeHandle>>,
    next_submission: u64,
    in_flight: HashMap<(Queue, usize), u64>,
}

impl FakeBackend {
    pub(crate) fn new(extent: Extent, frames_in_flight: usize, probe: Probe) -> Self {
        let bounds = probe.inner.script.lock().bounds.unwrap_or(SurfaceBounds {
            min: Extent::new(1, 1),
            max: Extent::new(4096, 4096),
            fixed: None,
        });

        let mut ledger = HandleLedger::new();
        let mut persistent = vec![
            ledger.track("compute shader", FakeHandle),
            ledger.track("render shader", FakeHandle),
            ledger.track("compute bind group layout", FakeHandle),
            ledger.track("compute pipeline", FakeHandle),
        ];
        let ring = frames_in_flight.max(2);
        for k in 0..ring {
            persistent.push(ledger.track(format!("particles[{k}]"), FakeHandle));
            persistent.push(ledger.track(format!("sim params[{k}]"), FakeHandle));
        }
        for k in 0..ring {
            persistent.push(ledger.track(format!("compute bind group[{k}]"), FakeHandle));
        }

        let swapchain = SwapchainState {
            extent: choose_extent(&bounds, extent),
            format: wgpu::TextureFormat::Bgra8UnormSrgb,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Opaque,
            image_count: frames_in_flight as u32,
            generation: 0,
        };

        let mut backend = Self {
            probe,
            swapchain,
            bounds,
            ledger,
            persistent,
            per_swapchain: Vec::new(),
            next_submission: 1,
            in_flight: HashMap::new(),
        };
        backend.build_swapchain_objects();
        backend
    }

    fn build_swapchain_objects(&mut self) {
        let generation = self.swapchain.generation;
        for label in ["surface configuration", "render pipeline", "render params"] {
            let tracked = self.ledger.track(format!("{label} #{generation}"), FakeHandle);
            self.per_swapchain.push(tracked);
        }
    }

    fn submit(&mut self, queue: Queue, slot: usize) -> u64 {
        let submission = self.next_submission;
        self.next_submission += 1;
        if let Some(prev) = self.in_flight.insert((queue, slot), submission) {
            let which = if queue == Queue::Compute { "compute" } else { "graphics" };
            self.probe
                .violation(format!("{which} submission {submission} on slot {slot} overlaps {prev}"));
        }
        submission
    }
}

impl FrameBackend for FakeBackend {
    type Submission = u64;
    type Image = FakeImage;

    fn swapchain(&self) -> &SwapchainState {
        &self.swapchain
    }

    fn adapter_name(&self) -> String {
        "fake adapter".to_string()
    }

    fn wait(&mut self, submission: u64, fence: &'static str, slot: usize) -> Result<()> {
        let queue = if fence == "compute" { Queue::Compute } else { Queue::Graphics };
        self.probe.record(match queue {
            Queue::Compute => Call::WaitCompute { slot, submission },
            Queue::Graphics => Call::WaitGraphics { slot, submission },
        });

        if self.probe.inner.script.lock().timeout_waits {
            return Err(RenderError::FenceTimeout { fence, slot });
        }
        if self.in_flight.remove(&(queue, slot)) != Some(submission) {
            self.probe.violation(format!("{fence} wait on slot {slot} for unknown submission {submission}"));
        }
        Ok(())
    }

    fn submit_compute(&mut self, slot: usize, _dt: f32) -> Result<u64> {
        let submission = self.submit(Queue::Compute, slot);
        self.probe.record(Call::Compute { slot, submission });
        Ok(submission)
    }

    fn recreate_swapchain(&mut self, requested: Extent) -> Result<Extent> {
        for tracked in self.per_swapchain.drain(..).rev() {
            self.ledger.release(tracked);
        }

        let chosen = choose_extent(&self.bounds, requested);
        self.swapchain.extent = chosen;
        self.swapchain.generation += 1;
        self.build_swapchain_objects();

        self.probe.record(Call::Recreate { requested, chosen });
        Ok(chosen)
    }

    fn acquire(&mut self, slot: usize) -> Result<Acquired<FakeImage>> {
        self.probe.record(Call::Acquire { slot, extent: self.swapchain.extent });
        let forced = self.probe.inner.script.lock().acquire.pop_front();
        let generation = self.swapchain.generation;
        Ok(match forced {
            None | Some(Acquired::Ready(())) => Acquired::Ready(FakeImage { generation }),
            Some(Acquired::Stale) => Acquired::Stale,
            Some(Acquired::Skip) => Acquired::Skip,
        })
    }

    fn submit_graphics(&mut self, slot: usize, image: &FakeImage) -> Result<u64> {
        let panic_graphics = self.probe.inner.script.lock().panic_graphics;
        if panic_graphics {
            panic!("fake graphics submission panicked");
        }
        if image.generation != self.swapchain.generation {
            self.probe.violation(format!("graphics on slot {slot} targets a retired swapchain"));
        }
        let submission = self.submit(Queue::Graphics, slot);
        self.probe.record(Call::Graphics { slot, submission, extent: self.swapchain.extent });
        Ok(submission)
    }

    fn present(&mut self, slot: usize, image: FakeImage) -> Result<Presented> {
        if image.generation != self.swapchain.generation {
            self.probe.violation(format!("present on slot {slot} of a retired swapchain image"));
        }
        self.probe.record(Call::Present { slot, extent: self.swapchain.extent });

        let (forced, delay) = {
            let mut script = self.probe.inner.script.lock();
            (script.present.pop_front(), script.frame_delay)
        };
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        self.probe.inner.presented.fetch_add(1, Ordering::SeqCst);
        Ok(forced.unwrap_or(Presented::Done))
    }

    fn device_lost(&self) -> Option<String> {
        self.probe.inner.script.lock().lost.clone()
    }

    fn wait_idle(&mut self) -> Result<()> {
        self.probe.record(Call::WaitIdle);
        self.in_flight.clear();
        Ok(())
    }

    fn teardown(mut self) -> LedgerReport {
        let mut batch = Teardown::default();
        batch.extend(self.persistent.drain(..));
        batch.extend(self.per_swapchain.drain(..));
        let report = self.ledger.teardown(batch);
        self.probe.inner.reports.lock().push(report.clone());
        report
    }
}

/// Builds [`FakeBackend`]s reporting into one probe.
#[derive(Clone, Default)]
pub(crate) struct FakeFactory {
    pub(crate) probe: Probe,
}

impl BackendFactory for FakeFactory {
    type Backend = FakeBackend;

    fn create(&self, extent: Extent, frames_in_flight: usize) -> Result<FakeBackend> {
        let (panic_create, fail_create) = {
            let mut script = self.probe.inner.script.lock();
            (script.panic_create, script.fail_create.take())
        };
        if panic_create {
            panic!("fake backend refused to initialize");
        }
        if let Some(reason) = fail_create {
            return Err(RenderError::NoSuitableAdapter(reason));
        }

        self.probe.inner.created.fetch_add(1, Ordering::SeqCst);
        Ok(FakeBackend::new(extent, frames_in_flight, self.probe.clone()))
    }
}
