use crate::error::{RenderError, Result};
use crate::swapchain::Extent;
use crate::sync::{FrameCursor, FrameSyncSet};
use crate::thread::RenderThreadState;
use crate::time::FrameClock;

use super::backend::{Acquired, FrameBackend, Presented};

/// Counters kept by the frame loop.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct LoopStats {
    pub iterations: u64,
    pub presented: u64,
    pub skipped: u64,
    pub recreations: u64,
}

/// What one iteration did.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Iteration {
    Presented { slot: usize, extent: Extent },
    Skipped { slot: usize },
}

/// How the loop ended.
#[derive(Debug)]
pub struct LoopExit {
    pub stats: LoopStats,
    pub result: Result<()>,
}

/// Steady-state compute + graphics submission on the render thread.
///
/// Per iteration: wait compute fence, submit compute, wait graphics fence,
/// apply any pending resize, acquire, submit graphics, present, advance the
/// slot, then check the running flag. The pending resize is only ever applied
/// between the graphics fence wait and acquisition, so one iteration sees one
/// swapchain extent from acquire to present.
pub struct FrameLoop<'a, B: FrameBackend> {
    backend: &'a mut B,
    state: &'a RenderThreadState,
    sync: FrameSyncSet<B::Submission>,
    cursor: FrameCursor,
    clock: FrameClock,
    max_stale_retries: u32,

    /// Extent to recreate at, set when the surface reported itself stale.
    stale: Option<Extent>,
    stats: LoopStats,
}

impl<'a, B: FrameBackend> FrameLoop<'a, B> {
    pub fn new(
        backend: &'a mut B,
        state: &'a RenderThreadState,
        frames_in_flight: usize,
        max_stale_retries: u32,
    ) -> Self {
        let sync = FrameSyncSet::new(frames_in_flight);
        let cursor = FrameCursor::new(sync.len());
        Self {
            backend,
            state,
            sync,
            cursor,
            clock: FrameClock::new(),
            max_stale_retries,
            stale: None,
            stats: LoopStats::default(),
        }
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn current_slot(&self) -> usize {
        self.cursor.current()
    }

    /// Iterates until the running flag is cleared or an iteration fails.
    pub fn run(mut self) -> LoopExit {
        let result = loop {
            if let Err(e) = self.iterate() {
                break Err(e);
            }
            if !self.state.is_running() {
                break Ok(());
            }
        };

        // Submissions still in flight are covered by the idle wait at teardown.
        drop(self.sync.drain_pending());

        LoopExit { stats: self.stats, result }
    }

    pub fn iterate(&mut self) -> Result<Iteration> {
        if let Some(reason) = self.backend.device_lost() {
            return Err(RenderError::DeviceLost(reason));
        }

        self.stats.iterations += 1;
        let slot = self.cursor.current();
        let time = self.clock.tick();

        if let Some(done) = self.sync.slot(slot).compute_fence.take() {
            self.backend.wait(done, "compute", slot)?;
        }

        let submitted = self.backend.submit_compute(slot, time.dt)?;
        let frame = self.sync.slot(slot);
        frame.compute_fence.arm(submitted)?;
        frame.compute_finished.signal()?;

        if let Some(done) = frame.graphics_fence.take() {
            self.backend.wait(done, "graphics", slot)?;
        }

        let Some(image) = self.acquire(slot)? else {
            self.sync.slot(slot).abandon_signals();
            self.stats.skipped += 1;
            log::trace!("frame {} skipped on slot {slot}", time.frame_index);
            return Ok(Iteration::Skipped { slot });
        };

        let extent = self.backend.swapchain().extent;
        let frame = self.sync.slot(slot);
        frame.image_available.signal()?;

        frame.compute_finished.consume()?;
        frame.image_available.consume()?;
        let submitted = self.backend.submit_graphics(slot, &image)?;
        frame.graphics_fence.arm(submitted)?;
        frame.render_finished.signal()?;

        frame.render_finished.consume()?;
        if self.backend.present(slot, image)? == Presented::Stale {
            log::debug!("present reported a stale surface; recreating next frame");
            self.stale = Some(extent);
        }

        if self.backend.swapchain().extent != extent {
            return Err(RenderError::SyncViolation(format!(
                "swapchain extent changed mid-frame ({extent} -> {})",
                self.backend.swapchain().extent
            )));
        }

        self.stats.presented += 1;
        self.cursor.advance();
        log::trace!("frame {} presented on slot {slot} at {extent}", time.frame_index);

        Ok(Iteration::Presented { slot, extent })
    }

    /// Applies pending resizes and acquires an image, retrying on staleness.
    ///
    /// `None` means the frame is skipped.
    fn acquire(&mut self, slot: usize) -> Result<Option<B::Image>> {
        let mut retries = 0;
        loop {
            let pending = self.state.take_request().or(self.stale.take());
            if let Some(requested) = pending {
                self.recreate(requested)?;
            }

            match self.backend.acquire(slot)? {
                Acquired::Ready(image) => return Ok(Some(image)),
                Acquired::Stale => {
                    self.stale = Some(self.backend.swapchain().extent);
                    if retries >= self.max_stale_retries {
                        log::warn!("surface still stale after {retries} recreations; skipping frame");
                        return Ok(None);
                    }
                    retries += 1;
                }
                Acquired::Skip => return Ok(None),
            }
        }
    }

    fn recreate(&mut self, requested: Extent) -> Result<()> {
        let chosen = self.backend.recreate_swapchain(requested)?;
        self.state.publish_extent(chosen);
        self.clock.reset();
        self.stats.recreations += 1;

        if chosen == requested {
            log::debug!("swapchain recreated at {chosen}");
        } else {
            log::debug!("swapchain recreated at {chosen} (requested {requested})");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::testing::{Call, FakeBackend, Probe, Script};

    fn setup(frames: usize) -> (FakeBackend, RenderThreadState, Probe) {
        let probe = Probe::default();
        let backend = FakeBackend::new(Extent::new(800, 600), frames, probe.clone());
        let state = RenderThreadState::new(Extent::new(800, 600));
        state.set_running(true);
        (backend, state, probe)
    }

    #[test]
    fn steps_run_in_order() {
        let (mut backend, state, probe) = setup(2);
        let mut fl = FrameLoop::new(&mut backend, &state, 2, 3);
        fl.iterate().unwrap();
        fl.iterate().unwrap();
        fl.iterate().unwrap();

        let calls = probe.calls();
        let kinds: Vec<&str> = calls.iter().map(Call::kind).collect();
        assert_eq!(
            kinds,
            vec![
                "compute", "acquire", "graphics", "present",
                "compute", "acquire", "graphics", "present",
                // slot 0 again: both fences are waited before reuse
                "wait_compute", "compute", "wait_graphics", "acquire", "graphics", "present",
            ]
        );
    }

    #[test]
    fn slots_cycle_round_robin() {
        let (mut backend, state, _probe) = setup(3);
        let mut fl = FrameLoop::new(&mut backend, &state, 3, 3);
        let slots: Vec<usize> = (0..7)
            .map(|_| match fl.iterate().unwrap() {
                Iteration::Presented { slot, .. } => slot,
                Iteration::Skipped { slot } => slot,
            })
            .collect();
        assert_eq!(slots, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn no_slot_submission_overlaps_its_predecessor() {
        let (mut backend, state, probe) = setup(2);
        let mut fl = FrameLoop::new(&mut backend, &state, 2, 3);
        for _ in 0..20 {
            fl.iterate().unwrap();
        }
        assert!(probe.violations().is_empty(), "{:?}", probe.violations());
    }

    #[test]
    fn pending_resize_applies_before_acquire() {
        let (mut backend, state, probe) = setup(2);
        let mut fl = FrameLoop::new(&mut backend, &state, 2, 3);
        fl.iterate().unwrap();

        state.request_resize(Extent::new(1200, 900));
        let it = fl.iterate().unwrap();
        assert_eq!(it, Iteration::Presented { slot: 1, extent: Extent::new(1200, 900) });
        assert_eq!(state.current_extent(), Extent::new(1200, 900));
        assert_eq!(state.pending_request(), None);

        let calls = probe.calls();
        let recreate_at = calls.iter().position(|c| matches!(c, Call::Recreate { .. })).unwrap();
        assert_eq!(calls[recreate_at + 1].kind(), "acquire");
        assert_eq!(calls[recreate_at - 1].kind(), "compute");
    }

    #[test]
    fn burst_of_requests_coalesces_to_latest() {
        let (mut backend, state, probe) = setup(2);
        let mut fl = FrameLoop::new(&mut backend, &state, 2, 3);

        state.request_resize(Extent::new(1000, 700));
        state.request_resize(Extent::new(1200, 900));
        state.request_resize(Extent::new(640, 480));
        fl.iterate().unwrap();

        let recreated: Vec<Extent> = probe
            .calls()
            .iter()
            .filter_map(|c| match c {
                Call::Recreate { requested, .. } => Some(*requested),
                _ => None,
            })
            .collect();
        assert_eq!(recreated, vec![Extent::new(640, 480)]);
        assert_eq!(fl.stats().recreations, 1);
    }

    #[test]
    fn extent_is_constant_from_acquire_to_present() {
        let (mut backend, state, probe) = setup(2);
        let mut fl = FrameLoop::new(&mut backend, &state, 2, 3);
        for i in 0..12 {
            if i % 3 == 0 {
                state.request_resize(Extent::new(800 + i, 600 + i));
            }
            fl.iterate().unwrap();
        }

        let mut frame_extent = None;
        for call in probe.calls() {
            match call {
                Call::Acquire { extent, .. } => frame_extent = Some(extent),
                Call::Graphics { extent, .. } | Call::Present { extent, .. } => {
                    assert_eq!(Some(extent), frame_extent);
                }
                _ => {}
            }
        }
    }

    #[test]
    fn stale_acquire_recreates_and_retries() {
        let (mut backend, state, probe) = setup(2);
        probe.script(|s: &mut Script| s.acquire.push_back(Acquired::Stale));
        let mut fl = FrameLoop::new(&mut backend, &state, 2, 3);

        assert!(matches!(fl.iterate().unwrap(), Iteration::Presented { slot: 0, .. }));
        let kinds: Vec<&str> = probe.calls().iter().map(Call::kind).collect();
        assert_eq!(kinds, vec!["compute", "acquire", "recreate", "acquire", "graphics", "present"]);
    }

    #[test]
    fn skipped_acquire_keeps_the_slot_and_drops_its_signals() {
        let (mut backend, state, probe) = setup(2);
        probe.script(|s: &mut Script| s.acquire.push_back(Acquired::Skip));
        let mut fl = FrameLoop::new(&mut backend, &state, 2, 3);

        assert_eq!(fl.iterate().unwrap(), Iteration::Skipped { slot: 0 });
        assert_eq!(fl.current_slot(), 0);
        let frame = fl.sync.slot(0);
        assert!(!frame.compute_finished.is_signaled());
        assert!(!frame.image_available.is_signaled());
        assert!(frame.compute_fence.is_armed());
        assert!(!frame.graphics_fence.is_armed());

        assert!(matches!(fl.iterate().unwrap(), Iteration::Presented { slot: 0, .. }));
        assert_eq!(fl.current_slot(), 1);
        assert_eq!(fl.stats().skipped, 1);
        assert!(!probe.calls().iter().any(|c| matches!(c, Call::Recreate { .. })));
        assert!(probe.violations().is_empty(), "{:?}", probe.violations());
    }

    #[test]
    fn persistent_staleness_skips_without_presenting() {
        let (mut backend, state, probe) = setup(2);
        probe.script(|s: &mut Script| {
            for _ in 0..3 {
                s.acquire.push_back(Acquired::Stale);
            }
        });
        let mut fl = FrameLoop::new(&mut backend, &state, 2, 2);

        assert_eq!(fl.iterate().unwrap(), Iteration::Skipped { slot: 0 });
        assert_eq!(fl.stats().skipped, 1);
        // the skipped slot is reused and its signals start clean
        assert!(matches!(fl.iterate().unwrap(), Iteration::Presented { slot: 0, .. }));
        assert!(probe.violations().is_empty());
    }

    #[test]
    fn stale_present_recreates_on_next_iteration() {
        let (mut backend, state, probe) = setup(2);
        probe.script(|s: &mut Script| s.present.push_back(Presented::Stale));
        let mut fl = FrameLoop::new(&mut backend, &state, 2, 3);

        fl.iterate().unwrap();
        assert!(!probe.calls().iter().any(|c| matches!(c, Call::Recreate { .. })));
        fl.iterate().unwrap();
        assert!(probe.calls().iter().any(|c| matches!(c, Call::Recreate { .. })));
    }

    #[test]
    fn device_loss_is_fatal() {
        let (mut backend, state, probe) = setup(2);
        let mut fl = FrameLoop::new(&mut backend, &state, 2, 3);
        fl.iterate().unwrap();
        probe.script(|s: &mut Script| s.lost = Some("gpu reset".to_string()));
        assert!(matches!(fl.iterate(), Err(RenderError::DeviceLost(_))));
    }

    #[test]
    fn fence_timeout_is_fatal() {
        let (mut backend, state, probe) = setup(1);
        let mut fl = FrameLoop::new(&mut backend, &state, 1, 3);
        fl.iterate().unwrap();
        probe.script(|s: &mut Script| s.timeout_waits = true);
        assert!(matches!(
            fl.iterate(),
            Err(RenderError::FenceTimeout { fence: "compute", slot: 0 })
        ));
    }

    #[test]
    fn fixed_surface_extent_wins_over_request() {
        let probe = Probe::default();
        probe.script(|s: &mut Script| {
            s.bounds = Some(crate::swapchain::SurfaceBounds {
                min: Extent::new(1, 1),
                max: Extent::new(4096, 4096),
                fixed: Some(Extent::new(1024, 768)),
            })
        });
        let mut backend = FakeBackend::new(Extent::new(800, 600), 2, probe.clone());
        let state = RenderThreadState::new(Extent::new(800, 600));
        let mut fl = FrameLoop::new(&mut backend, &state, 2, 3);

        state.request_resize(Extent::new(1200, 900));
        fl.iterate().unwrap();
        assert_eq!(state.current_extent(), Extent::new(1024, 768));
    }

    #[test]
    fn zero_request_is_clamped() {
        let (mut backend, state, _probe) = setup(2);
        let mut fl = FrameLoop::new(&mut backend, &state, 2, 3);
        state.request_resize(Extent::new(0, 0));
        fl.iterate().unwrap();
        assert_eq!(state.current_extent(), Extent::new(1, 1));
    }

    #[test]
    fn run_exits_when_running_is_cleared() {
        let (mut backend, state, _probe) = setup(2);
        state.set_running(false);
        let exit = FrameLoop::new(&mut backend, &state, 2, 3).run();
        assert!(exit.result.is_ok());
        assert_eq!(exit.stats.iterations, 1);
    }
}
