use crate::error::{RenderError, Result};

/// Binary GPU-GPU signal for one frame slot.
///
/// wgpu orders work on its single queue by submission order, so the real
/// dependency is implicit. This type tracks the protocol instead: every signal
/// must be consumed exactly once before it is signalled again.
#[derive(Debug)]
pub struct Semaphore {
    label: String,
    signaled: bool,
}

impl Semaphore {
    fn new(label: String) -> Self {
        Self { label, signaled: false }
    }

    pub fn is_signaled(&self) -> bool {
        self.signaled
    }

    pub fn signal(&mut self) -> Result<()> {
        if self.signaled {
            return Err(RenderError::SyncViolation(format!(
                "{} signalled twice without a wait",
                self.label
            )));
        }
        self.signaled = true;
        Ok(())
    }

    /// Consumes the signal as a waiting operation would.
    pub fn consume(&mut self) -> Result<()> {
        if !self.signaled {
            return Err(RenderError::SyncViolation(format!(
                "waited on {} before it was signalled",
                self.label
            )));
        }
        self.signaled = false;
        Ok(())
    }

    /// Drops a pending signal. Returns whether one was pending.
    pub fn reset(&mut self) -> bool {
        std::mem::replace(&mut self.signaled, false)
    }
}

/// CPU-observable completion of one submission.
///
/// `S` is the backend's submission token. An armed fence holds the token of its
/// outstanding submission; it must be waited (taken) before it can be re-armed.
#[derive(Debug)]
pub struct Fence<S> {
    label: String,
    pending: Option<S>,
}

impl<S> Fence<S> {
    fn new(label: String) -> Self {
        Self { label, pending: None }
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    pub fn arm(&mut self, submission: S) -> Result<()> {
        if self.pending.is_some() {
            return Err(RenderError::SyncViolation(format!(
                "{} re-armed while its submission is outstanding",
                self.label
            )));
        }
        self.pending = Some(submission);
        Ok(())
    }

    /// Takes the outstanding submission so the caller can wait on it.
    pub fn take(&mut self) -> Option<S> {
        self.pending.take()
    }
}

/// Synchronization objects for one in-flight frame.
#[derive(Debug)]
pub struct FrameSync<S> {
    pub image_available: Semaphore,
    pub render_finished: Semaphore,
    pub compute_finished: Semaphore,
    pub graphics_fence: Fence<S>,
    pub compute_fence: Fence<S>,
}

impl<S> FrameSync<S> {
    fn new(slot: usize) -> Self {
        Self {
            image_available: Semaphore::new(format!("image_available[{slot}]")),
            render_finished: Semaphore::new(format!("render_finished[{slot}]")),
            compute_finished: Semaphore::new(format!("compute_finished[{slot}]")),
            graphics_fence: Fence::new(format!("graphics_fence[{slot}]")),
            compute_fence: Fence::new(format!("compute_fence[{slot}]")),
        }
    }

    /// Drops every pending GPU-side signal of a frame that will not be presented.
    pub fn abandon_signals(&mut self) {
        self.image_available.reset();
        self.render_finished.reset();
        self.compute_finished.reset();
    }
}

/// Fixed-size set of per-frame synchronization objects.
///
/// The size is chosen once and never changes.
#[derive(Debug)]
pub struct FrameSyncSet<S> {
    frames: Box<[FrameSync<S>]>,
}

impl<S> FrameSyncSet<S> {
    pub fn new(frames_in_flight: usize) -> Self {
        let frames = (0..frames_in_flight.max(1)).map(FrameSync::new).collect();
        Self { frames }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn slot(&mut self, index: usize) -> &mut FrameSync<S> {
        &mut self.frames[index]
    }

    /// Takes every outstanding submission, oldest slot first.
    pub fn drain_pending(&mut self) -> Vec<S> {
        let mut pending = Vec::new();
        for frame in self.frames.iter_mut() {
            pending.extend(frame.compute_fence.take());
            pending.extend(frame.graphics_fence.take());
        }
        pending
    }
}

/// Round-robin frame slot index.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FrameCursor {
    current: usize,
    count: usize,
}

impl FrameCursor {
    pub fn new(count: usize) -> Self {
        Self { current: 0, count: count.max(1) }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn advance(&mut self) -> usize {
        self.current = (self.current + 1) % self.count;
        self.current
    }
}
