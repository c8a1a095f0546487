//! Steady-state frame loop.
//!
//! The loop is generic over [`FrameBackend`] so the fence/semaphore protocol
//! can be exercised without a GPU; [`crate::render::GpuResources`] is the wgpu
//! implementation.

mod backend;
mod frame_loop;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{Acquired, BackendFactory, FrameBackend, Presented};
pub use frame_loop::{FrameLoop, Iteration, LoopExit, LoopStats};
