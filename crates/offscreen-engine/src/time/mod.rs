//! Frame timing for the render loop.
//!
//! One `FrameClock` lives on the render thread; each loop iteration ticks it
//! once and feeds the clamped delta to the compute pass.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
