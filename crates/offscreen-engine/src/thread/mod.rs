//! Owner-side control of the offscreen render thread.
//!
//! - `controller`: start/stop lifecycle and resize requests
//! - `barrier`: one-shot startup status channel
//! - `state`: the lock-guarded state both threads share

mod barrier;
mod controller;
mod state;

pub use barrier::{startup_barrier, StartupInfo, StartupSignal, StartupWait};
pub use controller::{ControllerState, RenderThread, ShutdownReport, WindowResize};
pub use state::RenderThreadState;
