//! Offscreen render thread engine.
//!
//! A dedicated thread owns the GPU device and runs a compute + graphics frame
//! loop into a surface created by the window-owning thread. The owner talks to
//! it only through [`thread::RenderThread`]: start, stop and resize requests.

pub mod assets;
pub mod device;
pub mod error;
pub mod frame;
pub mod logging;
pub mod render;
pub mod swapchain;
pub mod sync;
pub mod thread;
pub mod time;

pub use error::{RenderError, Result};
