//! GPU adapter/device selection.
//!
//! This module is responsible for:
//! - ranking adapters that can present to the owner's surface and run compute
//! - creating the device/queue and watching for device loss
//! - blocking fence and idle waits with optional timeouts

mod gpu;
mod init;
pub mod select;

pub use gpu::{Gpu, WaitError};
pub use init::GpuInit;
