//! Engine error type.
//!
//! Errors fall into three groups:
//! - fatal initialization failures (the render thread never reaches its loop)
//! - unrecoverable device errors (the loop exits and the thread tears down)
//! - protocol errors in the controller (thread spawn/panic)
//!
//! Transient surface staleness is not an error; it is modelled by
//! [`Acquired::Stale`](crate::frame::Acquired) and
//! [`Presented::Stale`](crate::frame::Presented).

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, RenderError>;

#[derive(Debug, Error)]
pub enum RenderError {
    // ── initialization ────────────────────────────────────────────────────
    /// No adapter can present to the surface and run the compute pass.
    #[error("no suitable GPU adapter: {0}")]
    NoSuitableAdapter(String),

    /// The adapter refused to create a device.
    #[error("failed to create GPU device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    /// The surface offers no usable format for the selected adapter.
    #[error("surface is not supported by adapter '{0}'")]
    SurfaceUnsupported(String),

    /// The asset locator found no file under any of its roots.
    #[error("shader '{name}' not found (searched {searched:?})")]
    ShaderNotFound { name: String, searched: Vec<PathBuf> },

    /// The shader file exists but could not be read in full.
    #[error("failed to read shader {path:?}: {source}")]
    ShaderUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The shader file was read but its contents are unusable.
    #[error("shader {path:?} is invalid: {reason}")]
    ShaderInvalid { path: PathBuf, reason: String },

    // ── runtime ───────────────────────────────────────────────────────────
    /// The device-lost callback fired.
    #[error("GPU device lost: {0}")]
    DeviceLost(String),

    /// Surface acquisition ran out of memory.
    #[error("surface ran out of memory")]
    SurfaceOutOfMemory,

    /// A fence wait exceeded the configured timeout.
    #[error("timed out waiting for the {fence} fence of frame slot {slot}")]
    FenceTimeout { fence: &'static str, slot: usize },

    /// `Device::poll` reported a failure other than a timeout.
    #[error("device poll failed: {0}")]
    Poll(String),

    /// The frame loop broke its own fence/semaphore protocol.
    #[error("frame synchronization violated: {0}")]
    SyncViolation(String),

    // ── controller ────────────────────────────────────────────────────────
    #[error("failed to spawn render thread: {0}")]
    ThreadSpawn(#[source] std::io::Error),

    /// The render thread ended without firing the startup barrier.
    #[error("render thread exited before reporting startup status")]
    StartupAbandoned,

    /// The render thread panicked; the payload message is kept when it is a string.
    #[error("render thread panicked: {0}")]
    ThreadPanicked(String),
}

impl RenderError {
    /// Whether the device can no longer be trusted to finish outstanding work.
    ///
    /// Teardown skips the device-idle wait for these.
    pub fn is_device_fatal(&self) -> bool {
        matches!(
            self,
            RenderError::DeviceLost(_) | RenderError::FenceTimeout { .. } | RenderError::Poll(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_fatal_classification() {
        assert!(RenderError::DeviceLost("reset".into()).is_device_fatal());
        assert!(RenderError::FenceTimeout { fence: "compute", slot: 1 }.is_device_fatal());
        assert!(!RenderError::SurfaceOutOfMemory.is_device_fatal());
        assert!(!RenderError::StartupAbandoned.is_device_fatal());
    }

    #[test]
    fn messages_name_the_slot() {
        let e = RenderError::FenceTimeout { fence: "graphics", slot: 0 };
        assert_eq!(e.to_string(), "timed out waiting for the graphics fence of frame slot 0");
    }
}
