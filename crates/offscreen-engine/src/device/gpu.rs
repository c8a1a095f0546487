use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{RenderError, Result};

use super::select::{pick_adapter, AdapterCandidate};
use super::GpuInit;

/// Why a wait on the device did not complete.
#[derive(Debug)]
pub enum WaitError {
    Timeout,
    Failed(String),
}

/// Adapter, device and queue owned by the render thread.
///
/// The instance and surface belong to the window owner; this type only borrows
/// them while selecting the adapter.
pub struct Gpu {
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,

    /// Set by the device-lost callback (never for an intentional destroy).
    lost: Arc<Mutex<Option<String>>>,
}

impl Gpu {
    /// Selects an adapter that can present to `surface` and creates the device.
    ///
    /// Blocks the calling thread on wgpu's async adapter/device requests.
    pub fn new(instance: &wgpu::Instance, surface: &wgpu::Surface<'_>, init: &GpuInit) -> Result<Self> {
        pollster::block_on(Self::request(instance, surface, init))
    }

    async fn request(
        instance: &wgpu::Instance,
        surface: &wgpu::Surface<'_>,
        init: &GpuInit,
    ) -> Result<Self> {
        let mut adapters: Vec<wgpu::Adapter> = Vec::new();
        for power_preference in [wgpu::PowerPreference::HighPerformance, wgpu::PowerPreference::LowPower] {
            let found = instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference,
                    compatible_surface: Some(surface),
                    force_fallback_adapter: false,
                })
                .await;

            let Ok(adapter) = found else { continue };
            let info = adapter.get_info();
            let duplicate = adapters.iter().any(|a| {
                let seen = a.get_info();
                seen.name == info.name && seen.backend == info.backend && seen.device == info.device
            });
            if !duplicate {
                adapters.push(adapter);
            }
        }

        let candidates: Vec<AdapterCandidate> = adapters
            .iter()
            .map(|a| AdapterCandidate::from_adapter(a, surface))
            .collect();
        for c in &candidates {
            log::debug!("adapter candidate: {} ({:?}, {:?})", c.name, c.backend, c.device_type);
        }

        let chosen = pick_adapter(&candidates).map_err(RenderError::NoSuitableAdapter)?;
        let adapter = adapters.swap_remove(chosen);
        let info = adapter.get_info();
        log::info!("using adapter {} ({:?}, {:?})", info.name, info.backend, info.device_type);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("offscreen render device"),
                required_features: init.required_features,
                required_limits: init.required_limits.clone(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await?;

        let lost = Arc::new(Mutex::new(None));
        let flag = Arc::clone(&lost);
        device.set_device_lost_callback(move |reason, message| {
            if matches!(reason, wgpu::DeviceLostReason::Destroyed) {
                return;
            }
            log::error!("device lost ({reason:?}): {message}");
            *flag.lock() = Some(message);
        });

        Ok(Self { adapter, device, queue, lost })
    }

    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    pub fn adapter_name(&self) -> String {
        self.adapter.get_info().name
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn limits(&self) -> wgpu::Limits {
        self.device.limits()
    }

    /// Message of the device-lost callback, if it has fired.
    pub fn lost_reason(&self) -> Option<String> {
        self.lost.lock().clone()
    }

    /// Blocks until `submission` has finished on the GPU.
    pub fn wait_for(
        &self,
        submission: wgpu::SubmissionIndex,
        timeout: Option<Duration>,
    ) -> std::result::Result<(), WaitError> {
        self.poll_wait(Some(submission), timeout)
    }

    /// Blocks until all submitted work has finished.
    pub fn wait_idle(&self, timeout: Option<Duration>) -> std::result::Result<(), WaitError> {
        self.poll_wait(None, timeout)
    }

    fn poll_wait(
        &self,
        submission_index: Option<wgpu::SubmissionIndex>,
        timeout: Option<Duration>,
    ) -> std::result::Result<(), WaitError> {
        match self.device.poll(wgpu::PollType::Wait { submission_index, timeout }) {
            Ok(_) => Ok(()),
            Err(wgpu::PollError::Timeout) => Err(WaitError::Timeout),
            Err(other) => Err(WaitError::Failed(other.to_string())),
        }
    }
}
