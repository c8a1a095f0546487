//! Adapter suitability checks and ranking.
//!
//! Kept free of live wgpu objects so the policy can be tested without a GPU.

use std::fmt;

/// Minimum storage buffers per stage: the compute pass reads one particle
/// buffer and writes another.
pub const REQUIRED_STORAGE_BUFFERS: u32 = 2;

/// What the render thread needs to know about one adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterCandidate {
    pub name: String,
    pub backend: wgpu::Backend,
    pub device_type: wgpu::DeviceType,
    /// The adapter can present to the owner's surface.
    pub presents: bool,
    /// The adapter runs compute shaders.
    pub compute: bool,
    pub storage_buffers_per_stage: u32,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Rejection {
    NoPresentation,
    NoCompute,
    TooFewStorageBuffers(u32),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NoPresentation => write!(f, "cannot present to the surface"),
            Rejection::NoCompute => write!(f, "no compute shader support"),
            Rejection::TooFewStorageBuffers(n) => {
                write!(f, "only {n} storage buffers per stage (need {REQUIRED_STORAGE_BUFFERS})")
            }
        }
    }
}

impl AdapterCandidate {
    pub fn from_adapter(adapter: &wgpu::Adapter, surface: &wgpu::Surface<'_>) -> Self {
        let info = adapter.get_info();
        Self {
            name: info.name,
            backend: info.backend,
            device_type: info.device_type,
            presents: adapter.is_surface_supported(surface),
            compute: adapter
                .get_downlevel_capabilities()
                .flags
                .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS),
            storage_buffers_per_stage: adapter.limits().max_storage_buffers_per_shader_stage,
        }
    }

    /// Score of a usable adapter, or why it is unusable. Higher is better.
    pub fn score(&self) -> Result<u32, Rejection> {
        if !self.presents {
            return Err(Rejection::NoPresentation);
        }
        if !self.compute {
            return Err(Rejection::NoCompute);
        }
        if self.storage_buffers_per_stage < REQUIRED_STORAGE_BUFFERS {
            return Err(Rejection::TooFewStorageBuffers(self.storage_buffers_per_stage));
        }

        Ok(match self.device_type {
            wgpu::DeviceType::DiscreteGpu => 4,
            wgpu::DeviceType::IntegratedGpu => 3,
            wgpu::DeviceType::VirtualGpu => 2,
            wgpu::DeviceType::Cpu => 1,
            wgpu::DeviceType::Other => 0,
        })
    }
}

/// Index of the best usable candidate; on failure, a summary of every rejection.
pub fn pick_adapter(candidates: &[AdapterCandidate]) -> Result<usize, String> {
    let mut best: Option<(usize, u32)> = None;
    let mut rejected = Vec::new();

    for (i, c) in candidates.iter().enumerate() {
        match c.score() {
            Ok(score) => {
                if best.is_none_or(|(_, s)| score > s) {
                    best = Some((i, score));
                }
            }
            Err(why) => rejected.push(format!("{} ({:?}): {why}", c.name, c.backend)),
        }
    }

    match best {
        Some((i, _)) => Ok(i),
        None if rejected.is_empty() => Err("no adapters found".to_string()),
        None => Err(rejected.join("; ")),
    }
}
