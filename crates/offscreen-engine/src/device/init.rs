use std::time::Duration;

/// Initialization parameters for the render thread's GPU layer.
///
/// Keep this structure stable and minimal. Add configuration flags only when a
/// concrete platform or backend requirement exists.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Prefer an sRGB surface format when available.
    pub prefer_srgb: bool,

    /// Present modes in order of preference.
    ///
    /// The first mode the surface supports wins. FIFO is always supported and is
    /// used when none of these are.
    pub present_modes: Vec<wgpu::PresentMode>,

    /// Optional alpha mode preference for the surface.
    ///
    /// If provided but unsupported on the current surface, a supported mode is selected.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Required wgpu features.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,

    /// Number of frames that may be in flight at once.
    ///
    /// Also sizes the per-frame storage/uniform buffers. Fixed for the life of a
    /// render thread.
    pub frames_in_flight: usize,

    /// Number of simulated particles. Rounded up to a whole compute workgroup.
    pub particle_count: u32,

    /// Seed for particle placement. `None` seeds from OS entropy.
    pub particle_seed: Option<u64>,

    /// Point sprite diameter in physical pixels.
    pub point_size: f32,

    /// Upper bound on a single fence wait. `None` waits indefinitely.
    pub fence_timeout: Option<Duration>,

    /// Upper bound on the device-idle wait during teardown.
    pub idle_timeout: Option<Duration>,

    /// How many times a frame may retry acquisition after a stale surface
    /// before it is skipped.
    pub max_stale_retries: u32,

    /// Asset names of the compute and graphics shaders.
    pub compute_shader: String,
    pub render_shader: String,

    /// Name given to the spawned render thread.
    pub thread_name: String,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            present_modes: vec![wgpu::PresentMode::Mailbox, wgpu::PresentMode::Fifo],
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            frames_in_flight: 2,
            particle_count: 8192,
            particle_seed: None,
            point_size: 14.0,
            fence_timeout: Some(Duration::from_secs(5)),
            idle_timeout: Some(Duration::from_secs(2)),
            max_stale_retries: 3,
            compute_shader: "shaders/particles_compute.wgsl".to_string(),
            render_shader: "shaders/particles_render.wgsl".to_string(),
            thread_name: "offscreen-render".to_string(),
        }
    }
}

impl GpuInit {
    /// `frames_in_flight`, clamped to at least one.
    pub fn frames_in_flight(&self) -> usize {
        self.frames_in_flight.max(1)
    }
}
