use std::f32::consts::TAU;

use bytemuck::{Pod, Zeroable};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::swapchain::Extent;

/// Invocations per compute workgroup; must match `@workgroup_size` in the shader.
pub const WORKGROUP_SIZE: u32 = 256;

/// Radius of the spawn disc, in NDC.
pub const SPAWN_RADIUS: f32 = 0.25;

/// Initial outward speed, in NDC per second.
pub const SPAWN_SPEED: f32 = 0.25;

// ── GPU types ─────────────────────────────────────────────────────────────

/// Particle layout (32 bytes), shared by the storage buffer and the
/// per-instance vertex buffer:
///
///  offset  0  position  [f32; 2]   loc 0
///  offset  8  velocity  [f32; 2]   (compute only)
///  offset 16  color     [f32; 4]   loc 1
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Particle {
    pub position: [f32; 2],
    pub velocity: [f32; 2],
    pub color: [f32; 4],
}

impl Particle {
    const ATTRS: [wgpu::VertexAttribute; 2] = [
        wgpu::VertexAttribute { format: wgpu::VertexFormat::Float32x2, offset: 0, shader_location: 0 },
        wgpu::VertexAttribute { format: wgpu::VertexFormat::Float32x4, offset: 16, shader_location: 1 },
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Particle>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}

/// Per-dispatch compute uniform.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct SimParams {
    pub delta_time: f32,
    pub particle_count: u32,
    pub _pad: [u32; 2], // 16-byte alignment
}

impl SimParams {
    pub fn new(delta_time: f32, particle_count: u32) -> Self {
        Self { delta_time, particle_count, _pad: [0; 2] }
    }
}

/// Graphics uniform; rewritten whenever the swapchain is recreated.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct RenderParams {
    pub viewport: [f32; 2],
    pub point_size: f32,
    pub _pad: f32,
}

impl RenderParams {
    pub fn new(extent: Extent, point_size: f32) -> Self {
        Self {
            viewport: [extent.width.max(1) as f32, extent.height.max(1) as f32],
            point_size,
            _pad: 0.0,
        }
    }
}

// ── seeding ───────────────────────────────────────────────────────────────

/// Rounds a requested particle count up to whole workgroups (at least one).
pub fn padded_count(requested: u32) -> u32 {
    requested.max(1).div_ceil(WORKGROUP_SIZE) * WORKGROUP_SIZE
}

pub fn workgroups(count: u32) -> u32 {
    count.div_ceil(WORKGROUP_SIZE)
}

/// Places `count` particles uniformly in a disc at the centre of the screen.
///
/// The disc is squeezed horizontally by the aspect ratio of `extent` so it is
/// round on screen. Each particle moves straight outward at [`SPAWN_SPEED`].
pub fn seed_particles(count: u32, extent: Extent, seed: Option<u64>) -> Vec<Particle> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let aspect = extent.inverse_aspect();

    (0..count)
        .map(|_| {
            let r = SPAWN_RADIUS * rng.random::<f32>().sqrt();
            let theta = rng.random::<f32>() * TAU;
            let (sin, cos) = theta.sin_cos();

            let x = r * cos * aspect;
            let y = r * sin;
            let len = (x * x + y * y).sqrt();
            let velocity = if len > f32::EPSILON {
                [x / len * SPAWN_SPEED, y / len * SPAWN_SPEED]
            } else {
                [SPAWN_SPEED, 0.0]
            };

            Particle {
                position: [x, y],
                velocity,
                color: [rng.random(), rng.random(), rng.random(), 1.0],
            }
        })
        .collect()
}
