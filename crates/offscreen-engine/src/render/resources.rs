use std::sync::Arc;

use wgpu::util::DeviceExt;

use crate::assets::AssetLocator;
use crate::device::{Gpu, GpuInit, WaitError};
use crate::error::{RenderError, Result};
use crate::frame::{Acquired, BackendFactory, FrameBackend, Presented};
use crate::swapchain::{Extent, SurfaceBounds, SwapchainState};
use crate::sync::{HandleLedger, LedgerReport, Teardown, Tracked};

use super::particles::{padded_count, seed_particles, workgroups, Particle, RenderParams, SimParams};

/// An acquired surface texture and its view.
pub struct FrameImage {
    texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
}

/// Objects that depend on the swapchain; rebuilt on every recreation.
struct ViewObjects {
    pipeline: Tracked<wgpu::RenderPipeline>,
    params: Tracked<wgpu::Buffer>,
    bind_group: Tracked<wgpu::BindGroup>,
}

/// Every GPU object the render thread owns, plus the wgpu frame operations.
///
/// Particle buffers form a ring of at least two, independent of the number of
/// frames in flight, so the compute pass always reads one buffer and writes
/// another. Each dispatch advances the ring; the graphics pass draws the buffer
/// the latest dispatch wrote.
pub struct GpuResources {
    gpu: Gpu,
    surface: Arc<wgpu::Surface<'static>>,
    init: GpuInit,
    swapchain: SwapchainState,
    ledger: HandleLedger,

    particle_count: u32,
    dispatches: usize,
    latest: usize,

    compute_shader: Tracked<wgpu::ShaderModule>,
    render_shader: Tracked<wgpu::ShaderModule>,
    compute_layout: Tracked<wgpu::BindGroupLayout>,
    compute_pipeline_layout: Tracked<wgpu::PipelineLayout>,
    compute_pipeline: Tracked<wgpu::ComputePipeline>,
    render_layout: Tracked<wgpu::BindGroupLayout>,
    render_pipeline_layout: Tracked<wgpu::PipelineLayout>,
    particles: Vec<Tracked<wgpu::Buffer>>,
    sim_params: Vec<Tracked<wgpu::Buffer>>,
    compute_groups: Vec<Tracked<wgpu::BindGroup>>,
    view: Option<ViewObjects>,
}

impl GpuResources {
    /// Selects the device, configures the surface and builds both pipelines.
    pub fn new(
        instance: &wgpu::Instance,
        surface: Arc<wgpu::Surface<'static>>,
        extent: Extent,
        frames_in_flight: usize,
        init: &GpuInit,
        assets: &AssetLocator,
    ) -> Result<Self> {
        let gpu = Gpu::new(instance, &surface, init)?;
        let swapchain = negotiate(&gpu, &surface, init, extent, 0)?;
        surface.configure(gpu.device(), &swapchain.surface_configuration());

        let compute_src = assets.load_shader(&init.compute_shader, &["cs_main"])?;
        let render_src = assets.load_shader(&init.render_shader, &["vs_main", "fs_main"])?;

        let device = gpu.device();
        let mut ledger = HandleLedger::new();

        let compute_label = compute_src.label();
        let compute_shader = ledger.track(
            compute_label.clone(),
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&compute_label),
                source: wgpu::ShaderSource::Wgsl(compute_src.code.into()),
            }),
        );
        let render_label = render_src.label();
        let render_shader = ledger.track(
            render_label.clone(),
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&render_label),
                source: wgpu::ShaderSource::Wgsl(render_src.code.into()),
            }),
        );

        let compute_layout = ledger.track(
            "particle compute bgl",
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("particle compute bgl"),
                entries: &[
                    layout_entry(0, wgpu::ShaderStages::COMPUTE, wgpu::BufferBindingType::Uniform),
                    layout_entry(
                        1,
                        wgpu::ShaderStages::COMPUTE,
                        wgpu::BufferBindingType::Storage { read_only: true },
                    ),
                    layout_entry(
                        2,
                        wgpu::ShaderStages::COMPUTE,
                        wgpu::BufferBindingType::Storage { read_only: false },
                    ),
                ],
            }),
        );
        let compute_pipeline_layout = ledger.track(
            "particle compute pipeline layout",
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("particle compute pipeline layout"),
                bind_group_layouts: &[&*compute_layout],
                immediate_size: 0,
            }),
        );
        let compute_pipeline = ledger.track(
            "particle compute pipeline",
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("particle compute pipeline"),
                layout: Some(&*compute_pipeline_layout),
                module: &compute_shader,
                entry_point: Some("cs_main"),
                compilation_options: Default::default(),
                cache: None,
            }),
        );

        let render_layout = ledger.track(
            "particle render bgl",
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("particle render bgl"),
                entries: &[layout_entry(0, wgpu::ShaderStages::VERTEX, wgpu::BufferBindingType::Uniform)],
            }),
        );
        let render_pipeline_layout = ledger.track(
            "particle render pipeline layout",
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("particle render pipeline layout"),
                bind_group_layouts: &[&*render_layout],
                immediate_size: 0,
            }),
        );

        let particle_count = padded_count(init.particle_count);
        let seeded = seed_particles(particle_count, swapchain.extent, init.particle_seed);
        let ring = frames_in_flight.max(2);

        let mut particles = Vec::with_capacity(ring);
        let mut sim_params = Vec::with_capacity(ring);
        for k in 0..ring {
            let label = format!("particles[{k}]");
            particles.push(ledger.track(
                label.clone(),
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&label),
                    contents: bytemuck::cast_slice(&seeded),
                    usage: wgpu::BufferUsages::STORAGE
                        | wgpu::BufferUsages::VERTEX
                        | wgpu::BufferUsages::COPY_DST,
                }),
            ));

            let label = format!("sim params[{k}]");
            sim_params.push(ledger.track(
                label.clone(),
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(&label),
                    size: std::mem::size_of::<SimParams>() as u64,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                }),
            ));
        }

        let mut compute_groups = Vec::with_capacity(ring);
        for k in 0..ring {
            let read = (k + ring - 1) % ring;
            let label = format!("particle compute bind group[{k}]");
            compute_groups.push(ledger.track(
                label.clone(),
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&label),
                    layout: &compute_layout,
                    entries: &[
                        wgpu::BindGroupEntry { binding: 0, resource: sim_params[k].as_entire_binding() },
                        wgpu::BindGroupEntry { binding: 1, resource: particles[read].as_entire_binding() },
                        wgpu::BindGroupEntry { binding: 2, resource: particles[k].as_entire_binding() },
                    ],
                }),
            ));
        }

        let mut resources = Self {
            gpu,
            surface,
            init: init.clone(),
            swapchain,
            ledger,
            particle_count,
            dispatches: 0,
            latest: 0,
            compute_shader,
            render_shader,
            compute_layout,
            compute_pipeline_layout,
            compute_pipeline,
            render_layout,
            render_pipeline_layout,
            particles,
            sim_params,
            compute_groups,
            view: None,
        };
        resources.view = Some(resources.build_view_objects());

        log::info!(
            "gpu resources ready: {} particles, {} particle buffers, {} live handles",
            particle_count,
            ring,
            resources.ledger.live_count()
        );
        Ok(resources)
    }

    pub fn particle_count(&self) -> u32 {
        self.particle_count
    }

    fn build_view_objects(&mut self) -> ViewObjects {
        let device = self.gpu.device();
        let generation = self.swapchain.generation;

        let pipeline = self.ledger.track(
            format!("particle render pipeline #{generation}"),
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("particle render pipeline"),
                layout: Some(&*self.render_pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &self.render_shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[Particle::layout()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &self.render_shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.swapchain.format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            }),
        );

        let params = self.ledger.track(
            format!("render params #{generation}"),
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("particle render params"),
                contents: bytemuck::bytes_of(&RenderParams::new(self.swapchain.extent, self.init.point_size)),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            }),
        );

        let bind_group = self.ledger.track(
            format!("particle render bind group #{generation}"),
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("particle render bind group"),
                layout: &self.render_layout,
                entries: &[wgpu::BindGroupEntry { binding: 0, resource: params.as_entire_binding() }],
            }),
        );

        ViewObjects { pipeline, params, bind_group }
    }

    fn release_view_objects(&mut self) {
        if let Some(ViewObjects { pipeline, params, bind_group }) = self.view.take() {
            self.ledger.release(bind_group);
            self.ledger.release(params);
            self.ledger.release(pipeline);
        }
    }

    fn wait_device_idle(&self) -> Result<()> {
        match self.gpu.wait_idle(self.init.idle_timeout) {
            Ok(()) => Ok(()),
            Err(WaitError::Timeout) => Err(RenderError::Poll("device idle wait timed out".to_string())),
            Err(WaitError::Failed(msg)) => Err(RenderError::Poll(msg)),
        }
    }
}

impl FrameBackend for GpuResources {
    type Submission = wgpu::SubmissionIndex;
    type Image = FrameImage;

    fn swapchain(&self) -> &SwapchainState {
        &self.swapchain
    }

    fn adapter_name(&self) -> String {
        self.gpu.adapter_name()
    }

    fn wait(&mut self, submission: wgpu::SubmissionIndex, fence: &'static str, slot: usize) -> Result<()> {
        match self.gpu.wait_for(submission, self.init.fence_timeout) {
            Ok(()) => Ok(()),
            Err(WaitError::Timeout) => Err(RenderError::FenceTimeout { fence, slot }),
            Err(WaitError::Failed(msg)) => Err(RenderError::Poll(msg)),
        }
    }

    fn submit_compute(&mut self, slot: usize, dt: f32) -> Result<wgpu::SubmissionIndex> {
        let write = self.dispatches % self.particles.len();
        self.dispatches = self.dispatches.wrapping_add(1);
        self.latest = write;

        let queue = self.gpu.queue();
        queue.write_buffer(
            &self.sim_params[write],
            0,
            bytemuck::bytes_of(&SimParams::new(dt, self.particle_count)),
        );

        let mut encoder = self.gpu.device().create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("particle compute encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("particle compute pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.compute_pipeline);
            pass.set_bind_group(0, &*self.compute_groups[write], &[]);
            pass.dispatch_workgroups(workgroups(self.particle_count), 1, 1);
        }

        log::trace!("compute for slot {slot} writes particles[{write}]");
        Ok(queue.submit(Some(encoder.finish())))
    }

    fn recreate_swapchain(&mut self, requested: Extent) -> Result<Extent> {
        self.wait_device_idle()?;
        self.release_view_objects();

        let generation = self.swapchain.generation + 1;
        self.swapchain = negotiate(&self.gpu, &self.surface, &self.init, requested, generation)?;
        self.surface.configure(self.gpu.device(), &self.swapchain.surface_configuration());
        self.view = Some(self.build_view_objects());

        Ok(self.swapchain.extent)
    }

    fn acquire(&mut self, slot: usize) -> Result<Acquired<FrameImage>> {
        match self.surface.get_current_texture() {
            Ok(texture) if texture.suboptimal => {
                log::debug!("acquired a suboptimal image on slot {slot}");
                drop(texture);
                Ok(Acquired::Stale)
            }
            Ok(texture) => {
                let view = texture.texture.create_view(&wgpu::TextureViewDescriptor::default());
                Ok(Acquired::Ready(FrameImage { texture, view }))
            }
            Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => Ok(Acquired::Stale),
            Err(wgpu::SurfaceError::OutOfMemory) => Err(RenderError::SurfaceOutOfMemory),
            Err(other) => {
                log::debug!("acquire on slot {slot} failed ({other}); skipping frame");
                Ok(Acquired::Skip)
            }
        }
    }

    fn submit_graphics(&mut self, slot: usize, image: &FrameImage) -> Result<wgpu::SubmissionIndex> {
        let Some(view) = self.view.as_ref() else {
            return Err(RenderError::SyncViolation(format!(
                "graphics for slot {slot} submitted without a swapchain"
            )));
        };

        let mut encoder = self.gpu.device().create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("particle render encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("particle render pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &image.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            pass.set_pipeline(&view.pipeline);
            pass.set_bind_group(0, &*view.bind_group, &[]);
            pass.set_vertex_buffer(0, self.particles[self.latest].slice(..));
            pass.draw(0..6, 0..self.particle_count);
        }

        Ok(self.gpu.queue().submit(Some(encoder.finish())))
    }

    fn present(&mut self, slot: usize, image: FrameImage) -> Result<Presented> {
        let FrameImage { texture, view } = image;
        let size = texture.texture.size();
        let extent = self.swapchain.extent;
        let stale = size.width != extent.width || size.height != extent.height;

        drop(view);
        texture.present();

        if stale {
            log::debug!("slot {slot} presented {}x{} into a {extent} swapchain", size.width, size.height);
            return Ok(Presented::Stale);
        }
        Ok(Presented::Done)
    }

    fn device_lost(&self) -> Option<String> {
        self.gpu.lost_reason()
    }

    fn wait_idle(&mut self) -> Result<()> {
        self.wait_device_idle()
    }

    fn teardown(self) -> LedgerReport {
        let Self {
            gpu,
            surface,
            mut ledger,
            compute_shader,
            render_shader,
            compute_layout,
            compute_pipeline_layout,
            compute_pipeline,
            render_layout,
            render_pipeline_layout,
            particles,
            sim_params,
            compute_groups,
            view,
            ..
        } = self;

        let mut batch = Teardown::default();
        batch.push(compute_shader);
        batch.push(render_shader);
        batch.push(compute_layout);
        batch.push(compute_pipeline_layout);
        batch.push(compute_pipeline);
        batch.push(render_layout);
        batch.push(render_pipeline_layout);
        batch.extend(particles);
        batch.extend(sim_params);
        batch.extend(compute_groups);
        if let Some(ViewObjects { pipeline, params, bind_group }) = view {
            batch.push(pipeline);
            batch.push(params);
            batch.push(bind_group);
        }

        let report = ledger.teardown(batch);

        drop(surface);
        drop(gpu);
        report
    }
}

fn layout_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    ty: wgpu::BufferBindingType,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer { ty, has_dynamic_offset: false, min_binding_size: None },
        count: None,
    }
}

fn negotiate(
    gpu: &Gpu,
    surface: &wgpu::Surface<'_>,
    init: &GpuInit,
    requested: Extent,
    generation: u64,
) -> Result<SwapchainState> {
    let caps = surface.get_capabilities(gpu.adapter());
    let bounds = SurfaceBounds::for_limits(&gpu.limits());
    let state = SwapchainState::negotiate(&caps, &bounds, requested, init, generation)
        .ok_or_else(|| RenderError::SurfaceUnsupported(gpu.adapter_name()))?;

    log::debug!(
        "swapchain #{generation}: {} {:?} {:?}, latency {}",
        state.extent,
        state.format,
        state.present_mode,
        state.image_count
    );
    Ok(state)
}

/// Builds [`GpuResources`] on the render thread from the owner's instance and surface.
pub struct WgpuFactory {
    instance: wgpu::Instance,
    surface: Arc<wgpu::Surface<'static>>,
    init: GpuInit,
    assets: AssetLocator,
}

impl WgpuFactory {
    pub fn new(
        instance: wgpu::Instance,
        surface: Arc<wgpu::Surface<'static>>,
        init: GpuInit,
        assets: AssetLocator,
    ) -> Self {
        Self { instance, surface, init, assets }
    }
}

impl BackendFactory for WgpuFactory {
    type Backend = GpuResources;

    fn create(&self, extent: Extent, frames_in_flight: usize) -> Result<GpuResources> {
        GpuResources::new(
            &self.instance,
            Arc::clone(&self.surface),
            extent,
            frames_in_flight,
            &self.init,
            &self.assets,
        )
    }
}
