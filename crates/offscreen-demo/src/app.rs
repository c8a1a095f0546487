use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow};
use winit::keyboard::PhysicalKey;
use winit::window::{Window, WindowId};

use offscreen_engine::assets::{AssetLocator, BUNDLED_ASSET_DIR};
use offscreen_engine::render::WgpuFactory;
use offscreen_engine::thread::RenderThread;

use crate::bindings::{command_for, Command};
use crate::config::DemoConfig;

/// Window and render thread, dropped renderer first so the surface outlives
/// every GPU object created against it.
struct Session {
    renderer: RenderThread<WgpuFactory>,
    window: Arc<Window>,
}

/// The window-owning side of the demo.
pub struct DemoApp {
    config: DemoConfig,
    session: Option<Session>,
    failure: Option<anyhow::Error>,
}

impl DemoApp {
    pub fn new(config: DemoConfig) -> Self {
        Self { config, session: None, failure: None }
    }

    /// Outcome of the run once the event loop has returned.
    pub fn finish(mut self) -> Result<()> {
        self.shutdown();
        match self.failure.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn open(&mut self, event_loop: &ActiveEventLoop) -> Result<Session> {
        let size = self.config.initial_size;
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(PhysicalSize::new(size.width, size.height))
            .with_resizable(false);

        let window = Arc::new(event_loop.create_window(attrs).context("failed to create window")?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(Arc::clone(&window))
            .context("failed to create wgpu surface")?;

        let assets = AssetLocator::platform_default().with_fallback(BUNDLED_ASSET_DIR);
        let mut renderer = RenderThread::with_surface(
            instance,
            Arc::new(surface),
            window.inner_size().into(),
            self.config.gpu.clone(),
            assets,
        );
        renderer.start().context("render thread failed to start")?;

        Ok(Session { renderer, window })
    }

    fn shutdown(&mut self) {
        let Some(Session { mut renderer, window }) = self.session.take() else {
            return;
        };

        if let Some(report) = renderer.stop() {
            log::info!(
                "rendered {} frames ({} skipped, {} swapchain recreations)",
                report.frames_rendered,
                report.frames_skipped,
                report.recreations
            );
            if let Some(e) = report.fatal {
                self.failure.get_or_insert_with(|| anyhow::Error::new(e).context("render thread failed"));
            }
        }

        drop(renderer);
        drop(window);
    }

    fn quit(&mut self, event_loop: &ActiveEventLoop) {
        self.shutdown();
        event_loop.exit();
    }

    fn apply(&mut self, event_loop: &ActiveEventLoop, command: Command) {
        match command {
            Command::ResizeWindow { width, height } => {
                if let Some(session) = &self.session {
                    log::info!("resizing window to {width}x{height}");
                    session.renderer.resize_window(&*session.window, width, height);
                }
            }
            Command::Quit => self.quit(event_loop),
        }
    }
}

impl ApplicationHandler for DemoApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.session.is_some() {
            return;
        }

        match self.open(event_loop) {
            Ok(session) => self.session = Some(session),
            Err(e) => {
                log::error!("{e:#}");
                self.failure = Some(e);
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(session) = &self.session else { return };

        if session.renderer.has_exited() {
            log::error!("render thread exited; closing");
            self.quit(event_loop);
            return;
        }

        event_loop.set_control_flow(ControlFlow::WaitUntil(Instant::now() + self.config.tick));
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(session) = &self.session else { return };
        if session.window.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => self.quit(event_loop),
            WindowEvent::Resized(size) => session.renderer.resize_swap_chain(size.width, size.height),
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(code) = event.physical_key else { return };
                if let Some(command) = command_for(code, event.state, event.repeat) {
                    self.apply(event_loop, command);
                }
            }
            _ => {}
        }
    }
}
