mod keymap;

use anyhow::{Context, Result};
use clap::Parser;
use glam::Vec2;
use physview_common::Viewport;
use physview_frame::{FrameContext, Orchestrator, ViewerConfig};
use physview_physics::SimWorld;
use physview_render_wgpu::WgpuBackend;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{CursorGrabMode, Window, WindowId};

use crate::keymap::{capture_after_button, key_ordinal};

const TITLE: &str = "physview";

#[derive(Parser)]
#[command(name = "physview-desktop", about = "Physics-coupled, shadow-mapped scene viewer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

struct Viewer {
    config: ViewerConfig,
    window: Option<Arc<Window>>,
    orchestrator: Option<Orchestrator<SimWorld, WgpuBackend>>,
    ctx: FrameContext,
    started: Instant,
    /// First fatal error; returned from `main` once the loop exits.
    error: Option<anyhow::Error>,
}

impl Viewer {
    fn new(config: ViewerConfig) -> Self {
        let ctx = FrameContext::new(config.timing.max_dt, Viewport::new(1280, 720));
        Self {
            config,
            window: None,
            orchestrator: None,
            ctx,
            started: Instant::now(),
            error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(TITLE)
            .with_inner_size(PhysicalSize::new(1280u32, 720));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );
        let size = window.inner_size();
        self.ctx.set_viewport(size.width, size.height);

        let backend = pollster::block_on(WgpuBackend::new(
            window.clone(),
            self.ctx.viewport,
            self.config.light.shadow_resolution,
            self.config.render.vsync,
        ))
        .context("failed to initialize the renderer")?;
        tracing::info!(adapter = backend.adapter_name(), "renderer ready");

        let physics = SimWorld::new(self.config.physics.sim);
        let orchestrator = Orchestrator::new(&self.config, physics, backend)
            .context("failed to build the scene")?;

        self.window = Some(window);
        self.orchestrator = Some(orchestrator);
        self.set_captured(true);
        self.started = Instant::now();
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        tracing::error!("{err:#}");
        if self.error.is_none() {
            self.error = Some(err);
        }
        event_loop.exit();
    }

    fn set_captured(&mut self, captured: bool) {
        self.ctx.input.set_captured(captured);
        let Some(window) = &self.window else {
            return;
        };
        window.set_cursor_visible(!captured);
        let grab = if captured {
            CursorGrabMode::Confined
        } else {
            CursorGrabMode::None
        };
        if let Err(err) = window.set_cursor_grab(grab) {
            tracing::debug!(%err, "cursor grab not supported");
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(orchestrator) = self.orchestrator.as_mut() else {
            return;
        };
        match orchestrator.tick(&mut self.ctx, self.started.elapsed()) {
            Ok(Some(report)) => {
                if let (Some(fps), Some(window)) = (report.fps, &self.window) {
                    window.set_title(&format!("{TITLE} | FPS: {fps}"));
                }
            }
            Ok(None) => {}
            Err(err) => {
                self.fail(event_loop, anyhow::Error::new(err).context("frame failed"));
                return;
            }
        }

        if let (Some(center), Some(window)) = (self.ctx.take_pointer_recenter(), &self.window) {
            let position = PhysicalPosition::new(center.x as f64, center.y as f64);
            if let Err(err) = window.set_cursor_position(position) {
                tracing::debug!(%err, "pointer warp not supported");
            }
        }
    }
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.error.is_some() {
            return;
        }
        if let Err(err) = self.init(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                self.ctx.input.request_quit();
            }
            WindowEvent::Resized(size) => {
                self.ctx.set_viewport(size.width, size.height);
            }
            WindowEvent::Focused(false) => {
                self.ctx.input.focus_lost();
                self.set_captured(false);
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        ..
                    },
                ..
            } => {
                let pressed = state == ElementState::Pressed;
                if code == KeyCode::Escape && pressed {
                    self.ctx.input.request_quit();
                } else if let Some(ordinal) = key_ordinal(code) {
                    if pressed {
                        self.ctx.input.key_down(ordinal);
                    } else {
                        self.ctx.input.key_up(ordinal);
                    }
                }
            }
            WindowEvent::MouseInput { state, .. } => {
                let captured = capture_after_button(self.ctx.input.captured(), state);
                self.set_captured(captured);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.ctx
                    .input
                    .pointer_moved(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
            }
            _ => {}
        }

        if self.ctx.input.quit_requested() {
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(orchestrator) = self.orchestrator.as_mut() {
            tracing::info!(ticks = self.ctx.tick, "shutting down");
            orchestrator.shutdown();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!("physview-desktop starting");

    let config = match &cli.config {
        Some(path) => ViewerConfig::load(path)?,
        None => ViewerConfig::default(),
    };

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut viewer = Viewer::new(config);
    event_loop.run_app(&mut viewer)?;

    match viewer.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
