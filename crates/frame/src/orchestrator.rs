use std::time::Duration;

use glam::Vec3;
use physview_assets::AssetError;
use physview_camera::{Camera, CameraMode};
use physview_common::BodyHandle;
use physview_input::{KeyBindings, MoveIntent};
use physview_physics::{AvatarMotion, PhysicsError, PhysicsRegistry, PhysicsService};
use physview_render::{
    CameraView, LightRig, MainPass, RenderBackend, RenderError, RenderScene, ShadowPass,
};

use crate::config::{ConfigError, ViewerConfig};
use crate::context::FrameContext;
use crate::scene;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("physics: {0}")]
    Physics(#[from] PhysicsError),
    #[error("render: {0}")]
    Render(#[from] RenderError),
    #[error("assets: {0}")]
    Asset(#[from] AssetError),
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("avatar body {0:?} missing from the physics snapshot")]
    MissingAvatar(BodyHandle),
    #[error("orchestrator has been shut down")]
    ShutDown,
}

/// What one completed tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub dt: f32,
    /// Frames per second, when a one-second window closed this tick.
    pub fps: Option<u32>,
    pub camera: Vec3,
    pub shadow_draws: usize,
    pub screen_draws: usize,
    pub texture_binds: usize,
}

/// The per-tick control loop: physics, camera, shadow pass, main pass, present.
///
/// Owns the physics registry and the render backend. Any error returned from
/// [`tick`](Self::tick) is fatal; the caller is expected to stop and call
/// [`shutdown`](Self::shutdown).
pub struct Orchestrator<P: PhysicsService, R: RenderBackend> {
    physics: PhysicsRegistry<P>,
    backend: R,
    scene: RenderScene,
    camera: Camera,
    mode: CameraMode,
    bindings: KeyBindings,
    motion: AvatarMotion,
    light: LightRig,
    shadow_pass: ShadowPass,
    main_pass: MainPass,
    running: bool,
}

impl<P: PhysicsService, R: RenderBackend> Orchestrator<P, R> {
    /// Populate the scene on `backend`, register it with `service` and commit.
    pub fn new(config: &ViewerConfig, service: P, mut backend: R) -> Result<Self, FrameError> {
        config.validate()?;
        tracing::info!(
            physics = service.name(),
            renderer = backend.name(),
            "starting orchestrator"
        );
        let mut physics = PhysicsRegistry::new(service);
        let loaded = scene::populate(config, &mut physics, &mut backend)?;
        let camera = Camera::new(config.camera.eye, config.camera.target, config.camera.params);

        Ok(Self {
            physics,
            backend,
            scene: loaded.render,
            camera,
            mode: loaded.mode,
            bindings: config.keys,
            motion: config.avatar.motion,
            light: config.light,
            shadow_pass: ShadowPass::new(config.render.shadow_clear),
            main_pass: MainPass::new(config.render.screen_clear, config.render.sky_size),
            running: true,
        })
    }

    /// Run one tick at `elapsed` time since startup.
    ///
    /// Returns `Ok(None)` when no time has passed and the tick is skipped.
    pub fn tick(
        &mut self,
        ctx: &mut FrameContext,
        elapsed: Duration,
    ) -> Result<Option<TickReport>, FrameError> {
        if !self.running {
            return Err(FrameError::ShutDown);
        }

        // 1. Time.
        let Some(dt) = ctx.clock.advance(elapsed) else {
            return Ok(None);
        };
        ctx.tick += 1;
        let fps = ctx.fps.record(dt);
        if let Some(fps) = fps {
            tracing::debug!(fps, tick = ctx.tick, "frame rate");
        }

        // 2. Physics.
        self.physics.step(dt)?;
        self.physics.readback()?;

        // 3. Pointer look.
        self.look(ctx);

        // 4. Movement.
        self.camera.update(dt);
        let intent = MoveIntent::from_keys(ctx.input.keys(), &self.bindings);
        self.apply_movement(intent)?;

        // 5-8. Light, shadow pass, main pass, present.
        let viewport = ctx.viewport;
        if self.backend.viewport() != viewport {
            self.backend.resize(viewport);
        }
        let view = CameraView {
            view: self.camera.view_matrix(),
            projection: self.camera.projection_matrix(viewport.aspect()),
            eye: self.camera.position(),
            viewport,
        };
        let shadow = self.shadow_pass.record(&self.light, &self.scene, &self.physics)?;
        self.backend.execute(&shadow)?;
        let main = self
            .main_pass
            .record(&view, &self.light, &self.scene, &self.physics)?;
        self.backend.execute(&main)?;
        self.backend.present()?;

        Ok(Some(TickReport {
            tick: ctx.tick,
            dt,
            fps,
            camera: self.camera.position(),
            shadow_draws: shadow.draw_calls(),
            screen_draws: main.draw_calls(),
            texture_binds: main.texture_binds(),
        }))
    }

    fn look(&mut self, ctx: &mut FrameContext) {
        let Some(pointer) = ctx.input.pointer() else {
            return;
        };
        if !ctx.input.captured() {
            // Track without turning so capture starts from where the pointer is.
            self.camera.recenter_pointer(pointer);
            return;
        }
        self.camera.look_from_pointer(pointer);
        let center = ctx.viewport.center();
        self.camera.recenter_pointer(center);
        ctx.input.pointer_moved(center);
        ctx.pointer_recenter = Some(center);
    }

    fn apply_movement(&mut self, intent: MoveIntent) -> Result<(), FrameError> {
        match self.mode {
            CameraMode::FreeFly => {
                let dir = intent.direction(self.camera.forward(), self.camera.up());
                self.camera.move_along(dir);
            }
            CameraMode::AvatarFollow(handle) => {
                let body = *self
                    .physics
                    .body(handle)
                    .ok_or(FrameError::MissingAvatar(handle))?;
                self.camera
                    .set_position(self.motion.eye_position(body.transform.position));
                let dir = intent.direction(self.camera.flat_forward(), self.camera.up());
                let velocity = self.motion.velocity(body.linear_velocity, dir);
                self.physics.writeback(handle, velocity)?;
            }
        }
        Ok(())
    }

    /// Release the scene, then physics, then the renderer. Idempotent.
    pub fn shutdown(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        tracing::info!(
            instances = self.scene.instance_count(),
            batches = self.scene.batch_count(),
            "releasing scene"
        );
        self.scene = RenderScene::new();
        self.physics.shutdown();
        tracing::info!(renderer = self.backend.name(), "releasing renderer");
        self.backend.shutdown();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn mode(&self) -> CameraMode {
        self.mode
    }

    pub fn physics(&self) -> &PhysicsRegistry<P> {
        &self.physics
    }

    pub fn backend(&self) -> &R {
        &self.backend
    }

    pub fn scene(&self) -> &RenderScene {
        &self.scene
    }

    pub fn light(&self) -> &LightRig {
        &self.light
    }
}
