use physview_common::{ModelId, TextureId, TextureImage, Viewport};

use crate::backend::{RenderBackend, RenderError, validate_texture};
use crate::batch::{MeshData, StaticModel};
use crate::pass::{DrawCommand, PassRecording, PassTarget};

/// Running totals of what a backend has been asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    pub shadow_passes: u64,
    pub screen_passes: u64,
    pub texture_binds: u64,
    pub batch_draws: u64,
    pub instance_draws: u64,
    pub sky_draws: u64,
    pub presents: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendEvent {
    Execute(PassTarget),
    Present,
    Resize(Viewport),
}

/// Headless backend that validates and records passes instead of drawing.
///
/// Handles are checked exactly as a GPU backend would, so it stands in for
/// one in the CLI and in tests.
#[derive(Debug)]
pub struct RecordingRenderer {
    viewport: Viewport,
    textures: Vec<(u32, u32)>,
    models: Vec<StaticModel>,
    events: Vec<BackendEvent>,
    stats: FrameStats,
    last_screen: Option<PassRecording>,
    screen_pending: bool,
}

impl RecordingRenderer {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            textures: Vec::new(),
            models: Vec::new(),
            events: Vec::new(),
            stats: FrameStats::default(),
            last_screen: None,
            screen_pending: false,
        }
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn events(&self) -> &[BackendEvent] {
        &self.events
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    /// The most recent screen pass, for inspection.
    pub fn last_screen_pass(&self) -> Option<&PassRecording> {
        self.last_screen.as_ref()
    }

    fn model(&self, id: ModelId) -> Result<&StaticModel, RenderError> {
        self.models
            .get(id.0 as usize)
            .ok_or(RenderError::UnknownModel(id))
    }

    fn check_command(&self, cmd: &DrawCommand) -> Result<(), RenderError> {
        match cmd {
            DrawCommand::BindTexture(Some(id)) if id.0 as usize >= self.textures.len() => {
                Err(RenderError::UnknownTexture(*id))
            }
            DrawCommand::DrawBatch { model, batch, .. } => {
                if *batch < self.model(*model)?.batches().len() {
                    Ok(())
                } else {
                    Err(RenderError::UnknownModel(*model))
                }
            }
            DrawCommand::DrawInstance { model, .. } => self.model(*model).map(|_| ()),
            _ => Ok(()),
        }
    }

    /// Human-readable digest of uploads and totals.
    pub fn summary(&self) -> String {
        let s = &self.stats;
        let mut out = String::new();
        out.push_str(&format!(
            "=== Recording renderer ({}x{}) ===\n",
            self.viewport.width(),
            self.viewport.height()
        ));
        out.push_str(&format!(
            "Uploads: {} textures, {} models\n",
            self.textures.len(),
            self.models.len()
        ));
        out.push_str(&format!(
            "Passes: {} shadow, {} screen, {} presented\n",
            s.shadow_passes, s.screen_passes, s.presents
        ));
        out.push_str(&format!(
            "Draws: {} batches, {} instances, {} sky; {} texture binds\n",
            s.batch_draws, s.instance_draws, s.sky_draws, s.texture_binds
        ));
        out
    }
}

impl RenderBackend for RecordingRenderer {
    fn name(&self) -> &str {
        "recording"
    }

    fn upload_texture(&mut self, image: &TextureImage) -> Result<TextureId, RenderError> {
        validate_texture(image)?;
        let id = TextureId(self.textures.len() as u32);
        self.textures.push((image.width, image.height));
        Ok(id)
    }

    fn upload_model(&mut self, mesh: &MeshData) -> Result<StaticModel, RenderError> {
        if mesh.is_empty() {
            return Err(RenderError::EmptyModel);
        }
        let layout = mesh.layout();
        let model = StaticModel::new(ModelId(self.models.len() as u32), &layout);
        self.models.push(model.clone());
        Ok(model)
    }

    fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.events.push(BackendEvent::Resize(viewport));
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn execute(&mut self, pass: &PassRecording) -> Result<(), RenderError> {
        for cmd in &pass.commands {
            self.check_command(cmd)?;
        }
        let s = &mut self.stats;
        for cmd in &pass.commands {
            match cmd {
                DrawCommand::BindShadowMap => {}
                DrawCommand::BindTexture(_) => s.texture_binds += 1,
                DrawCommand::DrawBatch { .. } => s.batch_draws += 1,
                DrawCommand::DrawInstance { .. } => s.instance_draws += 1,
                DrawCommand::DrawSky { .. } => s.sky_draws += 1,
            }
        }
        match pass.target {
            PassTarget::Shadow => s.shadow_passes += 1,
            PassTarget::Screen => {
                s.screen_passes += 1;
                self.screen_pending = true;
                self.last_screen = Some(pass.clone());
            }
        }
        self.events.push(BackendEvent::Execute(pass.target));
        Ok(())
    }

    fn present(&mut self) -> Result<(), RenderError> {
        if !self.screen_pending {
            return Err(RenderError::Surface(
                "present without a screen pass".to_string(),
            ));
        }
        self.screen_pending = false;
        self.stats.presents += 1;
        self.events.push(BackendEvent::Present);
        Ok(())
    }

    fn shutdown(&mut self) {
        tracing::debug!(
            textures = self.textures.len(),
            models = self.models.len(),
            "recording renderer released"
        );
        self.textures.clear();
        self.models.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::MaterialGroup;
    use crate::pass::FrameUniforms;
    use bytemuck::Zeroable;
    use glam::{Mat4, Vec2, Vec3};
    use physview_common::{BodyHandle, Vertex};

    fn mesh() -> MeshData {
        MeshData {
            groups: vec![MaterialGroup {
                vertices: vec![Vertex::new(Vec3::ZERO, Vec3::Y, Vec2::ZERO); 3],
                texture: None,
            }],
        }
    }

    fn pass(target: PassTarget, commands: Vec<DrawCommand>) -> PassRecording {
        PassRecording {
            target,
            clear: [0.0; 4],
            viewport: Viewport::new(8, 8),
            uniforms: FrameUniforms::zeroed(),
            commands,
        }
    }

    #[test]
    fn uploads_hand_out_sequential_ids() {
        let mut r = RecordingRenderer::new(Viewport::new(8, 8));
        let t0 = r.upload_texture(&TextureImage::solid(1, 1, [255; 4])).unwrap();
        let t1 = r.upload_texture(&TextureImage::solid(2, 2, [0; 4])).unwrap();
        assert_eq!((t0, t1), (TextureId(0), TextureId(1)));
        let m = r.upload_model(&mesh()).unwrap();
        assert_eq!(m.id(), ModelId(0));
        assert_eq!(m.batches().len(), 1);
    }

    #[test]
    fn bad_uploads_are_rejected() {
        let mut r = RecordingRenderer::new(Viewport::new(8, 8));
        let broken = TextureImage {
            width: 4,
            height: 4,
            rgba: vec![0; 3],
        };
        assert!(matches!(
            r.upload_texture(&broken),
            Err(RenderError::InvalidTexture { .. })
        ));
        assert!(matches!(
            r.upload_model(&MeshData::default()),
            Err(RenderError::EmptyModel)
        ));
    }

    #[test]
    fn unknown_handles_fail_execution() {
        let mut r = RecordingRenderer::new(Viewport::new(8, 8));
        let bad_tex = pass(PassTarget::Screen, vec![DrawCommand::BindTexture(Some(TextureId(3)))]);
        assert!(matches!(r.execute(&bad_tex), Err(RenderError::UnknownTexture(_))));

        let bad_model = pass(
            PassTarget::Shadow,
            vec![DrawCommand::DrawInstance {
                model: ModelId(0),
                handle: BodyHandle(0),
                world: Mat4::IDENTITY,
            }],
        );
        assert!(matches!(r.execute(&bad_model), Err(RenderError::UnknownModel(_))));
        assert_eq!(r.stats(), FrameStats::default());
    }

    #[test]
    fn present_needs_a_screen_pass() {
        let mut r = RecordingRenderer::new(Viewport::new(8, 8));
        assert!(r.present().is_err());
        r.execute(&pass(PassTarget::Shadow, Vec::new())).unwrap();
        assert!(r.present().is_err());
        r.execute(&pass(PassTarget::Screen, Vec::new())).unwrap();
        r.present().unwrap();
        assert_eq!(
            r.events(),
            &[
                BackendEvent::Execute(PassTarget::Shadow),
                BackendEvent::Execute(PassTarget::Screen),
                BackendEvent::Present,
            ]
        );
        assert!(r.summary().contains("1 presented"));
    }
}
