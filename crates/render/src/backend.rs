use physview_common::{BodyHandle, ModelId, TextureId, TextureImage, Viewport};

use crate::batch::{MeshData, StaticModel};
use crate::pass::PassRecording;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("unknown texture {0:?}")]
    UnknownTexture(TextureId),
    #[error("unknown model {0:?}")]
    UnknownModel(ModelId),
    #[error("no pose for body {0:?}")]
    MissingPose(BodyHandle),
    #[error("model has no vertices")]
    EmptyModel,
    #[error("invalid texture image ({width}x{height}, {len} bytes)")]
    InvalidTexture { width: u32, height: u32, len: usize },
    #[error("surface error: {0}")]
    Surface(String),
    #[error("graphics device lost")]
    DeviceLost,
    #[error("renderer initialization failed: {0}")]
    Init(String),
}

/// A device that owns GPU resources and executes recorded passes.
///
/// Per frame the orchestrator executes the shadow pass, then the screen pass,
/// then presents.
pub trait RenderBackend {
    fn name(&self) -> &str;

    fn upload_texture(&mut self, image: &TextureImage) -> Result<TextureId, RenderError>;

    /// Upload a model's vertices and batches. Empty meshes are rejected.
    fn upload_model(&mut self, mesh: &MeshData) -> Result<StaticModel, RenderError>;

    /// Resize the screen target. Zero sizes are already clamped by `Viewport`.
    fn resize(&mut self, viewport: Viewport);

    fn viewport(&self) -> Viewport;

    fn execute(&mut self, pass: &PassRecording) -> Result<(), RenderError>;

    fn present(&mut self) -> Result<(), RenderError>;

    /// Release GPU resources. Nothing is drawn afterwards.
    fn shutdown(&mut self) {}
}

/// Reject images whose byte length does not match their size.
pub fn validate_texture(image: &TextureImage) -> Result<(), RenderError> {
    if image.is_valid() {
        Ok(())
    } else {
        Err(RenderError::InvalidTexture {
            width: image.width,
            height: image.height,
            len: image.rgba.len(),
        })
    }
}
