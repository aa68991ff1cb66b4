//! Renderer-agnostic drawing: material batches, texture-grouped instances,
//! the light rig, and the shadow and main pass recorders.
//!
//! # Invariants
//! - Passes only read body poses; they never write back to physics.
//! - A recorded pass is complete before any backend sees it.
//! - Each instance is drawn once per pass, under the texture it was created with.
//!
//! Passes are recorded as plain command lists and handed to a
//! [`RenderBackend`]. The wgpu backend lives in its own crate;
//! [`RecordingRenderer`] executes the same lists headlessly.

mod backend;
mod batch;
mod instances;
mod light;
mod main_pass;
mod pass;
mod recording;
mod scene;
mod shadow;

pub use backend::{RenderBackend, RenderError, validate_texture};
pub use batch::{DrawBatch, MaterialGroup, MeshData, ModelLayout, StaticModel};
pub use instances::{Instance, InstanceSet};
pub use light::LightRig;
pub use main_pass::MainPass;
pub use pass::{CameraView, DrawCommand, FrameUniforms, PassRecording, PassTarget};
pub use recording::{BackendEvent, FrameStats, RecordingRenderer};
pub use scene::{RenderScene, SceneObject};
pub use shadow::ShadowPass;
