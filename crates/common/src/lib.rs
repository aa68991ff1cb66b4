//! Shared data model for the physview viewer.
//!
//! Every other crate speaks in these types: poses, vertices, opaque handles
//! into the physics service and the GPU backend, and the viewport.

pub mod types;

pub use types::{
    BodyHandle, ModelId, PoseSource, TextureId, TextureImage, Transform, Vertex, Viewport,
};
