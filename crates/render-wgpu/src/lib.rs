//! wgpu backend for the viewer.
//!
//! Executes recorded shadow and main passes: the shadow pass renders light
//! space depth into a square RGBA32F target, the main pass samples it with
//! `textureLoad` for a 3x3 shadow test and finishes with a gradient sky.
//!
//! # Invariants
//! - The shadow pass is submitted before the screen pass that samples it.
//! - Every handle in a pass is resolved before any GPU work is encoded.
//! - A lost or outdated surface is reconfigured once; a second failure is an error.

mod gpu;
mod pipelines;
mod resources;
mod shaders;

pub use gpu::WgpuBackend;
