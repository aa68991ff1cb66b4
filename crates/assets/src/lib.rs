//! Asset loading: OBJ models flattened into per-material vertex lists,
//! RGBA texture decoding, and procedural stand-ins for missing files.
//!
//! Nothing here touches the GPU. Callers upload the results through a
//! render backend and resolve texture paths to handles themselves.

mod obj;
mod procedural;
mod texture;

use std::path::PathBuf;

pub use obj::{ImportedGroup, ImportedModel, import_obj};
pub use procedural::{box_model, checker_texture, ground_grid, prop_palette};
pub use texture::{decode_texture, load_texture};

/// Errors from asset operations.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("OBJ load error in {path}: {source}")]
    Obj {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },
    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),
    #[error("model {0} contains no triangles")]
    EmptyModel(PathBuf),
}
