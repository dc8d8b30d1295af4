//! Mesh module - geometry and texture maps fed to the rasterizer
//!
//! - OBJ reader producing raw mesh arrays
//! - Immutable render model baked into world space through a pivot
//! - Optional diffuse / normal / mrao / emission maps

mod model;
mod obj;
mod texture;

pub use model::*;
pub use obj::*;
pub use texture::*;

use std::path::Path;

use thiserror::Error;

use crate::rasterizer::{Pivot, Vec3};

/// Anything that can go wrong while loading a model from disk
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("mesh: {0}")]
    Obj(#[from] ObjError),
    #[error("mesh: {0}")]
    Mesh(#[from] MeshError),
    #[error("texture: {0}")]
    Texture(#[from] TextureError),
}

/// Load an OBJ plus any texture maps sitting in the same directory.
///
/// Fails as a whole: a bad index or an undecodable map yields an error and
/// no model.
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Model, LoadError> {
    let path = path.as_ref();
    let mesh = load_obj(path)?;
    let model = Model::new(mesh, Pivot::base(Vec3::ZERO))?;

    let textures = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => TextureSet::discover(dir)?,
        _ => TextureSet::discover(".")?,
    };

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let stats = model.stats();
    log::info!(
        "Loaded model '{}': {} vertices, {} polygons ({} triangles, {} degenerate)",
        name,
        stats.vertices,
        stats.polygons,
        stats.triangles,
        stats.degenerate
    );

    Ok(model.with_textures(textures).with_name(name))
}
