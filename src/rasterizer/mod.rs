//! Software scanline rasterizer
//!
//! Features:
//! - Orbit camera with cached forward and inverse projection
//! - Active-edge scanline fill, perspective-correct normals and UVs
//! - Per-pixel locked depth test so polygons can be filled in parallel
//! - None, Lambert, Gouraud, Phong shadow and Phong lighting shading
//! - Optional diffuse, normal, mrao and emission maps

mod camera;
mod math;
mod pivot;
mod render;
mod shading;
mod target;
mod types;

pub use camera::*;
pub use math::*;
pub use pivot::*;
pub use render::*;
pub use shading::*;
pub use target::*;
pub use types::*;
