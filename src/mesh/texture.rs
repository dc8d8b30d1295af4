//! Sampled texture maps

use std::path::{Path, PathBuf};

use image::GenericImageView;
use thiserror::Error;

use crate::rasterizer::{Color, Vec2, Vec3};

/// Image extensions probed when looking for maps next to a mesh
const MAP_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("failed to load {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("unsupported bytes per pixel: {0} (expected 3 or 4)")]
    UnsupportedFormat(usize),
    #[error("texture data is {actual} bytes, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("texture has zero size")]
    Empty,
}

/// RGBA8 texture, row-major with the origin at the top-left
#[derive(Debug, Clone)]
pub struct Texture {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<[u8; 4]>,
    pub name: String,
}

impl Texture {
    /// Wrap raw decoded RGB (3 bytes per pixel) or RGBA (4) data
    pub fn from_raw(bytes: &[u8], width: usize, height: usize, bytes_per_pixel: usize) -> Result<Self, TextureError> {
        if width == 0 || height == 0 {
            return Err(TextureError::Empty);
        }
        if bytes_per_pixel != 3 && bytes_per_pixel != 4 {
            return Err(TextureError::UnsupportedFormat(bytes_per_pixel));
        }
        let expected = width * height * bytes_per_pixel;
        if bytes.len() < expected {
            return Err(TextureError::SizeMismatch { expected, actual: bytes.len() });
        }

        let pixels = bytes[..expected]
            .chunks_exact(bytes_per_pixel)
            .map(|p| [p[0], p[1], p[2], if bytes_per_pixel == 4 { p[3] } else { 255 }])
            .collect();

        Ok(Self { width, height, pixels, name: String::new() })
    }

    /// Load texture from an image file (PNG, JPEG or BMP)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TextureError> {
        let path = path.as_ref();
        let img = image::open(path).map_err(|source| TextureError::File {
            path: path.to_path_buf(),
            source,
        })?;

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        Self::from_image(img, name)
    }

    fn from_image(img: image::DynamicImage, name: String) -> Result<Self, TextureError> {
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(TextureError::Empty);
        }
        let pixels = img.to_rgba8().pixels().map(|p| p.0).collect();
        Ok(Self {
            width: width as usize,
            height: height as usize,
            pixels,
            name,
        })
    }

    /// Single-color texture
    pub fn solid(width: usize, height: usize, rgba: [u8; 4]) -> Self {
        Self {
            width,
            height,
            pixels: vec![rgba; width * height],
            name: "solid".to_string(),
        }
    }

    /// Nearest-neighbour sample, V flipped (v = 0 is the bottom row).
    ///
    /// UVs in [0, 1] are clamped to the last texel, UVs outside are wrapped.
    /// Non-finite UVs give `None`.
    pub fn sample(&self, uv: Vec2) -> Option<Color> {
        let [r, g, b, a] = self.texel(uv)?;
        Some(Color::from_rgba8(r, g, b, a))
    }

    /// Decode a normal-map texel (`rgb / 255 * 2 - 1`)
    pub fn sample_normal(&self, uv: Vec2) -> Option<Vec3> {
        let [r, g, b, _] = self.texel(uv)?;
        let n = Vec3::new(r as f32, g as f32, b as f32) / 255.0 * 2.0 - Vec3::ONE;
        let n = n.normalize_or_zero();
        (n != Vec3::ZERO).then_some(n)
    }

    fn texel(&self, uv: Vec2) -> Option<[u8; 4]> {
        if !uv.is_finite() || self.pixels.is_empty() {
            return None;
        }
        let u = wrap_unit(uv.x);
        let v = wrap_unit(uv.y);
        let x = ((u * self.width as f32) as usize).min(self.width - 1);
        let y = (((1.0 - v) * self.height as f32) as usize).min(self.height - 1);
        self.pixels.get(y * self.width + x).copied()
    }
}

fn wrap_unit(t: f32) -> f32 {
    if (0.0..=1.0).contains(&t) {
        t
    } else {
        t.rem_euclid(1.0)
    }
}

/// Optional maps bound to a model
#[derive(Debug, Clone, Default)]
pub struct TextureSet {
    pub diffuse: Option<Texture>,
    pub normal: Option<Texture>,
    /// Packed metal (r) / roughness (g) / ambient occlusion (b)
    pub mrao: Option<Texture>,
    pub emission: Option<Texture>,
}

impl TextureSet {
    /// Maps that switch Phong lighting to its texture-driven variant
    pub fn has_surface_maps(&self) -> bool {
        self.diffuse.is_some() || self.normal.is_some() || self.mrao.is_some()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_surface_maps() && self.emission.is_none()
    }

    /// Load `diffuse`, `normal`, `mrao` and `emission` images from `dir`.
    ///
    /// Missing files leave the slot empty; a file that exists but fails to
    /// decode is an error.
    pub fn discover<P: AsRef<Path>>(dir: P) -> Result<Self, TextureError> {
        let dir = dir.as_ref();
        let load = |stem: &str| -> Result<Option<Texture>, TextureError> {
            for ext in MAP_EXTENSIONS {
                let path = dir.join(format!("{stem}.{ext}"));
                if path.is_file() {
                    let tex = Texture::from_file(&path)?;
                    log::info!("Loaded {} map: {} ({}x{})", stem, path.display(), tex.width, tex.height);
                    return Ok(Some(tex));
                }
            }
            Ok(None)
        };

        Ok(Self {
            diffuse: load("diffuse")?,
            normal: load("normal")?,
            mrao: load("mrao")?,
            emission: load("emission")?,
        })
    }
}
