//! Per-pixel shading strategies
//!
//! One [`Shader`] is selected per polygon and then evaluated for every pixel
//! of that polygon. Variants hold only what they precomputed for their
//! polygon, so they are cheap to build and share no state.
//!
//! Normal convention: face normals are `normalize(cross(v1 - v2, v3 - v2))`,
//! which for a front face points *away* from the viewer, and the light vector
//! is the direction light travels. The normal handed to a shader is therefore
//! the light-facing one (the negated outward mesh normal), so a surface is
//! lit when `dot(normal, light) > 0`.

use serde::{Deserialize, Serialize};

use super::math::{reflect, Vec3};
use super::types::{Color, ShadingMode};

/// Scale of the ambient term when the occlusion comes from a texture
const TEXTURED_AMBIENT_SCALE: f32 = 0.05;

/// Material constants for the Phong lighting model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhongMaterial {
    pub ambient: f32,
    pub diffuse: f32,
    pub specular: f32,
    pub shininess: f32,
    pub specular_color: Color,
    /// Multiplier applied to emission maps under Phong lighting
    pub emission_boost: f32,
}

impl PhongMaterial {
    /// Factors limited to [0, 1]
    pub fn clamped(self) -> Self {
        Self {
            ambient: self.ambient.clamp(0.0, 1.0),
            diffuse: self.diffuse.clamp(0.0, 1.0),
            specular: self.specular.clamp(0.0, 1.0),
            ..self
        }
    }
}

impl Default for PhongMaterial {
    fn default() -> Self {
        Self {
            ambient: 0.01,
            diffuse: 0.7,
            specular: 0.5,
            shininess: 20.0,
            specular_color: Color::WHITE,
            emission_boost: 10.0,
        }
    }
}

/// Geometry at one pixel
#[derive(Debug, Clone, Copy)]
pub struct Fragment {
    /// Light-facing unit normal
    pub normal: Vec3,
    /// Corner intensity interpolated along edges and span (Gouraud)
    pub intensity: f32,
    /// Unit vector from the surface towards the eye
    pub to_eye: Vec3,
    /// Packed roughness (g) / ambient occlusion (b) sample, black when unbound
    pub mrao: Color,
}

impl Default for Fragment {
    fn default() -> Self {
        Self {
            normal: Vec3::ZERO,
            intensity: 1.0,
            to_eye: Vec3::ZERO,
            mrao: Color::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shader {
    None,
    /// Intensity computed once from the face normal
    Lambert { intensity: f32 },
    Gouraud,
    PhongShadow,
    PhongLighting { material: PhongMaterial },
    /// Phong lighting driven by diffuse / normal / mrao maps
    PhongTextured,
}

impl Shader {
    /// Pick the strategy for one polygon
    pub fn select(
        mode: ShadingMode,
        face_normal: Vec3,
        light: Vec3,
        material: &PhongMaterial,
        has_surface_maps: bool,
    ) -> Self {
        match mode {
            ShadingMode::None => Shader::None,
            ShadingMode::Lambert => Shader::Lambert {
                intensity: diffuse_intensity(face_normal, light),
            },
            ShadingMode::Gouraud => Shader::Gouraud,
            ShadingMode::PhongShadow => Shader::PhongShadow,
            ShadingMode::PhongLighting if has_surface_maps => Shader::PhongTextured,
            ShadingMode::PhongLighting => Shader::PhongLighting {
                material: material.clamped(),
            },
        }
    }

    /// Needs a per-pixel interpolated (or normal-mapped) normal
    pub fn uses_pixel_normal(&self) -> bool {
        matches!(
            self,
            Shader::PhongShadow | Shader::PhongLighting { .. } | Shader::PhongTextured
        )
    }

    /// Needs the per-pixel direction towards the eye
    pub fn uses_view(&self) -> bool {
        matches!(self, Shader::PhongLighting { .. } | Shader::PhongTextured)
    }

    /// Needs per-corner intensities carried through the edge table
    pub fn uses_corner_intensity(&self) -> bool {
        matches!(self, Shader::Gouraud)
    }

    pub fn shade(&self, albedo: Color, frag: &Fragment, light: Vec3) -> Color {
        match self {
            Shader::None => albedo,
            Shader::Lambert { intensity } => albedo.shade(*intensity),
            Shader::Gouraud => albedo.shade(frag.intensity),
            Shader::PhongShadow => albedo.shade(diffuse_intensity(frag.normal, light)),
            Shader::PhongLighting { material } => {
                phong_lighting(albedo, frag.normal, light, frag.to_eye, material)
            }
            Shader::PhongTextured => {
                phong_textured(albedo, frag.normal, light, frag.to_eye, frag.mrao)
            }
        }
    }
}

/// `clamp(dot(normal, light), 0, 1)`
#[inline]
pub fn diffuse_intensity(normal: Vec3, light: Vec3) -> f32 {
    normal.dot(light).clamp(0.0, 1.0)
}

/// Classic ambient + diffuse + specular
pub fn phong_lighting(
    albedo: Color,
    normal: Vec3,
    light: Vec3,
    to_eye: Vec3,
    material: &PhongMaterial,
) -> Color {
    let n = normal.normalize_or_zero();
    let l = light.normalize_or_zero();
    let v = to_eye.normalize_or_zero();

    let ambient = albedo * material.ambient;
    let diffuse = albedo * (material.diffuse * n.dot(l).max(0.0));
    let r = reflect(l, n).normalize_or_zero();
    let spec = r.dot(v).max(0.0).powf(material.shininess);
    let specular = material.specular_color * (material.specular * spec);

    ambient + diffuse + specular
}

/// Texture-driven Phong: roughness in green, ambient occlusion in blue
pub fn phong_textured(albedo: Color, normal: Vec3, light: Vec3, to_eye: Vec3, mrao: Color) -> Color {
    let n = normal.normalize_or_zero();
    let l = light.normalize_or_zero();
    let v = to_eye.normalize_or_zero();
    let smoothness = (1.0 - mrao.g).clamp(0.0, 1.0);

    let ambient = albedo * (mrao.b * TEXTURED_AMBIENT_SCALE);
    let diffuse = albedo * n.dot(l).max(0.0);
    let r = reflect(l, n).normalize_or_zero();
    let exponent = smoothness.powi(8) * 127.0 + 1.0;
    let strength = 0.05 + 0.95 * smoothness.powi(4);
    let specular = Color::gray(strength * r.dot(v).max(0.0).powf(exponent));

    ambient + diffuse + specular
}
