//! Core types for the rasterizer

use std::ops::{Add, AddAssign, Div, Mul, Sub};

use serde::{Deserialize, Serialize};

use super::math::Vec3;
use super::shading::PhongMaterial;

/// Linear floating-point RGBA color.
///
/// Channels are unclamped while a frame accumulates (emission and bloom rely
/// on values above 1.0); quantization to bytes happens only in tone mapping.
/// Arithmetic operators act on RGB and carry the left operand's alpha;
/// `Mul<Color>` modulates all four channels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color { r: 0.0, g: 0.0, b: 0.0, a: 1.0 };
    pub const WHITE: Color = Color { r: 1.0, g: 1.0, b: 1.0, a: 1.0 };
    /// Cleared accumulation value
    pub const ZERO: Color = Color { r: 0.0, g: 0.0, b: 0.0, a: 0.0 };

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn with_alpha(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn gray(v: f32) -> Self {
        Self::new(v, v, v)
    }

    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: a as f32 / 255.0,
        }
    }

    /// Apply shading (multiply RGB by intensity)
    pub fn shade(self, intensity: f32) -> Self {
        self * intensity
    }

    /// Perceived brightness
    pub fn luma(self) -> f32 {
        0.299 * self.r + 0.587 * self.g + 0.114 * self.b
    }

    pub fn is_finite(self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite() && self.a.is_finite()
    }
}

impl Add for Color {
    type Output = Color;
    fn add(self, other: Color) -> Color {
        Color {
            r: self.r + other.r,
            g: self.g + other.g,
            b: self.b + other.b,
            a: self.a,
        }
    }
}

impl AddAssign for Color {
    fn add_assign(&mut self, other: Color) {
        *self = *self + other;
    }
}

impl Sub for Color {
    type Output = Color;
    fn sub(self, other: Color) -> Color {
        Color {
            r: self.r - other.r,
            g: self.g - other.g,
            b: self.b - other.b,
            a: self.a,
        }
    }
}

impl Mul<f32> for Color {
    type Output = Color;
    fn mul(self, s: f32) -> Color {
        Color {
            r: self.r * s,
            g: self.g * s,
            b: self.b * s,
            a: self.a,
        }
    }
}

impl Mul<Color> for Color {
    type Output = Color;
    fn mul(self, other: Color) -> Color {
        Color {
            r: self.r * other.r,
            g: self.g * other.g,
            b: self.b * other.b,
            a: self.a * other.a,
        }
    }
}

impl Div<f32> for Color {
    type Output = Color;
    fn div(self, s: f32) -> Color {
        Color {
            r: self.r / s,
            g: self.g / s,
            b: self.b / s,
            a: self.a,
        }
    }
}

/// Shading mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShadingMode {
    /// Raw diffuse texture or base color
    None,
    /// One light calculation per face
    #[default]
    Lambert,
    /// Per-corner intensity interpolated across the face
    Gouraud,
    /// Per-pixel normal, diffuse term only
    PhongShadow,
    /// Ambient + diffuse + specular per pixel, texture-driven when maps are bound
    PhongLighting,
}

impl ShadingMode {
    pub const ALL: [ShadingMode; 5] = [
        ShadingMode::None,
        ShadingMode::Lambert,
        ShadingMode::Gouraud,
        ShadingMode::PhongShadow,
        ShadingMode::PhongLighting,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ShadingMode::None => "none",
            ShadingMode::Lambert => "lambert",
            ShadingMode::Gouraud => "gouraud",
            ShadingMode::PhongShadow => "phong shadow",
            ShadingMode::PhongLighting => "phong lighting",
        }
    }
}

/// Per-pass rasterizer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterSettings {
    /// Shading mode
    pub shading: ShadingMode,
    /// Direction the light travels (normalized on use)
    pub light_dir: Vec3,
    /// Surface color when no diffuse texture is bound
    pub base_color: Color,
    /// Phong lighting factors
    pub material: PhongMaterial,
    /// Bright-pass bloom before tone mapping
    pub bloom: bool,
}

impl RasterSettings {
    pub fn light(&self) -> Vec3 {
        self.light_dir.normalize_or_zero()
    }
}

impl Default for RasterSettings {
    fn default() -> Self {
        Self {
            shading: ShadingMode::Lambert,
            light_dir: Vec3::new(-1.0, -1.0, -1.0).normalize(),
            base_color: Color::WHITE,
            material: PhongMaterial::default(),
            bloom: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_ops_keep_left_alpha() {
        let c = Color::with_alpha(0.5, 0.25, 1.0, 0.5) + Color::new(0.5, 0.5, 0.5);
        assert_eq!(c, Color::with_alpha(1.0, 0.75, 1.5, 0.5));
        let d = (c - Color::new(1.0, 0.75, 1.5)) * 2.0;
        assert_eq!(d, Color::with_alpha(0.0, 0.0, 0.0, 0.5));
        assert_eq!(Color::gray(4.0) / 2.0, Color::gray(2.0));
    }

    #[test]
    fn test_color_unclamped() {
        let c = Color::gray(0.8) * 3.0;
        assert!(c.r > 1.0);
        assert!((c.luma() - 2.4).abs() < 0.0001);
    }

    #[test]
    fn test_from_rgba8() {
        let c = Color::from_rgba8(255, 0, 51, 255);
        assert!((c.r - 1.0).abs() < 1e-6);
        assert!((c.b - 0.2).abs() < 1e-6);
        assert!((c.a - 1.0).abs() < 1e-6);
    }
}
