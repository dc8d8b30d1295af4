//! Vector math for 3D rendering
//!
//! Vectors and matrices come from glam; this module only adds the
//! rasterizer-specific pieces: the viewport transform, reflection and the
//! screen-space interpolation helpers used by the edge walker.

use std::ops::{Add, Mul};

pub use glam::{Mat4, Vec2, Vec3, Vec4};

pub fn degrees_to_radians(degrees: f32) -> f32 {
    degrees.to_radians()
}

pub fn radians_to_degrees(radians: f32) -> f32 {
    radians.to_degrees()
}

/// Viewport matrix: maps NDC [-1, 1] onto pixel coordinates.
/// Y is flipped so that +Y in NDC ends up at the top row.
pub fn viewport_matrix(width: f32, height: f32, x_min: f32, y_min: f32) -> Mat4 {
    Mat4::from_cols(
        Vec4::new(width * 0.5, 0.0, 0.0, 0.0),
        Vec4::new(0.0, -height * 0.5, 0.0, 0.0),
        Vec4::new(0.0, 0.0, 1.0, 0.0),
        Vec4::new(x_min + width * 0.5, y_min + height * 0.5, 0.0, 1.0),
    )
}

/// Reflect `v` about the plane whose (unit) normal is `n`.
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - n * (2.0 * v.dot(n))
}

/// Interpolation parameter of `value` along `start..end`.
/// A zero-length range yields 0 so callers never see NaN.
#[inline]
pub fn phi(start: f32, end: f32, value: f32) -> f32 {
    let d = end - start;
    if d == 0.0 {
        0.0
    } else {
        (value - start) / d
    }
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Perspective-correct interpolation between two attributes whose vertices
/// carry `1/w` weights. Degenerate weights fall back to plain linear.
#[inline]
pub fn perspective_lerp<T>(a: T, b: T, inv_w_a: f32, inv_w_b: f32, t: f32) -> T
where
    T: Copy + Add<Output = T> + Mul<f32, Output = T>,
{
    let wa = (1.0 - t) * inv_w_a;
    let wb = t * inv_w_b;
    let sum = wa + wb;
    if sum.abs() <= f32::EPSILON || !sum.is_finite() {
        return a * (1.0 - t) + b * t;
    }
    (a * wa + b * wb) * (1.0 / sum)
}

/// True when every component of a projected vertex is usable.
#[inline]
pub fn is_finite4(v: Vec4) -> bool {
    v.x.is_finite() && v.y.is_finite() && v.z.is_finite() && v.w.is_finite()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_maps_corners() {
        let m = viewport_matrix(200.0, 100.0, 0.0, 0.0);
        let top_left = m * Vec4::new(-1.0, 1.0, 0.5, 1.0);
        let bottom_right = m * Vec4::new(1.0, -1.0, 0.5, 1.0);
        assert!((top_left.x - 0.0).abs() < 0.001);
        assert!((top_left.y - 0.0).abs() < 0.001);
        assert!((bottom_right.x - 200.0).abs() < 0.001);
        assert!((bottom_right.y - 100.0).abs() < 0.001);
        assert!((top_left.z - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_reflect() {
        let r = reflect(Vec3::new(1.0, -1.0, 0.0), Vec3::Y);
        assert!((r - Vec3::new(1.0, 1.0, 0.0)).length() < 0.001);
    }

    #[test]
    fn test_phi_degenerate_range() {
        assert_eq!(phi(3.0, 3.0, 3.0), 0.0);
        assert!((phi(0.0, 4.0, 1.0) - 0.25).abs() < 0.0001);
    }

    #[test]
    fn test_perspective_lerp_equal_weights_is_linear() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(1.0, 2.0);
        let mid = perspective_lerp(a, b, 0.5, 0.5, 0.25);
        assert!((mid - Vec2::new(0.25, 0.5)).length() < 0.0001);
    }

    #[test]
    fn test_perspective_lerp_favours_nearer_vertex() {
        // `a` is four times closer (larger 1/w), so the midpoint leans towards it
        let v = perspective_lerp(0.0f32, 1.0f32, 4.0, 1.0, 0.5);
        assert!((v - 0.2).abs() < 0.0001);
        assert_eq!(perspective_lerp(0.0f32, 1.0f32, 4.0, 1.0, 0.0), 0.0);
        assert!((perspective_lerp(0.0f32, 1.0f32, 4.0, 1.0, 1.0) - 1.0).abs() < 0.0001);
    }
}
