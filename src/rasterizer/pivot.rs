//! Local coordinate frame (position + three axes)
//!
//! A model's pivot is applied once when the model is built; the camera keeps
//! its own eye position and is not a pivot-driven transform.

use super::math::{Mat4, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pivot {
    pub position: Vec3,
    pub x_axis: Vec3,
    pub y_axis: Vec3,
    pub z_axis: Vec3,
}

impl Pivot {
    pub fn new(position: Vec3, x_axis: Vec3, y_axis: Vec3, z_axis: Vec3) -> Self {
        Self { position, x_axis, y_axis, z_axis }
    }

    /// Identity axes centered at `position`
    pub fn base(position: Vec3) -> Self {
        Self::new(position, Vec3::X, Vec3::Y, Vec3::Z)
    }

    pub fn rotate_x(&mut self, radians: f32) {
        self.apply(Mat4::from_rotation_x(radians));
    }

    pub fn rotate_y(&mut self, radians: f32) {
        self.apply(Mat4::from_rotation_y(radians));
    }

    pub fn rotate_z(&mut self, radians: f32) {
        self.apply(Mat4::from_rotation_z(radians));
    }

    pub fn scale(&mut self, scale: Vec3) {
        self.apply(Mat4::from_scale(scale));
    }

    pub fn scale_uniform(&mut self, factor: f32) {
        self.scale(Vec3::splat(factor));
    }

    pub fn translate(&mut self, offset: Vec3) {
        self.position += offset;
    }

    fn apply(&mut self, m: Mat4) {
        self.x_axis = m.transform_vector3(self.x_axis);
        self.y_axis = m.transform_vector3(self.y_axis);
        self.z_axis = m.transform_vector3(self.z_axis);
    }

    /// Local -> world: axes as columns, position as translation
    pub fn world_matrix(&self) -> Mat4 {
        Mat4::from_cols(
            self.x_axis.extend(0.0),
            self.y_axis.extend(0.0),
            self.z_axis.extend(0.0),
            self.position.extend(1.0),
        )
    }

    /// World -> local
    pub fn local_matrix(&self) -> Mat4 {
        self.world_matrix().inverse()
    }

    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.world_matrix().transform_point3(local)
    }

    pub fn to_local(&self, world: Vec3) -> Vec3 {
        self.local_matrix().transform_point3(world)
    }
}

impl Default for Pivot {
    fn default() -> Self {
        Self::base(Vec3::ZERO)
    }
}
