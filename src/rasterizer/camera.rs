//! Orbit camera
//!
//! The eye sits on a sphere around `target`: the polar angle spins around the
//! vertical axis, the azimuthal angle tilts above/below the horizon and the
//! radius is the orbit distance. Every effective change bumps `revision()`
//! and is broadcast to subscribers as a [`CameraEvent`].

use std::f32::consts::{FRAC_PI_2, TAU};

use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};

use super::math::{degrees_to_radians, is_finite4, viewport_matrix, Mat4, Vec2, Vec3, Vec4};
use super::pivot::Pivot;
use crate::events::Observers;

/// Keeps the eye from passing over the poles (look-at would flip)
const AZIMUTH_LIMIT: f32 = FRAC_PI_2 - 0.00001;
/// Distance changes smaller than this are treated as no-ops
const DISTANCE_EPSILON: f32 = 0.1;
const MIN_SPEED: f32 = 1.0;
const MAX_SPEED: f32 = 20.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Initial orbit radius
    pub distance: f32,
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Multiplier for zoom and pan steps (clamped to 1..=20)
    pub speed: f32,
    /// Radians of rotation per full viewport-width drag
    pub rotation_sensitivity: f32,
    /// Orbit distances of pan per full viewport-width drag
    pub pan_sensitivity: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            distance: 80.0,
            fov_degrees: 45.0,
            near: 1.0,
            far: 2000.0,
            min_distance: 2.0,
            max_distance: 5000.0,
            speed: 1.0,
            rotation_sensitivity: 1.0,
            pan_sensitivity: 1.0,
        }
    }
}

impl CameraConfig {
    /// Reject values the orbit math cannot work with
    pub fn validate(&self) -> Result<(), String> {
        let finite = [
            ("distance", self.distance),
            ("fov_degrees", self.fov_degrees),
            ("near", self.near),
            ("far", self.far),
            ("min_distance", self.min_distance),
            ("max_distance", self.max_distance),
            ("speed", self.speed),
            ("rotation_sensitivity", self.rotation_sensitivity),
            ("pan_sensitivity", self.pan_sensitivity),
        ];
        if let Some((name, _)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            return Err(format!("camera.{} must be finite", name));
        }
        if self.min_distance > self.max_distance {
            return Err(format!(
                "camera.min_distance ({}) is greater than camera.max_distance ({})",
                self.min_distance, self.max_distance
            ));
        }
        if self.near <= 0.0 || self.near >= self.far {
            return Err(format!("camera.near ({}) must be in (0, far = {})", self.near, self.far));
        }
        if self.fov_degrees <= 0.0 || self.fov_degrees >= 180.0 {
            return Err(format!("camera.fov_degrees ({}) must be in (0, 180)", self.fov_degrees));
        }
        Ok(())
    }

    /// Orbit distance limits, usable even when the config was never validated
    fn distance_limits(&self) -> (f32, f32) {
        let defaults = Self::default();
        let lo = if self.min_distance.is_finite() { self.min_distance } else { defaults.min_distance };
        let hi = if self.max_distance.is_finite() { self.max_distance } else { defaults.max_distance };
        (lo.min(hi), lo.max(hi))
    }

    fn clamp_distance(&self, distance: f32) -> f32 {
        let (lo, hi) = self.distance_limits();
        distance.max(lo).min(hi)
    }
}

/// Snapshot broadcast after every camera change
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraEvent {
    pub polar_angle: f32,
    pub azimuthal_angle: f32,
    pub distance: f32,
    pub speed: f32,
    pub eye: Vec3,
    pub target: Vec3,
}

/// Immutable projection state for one render pass.
///
/// Holds the composed matrices and their inverse so per-pixel unprojection
/// never re-inverts anything.
#[derive(Debug, Clone, Copy)]
pub struct Projector {
    pub view: Mat4,
    pub projection: Mat4,
    pub viewport: Mat4,
    pub eye: Vec3,
    pub width: u32,
    pub height: u32,
    view_projection: Mat4,
    screen_to_world: Mat4,
}

impl Projector {
    pub fn new(view: Mat4, projection: Mat4, viewport: Mat4, eye: Vec3, width: u32, height: u32) -> Self {
        let view_projection = projection * view;
        let screen_to_world = (viewport * view_projection).inverse();
        Self {
            view,
            projection,
            viewport,
            eye,
            width,
            height,
            view_projection,
            screen_to_world,
        }
    }

    /// World point -> (screen x, screen y, NDC z, 1/w).
    ///
    /// Points behind the eye come back with `w <= 0` or non-finite
    /// components; see [`Projector::is_representable`].
    pub fn project_to_screen(&self, world: Vec3) -> Vec4 {
        let clip = self.view_projection * world.extend(1.0);
        let inv_w = 1.0 / clip.w;
        let ndc = clip.truncate() * inv_w;
        let screen = self.viewport * ndc.extend(1.0);
        Vec4::new(screen.x, screen.y, ndc.z, inv_w)
    }

    /// Screen (x, y, NDC z) -> world point
    pub fn project_from_screen(&self, screen: Vec3) -> Vec3 {
        let h = self.screen_to_world * screen.extend(1.0);
        h.truncate() / h.w
    }

    /// Unit direction from the eye through a pixel
    pub fn view_direction(&self, x: f32, y: f32) -> Vec3 {
        (self.project_from_screen(Vec3::new(x, y, 1.0)) - self.eye).normalize_or_zero()
    }

    pub fn is_in_view(&self, world: Vec3) -> bool {
        let clip = self.view_projection * world.extend(1.0);
        if clip.w <= 0.0 {
            return false;
        }
        let ndc = clip.truncate() / clip.w;
        ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0 && ndc.z > 0.0 && ndc.z < 1.0
    }

    /// Whether a projected vertex can take part in rasterization
    pub fn is_representable(screen: Vec4) -> bool {
        screen.w > 0.0 && is_finite4(screen)
    }
}

/// Spherical orbit camera
#[derive(Debug)]
pub struct Camera {
    pub pivot: Pivot,
    polar_angle: f32,
    azimuthal_angle: f32,
    distance: f32,
    target: Vec3,
    speed: f32,
    fov: f32,
    near: f32,
    far: f32,
    viewport_width: u32,
    viewport_height: u32,
    config: CameraConfig,
    revision: u64,
    observers: Observers<CameraEvent>,
}

impl Camera {
    pub fn new(config: CameraConfig, viewport_width: u32, viewport_height: u32) -> Self {
        let distance = config.clamp_distance(config.distance);
        Self {
            pivot: Pivot::base(Vec3::new(0.0, 0.0, distance)),
            polar_angle: 0.0,
            azimuthal_angle: 0.0,
            distance,
            target: Vec3::ZERO,
            speed: clamp_speed(config.speed),
            fov: degrees_to_radians(config.fov_degrees),
            near: config.near,
            far: config.far,
            viewport_width: viewport_width.max(1),
            viewport_height: viewport_height.max(1),
            config,
            revision: 0,
            observers: Observers::new(),
        }
    }

    pub fn subscribe(&mut self) -> Receiver<CameraEvent> {
        self.observers.subscribe()
    }

    /// Incremented on every effective change
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn polar_angle(&self) -> f32 {
        self.polar_angle
    }

    pub fn azimuthal_angle(&self) -> f32 {
        self.azimuthal_angle
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn eye(&self) -> Vec3 {
        self.pivot.position
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = clamp_speed(speed);
    }

    pub fn viewport(&self) -> (u32, u32) {
        (self.viewport_width, self.viewport_height)
    }

    pub fn aspect(&self) -> f32 {
        self.viewport_width as f32 / self.viewport_height as f32
    }

    /// Resize the viewport; zero dimensions are bumped to 1
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        if (width, height) != (self.viewport_width, self.viewport_height) {
            self.viewport_width = width;
            self.viewport_height = height;
            self.changed();
        }
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.target, Vec3::Y)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect(), self.near, self.far)
    }

    pub fn viewport_matrix(&self) -> Mat4 {
        viewport_matrix(self.viewport_width as f32, self.viewport_height as f32, 0.0, 0.0)
    }

    pub fn projector(&self) -> Projector {
        Projector::new(
            self.view(),
            self.projection(),
            self.viewport_matrix(),
            self.eye(),
            self.viewport_width,
            self.viewport_height,
        )
    }

    /// Orbit by a screen-space drag
    pub fn rotate(&mut self, start: Vec2, end: Vec2) {
        let sensitivity = self.config.rotation_sensitivity;
        let d_polar = -(end.x - start.x) / self.viewport_width as f32 * sensitivity;
        let d_azimuth = (end.y - start.y) / self.viewport_height as f32 * sensitivity;

        let polar = wrap_angle(self.polar_angle + d_polar);
        let azimuth = (self.azimuthal_angle + d_azimuth).clamp(-AZIMUTH_LIMIT, AZIMUTH_LIMIT);

        if polar != self.polar_angle || azimuth != self.azimuthal_angle {
            self.polar_angle = polar;
            self.azimuthal_angle = azimuth;
            self.recount_position();
        }
    }

    /// Pan the target along the camera's right/up axes by a screen-space drag
    pub fn move_target(&mut self, start: Vec2, end: Vec2) {
        let dx = (end.x - start.x) / self.viewport_width as f32;
        let dy = (end.y - start.y) / self.viewport_height as f32;
        let scale = self.config.pan_sensitivity * self.speed * self.distance;

        let view = self.view();
        let right = view.row(0).truncate();
        let up = view.row(1).truncate();

        self.set_target(self.target + (up * dy - right * dx) * scale);
    }

    pub fn set_target(&mut self, target: Vec3) {
        if target != self.target && target.is_finite() {
            self.target = target;
            self.recount_position();
        }
    }

    /// Zoom by `speed * delta`; returns whether the distance moved
    pub fn change_distance(&mut self, delta: f32) -> bool {
        self.set_distance(self.distance + self.speed * delta)
    }

    pub fn set_distance(&mut self, distance: f32) -> bool {
        let clamped = self.config.clamp_distance(distance);
        if (clamped - self.distance).abs() > DISTANCE_EPSILON {
            self.distance = clamped;
            self.recount_position();
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.polar_angle = 0.0;
        self.azimuthal_angle = 0.0;
        self.target = Vec3::ZERO;
        self.pivot = Pivot::base(Vec3::new(0.0, 0.0, self.distance));
        self.recount_position();
    }

    pub fn project_to_screen(&self, world: Vec3) -> Vec4 {
        self.projector().project_to_screen(world)
    }

    pub fn project_from_screen(&self, screen: Vec3) -> Vec3 {
        self.projector().project_from_screen(screen)
    }

    pub fn is_in_view(&self, world: Vec3) -> bool {
        self.projector().is_in_view(world)
    }

    pub fn snapshot(&self) -> CameraEvent {
        CameraEvent {
            polar_angle: self.polar_angle,
            azimuthal_angle: self.azimuthal_angle,
            distance: self.distance,
            speed: self.speed,
            eye: self.eye(),
            target: self.target,
        }
    }

    fn recount_position(&mut self) {
        let (pol, az) = (self.polar_angle, self.azimuthal_angle);
        self.pivot.position = Vec3::new(
            az.cos() * pol.sin(),
            az.sin(),
            az.cos() * pol.cos(),
        ) * self.distance
            + self.target;
        self.changed();
    }

    fn changed(&mut self) {
        self.revision += 1;
        let event = self.snapshot();
        self.observers.notify(event);
    }
}

fn clamp_speed(speed: f32) -> f32 {
    if speed.is_nan() {
        MIN_SPEED
    } else {
        speed.clamp(MIN_SPEED, MAX_SPEED)
    }
}

/// Wrap into [0, 2pi)
fn wrap_angle(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        Camera::new(CameraConfig::default(), 800, 600)
    }

    #[test]
    fn test_initial_eye_on_positive_z() {
        let cam = camera();
        assert!((cam.eye() - Vec3::new(0.0, 0.0, 80.0)).length() < 0.0001);
    }

    #[test]
    fn test_horizontal_drag_only_changes_polar() {
        let mut cam = camera();
        cam.rotate(Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0));
        assert!(cam.polar_angle() != 0.0);
        assert_eq!(cam.azimuthal_angle(), 0.0);
    }

    #[test]
    fn test_polar_wraps_into_range() {
        let mut cam = camera();
        for _ in 0..20 {
            cam.rotate(Vec2::ZERO, Vec2::new(800.0, 0.0));
            assert!(cam.polar_angle() >= 0.0 && cam.polar_angle() < TAU);
        }
    }

    #[test]
    fn test_azimuth_clamped_below_pole() {
        let mut cam = camera();
        for _ in 0..10 {
            cam.rotate(Vec2::ZERO, Vec2::new(0.0, 600.0));
        }
        assert!(cam.azimuthal_angle() < FRAC_PI_2);
        assert!(cam.azimuthal_angle() > FRAC_PI_2 - 0.001);
        assert!(cam.view().is_finite());
    }

    #[test]
    fn test_eye_follows_orbit_formula() {
        let mut cam = camera();
        cam.set_target(Vec3::new(1.0, 2.0, 3.0));
        cam.rotate(Vec2::ZERO, Vec2::new(-400.0, 150.0));
        let (pol, az, d) = (cam.polar_angle(), cam.azimuthal_angle(), cam.distance());
        let expected = Vec3::new(az.cos() * pol.sin(), az.sin(), az.cos() * pol.cos()) * d
            + Vec3::new(1.0, 2.0, 3.0);
        assert!((cam.eye() - expected).length() < 0.001);
    }

    #[test]
    fn test_zoom_stops_notifying_at_clamp() {
        let mut cam = camera();
        let rx = cam.subscribe();
        let mut changes = 0;
        for _ in 0..6000 {
            if cam.change_distance(1.0) {
                changes += 1;
            }
        }
        assert_eq!(cam.distance(), 5000.0);
        let events = rx.try_iter().count();
        assert_eq!(events, changes);

        // Further ticks at the limit are silent
        for _ in 0..10 {
            assert!(!cam.change_distance(1.0));
        }
        assert_eq!(rx.try_iter().count(), 0);
    }

    #[test]
    fn test_project_round_trip() {
        let points = [
            Vec3::ZERO,
            Vec3::new(5.0, -3.0, 2.0),
            Vec3::new(-10.0, 7.5, -12.0),
        ];
        for distance in [10.0, 80.0, 300.0] {
            for (dx, dy) in [(0.0, 0.0), (250.0, 80.0), (-600.0, -200.0)] {
                let mut cam = camera();
                cam.set_distance(distance);
                cam.rotate(Vec2::ZERO, Vec2::new(dx, dy));
                let projector = cam.projector();
                for p in points {
                    let s = projector.project_to_screen(p);
                    assert!(Projector::is_representable(s));
                    let back = projector.project_from_screen(s.truncate());
                    let tolerance = 1e-3 * distance;
                    assert!(
                        (back - p).length() < tolerance,
                        "round trip {p:?} -> {back:?} at distance {distance}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_target_projects_to_viewport_center() {
        let cam = camera();
        let s = cam.project_to_screen(Vec3::ZERO);
        assert!((s.x - 400.0).abs() < 0.01);
        assert!((s.y - 300.0).abs() < 0.01);
        assert!(s.z > 0.0 && s.z < 1.0);
        assert!((s.w - 1.0 / 80.0).abs() < 1e-5);
    }

    #[test]
    fn test_up_is_screen_top() {
        let cam = camera();
        let s = cam.project_to_screen(Vec3::new(0.0, 5.0, 0.0));
        assert!(s.y < 300.0);
    }

    #[test]
    fn test_is_in_view() {
        let cam = camera();
        assert!(cam.is_in_view(Vec3::ZERO));
        assert!(!cam.is_in_view(Vec3::new(0.0, 0.0, 200.0)));
        assert!(!cam.is_in_view(Vec3::new(500.0, 0.0, 0.0)));
    }

    #[test]
    fn test_point_behind_eye_not_representable() {
        let cam = camera();
        let s = cam.project_to_screen(Vec3::new(0.0, 0.0, 100.0));
        assert!(!Projector::is_representable(s));
    }

    #[test]
    fn test_move_pans_target_and_keeps_distance() {
        let mut cam = camera();
        cam.move_target(Vec2::new(400.0, 300.0), Vec2::new(480.0, 300.0));
        assert!(cam.target().x < 0.0);
        assert!(cam.target().y.abs() < 1e-4);
        assert!(((cam.eye() - cam.target()).length() - 80.0).abs() < 0.01);
    }

    #[test]
    fn test_reset_restores_base_eye() {
        let mut cam = camera();
        cam.rotate(Vec2::ZERO, Vec2::new(123.0, 45.0));
        cam.set_target(Vec3::new(4.0, 4.0, 4.0));
        cam.reset();
        assert_eq!(cam.polar_angle(), 0.0);
        assert_eq!(cam.azimuthal_angle(), 0.0);
        assert_eq!(cam.target(), Vec3::ZERO);
        assert!((cam.eye() - Vec3::new(0.0, 0.0, 80.0)).length() < 0.0001);
    }

    #[test]
    fn test_zero_viewport_guarded() {
        let mut cam = camera();
        cam.set_viewport(0, 0);
        assert_eq!(cam.viewport(), (1, 1));
        assert!(cam.projection().is_finite());
    }

    #[test]
    fn test_speed_clamped() {
        let mut cam = camera();
        cam.set_speed(100.0);
        assert_eq!(cam.speed(), 20.0);
        cam.set_speed(0.0);
        assert_eq!(cam.speed(), 1.0);
    }

    #[test]
    fn test_inverted_distance_limits_do_not_panic() {
        let config = CameraConfig { min_distance: 100.0, max_distance: 10.0, ..CameraConfig::default() };
        assert!(config.validate().is_err());

        let mut cam = Camera::new(config, 64, 64);
        assert_eq!(cam.distance(), 80.0);
        cam.change_distance(1000.0);
        assert_eq!(cam.distance(), 100.0);
        cam.set_distance(f32::NAN);
        assert_eq!(cam.distance(), 10.0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(CameraConfig::default().validate().is_ok());
        let nan = CameraConfig { max_distance: f32::NAN, ..CameraConfig::default() };
        assert!(nan.validate().unwrap_err().contains("max_distance"));
        let near = CameraConfig { near: 0.0, ..CameraConfig::default() };
        assert!(near.validate().is_err());
        let fov = CameraConfig { fov_degrees: 180.0, ..CameraConfig::default() };
        assert!(fov.validate().is_err());
    }

    #[test]
    fn test_snapshot_carries_speed() {
        let mut cam = camera();
        cam.set_speed(5.0);
        assert_eq!(cam.snapshot().speed, 5.0);
    }
}
