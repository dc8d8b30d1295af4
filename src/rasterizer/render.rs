//! Core rendering functions
//! Active-edge scanline polygon fill with a shared depth test

use std::ops::{Add, AddAssign};

use rayon::prelude::*;

use super::camera::Projector;
use super::math::{lerp, perspective_lerp, phi, Vec2, Vec3, Vec4};
use super::shading::{diffuse_intensity, Fragment, Shader};
use super::target::FrameTarget;
use super::types::RasterSettings;
use crate::mesh::{Corner, Mesh, Model, Polygon};

/// Counters for one polygon, or summed over a pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RasterStats {
    pub drawn: usize,
    pub culled: usize,
    pub rejected: usize,
    pub pixels_written: usize,
}

impl Add for RasterStats {
    type Output = RasterStats;

    fn add(self, rhs: RasterStats) -> RasterStats {
        RasterStats {
            drawn: self.drawn + rhs.drawn,
            culled: self.culled + rhs.culled,
            rejected: self.rejected + rhs.rejected,
            pixels_written: self.pixels_written + rhs.pixels_written,
        }
    }
}

impl AddAssign for RasterStats {
    fn add_assign(&mut self, rhs: RasterStats) {
        *self = *self + rhs;
    }
}

impl RasterStats {
    fn culled() -> Self {
        Self { culled: 1, ..Self::default() }
    }

    fn rejected() -> Self {
        Self { rejected: 1, ..Self::default() }
    }
}

/// Everything interpolated across a polygon
#[derive(Debug, Clone, Copy)]
struct FullVertex {
    /// Screen x, screen y, NDC z, 1/w
    screen: Vec4,
    /// Light-facing normal
    normal: Vec3,
    uv: Vec2,
    intensity: f32,
}

impl FullVertex {
    /// Position, depth and intensity are linear in screen space;
    /// normal and uv are weighted by 1/w.
    fn lerp(a: &FullVertex, b: &FullVertex, t: f32) -> FullVertex {
        let (wa, wb) = (a.screen.w, b.screen.w);
        FullVertex {
            screen: a.screen.lerp(b.screen, t),
            normal: perspective_lerp(a.normal, b.normal, wa, wb, t),
            uv: perspective_lerp(a.uv, b.uv, wa, wb, t),
            intensity: lerp(a.intensity, b.intensity, t),
        }
    }
}

/// Edge with its endpoints ordered top to bottom
struct Edge {
    top: FullVertex,
    bottom: FullVertex,
}

impl Edge {
    fn new(a: FullVertex, b: FullVertex) -> Self {
        if a.screen.y <= b.screen.y {
            Self { top: a, bottom: b }
        } else {
            Self { top: b, bottom: a }
        }
    }

    fn is_horizontal(&self) -> bool {
        self.top.screen.y == self.bottom.screen.y
    }

    fn straddles(&self, y: f32) -> bool {
        self.top.screen.y <= y && y <= self.bottom.screen.y
    }

    fn at(&self, y: f32) -> FullVertex {
        let t = phi(self.top.screen.y, self.bottom.screen.y, y);
        FullVertex::lerp(&self.top, &self.bottom, t)
    }
}

/// Face normal from the first three corners: `normalize(cross(v1 - v2, v3 - v2))`.
///
/// For a counter-clockwise front face this points away from the viewer,
/// which is also the light-facing orientation the shaders expect.
pub fn face_normal(v1: Vec3, v2: Vec3, v3: Vec3) -> Vec3 {
    (v1 - v2).cross(v3 - v2).normalize_or_zero()
}

/// Rasterize one polygon into the shared target.
///
/// `screen` holds the projected vertices of the whole model (see
/// [`Projector::project_to_screen`]). Back faces are culled and polygons
/// touching an unrepresentable vertex are dropped; neither is an error.
pub fn rasterize_polygon(
    polygon: &Polygon,
    model: &Model,
    screen: &[Vec4],
    projector: &Projector,
    settings: &RasterSettings,
    target: &FrameTarget,
) -> RasterStats {
    if polygon.is_degenerate() {
        return RasterStats::rejected();
    }

    let world = model.world_vertices();
    let corner_world = |i: usize| world.get(polygon.corners[i].vertex).copied();
    let (Some(v1), Some(v2), Some(v3)) = (corner_world(0), corner_world(1), corner_world(2)) else {
        return RasterStats::rejected();
    };

    // Back-face cull
    let normal = face_normal(v1, v2, v3);
    if normal.dot(v1 - projector.eye) <= 0.0 {
        return RasterStats::culled();
    }

    let light = settings.light();
    let textures = model.textures();
    let shader = Shader::select(
        settings.shading,
        normal,
        light,
        &settings.material,
        textures.has_surface_maps(),
    );

    let mut corners = Vec::with_capacity(polygon.corners.len());
    for corner in &polygon.corners {
        let Some(&projected) = screen.get(corner.vertex) else {
            return RasterStats::rejected();
        };
        if !Projector::is_representable(projected) {
            return RasterStats::rejected();
        }
        // Mesh normals point outward; negate into the light-facing convention
        let corner_normal = corner
            .normal
            .and_then(|n| model.normals().get(n))
            .map(|&n| -n)
            .unwrap_or(normal);
        let uv = corner
            .uv
            .and_then(|t| model.uvs().get(t))
            .copied()
            .unwrap_or(Vec2::ZERO);
        let intensity = if shader.uses_corner_intensity() {
            diffuse_intensity(corner_normal, light)
        } else {
            1.0
        };
        corners.push(FullVertex { screen: projected, normal: corner_normal, uv, intensity });
    }

    let mut edges = Vec::with_capacity(corners.len());
    let (mut min_y, mut max_y) = (f32::INFINITY, f32::NEG_INFINITY);
    for (i, &a) in corners.iter().enumerate() {
        let b = corners[(i + 1) % corners.len()];
        min_y = min_y.min(a.screen.y);
        max_y = max_y.max(a.screen.y);
        let edge = Edge::new(a, b);
        if !edge.is_horizontal() {
            edges.push(edge);
        }
    }

    let width = target.width() as i64;
    let height = target.height() as i64;
    let first_row = (min_y.ceil() as i64).max(0);
    let last_row = (max_y.floor() as i64).min(height - 1);

    let mut stats = RasterStats { drawn: 1, ..RasterStats::default() };
    let material = settings.material;
    let emission_boost = match shader {
        Shader::PhongLighting { .. } | Shader::PhongTextured => material.emission_boost,
        _ => 1.0,
    };

    for row in first_row..=last_row {
        let y = row as f32;

        // Leftmost and rightmost crossings; a shared vertex can touch more than two edges
        let mut left: Option<FullVertex> = None;
        let mut right: Option<FullVertex> = None;
        let mut crossings = 0;
        for edge in edges.iter().filter(|e| e.straddles(y)) {
            let v = edge.at(y);
            crossings += 1;
            if left.map_or(true, |l| v.screen.x < l.screen.x) {
                left = Some(v);
            }
            if right.map_or(true, |r| v.screen.x > r.screen.x) {
                right = Some(v);
            }
        }
        let (Some(left), Some(right)) = (left, right) else {
            continue;
        };
        if crossings < 2 {
            continue;
        }

        let first_col = (left.screen.x.ceil() as i64).max(0);
        let end_col = (right.screen.x.ceil() as i64).min(width);

        for col in first_col..end_col {
            let x = col as f32;
            let t = phi(left.screen.x, right.screen.x, x);
            let p = FullVertex::lerp(&left, &right, t);

            let depth = p.screen.z;
            if !(depth > 0.0 && depth < 1.0) {
                continue;
            }

            let albedo = textures
                .diffuse
                .as_ref()
                .and_then(|tex| tex.sample(p.uv))
                .unwrap_or(settings.base_color);

            let mut frag = Fragment { intensity: p.intensity, ..Fragment::default() };
            if shader.uses_pixel_normal() {
                frag.normal = textures
                    .normal
                    .as_ref()
                    .and_then(|tex| tex.sample_normal(p.uv))
                    .map(|n| -n)
                    .unwrap_or_else(|| p.normal.normalize_or_zero());
            }
            if shader.uses_view() {
                frag.to_eye = -projector.view_direction(x, y);
            }
            if let Some(mrao) = textures.mrao.as_ref().and_then(|tex| tex.sample(p.uv)) {
                frag.mrao = mrao;
            }

            let mut color = shader.shade(albedo, &frag, light);
            if let Some(emission) = textures.emission.as_ref().and_then(|tex| tex.sample(p.uv)) {
                color += emission * emission_boost;
            }
            if !color.is_finite() {
                continue;
            }

            if target.test_and_set(col as usize, row as usize, depth, color) {
                stats.pixels_written += 1;
            }
        }
    }

    stats
}

/// Project every world vertex once, then fill all polygons in parallel
pub fn render_model(
    model: &Model,
    projector: &Projector,
    settings: &RasterSettings,
    target: &FrameTarget,
) -> RasterStats {
    let screen: Vec<Vec4> = model
        .world_vertices()
        .par_iter()
        .map(|&v| projector.project_to_screen(v))
        .collect();

    model
        .polygons()
        .par_iter()
        .map(|polygon| rasterize_polygon(polygon, model, &screen, projector, settings, target))
        .reduce(RasterStats::default, |a, b| a + b)
}

/// Axis-aligned cube centered at the origin, faces counter-clockwise from outside
pub fn create_test_cube(half_size: f32) -> Mesh {
    let h = half_size;
    let positions = vec![
        Vec3::new(-h, -h, -h),
        Vec3::new(h, -h, -h),
        Vec3::new(h, h, -h),
        Vec3::new(-h, h, -h),
        Vec3::new(-h, -h, h),
        Vec3::new(h, -h, h),
        Vec3::new(h, h, h),
        Vec3::new(-h, h, h),
    ];
    let faces: [([usize; 4], Vec3); 6] = [
        ([4, 5, 6, 7], Vec3::Z),
        ([1, 0, 3, 2], Vec3::NEG_Z),
        ([5, 1, 2, 6], Vec3::X),
        ([0, 4, 7, 3], Vec3::NEG_X),
        ([7, 6, 2, 3], Vec3::Y),
        ([0, 1, 5, 4], Vec3::NEG_Y),
    ];

    let mut mesh = Mesh {
        positions,
        uvs: vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ],
        ..Mesh::default()
    };
    for (indices, normal) in faces {
        let n = mesh.normals.len();
        mesh.normals.push(normal);
        mesh.polygons.push(Polygon::new(
            indices
                .iter()
                .enumerate()
                .map(|(k, &v)| Corner::new(v, Some(k), Some(n)))
                .collect(),
        ));
    }
    mesh
}

/// Quad in the XY plane at depth `z`, counter-clockwise when seen from +Z
pub fn create_test_quad(half_size: f32, z: f32) -> Mesh {
    Mesh {
        positions: vec![
            Vec3::new(-half_size, -half_size, z),
            Vec3::new(half_size, -half_size, z),
            Vec3::new(half_size, half_size, z),
            Vec3::new(-half_size, half_size, z),
        ],
        uvs: vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ],
        normals: vec![Vec3::Z],
        polygons: vec![Polygon::new(
            (0..4).map(|i| Corner::new(i, Some(i), Some(0))).collect(),
        )],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{Texture, TextureSet};
    use crate::rasterizer::{Camera, CameraConfig, Color, Pivot, ShadingMode};

    const SIZE: u32 = 64;

    fn projector() -> Projector {
        let config = CameraConfig { distance: 10.0, ..CameraConfig::default() };
        Camera::new(config, SIZE, SIZE).projector()
    }

    fn settings(shading: ShadingMode, light_dir: Vec3) -> RasterSettings {
        RasterSettings { shading, light_dir, ..RasterSettings::default() }
    }

    fn render(mesh: Mesh, textures: TextureSet, settings: &RasterSettings) -> (FrameTarget, RasterStats) {
        let model = Model::new(mesh, Pivot::default()).unwrap().with_textures(textures);
        let target = FrameTarget::new(SIZE as usize, SIZE as usize);
        let stats = render_model(&model, &projector(), settings, &target);
        (target, stats)
    }

    fn covered(target: &FrameTarget) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        for y in 0..target.height() {
            for x in 0..target.width() {
                if !target.is_empty_at(x, y) {
                    out.push((x, y));
                }
            }
        }
        out
    }

    #[test]
    fn test_face_normal_points_away_from_viewer() {
        let n = face_normal(
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
        );
        assert!((n - Vec3::NEG_Z).length() < 1e-6);
    }

    #[test]
    fn test_back_facing_quad_writes_nothing() {
        let mut mesh = create_test_quad(2.0, 0.0);
        mesh.polygons[0].corners.reverse();
        let (target, stats) = render(mesh, TextureSet::default(), &RasterSettings::default());
        assert_eq!(stats.culled, 1);
        assert_eq!(stats.pixels_written, 0);
        assert_eq!(target.covered_pixels(), 0);
    }

    #[test]
    fn test_lambert_is_flat() {
        let light = Vec3::new(1.0, 0.0, -1.0).normalize();
        let (target, stats) = render(
            create_test_quad(2.0, 0.0),
            TextureSet::default(),
            &settings(ShadingMode::Lambert, light),
        );
        // dot(-Z, light) for the quad's light-facing normal
        let expected = std::f32::consts::FRAC_1_SQRT_2;
        let pixels = covered(&target);
        assert!(pixels.len() > 100);
        assert_eq!(stats.pixels_written, pixels.len());
        for (x, y) in pixels {
            let c = target.color_at(x, y);
            assert!((c.r - expected).abs() < 1e-5);
            assert_eq!(c.r, c.g);
            assert_eq!(c.g, c.b);
        }
    }

    #[test]
    fn test_gouraud_gradient() {
        let mut mesh = create_test_quad(2.0, 0.0);
        // bottom corners lit, top corners facing away from the light
        mesh.normals = vec![Vec3::Z, Vec3::NEG_Z];
        for (i, corner) in mesh.polygons[0].corners.iter_mut().enumerate() {
            corner.normal = Some(if i < 2 { 0 } else { 1 });
        }
        let (target, _) = render(
            mesh,
            TextureSet::default(),
            &settings(ShadingMode::Gouraud, Vec3::NEG_Z),
        );

        let column = SIZE as usize / 2;
        let column_values: Vec<f32> = (0..target.height())
            .filter(|&y| !target.is_empty_at(column, y))
            .map(|y| target.color_at(column, y).r)
            .collect();

        assert!(column_values.len() > 20);
        // screen rows grow downwards: dark at the top, bright at the bottom
        assert!(column_values.windows(2).all(|w| w[1] >= w[0]));
        assert!(column_values[0] < 0.2);
        assert!(*column_values.last().unwrap() > 0.8);
        assert!(column_values.iter().any(|&v| v > 0.3 && v < 0.7));
    }

    #[test]
    fn test_unshaded_texture_reproduced() {
        let mut mesh = create_test_quad(2.0, 0.0);
        // split into two triangles
        let quad = mesh.polygons.remove(0);
        let c = &quad.corners;
        mesh.polygons = vec![
            Polygon::new(vec![c[0], c[1], c[2]]),
            Polygon::new(vec![c[0], c[2], c[3]]),
        ];
        let textures = TextureSet {
            diffuse: Some(Texture::solid(2, 2, [200, 100, 50, 255])),
            ..TextureSet::default()
        };
        let (target, stats) = render(mesh, textures, &settings(ShadingMode::None, Vec3::NEG_Z));

        assert_eq!(stats.drawn, 2);
        let expected = Color::from_rgba8(200, 100, 50, 255);
        let pixels = covered(&target);
        assert!(pixels.len() > 100);
        for (x, y) in pixels {
            assert_eq!(target.color_at(x, y), expected);
        }
    }

    #[test]
    fn test_overlapping_polygons_nearest_wins() {
        // 2x1 texture: red on the left, blue on the right
        let texture = Texture::from_raw(&[255, 0, 0, 0, 0, 255], 2, 1, 3).unwrap();
        let red = Color::from_rgba8(255, 0, 0, 255);

        let mut mesh = Mesh {
            uvs: vec![Vec2::new(0.25, 0.5), Vec2::new(0.75, 0.5)],
            ..Mesh::default()
        };
        // many copies of a small near quad and a large far quad, interleaved
        for i in 0..40 {
            let (half, z, uv) = if i % 2 == 0 { (1.0, 1.0, 0) } else { (2.0, -1.0, 1) };
            let base = mesh.positions.len();
            let quad = create_test_quad(half, z);
            mesh.positions.extend(quad.positions);
            mesh.polygons.push(Polygon::new(
                (0..4).map(|k| Corner::new(base + k, Some(uv), None)).collect(),
            ));
        }

        let textures = TextureSet { diffuse: Some(texture), ..TextureSet::default() };
        let (target, _) = render(mesh, textures, &settings(ShadingMode::None, Vec3::NEG_Z));

        let center = SIZE as usize / 2;
        assert_eq!(target.color_at(center, center), red);
        let near_depth = target.depth_at(center, center);
        let pixels = covered(&target);
        let mut near_pixels = 0;
        for (x, y) in pixels {
            let color = target.color_at(x, y);
            if target.depth_at(x, y) <= near_depth + 1e-6 {
                near_pixels += 1;
                assert_eq!(color, red);
            } else {
                assert_eq!(color, Color::from_rgba8(0, 0, 255, 255));
            }
        }
        assert!(near_pixels > 50);
    }

    #[test]
    fn test_polygon_behind_eye_rejected() {
        // floor triangle reaching behind the camera (eye at z = 10)
        let mesh = Mesh {
            positions: vec![
                Vec3::new(1.0, -1.0, 0.0),
                Vec3::new(-1.0, -1.0, 0.0),
                Vec3::new(0.0, -1.0, 30.0),
            ],
            polygons: vec![Polygon::new((0..3).map(|i| Corner::new(i, None, None)).collect())],
            ..Mesh::default()
        };
        let (target, stats) = render(mesh, TextureSet::default(), &RasterSettings::default());
        assert_eq!(stats.rejected, 1);
        assert_eq!(target.covered_pixels(), 0);
    }

    #[test]
    fn test_cube_shows_at_most_three_faces() {
        let (target, stats) = render(
            create_test_cube(2.0),
            TextureSet::default(),
            &RasterSettings::default(),
        );
        // eye on +Z: only the +Z face survives culling
        assert_eq!(stats.culled, 5);
        assert_eq!(stats.drawn, 1);
        assert!(target.covered_pixels() > 100);
    }

    #[test]
    fn test_emission_added_unclamped() {
        let textures = TextureSet {
            emission: Some(Texture::solid(1, 1, [255, 255, 255, 255])),
            ..TextureSet::default()
        };
        let mut phong = settings(ShadingMode::PhongLighting, Vec3::NEG_Z);
        phong.material.emission_boost = 10.0;
        let (target, _) = render(create_test_quad(2.0, 0.0), textures, &phong);
        let c = target.color_at(SIZE as usize / 2, SIZE as usize / 2);
        assert!(c.r > 10.0);
        assert!(c.luma() > 1.0);
    }
}
