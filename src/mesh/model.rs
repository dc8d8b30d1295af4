//! Polygon mesh and the immutable render model built from it

use thiserror::Error;

use super::texture::TextureSet;
use crate::rasterizer::{Mat4, Pivot, Vec2, Vec3, Vec4};

/// One polygon corner; indices are 0-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Corner {
    pub vertex: usize,
    pub uv: Option<usize>,
    pub normal: Option<usize>,
}

impl Corner {
    pub fn new(vertex: usize, uv: Option<usize>, normal: Option<usize>) -> Self {
        Self { vertex, uv, normal }
    }
}

/// Ordered corners; fewer than three is degenerate and never drawn
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polygon {
    pub corners: Vec<Corner>,
}

impl Polygon {
    pub fn new(corners: Vec<Corner>) -> Self {
        Self { corners }
    }

    pub fn is_degenerate(&self) -> bool {
        self.corners.len() < 3
    }
}

/// Raw mesh arrays as produced by a file reader
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub normals: Vec<Vec3>,
    pub polygons: Vec<Polygon>,
}

#[derive(Debug, Error, PartialEq)]
pub enum MeshError {
    #[error("polygon {polygon}: {kind} index {index} out of range ({len} available)")]
    IndexOutOfRange {
        polygon: usize,
        kind: &'static str,
        index: usize,
        len: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelStats {
    pub vertices: usize,
    pub polygons: usize,
    pub triangles: usize,
    pub degenerate: usize,
}

/// Render-ready model.
///
/// World vertices are computed once from the local ones through the pivot;
/// the model never changes afterwards and is shared read-only across render
/// workers.
#[derive(Debug, Clone)]
pub struct Model {
    pub name: String,
    pivot: Pivot,
    local_vertices: Vec<Vec3>,
    world_vertices: Vec<Vec3>,
    normals: Vec<Vec3>,
    uvs: Vec<Vec2>,
    polygons: Vec<Polygon>,
    textures: TextureSet,
}

impl Model {
    /// Validate every corner index and bake world-space geometry
    pub fn new(mesh: Mesh, pivot: Pivot) -> Result<Self, MeshError> {
        for (i, polygon) in mesh.polygons.iter().enumerate() {
            for corner in &polygon.corners {
                check_index(i, "vertex", corner.vertex, mesh.positions.len())?;
                if let Some(uv) = corner.uv {
                    check_index(i, "uv", uv, mesh.uvs.len())?;
                }
                if let Some(n) = corner.normal {
                    check_index(i, "normal", n, mesh.normals.len())?;
                }
            }
        }

        let world = pivot.world_matrix();
        let normal_matrix = normal_matrix(world);
        let world_vertices = mesh.positions.iter().map(|&v| world.transform_point3(v)).collect();
        let normals = mesh
            .normals
            .iter()
            .map(|&n| normal_matrix.transform_vector3(n).normalize_or_zero())
            .collect();

        Ok(Self {
            name: String::new(),
            pivot,
            local_vertices: mesh.positions,
            world_vertices,
            normals,
            uvs: mesh.uvs,
            polygons: mesh.polygons,
            textures: TextureSet::default(),
        })
    }

    pub fn with_textures(mut self, textures: TextureSet) -> Self {
        self.textures = textures;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn pivot(&self) -> &Pivot {
        &self.pivot
    }

    pub fn local_vertices(&self) -> &[Vec3] {
        &self.local_vertices
    }

    pub fn world_vertices(&self) -> &[Vec3] {
        &self.world_vertices
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn uvs(&self) -> &[Vec2] {
        &self.uvs
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    pub fn textures(&self) -> &TextureSet {
        &self.textures
    }

    /// Axis-aligned bounds of the world vertices
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.world_vertices.first()?;
        Some(
            self.world_vertices
                .iter()
                .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
        )
    }

    pub fn stats(&self) -> ModelStats {
        let degenerate = self.polygons.iter().filter(|p| p.is_degenerate()).count();
        let triangles = self
            .polygons
            .iter()
            .filter(|p| !p.is_degenerate())
            .map(|p| p.corners.len() - 2)
            .sum();
        ModelStats {
            vertices: self.world_vertices.len(),
            polygons: self.polygons.len(),
            triangles,
            degenerate,
        }
    }
}

fn check_index(polygon: usize, kind: &'static str, index: usize, len: usize) -> Result<(), MeshError> {
    if index < len {
        Ok(())
    } else {
        Err(MeshError::IndexOutOfRange { polygon, kind, index, len })
    }
}

/// Inverse-transpose of the linear part, so normals survive non-uniform scale
fn normal_matrix(world: Mat4) -> Mat4 {
    let mut linear = world;
    linear.w_axis = Vec4::W;
    linear.inverse().transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_mesh() -> Mesh {
        Mesh {
            positions: vec![
                Vec3::new(-1.0, -1.0, 0.0),
                Vec3::new(1.0, -1.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(-1.0, 1.0, 0.0),
            ],
            uvs: vec![Vec2::ZERO],
            normals: vec![Vec3::new(0.0, 0.0, 2.0)],
            polygons: vec![Polygon::new(
                (0..4).map(|i| Corner::new(i, Some(0), Some(0))).collect(),
            )],
        }
    }

    #[test]
    fn test_world_vertices_baked_through_pivot() {
        let mut pivot = Pivot::base(Vec3::new(0.0, 0.0, -5.0));
        pivot.scale_uniform(2.0);
        let model = Model::new(quad_mesh(), pivot).unwrap();
        assert_eq!(model.local_vertices()[2], Vec3::new(1.0, 1.0, 0.0));
        assert!((model.world_vertices()[2] - Vec3::new(2.0, 2.0, -5.0)).length() < 1e-5);
        // normals normalized and still facing +Z
        assert!((model.normals()[0] - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn test_rotated_pivot_rotates_normals() {
        let mut pivot = Pivot::default();
        pivot.rotate_y(std::f32::consts::FRAC_PI_2);
        let model = Model::new(quad_mesh(), pivot).unwrap();
        assert!((model.normals()[0] - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn test_out_of_range_index_rejected() {
        let mut mesh = quad_mesh();
        mesh.polygons[0].corners[1].normal = Some(3);
        assert_eq!(
            Model::new(mesh, Pivot::default()).unwrap_err(),
            MeshError::IndexOutOfRange { polygon: 0, kind: "normal", index: 3, len: 1 }
        );
    }

    #[test]
    fn test_stats_and_bounds() {
        let mut mesh = quad_mesh();
        mesh.polygons.push(Polygon::new(vec![Corner::new(0, None, None), Corner::new(1, None, None)]));
        let model = Model::new(mesh, Pivot::default()).unwrap();
        let stats = model.stats();
        assert_eq!(stats.polygons, 2);
        assert_eq!(stats.triangles, 2);
        assert_eq!(stats.degenerate, 1);
        let (lo, hi) = model.bounds().unwrap();
        assert_eq!(lo, Vec3::new(-1.0, -1.0, 0.0));
        assert_eq!(hi, Vec3::new(1.0, 1.0, 0.0));
    }
}
