//! Wavefront OBJ reader
//!
//! Only geometry records are read: `v`, `vt`, `vn` and `f`. Everything else
//! (groups, smoothing, materials, comments) is skipped.

use std::fs;
use std::path::Path;

use thiserror::Error;

use super::model::{Corner, Mesh, Polygon};
use crate::rasterizer::{Vec2, Vec3};

#[derive(Debug, Error)]
pub enum ObjError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: invalid number '{token}'")]
    InvalidNumber { line: usize, token: String },
    #[error("line {line}: '{record}' needs at least {expected} values")]
    MissingValue {
        line: usize,
        record: &'static str,
        expected: usize,
    },
    #[error("line {line}: invalid face index '{token}'")]
    InvalidIndex { line: usize, token: String },
}

/// Read and parse an OBJ file
pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<Mesh, ObjError> {
    let contents = fs::read_to_string(path)?;
    parse_obj(&contents)
}

/// Parse OBJ text into a mesh with 0-based indices
pub fn parse_obj(source: &str) -> Result<Mesh, ObjError> {
    let mut mesh = Mesh::default();

    for (i, raw) in source.lines().enumerate() {
        let line = i + 1;
        let mut tokens = raw.split_whitespace();
        let Some(record) = tokens.next() else {
            continue;
        };

        match record {
            "v" => {
                let [x, y, z] = floats::<3>(line, "v", &mut tokens, 3)?;
                mesh.positions.push(Vec3::new(x, y, z));
            }
            "vt" => {
                let [u, v] = floats::<2>(line, "vt", &mut tokens, 1)?;
                mesh.uvs.push(Vec2::new(u, v));
            }
            "vn" => {
                let [x, y, z] = floats::<3>(line, "vn", &mut tokens, 3)?;
                mesh.normals.push(Vec3::new(x, y, z));
            }
            "f" => {
                let corners = tokens
                    .map(|token| parse_corner(line, token))
                    .collect::<Result<Vec<_>, _>>()?;
                mesh.polygons.push(Polygon::new(corners));
            }
            _ => {}
        }
    }

    log::debug!(
        "Parsed OBJ: {} vertices, {} uvs, {} normals, {} faces",
        mesh.positions.len(),
        mesh.uvs.len(),
        mesh.normals.len(),
        mesh.polygons.len()
    );

    Ok(mesh)
}

/// Read up to `N` floats; the first `required` must be present, the rest default to 0
fn floats<'a, const N: usize>(
    line: usize,
    record: &'static str,
    tokens: &mut impl Iterator<Item = &'a str>,
    required: usize,
) -> Result<[f32; N], ObjError> {
    let mut out = [0.0; N];
    for (i, slot) in out.iter_mut().enumerate() {
        match tokens.next() {
            Some(token) => {
                *slot = token.parse().map_err(|_| ObjError::InvalidNumber {
                    line,
                    token: token.to_string(),
                })?;
            }
            None if i < required => {
                return Err(ObjError::MissingValue { line, record, expected: required });
            }
            None => break,
        }
    }
    Ok(out)
}

/// `v`, `v/t`, `v//n` or `v/t/n`, 1-based
fn parse_corner(line: usize, token: &str) -> Result<Corner, ObjError> {
    let invalid = || ObjError::InvalidIndex { line, token: token.to_string() };
    let mut parts = token.split('/');

    let vertex: i64 = parts.next().unwrap_or("").parse().map_err(|_| invalid())?;
    if vertex < 1 {
        return Err(invalid());
    }

    let optional = |part: Option<&str>| -> Result<Option<usize>, ObjError> {
        match part {
            None | Some("") => Ok(None),
            Some(s) => {
                let idx: i64 = s.parse().map_err(|_| invalid())?;
                // zero or negative sub-indices count as absent
                Ok((idx >= 1).then(|| (idx - 1) as usize))
            }
        }
    };

    let uv = optional(parts.next())?;
    let normal = optional(parts.next())?;

    Ok(Corner::new((vertex - 1) as usize, uv, normal))
}
