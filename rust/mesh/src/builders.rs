// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Primitive mesh builders.

use nalgebra::{Point3, Vector2};
use smallvec::SmallVec;

use crate::arena::{Corner, PolyMesh};
use crate::error::{Error, Result};
use crate::keys::VertexKey;

/// Flat grid of `nx * ny` quads in the XY plane, facing +Z, starting at the
/// origin. UVs span the unit square.
pub fn quad_grid(nx: usize, ny: usize, size: f64) -> PolyMesh {
    let mut mesh = PolyMesh::new();
    let nx = nx.max(1);
    let ny = ny.max(1);

    let mut grid: Vec<VertexKey> = Vec::with_capacity((nx + 1) * (ny + 1));
    for j in 0..=ny {
        for i in 0..=nx {
            grid.push(mesh.add_vertex(Point3::new(i as f64 * size, j as f64 * size, 0.0)));
        }
    }

    let at = |i: usize, j: usize| grid[j * (nx + 1) + i];
    let uv = |i: usize, j: usize| Vector2::new(i as f64 / nx as f64, j as f64 / ny as f64);

    for j in 0..ny {
        for i in 0..nx {
            let corners: SmallVec<[Corner; 4]> = [(i, j), (i + 1, j), (i + 1, j + 1), (i, j + 1)]
                .iter()
                .map(|&(ci, cj)| Corner::new(at(ci, cj), uv(ci, cj)))
                .collect();
            mesh.insert_face(corners, 0, false);
        }
    }
    mesh
}

/// Axis-aligned cube centered at the origin with outward-facing quads.
pub fn cube(size: f64) -> PolyMesh {
    let h = size / 2.0;
    let positions = [
        Point3::new(-h, -h, -h),
        Point3::new(h, -h, -h),
        Point3::new(h, h, -h),
        Point3::new(-h, h, -h),
        Point3::new(-h, -h, h),
        Point3::new(h, -h, h),
        Point3::new(h, h, h),
        Point3::new(-h, h, h),
    ];
    let faces: [[usize; 4]; 6] = [
        [0, 3, 2, 1],
        [4, 5, 6, 7],
        [0, 1, 5, 4],
        [2, 3, 7, 6],
        [0, 4, 7, 3],
        [1, 2, 6, 5],
    ];
    let square = [
        Vector2::new(0.0, 0.0),
        Vector2::new(1.0, 0.0),
        Vector2::new(1.0, 1.0),
        Vector2::new(0.0, 1.0),
    ];

    let mut mesh = PolyMesh::new();
    let verts: Vec<VertexKey> = positions.iter().map(|p| mesh.add_vertex(*p)).collect();
    for face in faces {
        let corners: SmallVec<[Corner; 4]> = face
            .iter()
            .zip(square)
            .map(|(&i, uv)| Corner::new(verts[i], uv))
            .collect();
        mesh.insert_face(corners, 0, false);
    }
    mesh
}

/// Builds a mesh from indexed polygons.
pub fn from_polygons(positions: &[Point3<f64>], faces: &[Vec<usize>]) -> Result<PolyMesh> {
    let mut mesh = PolyMesh::new();
    let verts: Vec<VertexKey> = positions.iter().map(|p| mesh.add_vertex(*p)).collect();
    for face in faces {
        let loop_verts = face
            .iter()
            .map(|&i| {
                verts.get(i).copied().ok_or(Error::IndexOutOfRange {
                    domain: "vertex",
                    index: i,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        mesh.add_face(&loop_verts)?;
    }
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_counts() {
        let mesh = quad_grid(3, 2, 0.5);
        assert_eq!(mesh.vertex_count(), 12);
        assert_eq!(mesh.face_count(), 6);
        assert_eq!(mesh.edge_count(), 17);
    }

    #[test]
    fn cube_counts() {
        let mesh = cube(1.0);
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.edge_count(), 12);
        assert_eq!(mesh.face_count(), 6);
    }

    #[test]
    fn polygons_with_bad_index_fail() {
        let positions = [Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
        assert!(from_polygons(&positions, &[vec![0, 1, 5]]).is_err());
    }
}
