// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Spatial index for tolerance-based vertex lookup.
//!
//! Uses a grid-based spatial hash for O(1) average-case neighbour queries.
//! This backs vertex welding, where vertices within a tolerance are merged
//! into one.

use nalgebra::Point3;
use rustc_hash::FxHashMap;

use crate::arena::PolyMesh;
use crate::keys::VertexKey;

/// A spatial hash grid for fast tolerance-based vertex lookup.
///
/// The grid divides 3D space into cubic cells of side `cell_size`. Lookups
/// check the 27 neighbouring cells (3x3x3 neighbourhood) for candidates
/// within tolerance.
#[derive(Debug)]
pub struct SpatialIndex {
    cell_size: f64,
    grid: FxHashMap<(i64, i64, i64), Vec<VertexKey>>,
}

impl SpatialIndex {
    /// Creates a new spatial index with the given cell size.
    ///
    /// `cell_size` should be >= the tolerance used for queries.
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size,
            grid: FxHashMap::default(),
        }
    }

    /// Builds a spatial index from all vertices of a mesh.
    pub fn from_mesh(mesh: &PolyMesh, cell_size: f64) -> Self {
        let mut index = Self::new(cell_size);
        for (key, data) in mesh.vertices.iter() {
            index.insert(key, &data.position);
        }
        index
    }

    /// Builds a spatial index from a subset of the vertices of a mesh.
    pub fn from_vertices(mesh: &PolyMesh, vertices: &[VertexKey], cell_size: f64) -> Self {
        let mut index = Self::new(cell_size);
        for &vk in vertices {
            if let Some(p) = mesh.position(vk) {
                index.insert(vk, &p);
            }
        }
        index
    }

    pub fn insert(&mut self, key: VertexKey, point: &Point3<f64>) {
        let cell = self.cell_coords(point);
        self.grid.entry(cell).or_default().push(key);
    }

    /// Finds all indexed vertices within `tolerance` of `point`.
    pub fn find_all_near(
        &self,
        mesh: &PolyMesh,
        point: &Point3<f64>,
        tolerance: f64,
    ) -> Vec<VertexKey> {
        let (cx, cy, cz) = self.cell_coords(point);
        let tol_sq = tolerance * tolerance;
        let mut result = Vec::new();

        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    if let Some(keys) = self.grid.get(&(cx + dx, cy + dy, cz + dz)) {
                        for &vk in keys {
                            if let Some(p) = mesh.position(vk) {
                                if (p - point).norm_squared() <= tol_sq {
                                    result.push(vk);
                                }
                            }
                        }
                    }
                }
            }
        }

        result.sort();
        result
    }

    fn cell_coords(&self, p: &Point3<f64>) -> (i64, i64, i64) {
        (
            (p.x / self.cell_size).floor() as i64,
            (p.y / self.cell_size).floor() as i64,
            (p.z / self.cell_size).floor() as i64,
        )
    }
}

impl PolyMesh {
    /// Counts vertex pairs closer than `tolerance`.
    pub fn coincident_vertex_count(&self, tolerance: f64) -> usize {
        let index = SpatialIndex::from_mesh(self, tolerance.max(1e-10));
        let mut pairs = 0;
        for (vk, data) in self.vertices.iter() {
            pairs += index
                .find_all_near(self, &data.position, tolerance)
                .into_iter()
                .filter(|other| *other > vk)
                .count();
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_all_near() {
        let mut mesh = PolyMesh::new();
        let v0 = mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
        let v1 = mesh.add_vertex(Point3::new(0.001, 0.0, 0.0));
        mesh.add_vertex(Point3::new(10.0, 10.0, 10.0));

        let index = SpatialIndex::from_mesh(&mesh, 0.01);
        let near = index.find_all_near(&mesh, &Point3::origin(), 0.01);

        assert_eq!(near.len(), 2);
        assert!(near.contains(&v0));
        assert!(near.contains(&v1));
    }

    #[test]
    fn subset_index_ignores_other_vertices() {
        let mut mesh = PolyMesh::new();
        let v0 = mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
        mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));

        let index = SpatialIndex::from_vertices(&mesh, &[v0], 0.01);
        assert_eq!(index.find_all_near(&mesh, &Point3::origin(), 0.01), vec![v0]);
    }

    #[test]
    fn counts_coincident_pairs() {
        let mut mesh = PolyMesh::new();
        mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
        mesh.add_vertex(Point3::new(0.0, 0.0, 0.00001));
        mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
        assert_eq!(mesh.coincident_vertex_count(1e-4), 1);
        assert_eq!(mesh.coincident_vertex_count(1e-6), 0);
    }
}
