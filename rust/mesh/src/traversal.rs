// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Adjacency queries.

use rustc_hash::FxHashSet;

use crate::arena::PolyMesh;
use crate::keys::*;

impl PolyMesh {
    /// Vertex loop of a face, in winding order.
    pub fn face_vertices(&self, face: FaceKey) -> Vec<VertexKey> {
        self.faces
            .get(face)
            .map(|f| f.vertices().collect())
            .unwrap_or_default()
    }

    /// Boundary edges of a face, in winding order.
    pub fn face_edges(&self, face: FaceKey) -> Vec<EdgeKey> {
        let Some(f) = self.faces.get(face) else {
            return Vec::new();
        };
        let n = f.corners.len();
        (0..n)
            .filter_map(|i| self.find_edge(f.corners[i].vertex, f.corners[(i + 1) % n].vertex))
            .collect()
    }

    /// Faces using an edge. A face is listed once per use.
    pub fn edge_faces(&self, edge: EdgeKey) -> &[FaceKey] {
        self.edge_to_faces
            .get(&edge)
            .map(|l| l.as_slice())
            .unwrap_or(&[])
    }

    /// Edges touching a vertex.
    pub fn vertex_edges(&self, vertex: VertexKey) -> &[EdgeKey] {
        self.vertex_to_edges
            .get(&vertex)
            .map(|l| l.as_slice())
            .unwrap_or(&[])
    }

    /// Distinct faces touching a vertex.
    pub fn vertex_faces(&self, vertex: VertexKey) -> Vec<FaceKey> {
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        for &ek in self.vertex_edges(vertex) {
            for &fk in self.edge_faces(ek) {
                if seen.insert(fk) {
                    out.push(fk);
                }
            }
        }
        out
    }

    /// Endpoints of an edge.
    pub fn edge_vertices(&self, edge: EdgeKey) -> Option<(VertexKey, VertexKey)> {
        self.edges.get(edge).map(|e| (e.a, e.b))
    }

    /// Number of distinct faces using an edge.
    pub fn edge_face_count(&self, edge: EdgeKey) -> usize {
        let faces = self.edge_faces(edge);
        let mut distinct: smallvec::SmallVec<[FaceKey; 4]> = smallvec::SmallVec::new();
        for &f in faces {
            if !distinct.contains(&f) {
                distinct.push(f);
            }
        }
        distinct.len()
    }

    /// Returns `true` if the edge borders exactly one face.
    pub fn is_boundary_edge(&self, edge: EdgeKey) -> bool {
        self.edge_face_count(edge) == 1
    }

    /// Edges that are not shared by exactly two faces: open borders, wire
    /// edges and edges with three or more faces.
    pub fn non_manifold_edges(&self) -> Vec<EdgeKey> {
        self.edges
            .keys()
            .filter(|&ek| self.edge_face_count(ek) != 2)
            .collect()
    }

    /// Faces sharing at least one edge with `face`.
    pub fn face_neighbors(&self, face: FaceKey) -> Vec<FaceKey> {
        let mut out = Vec::new();
        for ek in self.face_edges(face) {
            for &fk in self.edge_faces(ek) {
                if fk != face && !out.contains(&fk) {
                    out.push(fk);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use crate::builders;

    #[test]
    fn grid_adjacency() {
        let mesh = builders::quad_grid(2, 2, 1.0);
        assert_eq!(mesh.face_count(), 4);
        assert_eq!(mesh.vertex_count(), 9);
        assert_eq!(mesh.edge_count(), 12);

        // 8 border edges, 4 interior edges
        assert_eq!(mesh.non_manifold_edges().len(), 8);

        for fk in mesh.face_keys() {
            assert_eq!(mesh.face_edges(fk).len(), 4);
            assert_eq!(mesh.face_neighbors(fk).len(), 2);
        }
    }

    #[test]
    fn center_vertex_touches_all_faces() {
        let mesh = builders::quad_grid(2, 2, 1.0);
        let center = mesh
            .vertex_keys()
            .find(|v| mesh.vertex_edges(*v).len() == 4)
            .unwrap();
        assert_eq!(mesh.vertex_faces(center).len(), 4);
    }

    #[test]
    fn closed_cube_is_manifold() {
        let mesh = builders::cube(1.0);
        assert!(mesh.non_manifold_edges().is_empty());
        for ek in mesh.edge_keys() {
            assert!(!mesh.is_boundary_edge(ek));
        }
    }
}
