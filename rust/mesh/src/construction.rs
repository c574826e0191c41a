// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Construction and removal of mesh elements.
//!
//! Faces are created through the mesh, which validates the corner loop,
//! creates the boundary edges on demand and maintains the adjacency indices.
//! Removing elements also drops their tag entries.

use nalgebra::{Point3, Vector2};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::arena::*;
use crate::error::{Error, Result};
use crate::keys::*;
use crate::tags::CornerKey;

impl PolyMesh {
    /// Adds a vertex at the given position.
    pub fn add_vertex(&mut self, position: Point3<f64>) -> VertexKey {
        self.vertices.insert(VertexData { position })
    }

    /// Returns the edge between two vertices, creating it if needed.
    pub fn ensure_edge(&mut self, a: VertexKey, b: VertexKey) -> EdgeKey {
        let pair = edge_pair(a, b);
        if let Some(&key) = self.edge_lookup.get(&pair) {
            return key;
        }
        let key = self.edges.insert(EdgeData {
            a,
            b,
            sharp: false,
            seam: false,
        });
        self.edge_lookup.insert(pair, key);
        self.link_vertex_edge(a, key);
        self.link_vertex_edge(b, key);
        key
    }

    /// Creates a face from an ordered vertex loop with zeroed UVs.
    pub fn add_face(&mut self, vertices: &[VertexKey]) -> Result<FaceKey> {
        let uvs = vec![Vector2::zeros(); vertices.len()];
        self.add_face_with_uvs(vertices, &uvs)
    }

    /// Creates a face from an ordered vertex loop and matching corner UVs.
    ///
    /// Fails if the loop has fewer than 3 corners, references a missing
    /// vertex or visits a vertex twice.
    pub fn add_face_with_uvs(
        &mut self,
        vertices: &[VertexKey],
        uvs: &[Vector2<f64>],
    ) -> Result<FaceKey> {
        if vertices.len() < 3 {
            return Err(Error::DegenerateFace);
        }

        let mut seen = FxHashSet::default();
        for &vk in vertices {
            if !self.vertices.contains_key(vk) {
                return Err(Error::VertexNotFound(vk));
            }
            if !seen.insert(vk) {
                return Err(Error::RepeatedVertex(vk));
            }
        }

        let corners: SmallVec<[Corner; 4]> = vertices
            .iter()
            .enumerate()
            .map(|(i, &vk)| Corner::new(vk, uvs.get(i).copied().unwrap_or_else(Vector2::zeros)))
            .collect();

        Ok(self.insert_face(corners, 0, false))
    }

    /// Inserts a face without validation and links its edges.
    pub(crate) fn insert_face(
        &mut self,
        corners: SmallVec<[Corner; 4]>,
        material: u16,
        smooth: bool,
    ) -> FaceKey {
        let key = self.faces.insert(FaceData {
            corners,
            material,
            smooth,
        });
        self.link_face_edges(key);
        key
    }

    /// Creates (if needed) and links the boundary edges of a face.
    pub(crate) fn link_face_edges(&mut self, face: FaceKey) {
        let loop_verts: SmallVec<[VertexKey; 8]> = match self.faces.get(face) {
            Some(f) => f.vertices().collect(),
            None => return,
        };
        let n = loop_verts.len();
        for i in 0..n {
            let a = loop_verts[i];
            let b = loop_verts[(i + 1) % n];
            if a == b {
                continue;
            }
            let ek = self.ensure_edge(a, b);
            self.link_edge_face(ek, face);
        }
    }

    /// Unlinks a face from its boundary edges. Returns the edges it used.
    pub(crate) fn unlink_face_edges(&mut self, face: FaceKey) -> SmallVec<[EdgeKey; 8]> {
        let loop_verts: SmallVec<[VertexKey; 8]> = match self.faces.get(face) {
            Some(f) => f.vertices().collect(),
            None => return SmallVec::new(),
        };
        let n = loop_verts.len();
        let mut used = SmallVec::new();
        for i in 0..n {
            if let Some(ek) = self.find_edge(loop_verts[i], loop_verts[(i + 1) % n]) {
                self.unlink_edge_face(ek, face);
                if !used.contains(&ek) {
                    used.push(ek);
                }
            }
        }
        used
    }

    /// Replaces the corner loop of an existing face, keeping its key and tags.
    pub(crate) fn rewrite_face(&mut self, face: FaceKey, corners: SmallVec<[Corner; 4]>) {
        self.unlink_face_edges(face);
        if let Some(f) = self.faces.get_mut(face) {
            f.corners = corners;
        }
        self.link_face_edges(face);
    }

    /// Removes a face and its tags. Edges and vertices are left in place.
    pub fn remove_face(&mut self, face: FaceKey) -> Result<FaceData> {
        if !self.faces.contains_key(face) {
            return Err(Error::FaceNotFound(face));
        }
        self.unlink_face_edges(face);
        self.tags.drop_face(face);
        self.tags.drop_face_corners(face);
        self.selection.faces.remove(&face);
        self.faces.remove(face).ok_or(Error::FaceNotFound(face))
    }

    /// Removes an edge that no face uses anymore.
    pub(crate) fn remove_edge_raw(&mut self, edge: EdgeKey) -> Option<EdgeData> {
        let data = self.edges.remove(edge)?;
        if self.edge_lookup.get(&edge_pair(data.a, data.b)) == Some(&edge) {
            self.edge_lookup.remove(&edge_pair(data.a, data.b));
        }
        self.unlink_vertex_edge(data.a, edge);
        self.unlink_vertex_edge(data.b, edge);
        self.edge_to_faces.remove(&edge);
        self.tags.drop_edge(edge);
        self.selection.edges.remove(&edge);
        Some(data)
    }

    /// Removes a vertex that no edge uses anymore.
    pub(crate) fn remove_vertex_raw(&mut self, vertex: VertexKey) -> Option<VertexData> {
        let data = self.vertices.remove(vertex)?;
        self.vertex_to_edges.remove(&vertex);
        self.tags.drop_vertex(vertex);
        self.selection.vertices.remove(&vertex);
        Some(data)
    }

    /// Removes faceless edges among `edges` and edgeless vertices among their
    /// endpoints and `vertices`.
    pub(crate) fn remove_loose(
        &mut self,
        edges: impl IntoIterator<Item = EdgeKey>,
        vertices: impl IntoIterator<Item = VertexKey>,
    ) {
        let mut vert_candidates: Vec<VertexKey> = vertices.into_iter().collect();
        for ek in edges {
            if self.edge_faces(ek).is_empty() {
                if let Some(data) = self.remove_edge_raw(ek) {
                    vert_candidates.push(data.a);
                    vert_candidates.push(data.b);
                }
            }
        }
        for vk in vert_candidates {
            if self.vertices.contains_key(vk) && self.vertex_edges(vk).is_empty() {
                self.remove_vertex_raw(vk);
            }
        }
    }

    /// Deletes faces together with the edges and vertices only they used.
    ///
    /// Returns the number of faces deleted. Stale keys are skipped.
    pub fn delete_faces(&mut self, faces: &[FaceKey]) -> usize {
        let mut touched_edges: Vec<EdgeKey> = Vec::new();
        let mut touched_verts: Vec<VertexKey> = Vec::new();
        let mut deleted = 0;

        for &fk in faces {
            let Some(face) = self.faces.get(fk) else {
                continue;
            };
            touched_verts.extend(face.vertices());
            touched_edges.extend(self.face_edges(fk));
            if self.remove_face(fk).is_ok() {
                deleted += 1;
            }
        }

        touched_edges.sort();
        touched_edges.dedup();
        self.remove_loose(touched_edges, touched_verts);
        deleted
    }

    /// Removes every edge without faces and every vertex without edges.
    pub fn delete_loose(&mut self) -> usize {
        let before = self.edges.len() + self.vertices.len();
        let edges: Vec<EdgeKey> = self.edges.keys().collect();
        let verts: Vec<VertexKey> = self.vertices.keys().collect();
        self.remove_loose(edges, verts);
        before - (self.edges.len() + self.vertices.len())
    }

    /// Corner keys of a face, in loop order.
    pub fn face_corner_keys(&self, face: FaceKey) -> Vec<CornerKey> {
        self.faces
            .get(face)
            .map(|f| f.vertices().map(|v| CornerKey::new(face, v)).collect())
            .unwrap_or_default()
    }
}
