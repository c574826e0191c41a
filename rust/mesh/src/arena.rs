// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Arena-based storage for polygon meshes.
//!
//! The [`PolyMesh`] owns every vertex, edge and face in slot maps with stable,
//! generational keys. Upward adjacency indices (vertex → edges, edge → faces)
//! are kept in sync by every construction and editing operation so that
//! topology operators can walk the mesh in both directions.
//!
//! Faces are ordered loops of [`Corner`]s. A corner references a vertex and
//! carries the per-corner UV. Edges are created implicitly by faces and are
//! shared between neighbouring faces.

use nalgebra::{Point3, Vector2};
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::keys::*;
use crate::selection::Selection;
use crate::tags::TagStore;

/// Data stored for a vertex.
#[derive(Debug, Clone)]
pub struct VertexData {
    pub position: Point3<f64>,
}

/// Data stored for an edge: an undirected segment between two vertices.
#[derive(Debug, Clone)]
pub struct EdgeData {
    pub a: VertexKey,
    pub b: VertexKey,
    /// Hard (sharp) edge flag used for split normals.
    pub sharp: bool,
    /// UV seam flag.
    pub seam: bool,
}

impl EdgeData {
    /// Returns the vertex on the other side of `v`, or `None` if `v` is not
    /// an endpoint of this edge.
    pub fn other(&self, v: VertexKey) -> Option<VertexKey> {
        if self.a == v {
            Some(self.b)
        } else if self.b == v {
            Some(self.a)
        } else {
            None
        }
    }
}

/// One corner of a face loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corner {
    pub vertex: VertexKey,
    pub uv: Vector2<f64>,
}

impl Corner {
    pub fn new(vertex: VertexKey, uv: Vector2<f64>) -> Self {
        Self { vertex, uv }
    }
}

/// Data stored for a face.
#[derive(Debug, Clone)]
pub struct FaceData {
    pub corners: SmallVec<[Corner; 4]>,
    /// Index into the owner's material slot list.
    pub material: u16,
    pub smooth: bool,
}

impl FaceData {
    /// Iterates the vertex keys of the face loop in order.
    pub fn vertices(&self) -> impl Iterator<Item = VertexKey> + '_ {
        self.corners.iter().map(|c| c.vertex)
    }

    /// Number of corners in the face loop.
    pub fn len(&self) -> usize {
        self.corners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corners.is_empty()
    }
}

/// The polygon mesh arena.
///
/// # Example
///
/// ```
/// use gamiflow_mesh::PolyMesh;
/// use nalgebra::Point3;
///
/// let mut mesh = PolyMesh::new();
/// let v0 = mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
/// let v1 = mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
/// let v2 = mesh.add_vertex(Point3::new(1.0, 1.0, 0.0));
/// mesh.add_face(&[v0, v1, v2]).unwrap();
///
/// assert_eq!(mesh.vertex_count(), 3);
/// assert_eq!(mesh.edge_count(), 3);
/// assert_eq!(mesh.face_count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PolyMesh {
    pub(crate) vertices: SlotMap<VertexKey, VertexData>,
    pub(crate) edges: SlotMap<EdgeKey, EdgeData>,
    pub(crate) faces: SlotMap<FaceKey, FaceData>,

    // Edge lookup by sorted endpoint pair
    pub(crate) edge_lookup: FxHashMap<(VertexKey, VertexKey), EdgeKey>,

    // Upward adjacency: child → parents
    pub(crate) vertex_to_edges: FxHashMap<VertexKey, SmallVec<[EdgeKey; 4]>>,
    pub(crate) edge_to_faces: FxHashMap<EdgeKey, SmallVec<[FaceKey; 2]>>,

    pub(crate) tags: TagStore,
    pub(crate) selection: Selection,
}

/// Returns the canonical (sorted) endpoint pair used for edge lookup.
#[inline]
pub(crate) fn edge_pair(a: VertexKey, b: VertexKey) -> (VertexKey, VertexKey) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl PolyMesh {
    /// Creates a new, empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    // --- Vertex access ---

    /// Returns the vertex data for the given key, or `None` if not found.
    pub fn vertex(&self, key: VertexKey) -> Option<&VertexData> {
        self.vertices.get(key)
    }

    /// Returns the position of a vertex.
    pub fn position(&self, key: VertexKey) -> Option<Point3<f64>> {
        self.vertices.get(key).map(|v| v.position)
    }

    /// Moves a vertex. Returns `false` when the key is stale.
    pub fn set_position(&mut self, key: VertexKey, position: Point3<f64>) -> bool {
        match self.vertices.get_mut(key) {
            Some(v) => {
                v.position = position;
                true
            }
            None => false,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn vertex_keys(&self) -> impl Iterator<Item = VertexKey> + '_ {
        self.vertices.keys()
    }

    // --- Edge access ---

    pub fn edge(&self, key: EdgeKey) -> Option<&EdgeData> {
        self.edges.get(key)
    }

    pub fn edge_mut(&mut self, key: EdgeKey) -> Option<&mut EdgeData> {
        self.edges.get_mut(key)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge_keys(&self) -> impl Iterator<Item = EdgeKey> + '_ {
        self.edges.keys()
    }

    /// Finds the edge joining two vertices, in either direction.
    pub fn find_edge(&self, a: VertexKey, b: VertexKey) -> Option<EdgeKey> {
        self.edge_lookup.get(&edge_pair(a, b)).copied()
    }

    // --- Face access ---

    pub fn face(&self, key: FaceKey) -> Option<&FaceData> {
        self.faces.get(key)
    }

    pub fn face_mut(&mut self, key: FaceKey) -> Option<&mut FaceData> {
        self.faces.get_mut(key)
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn face_keys(&self) -> impl Iterator<Item = FaceKey> + '_ {
        self.faces.keys()
    }

    /// Returns `true` if the mesh has no vertices.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Returns `true` if the given key references a live element.
    pub fn contains(&self, key: ElementKey) -> bool {
        match key {
            ElementKey::Vertex(k) => self.vertices.contains_key(k),
            ElementKey::Edge(k) => self.edges.contains_key(k),
            ElementKey::Face(k) => self.faces.contains_key(k),
        }
    }

    /// Sets the material slot index of every face.
    pub fn set_all_materials(&mut self, material: u16) {
        for face in self.faces.values_mut() {
            face.material = material;
        }
    }

    /// Sets the smooth shading flag of every face.
    pub fn set_all_smooth(&mut self, smooth: bool) {
        for face in self.faces.values_mut() {
            face.smooth = smooth;
        }
    }

    /// Clears the sharp flag on every edge. Returns how many were cleared.
    pub fn clear_sharp_edges(&mut self) -> usize {
        let mut cleared = 0;
        for edge in self.edges.values_mut() {
            if edge.sharp {
                edge.sharp = false;
                cleared += 1;
            }
        }
        cleared
    }

    /// Offsets the UV of every corner of the given faces.
    pub fn offset_uvs(&mut self, faces: &[FaceKey], offset: Vector2<f64>) {
        for &fk in faces {
            if let Some(face) = self.faces.get_mut(fk) {
                for corner in face.corners.iter_mut() {
                    corner.uv += offset;
                }
            }
        }
    }

    // --- Adjacency index helpers ---

    pub(crate) fn link_vertex_edge(&mut self, vertex: VertexKey, edge: EdgeKey) {
        let list = self.vertex_to_edges.entry(vertex).or_default();
        if !list.contains(&edge) {
            list.push(edge);
        }
    }

    pub(crate) fn unlink_vertex_edge(&mut self, vertex: VertexKey, edge: EdgeKey) {
        if let Some(list) = self.vertex_to_edges.get_mut(&vertex) {
            list.retain(|e| *e != edge);
            if list.is_empty() {
                self.vertex_to_edges.remove(&vertex);
            }
        }
    }

    /// Registers one use of `edge` by `face`. A face that uses an edge twice
    /// (a spur) is listed twice.
    pub(crate) fn link_edge_face(&mut self, edge: EdgeKey, face: FaceKey) {
        self.edge_to_faces.entry(edge).or_default().push(face);
    }

    /// Removes every use of `edge` by `face`.
    pub(crate) fn unlink_edge_face(&mut self, edge: EdgeKey, face: FaceKey) {
        if let Some(list) = self.edge_to_faces.get_mut(&edge) {
            list.retain(|f| *f != face);
            if list.is_empty() {
                self.edge_to_faces.remove(&edge);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_mesh_is_empty() {
        let mesh = PolyMesh::new();
        assert_eq!(mesh.vertex_count(), 0);
        assert_eq!(mesh.edge_count(), 0);
        assert_eq!(mesh.face_count(), 0);
        assert!(mesh.is_empty());
    }

    #[test]
    fn add_and_move_vertex() {
        let mut mesh = PolyMesh::new();
        let key = mesh.add_vertex(Point3::new(1.0, 2.0, 3.0));
        assert_eq!(mesh.position(key), Some(Point3::new(1.0, 2.0, 3.0)));

        assert!(mesh.set_position(key, Point3::new(0.0, 0.0, 1.0)));
        assert_eq!(mesh.position(key), Some(Point3::new(0.0, 0.0, 1.0)));
        assert!(mesh.contains(ElementKey::Vertex(key)));
    }

    #[test]
    fn edge_other_endpoint() {
        let mut mesh = PolyMesh::new();
        let v0 = mesh.add_vertex(Point3::origin());
        let v1 = mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
        let v2 = mesh.add_vertex(Point3::new(0.0, 1.0, 0.0));
        let e = mesh.ensure_edge(v0, v1);
        let edge = mesh.edge(e).unwrap();
        assert_eq!(edge.other(v0), Some(v1));
        assert_eq!(edge.other(v1), Some(v0));
        assert_eq!(edge.other(v2), None);
        assert_eq!(mesh.find_edge(v1, v0), Some(e));
    }

    #[test]
    fn clone_keeps_keys() {
        let mut mesh = PolyMesh::new();
        let v = mesh.add_vertex(Point3::new(4.0, 0.0, 0.0));
        let copy = mesh.clone();
        assert_eq!(copy.position(v), Some(Point3::new(4.0, 0.0, 0.0)));
    }
}
