// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Element selection state and a scoped guard that restores it.

use std::ops::{Deref, DerefMut};

use rustc_hash::FxHashSet;

use crate::arena::PolyMesh;
use crate::keys::{EdgeKey, FaceKey, VertexKey};

/// Selected elements of a mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub vertices: FxHashSet<VertexKey>,
    pub edges: FxHashSet<EdgeKey>,
    pub faces: FxHashSet<FaceKey>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.edges.is_empty() && self.faces.is_empty()
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.edges.clear();
        self.faces.clear();
    }
}

impl PolyMesh {
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    pub fn deselect_all(&mut self) {
        self.selection.clear();
    }

    /// Replaces the face selection.
    pub fn select_faces(&mut self, faces: impl IntoIterator<Item = FaceKey>) {
        self.selection.faces = faces
            .into_iter()
            .filter(|f| self.faces.contains_key(*f))
            .collect();
    }

    /// Replaces the vertex selection.
    pub fn select_vertices(&mut self, vertices: impl IntoIterator<Item = VertexKey>) {
        self.selection.vertices = vertices
            .into_iter()
            .filter(|v| self.vertices.contains_key(*v))
            .collect();
    }

    /// Selected faces in key order.
    pub fn selected_faces(&self) -> Vec<FaceKey> {
        let mut faces: Vec<FaceKey> = self
            .selection
            .faces
            .iter()
            .copied()
            .filter(|f| self.faces.contains_key(*f))
            .collect();
        faces.sort();
        faces
    }

    /// Selected vertices in key order.
    pub fn selected_vertices(&self) -> Vec<VertexKey> {
        let mut verts: Vec<VertexKey> = self
            .selection
            .vertices
            .iter()
            .copied()
            .filter(|v| self.vertices.contains_key(*v))
            .collect();
        verts.sort();
        verts
    }

    /// Opens a selection scope. The selection in effect now is restored when
    /// the returned guard is dropped; elements removed in the meantime are
    /// left out.
    pub fn selection_scope(&mut self) -> SelectionGuard<'_> {
        let saved = self.selection.clone();
        SelectionGuard { mesh: self, saved }
    }

    /// Drops selection entries for elements that no longer exist.
    pub(crate) fn prune_selection(&mut self) {
        let Self {
            vertices,
            edges,
            faces,
            selection,
            ..
        } = self;
        selection.vertices.retain(|v| vertices.contains_key(*v));
        selection.edges.retain(|e| edges.contains_key(*e));
        selection.faces.retain(|f| faces.contains_key(*f));
    }
}

/// Restores the mesh selection on drop.
pub struct SelectionGuard<'a> {
    mesh: &'a mut PolyMesh,
    saved: Selection,
}

impl Deref for SelectionGuard<'_> {
    type Target = PolyMesh;

    fn deref(&self) -> &PolyMesh {
        self.mesh
    }
}

impl DerefMut for SelectionGuard<'_> {
    fn deref_mut(&mut self) -> &mut PolyMesh {
        self.mesh
    }
}

impl Drop for SelectionGuard<'_> {
    fn drop(&mut self) {
        self.mesh.selection = std::mem::take(&mut self.saved);
        self.mesh.prune_selection();
    }
}

#[cfg(test)]
mod tests {
    use crate::builders;

    #[test]
    fn guard_restores_selection() {
        let mut mesh = builders::quad_grid(2, 1, 1.0);
        let faces: Vec<_> = mesh.face_keys().collect();
        mesh.select_faces([faces[0]]);

        {
            let mut scoped = mesh.selection_scope();
            scoped.select_faces([faces[1]]);
            assert_eq!(scoped.selected_faces(), vec![faces[1]]);
        }

        assert_eq!(mesh.selected_faces(), vec![faces[0]]);
    }

    #[test]
    fn guard_prunes_removed_elements() {
        let mut mesh = builders::quad_grid(2, 1, 1.0);
        let faces: Vec<_> = mesh.face_keys().collect();
        mesh.select_faces(faces.clone());

        {
            let mut scoped = mesh.selection_scope();
            scoped.delete_faces(&faces[..1]);
        }

        assert_eq!(mesh.selected_faces(), vec![faces[1]]);
        assert_eq!(mesh.selection().faces.len(), 1);
    }
}
