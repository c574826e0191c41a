// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Affine transformations of mesh vertices.
//!
//! Transforms move vertex positions in place. Faces and edges reference
//! vertices through keys, so they follow automatically. Transforming a whole
//! mesh by a mirroring matrix also flips face winding so normals keep
//! pointing outward.

use nalgebra::{Matrix4, Vector3};

use crate::arena::PolyMesh;
use crate::keys::*;

impl PolyMesh {
    /// Applies a 4x4 affine transformation to every vertex.
    ///
    /// A negative determinant flips every face.
    pub fn transform(&mut self, matrix: &Matrix4<f64>) {
        for v in self.vertices.values_mut() {
            v.position = matrix.transform_point(&v.position);
        }
        if matrix.determinant() < 0.0 {
            let faces: Vec<FaceKey> = self.faces.keys().collect();
            self.flip_faces(&faces);
        }
    }

    /// Applies a 4x4 affine transformation to the given vertices only.
    pub fn transform_vertices(&mut self, vertices: &[VertexKey], matrix: &Matrix4<f64>) {
        for &vk in vertices {
            if let Some(v) = self.vertices.get_mut(vk) {
                v.position = matrix.transform_point(&v.position);
            }
        }
    }

    /// Translates every vertex.
    pub fn translate(&mut self, offset: &Vector3<f64>) {
        for v in self.vertices.values_mut() {
            v.position += offset;
        }
    }

    /// Reverses the winding of the given faces. The edge set is unchanged.
    pub fn flip_faces(&mut self, faces: &[FaceKey]) {
        for &fk in faces {
            if let Some(face) = self.faces.get_mut(fk) {
                face.corners.reverse();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    #[test]
    fn translate_moves_every_vertex() {
        let mut mesh = builders::quad_grid(1, 1, 1.0);
        mesh.translate(&Vector3::new(0.0, 0.0, 5.0));
        for vk in mesh.vertex_keys() {
            assert_relative_eq!(mesh.position(vk).unwrap().z, 5.0);
        }
    }

    #[test]
    fn mirror_transform_keeps_outward_normals() {
        let mut mesh = builders::cube(2.0);
        let mirror = Matrix4::new_nonuniform_scaling(&Vector3::new(-1.0, 1.0, 1.0));
        mesh.transform(&mirror);

        for fk in mesh.face_keys() {
            let c = mesh.face_centroid(fk).unwrap();
            let n = mesh.face_normal(fk).unwrap();
            assert!(n.dot(&c.coords) > 0.0);
        }
    }

    #[test]
    fn transform_selected_vertices() {
        let mut mesh = builders::quad_grid(1, 1, 1.0);
        let first = mesh.vertex_keys().next().unwrap();
        mesh.transform_vertices(&[first], &Matrix4::new_translation(&Vector3::new(0.0, 0.0, 1.0)));
        assert_relative_eq!(mesh.position(first).unwrap(), Point3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn flip_reverses_normal() {
        let mut mesh = builders::quad_grid(1, 1, 1.0);
        let f = mesh.face_keys().next().unwrap();
        mesh.flip_faces(&[f]);
        assert_relative_eq!(mesh.face_normal(f).unwrap(), Vector3::new(0.0, 0.0, -1.0));
    }
}
