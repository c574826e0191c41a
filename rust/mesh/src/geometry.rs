// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometric queries on mesh elements.
//!
//! Normals, areas, centroids and bounds computed with standard polygon
//! formulas. Degenerate input yields `None` rather than NaN.

use nalgebra::{Point3, Vector3};

use crate::arena::PolyMesh;
use crate::keys::*;

/// Newell normal of a closed polygon, unnormalized. Its length is twice the
/// polygon area.
pub fn newell_normal(points: &[Point3<f64>]) -> Vector3<f64> {
    let mut normal = Vector3::zeros();
    let n = points.len();
    for i in 0..n {
        let curr = &points[i];
        let next = &points[(i + 1) % n];
        normal.x += (curr.y - next.y) * (curr.z + next.z);
        normal.y += (curr.z - next.z) * (curr.x + next.x);
        normal.z += (curr.x - next.x) * (curr.y + next.y);
    }
    normal
}

impl PolyMesh {
    /// Corner positions of a face, in winding order.
    pub fn face_positions(&self, face: FaceKey) -> Option<Vec<Point3<f64>>> {
        let f = self.faces.get(face)?;
        f.vertices().map(|v| self.position(v)).collect()
    }

    /// Computes the face normal using Newell's method.
    ///
    /// Works for any planar polygon (convex or concave). The direction
    /// follows the right-hand rule on the corner order.
    pub fn face_normal(&self, face: FaceKey) -> Option<Vector3<f64>> {
        let points = self.face_positions(face)?;
        if points.len() < 3 {
            return None;
        }
        let normal = newell_normal(&points);
        let len = normal.norm();
        if len < 1e-15 {
            return None;
        }
        Some(normal / len)
    }

    /// Area of a face.
    pub fn face_area(&self, face: FaceKey) -> Option<f64> {
        let points = self.face_positions(face)?;
        if points.len() < 3 {
            return Some(0.0);
        }
        Some(newell_normal(&points).norm() / 2.0)
    }

    /// Average of the corner positions of a face.
    pub fn face_centroid(&self, face: FaceKey) -> Option<Point3<f64>> {
        let points = self.face_positions(face)?;
        if points.is_empty() {
            return None;
        }
        let sum: Vector3<f64> = points.iter().map(|p| p.coords).sum();
        Some(Point3::from(sum / points.len() as f64))
    }

    /// Smooth vertex normal: area-weighted sum of the adjacent face normals.
    pub fn vertex_normal(&self, vertex: VertexKey) -> Option<Vector3<f64>> {
        let mut sum = Vector3::zeros();
        for fk in self.vertex_faces(vertex) {
            if let Some(points) = self.face_positions(fk) {
                sum += newell_normal(&points);
            }
        }
        let len = sum.norm();
        if len < 1e-15 {
            return None;
        }
        Some(sum / len)
    }

    pub fn edge_length(&self, edge: EdgeKey) -> Option<f64> {
        let (a, b) = self.edge_vertices(edge)?;
        Some((self.position(b)? - self.position(a)?).norm())
    }

    /// Axis-aligned bounds as `(min, max)`, or `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let mut iter = self.vertices.values().map(|v| v.position);
        let first = iter.next()?;
        let (mut min, mut max) = (first, first);
        for p in iter {
            min = min.inf(&p);
            max = max.sup(&p);
        }
        Some((min, max))
    }

    /// Sum of all face areas.
    pub fn surface_area(&self) -> f64 {
        self.faces
            .keys()
            .filter_map(|f| self.face_area(f))
            .sum()
    }
}
