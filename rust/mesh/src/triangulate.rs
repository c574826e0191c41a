// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polygon triangulation.
//!
//! Wrapper around earcutr for concave polygons, with fast paths for
//! triangles, convex quads and small convex polygons.

use nalgebra::{Point2, Point3, Vector3};
use smallvec::SmallVec;

use crate::arena::{Corner, PolyMesh};
use crate::error::{Error, Result};
use crate::geometry::newell_normal;
use crate::keys::FaceKey;
use crate::tags::CornerKey;

/// Check if a polygon is convex (all cross products have same sign)
#[inline]
fn is_convex(points: &[Point2<f64>]) -> bool {
    if points.len() < 3 {
        return false;
    }

    let n = points.len();
    let mut sign = 0i8;

    for i in 0..n {
        let p0 = &points[i];
        let p1 = &points[(i + 1) % n];
        let p2 = &points[(i + 2) % n];

        let cross = (p1.x - p0.x) * (p2.y - p1.y) - (p1.y - p0.y) * (p2.x - p1.x);

        if cross.abs() > 1e-10 {
            let current_sign = if cross > 0.0 { 1i8 } else { -1i8 };
            if sign == 0 {
                sign = current_sign;
            } else if sign != current_sign {
                return false;
            }
        }
    }

    true
}

#[inline]
fn fan_triangulate(n: usize) -> Vec<usize> {
    let mut indices = Vec::with_capacity((n - 2) * 3);
    for i in 1..n - 1 {
        indices.push(0);
        indices.push(i);
        indices.push(i + 1);
    }
    indices
}

/// Triangulates a simple polygon (no holes).
/// Returns triangle indices into the input points.
pub fn triangulate_polygon(points: &[Point2<f64>]) -> Result<Vec<usize>> {
    let n = points.len();

    if n < 3 {
        return Err(Error::Triangulation(
            "need at least 3 points to triangulate".to_string(),
        ));
    }

    if n == 3 {
        return Ok(vec![0, 1, 2]);
    }

    if n <= 8 && is_convex(points) {
        return Ok(fan_triangulate(n));
    }

    let mut vertices = Vec::with_capacity(n * 2);
    for p in points {
        vertices.push(p.x);
        vertices.push(p.y);
    }

    earcutr::earcut(&vertices, &[], 2).map_err(|e| Error::Triangulation(format!("{:?}", e)))
}

/// Projects planar 3D points onto 2D coordinates in the plane of `normal`.
///
/// The basis is right-handed with respect to `normal`, so a loop that winds
/// counter-clockwise around the normal stays counter-clockwise in 2D.
pub fn project_to_2d(points: &[Point3<f64>], normal: &Vector3<f64>) -> Vec<Point2<f64>> {
    let Some(origin) = points.first() else {
        return Vec::new();
    };

    // Least parallel axis for a stable cross product
    let (ax, ay, az) = (normal.x.abs(), normal.y.abs(), normal.z.abs());
    let reference = if ax <= ay && ax <= az {
        Vector3::x()
    } else if ay <= az {
        Vector3::y()
    } else {
        Vector3::z()
    };

    let u_axis = normal.cross(&reference).normalize();
    let v_axis = normal.cross(&u_axis).normalize();

    points
        .iter()
        .map(|p| {
            let d = p - origin;
            Point2::new(d.dot(&u_axis), d.dot(&v_axis))
        })
        .collect()
}

impl PolyMesh {
    /// Splits the given faces (or all faces) into triangles.
    ///
    /// Corner UVs, face tags and corner tags carry over to the triangles.
    /// Degenerate faces are left untouched. Returns the number of faces that
    /// were split.
    pub fn triangulate(&mut self, faces: Option<&[FaceKey]>) -> usize {
        let targets: Vec<FaceKey> = match faces {
            Some(list) => list.to_vec(),
            None => self.faces.keys().collect(),
        };

        let mut split = 0;
        for fk in targets {
            let Some(face) = self.faces.get(fk) else {
                continue;
            };
            if face.corners.len() <= 3 {
                continue;
            }
            let corners: Vec<Corner> = face.corners.to_vec();
            let (material, smooth) = (face.material, face.smooth);

            let Some(points) = self.face_positions(fk) else {
                continue;
            };
            let normal = newell_normal(&points);
            if normal.norm() < 1e-15 {
                continue;
            }
            let normal = normal.normalize();
            let projected = project_to_2d(&points, &normal);
            let Ok(indices) = triangulate_polygon(&projected) else {
                tracing::debug!(face = ?fk, "triangulation failed, face kept");
                continue;
            };
            if indices.len() < 3 {
                continue;
            }

            for tri in indices.chunks_exact(3) {
                let (i, mut j, mut k) = (tri[0], tri[1], tri[2]);
                let n = (points[j] - points[i]).cross(&(points[k] - points[i]));
                if n.dot(&normal) < 0.0 {
                    std::mem::swap(&mut j, &mut k);
                }
                let tri_corners: SmallVec<[Corner; 4]> =
                    [corners[i], corners[j], corners[k]].into_iter().collect();
                let new_face = self.insert_face(tri_corners, material, smooth);
                self.tags.copy_face(fk, new_face);
                for idx in [i, j, k] {
                    let v = corners[idx].vertex;
                    self.tags
                        .copy_corner(CornerKey::new(fk, v), CornerKey::new(new_face, v));
                }
                if self.selection.faces.contains(&fk) {
                    self.selection.faces.insert(new_face);
                }
            }

            if self.remove_face(fk).is_ok() {
                split += 1;
            }
        }
        split
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders;
    use crate::tags::{self, FaceDetail};
    use approx::assert_relative_eq;

    #[test]
    fn triangle_fast_path() {
        let pts = [Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(0.0, 1.0)];
        assert_eq!(triangulate_polygon(&pts).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn concave_polygon_uses_earcut() {
        // L-shape
        let pts = [
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 1.0),
            Point2::new(1.0, 1.0),
            Point2::new(1.0, 2.0),
            Point2::new(0.0, 2.0),
        ];
        let indices = triangulate_polygon(&pts).unwrap();
        assert_eq!(indices.len(), 12);
    }

    #[test]
    fn projection_keeps_winding() {
        let pts = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let flat = project_to_2d(&pts, &Vector3::z());
        let area = (flat[1].x - flat[0].x) * (flat[2].y - flat[0].y)
            - (flat[1].y - flat[0].y) * (flat[2].x - flat[0].x);
        assert!(area > 0.0);
    }

    #[test]
    fn cube_triangulates_to_twelve_faces() {
        let mut mesh = builders::cube(2.0);
        let area = mesh.surface_area();
        let first = mesh.face_keys().next().unwrap();
        mesh.set_tag::<FaceDetail>(first, tags::LOD0);

        assert_eq!(mesh.triangulate(None), 6);
        assert_eq!(mesh.face_count(), 12);
        assert_eq!(mesh.edge_count(), 18);
        assert_relative_eq!(mesh.surface_area(), area, epsilon = 1e-9);
        assert!(mesh.non_manifold_edges().is_empty());

        // tags follow the split
        assert_eq!(mesh.layer::<FaceDetail>().unwrap().len(), 2);

        for fk in mesh.face_keys() {
            let c = mesh.face_centroid(fk).unwrap();
            assert!(mesh.face_normal(fk).unwrap().dot(&c.coords) > 0.0);
        }
    }
}
