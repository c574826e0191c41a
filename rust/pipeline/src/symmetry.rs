// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Partial symmetry expansion.
//!
//! Faces tagged [`MIRROR_X`](gamiflow_mesh::tags::MIRROR_X) are duplicated,
//! mirrored across the object's local YZ plane through its origin, flipped
//! and welded back onto the open edges of the mesh.
//!
//! The mirror frame is the object's world rotation with scale and shear
//! removed, so a rotated or non-uniformly scaled object mirrors the same way
//! it would in the editor.

use gamiflow_mesh::tags::{FaceMirror, MIRROR_X};
use gamiflow_mesh::{DuplicateMap, FaceKey, PolyMesh, VertexKey};
use nalgebra::{Matrix3, Matrix4, Vector2, Vector3};

use crate::scene::{AutoMergeGuard, ToolSettings};

/// Offset applied to mirrored UVs so they leave the 0-1 tile.
pub fn uv_tile_offset() -> Vector2<f64> {
    Vector2::new(1.0, 1.0)
}

fn orthonormal_frame(world: &Matrix4<f64>) -> Option<Matrix3<f64>> {
    let basis: Matrix3<f64> = world.fixed_view::<3, 3>(0, 0).into_owned();
    let x = basis.column(0).into_owned().try_normalize(1e-12)?;
    let y = basis.column(1).into_owned();
    let y = (y - x * x.dot(&y)).try_normalize(1e-12)?;
    let z = x.cross(&y);
    Some(Matrix3::from_columns(&[x, y, z]))
}

/// World-space mirror across the object's local YZ plane through its origin.
pub fn world_mirror_matrix(object_world: &Matrix4<f64>) -> Matrix4<f64> {
    let flip = Matrix4::new_nonuniform_scaling(&Vector3::new(-1.0, 1.0, 1.0));
    let Some(frame) = orthonormal_frame(object_world) else {
        return flip;
    };
    let origin = Vector3::new(object_world[(0, 3)], object_world[(1, 3)], object_world[(2, 3)]);
    let rotation = frame.to_homogeneous();
    Matrix4::new_translation(&origin)
        * rotation
        * flip
        * rotation.transpose()
        * Matrix4::new_translation(&-origin)
}

/// The world mirror expressed in the object's local space.
///
/// Falls back to a plain local X flip when the object transform is singular.
pub fn local_mirror_matrix(object_world: &Matrix4<f64>) -> Matrix4<f64> {
    match object_world.try_inverse() {
        Some(inv) => inv * world_mirror_matrix(object_world) * object_world,
        None => Matrix4::new_nonuniform_scaling(&Vector3::new(-1.0, 1.0, 1.0)),
    }
}

/// Duplicates `faces`, moves the copies by `matrix` and restores their
/// winding when the matrix mirrors.
pub(crate) fn transformed_copy(
    mesh: &mut PolyMesh,
    faces: &[FaceKey],
    matrix: &Matrix4<f64>,
    uv_offset: Option<Vector2<f64>>,
) -> DuplicateMap {
    let dup = mesh.duplicate_faces(faces);
    let new_faces = dup.new_faces();
    mesh.transform_vertices(&dup.new_vertices(), matrix);
    if matrix.determinant() < 0.0 {
        mesh.flip_faces(&new_faces);
    }
    if let Some(offset) = uv_offset {
        mesh.offset_uvs(&new_faces, offset);
    }
    dup
}

/// Welds the vertices of every open or non-manifold edge.
pub(crate) fn weld_open_edges(mesh: &mut PolyMesh, threshold: f64) -> usize {
    let mut seam: Vec<VertexKey> = mesh
        .non_manifold_edges()
        .into_iter()
        .filter_map(|e| mesh.edge_vertices(e))
        .flat_map(|(a, b)| [a, b])
        .collect();
    seam.sort();
    seam.dedup();
    if seam.is_empty() {
        return 0;
    }
    mesh.deselect_all();
    mesh.select_vertices(seam.iter().copied());
    mesh.weld_vertices(&seam, threshold)
}

/// Expands the mirror-tagged faces of `mesh`.
///
/// Returns `false` when nothing is tagged. A mesh without coincident seam
/// vertices ends up with an open seam; that is not an error.
pub fn expand(
    mesh: &mut PolyMesh,
    object_world: &Matrix4<f64>,
    tools: &mut ToolSettings,
    offset_uvs: bool,
    weld_threshold: f64,
) -> bool {
    let Some(layer) = mesh.layer::<FaceMirror>() else {
        return false;
    };
    let mut faces: Vec<FaceKey> = layer
        .iter()
        .filter(|(_, v)| *v == MIRROR_X)
        .map(|(f, _)| f)
        .collect();
    if faces.is_empty() {
        return false;
    }
    faces.sort();

    let _auto_merge = AutoMergeGuard::disable(tools);
    let mut mesh = mesh.selection_scope();
    mesh.deselect_all();
    mesh.select_faces(faces.iter().copied());

    let mirror = local_mirror_matrix(object_world);
    let dup = transformed_copy(
        &mut mesh,
        &faces,
        &mirror,
        offset_uvs.then(uv_tile_offset),
    );

    let mut expanded = faces;
    expanded.extend(dup.new_faces());
    mesh.set_face_mirror(&expanded, false);

    let welded = weld_open_edges(&mut mesh, weld_threshold);
    tracing::debug!(
        faces = dup.faces.len(),
        welded,
        "expanded mirrored faces"
    );
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use gamiflow_mesh::builders;
    use nalgebra::{Point3, Rotation3};

    fn flip_x() -> Matrix4<f64> {
        Matrix4::new_nonuniform_scaling(&Vector3::new(-1.0, 1.0, 1.0))
    }

    #[test]
    fn local_mirror_ignores_rotation_and_scale() {
        let world = Matrix4::new_translation(&Vector3::new(3.0, -1.0, 2.0))
            * Rotation3::from_euler_angles(0.3, 1.1, -0.4).to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&Vector3::new(2.0, 0.5, 3.0));
        assert_relative_eq!(local_mirror_matrix(&world), flip_x(), epsilon = 1e-9);
    }

    #[test]
    fn world_mirror_keeps_origin_fixed() {
        let world = Matrix4::new_translation(&Vector3::new(3.0, 4.0, 5.0))
            * Rotation3::from_euler_angles(0.0, 0.0, std::f64::consts::FRAC_PI_2).to_homogeneous();
        let mirror = world_mirror_matrix(&world);
        let origin = Point3::new(3.0, 4.0, 5.0);
        assert_relative_eq!(mirror.transform_point(&origin), origin, epsilon = 1e-12);
        // local X points along world Y after the rotation
        assert_relative_eq!(
            mirror.transform_point(&Point3::new(3.0, 5.0, 5.0)),
            Point3::new(3.0, 3.0, 5.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn expands_and_welds_seam() {
        let mut mesh = builders::quad_grid(1, 1, 1.0);
        let faces: Vec<FaceKey> = mesh.face_keys().collect();
        mesh.set_face_mirror(&faces, true);
        let mut tools = ToolSettings { auto_merge: true };

        assert!(expand(&mut mesh, &Matrix4::identity(), &mut tools, false, 1e-4));
        assert!(tools.auto_merge);
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.edge_count(), 7);
        assert_eq!(mesh.coincident_vertex_count(1e-9), 0);
        assert!(mesh.layer::<FaceMirror>().map_or(true, |l| l.is_empty()));
        for f in mesh.face_keys() {
            assert!(mesh.face_normal(f).unwrap().z > 0.0);
        }
        // a second expansion finds nothing left to mirror
        assert!(!expand(&mut mesh, &Matrix4::identity(), &mut tools, false, 1e-4));
    }

    #[test]
    fn offsets_mirrored_uvs() {
        let mut mesh = builders::quad_grid(1, 1, 1.0);
        let original: Vec<FaceKey> = mesh.face_keys().collect();
        mesh.set_face_mirror(&original, true);
        let mut tools = ToolSettings::default();
        expand(&mut mesh, &Matrix4::identity(), &mut tools, true, 1e-4);

        let mirrored = mesh.face_keys().find(|f| *f != original[0]).unwrap();
        for c in &mesh.face(mirrored).unwrap().corners {
            assert!(c.uv.x >= 1.0 && c.uv.y >= 1.0);
        }
        for c in &mesh.face(original[0]).unwrap().corners {
            assert!(c.uv.x <= 1.0 && c.uv.y <= 1.0);
        }
    }

    #[test]
    fn untagged_mesh_is_untouched() {
        let mut mesh = builders::cube(1.0);
        let mut tools = ToolSettings::default();
        assert!(!expand(&mut mesh, &Matrix4::identity(), &mut tools, true, 1e-4));
        assert_eq!(mesh.face_count(), 6);
    }
}
