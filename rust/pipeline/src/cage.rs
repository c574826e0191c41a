// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cage inflation for baking.
//!
//! Every vertex moves along a blend of its smooth normal and the normals of
//! its faces. The per-corner hardness picks the blend (0 smooth, 1 face
//! normal) and the per-vertex weight pins the vertex (1 stays in place).

use gamiflow_mesh::tags::{CornerCageHardness, VertexCageWeight};
use gamiflow_mesh::{CornerKey, PolyMesh, VertexKey};
use nalgebra::{Point3, Vector3};

use crate::config::Settings;
use crate::scene::ObjectProps;

/// Inflation distance for an object: its own offset, or the scene default
/// when that is 0.
pub fn cage_offset(props: &ObjectProps, settings: &Settings) -> f64 {
    if props.cage_offset == 0.0 {
        settings.cage_offset
    } else {
        props.cage_offset
    }
}

fn displacement_direction(mesh: &PolyMesh, vertex: VertexKey) -> Option<Vector3<f64>> {
    let smooth = mesh.vertex_normal(vertex)?;
    let mut sum = Vector3::zeros();
    for face in mesh.vertex_faces(vertex) {
        let Some(flat) = mesh.face_normal(face) else {
            continue;
        };
        let hardness = mesh
            .tag::<CornerCageHardness>(CornerKey::new(face, vertex))
            .clamp(0.0, 1.0) as f64;
        sum += smooth.lerp(&flat, hardness);
    }
    Some(sum.try_normalize(1e-12).unwrap_or(smooth))
}

/// Inflates the mesh by `offset`. Returns the number of vertices moved.
pub fn inflate(mesh: &mut PolyMesh, offset: f64) -> usize {
    let moves: Vec<(VertexKey, Point3<f64>)> = mesh
        .vertex_keys()
        .filter_map(|v| {
            let weight = mesh.tag::<VertexCageWeight>(v).clamp(0.0, 1.0) as f64;
            let distance = offset * (1.0 - weight);
            if distance == 0.0 {
                return None;
            }
            let direction = displacement_direction(mesh, v)?;
            let position = mesh.position(v)?;
            Some((v, position + direction * distance))
        })
        .collect();

    for (v, p) in &moves {
        mesh.set_position(*v, *p);
    }
    moves.len()
}
