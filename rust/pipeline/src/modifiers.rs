// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Procedural modifier stacks and their application onto mesh data.

use gamiflow_mesh::FaceKey;
use nalgebra::{Matrix4, Vector2, Vector3};

use crate::error::Result;
use crate::scene::{ObjectKey, Scene};
use crate::symmetry::{transformed_copy, weld_open_edges};

#[derive(Debug, Clone, PartialEq)]
pub enum ModifierKind {
    Triangulate,
    /// Mirrors across the local YZ plane, or across the YZ plane of
    /// `mirror_object` when set.
    Mirror {
        mirror_object: Option<ObjectKey>,
        merge: bool,
        merge_threshold: f64,
        offset_u: f64,
        offset_v: f64,
    },
    /// `count` copies, each shifted by `constant_offset` from the previous.
    Array {
        count: u32,
        constant_offset: Vector3<f64>,
        offset_u: f64,
        offset_v: f64,
    },
    WeightedNormal,
    Bevel {
        width: f64,
        segments: u32,
    },
    /// Deformation by a skeleton. Never applied by the pipeline.
    Armature {
        object: Option<ObjectKey>,
    },
    Other(String),
}

impl ModifierKind {
    /// Object referenced by the modifier, if any.
    pub fn object(&self) -> Option<ObjectKey> {
        match self {
            ModifierKind::Mirror { mirror_object, .. } => *mirror_object,
            ModifierKind::Armature { object } => *object,
            _ => None,
        }
    }

    pub fn set_object(&mut self, target: ObjectKey) {
        match self {
            ModifierKind::Mirror { mirror_object, .. } => *mirror_object = Some(target),
            ModifierKind::Armature { object } => *object = Some(target),
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Modifier {
    pub name: String,
    pub kind: ModifierKind,
    /// Disabled for render; dropped by the bake and export sets.
    pub show_render: bool,
}

impl Modifier {
    pub fn new(name: impl Into<String>, kind: ModifierKind) -> Self {
        Self {
            name: name.into(),
            kind,
            show_render: true,
        }
    }

    pub fn triangulate() -> Self {
        Self::new("Triangulate (GFlow)", ModifierKind::Triangulate)
    }
}

/// Removes modifiers hidden from render.
pub fn remove_hidden_modifiers(scene: &mut Scene, object: ObjectKey) -> usize {
    let Some(obj) = scene.object_mut(object) else {
        return 0;
    };
    let before = obj.modifiers.len();
    obj.modifiers.retain(|m| m.show_render);
    before - obj.modifiers.len()
}

/// Appends a triangulate modifier unless the stack already has one.
pub fn ensure_triangulate(scene: &mut Scene, object: ObjectKey) {
    let Some(obj) = scene.object_mut(object) else {
        return;
    };
    if !obj.kind.is_mesh() {
        return;
    }
    if !obj
        .modifiers
        .iter()
        .any(|m| m.kind == ModifierKind::Triangulate)
    {
        obj.modifiers.push(Modifier::triangulate());
    }
}

/// Moves mirror and array UV copies one tile away from the original.
pub fn offset_copy_uvs(scene: &mut Scene, object: ObjectKey) {
    let Some(obj) = scene.object_mut(object) else {
        return;
    };
    for m in obj.modifiers.iter_mut() {
        match &mut m.kind {
            ModifierKind::Mirror {
                offset_u, offset_v, ..
            }
            | ModifierKind::Array {
                offset_u, offset_v, ..
            } => {
                *offset_u = 1.0;
                *offset_v = 1.0;
            }
            _ => {}
        }
    }
}

/// Applies every modifier of the stack except armatures onto the object's
/// mesh data, which is made single-user first. Returns the number applied.
pub fn apply_modifier_stack(scene: &mut Scene, object: ObjectKey) -> Result<usize> {
    let Some(obj) = scene.object(object) else {
        return Ok(0);
    };
    if !obj.kind.is_mesh() {
        return Ok(0);
    }
    let (kept, applied): (Vec<Modifier>, Vec<Modifier>) = obj
        .modifiers
        .iter()
        .cloned()
        .partition(|m| matches!(m.kind, ModifierKind::Armature { .. }));
    if applied.is_empty() {
        return Ok(0);
    }

    let object_world = scene.world_matrix(object);
    // Mirror frames are resolved before the mesh is borrowed.
    let mirror_frames: Vec<Option<Matrix4<f64>>> = applied
        .iter()
        .map(|m| match m.kind {
            ModifierKind::Mirror {
                mirror_object: Some(target),
                ..
            } if scene.contains_object(target) => Some(scene.world_matrix(target)),
            _ => None,
        })
        .collect();

    scene.make_single_user(object);
    let name = scene.object_name(object).to_string();
    let Some(data) = scene.object_mesh_mut(object) else {
        return Ok(0);
    };
    let mesh = &mut data.mesh;

    for (modifier, frame) in applied.iter().zip(mirror_frames) {
        match &modifier.kind {
            ModifierKind::Triangulate => {
                mesh.triangulate(None);
            }
            ModifierKind::Mirror {
                merge,
                merge_threshold,
                offset_u,
                offset_v,
                ..
            } => {
                let flip = Matrix4::new_nonuniform_scaling(&Vector3::new(-1.0, 1.0, 1.0));
                let matrix = match frame.and_then(|f| {
                    let inv_f = f.try_inverse()?;
                    let inv_o = object_world.try_inverse()?;
                    Some(inv_o * f * flip * inv_f * object_world)
                }) {
                    Some(m) => m,
                    None => flip,
                };
                let faces: Vec<FaceKey> = mesh.face_keys().collect();
                let uv = Vector2::new(*offset_u, *offset_v);
                let offset = (uv != Vector2::zeros()).then_some(uv);
                transformed_copy(mesh, &faces, &matrix, offset);
                if *merge {
                    weld_open_edges(mesh, *merge_threshold);
                }
            }
            ModifierKind::Array {
                count,
                constant_offset,
                offset_u,
                offset_v,
            } => {
                let faces: Vec<FaceKey> = mesh.face_keys().collect();
                for i in 1..*count {
                    let step = i as f64;
                    let matrix = Matrix4::new_translation(&(constant_offset * step));
                    let uv = Vector2::new(offset_u * step, offset_v * step);
                    let offset = (uv != Vector2::zeros()).then_some(uv);
                    transformed_copy(mesh, &faces, &matrix, offset);
                }
            }
            ModifierKind::WeightedNormal => mesh.set_all_smooth(true),
            ModifierKind::Bevel { .. } | ModifierKind::Other(_) => {
                tracing::debug!(
                    object = %name,
                    modifier = %modifier.name,
                    "modifier has no geometric evaluation, dropped"
                );
            }
            ModifierKind::Armature { .. } => {}
        }
    }

    if let Some(obj) = scene.object_mut(object) {
        obj.modifiers = kept;
    }
    Ok(applied.len())
}
