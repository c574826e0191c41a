// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hierarchy merging.
//!
//! Objects are grouped into chunks: a root plus every descendant reachable
//! through compatible parent/child links. Each chunk is joined into a single
//! mesh object that takes the place of the root. When the root is a locator
//! the joined mesh is re-pivoted onto it, renamed after it and takes over
//! its parent and anchors.

use std::collections::VecDeque;

use nalgebra::Matrix4;

use crate::config::Settings;
use crate::context::CompilationContext;
use crate::error::{Error, Result};
use crate::scene::{CollectionKey, ObjectKey, Scene};

/// Returns `true` when `child` can be joined into `parent`.
pub fn compatible(scene: &Scene, parent: ObjectKey, child: ObjectKey, settings: &Settings) -> bool {
    let (Some(p), Some(c)) = (scene.object(parent), scene.object(child)) else {
        return false;
    };
    if !c.props.merge_with_parent {
        return false;
    }
    if p.kind.is_armature() || c.kind.is_armature() {
        return false;
    }
    let locator = p.kind.is_locator() || c.kind.is_locator();
    if !locator && !settings.merge_texture_sets && p.props.texture_set != c.props.texture_set {
        return false;
    }
    if !locator && settings.merge_requires_matching_shading && p.props.shading != c.props.shading {
        return false;
    }
    true
}

fn collect_members(
    scene: &Scene,
    parent: ObjectKey,
    settings: &Settings,
    members: &mut Vec<ObjectKey>,
    queue: &mut VecDeque<ObjectKey>,
) {
    for child in scene.children(parent) {
        if compatible(scene, parent, child, settings) {
            members.push(child);
            collect_members(scene, child, settings, members, queue);
        } else {
            queue.push_back(child);
        }
    }
}

/// Partitions the hierarchies under `roots` into merge chunks.
///
/// Each chunk lists its members in depth-first order with the root last.
pub fn build_chunks(scene: &Scene, roots: &[ObjectKey], settings: &Settings) -> Vec<Vec<ObjectKey>> {
    let mut queue: VecDeque<ObjectKey> = roots.iter().copied().collect();
    let mut chunks = Vec::new();
    while let Some(root) = queue.pop_front() {
        if !scene.contains_object(root) {
            continue;
        }
        let mut chunk = Vec::new();
        collect_members(scene, root, settings, &mut chunk, &mut queue);
        chunk.push(root);
        chunks.push(chunk);
    }
    chunks
}

/// Joins a chunk into one mesh object and returns it.
///
/// Returns `None` when the chunk holds no mesh.
pub fn merge_chunk(scene: &mut Scene, chunk: &[ObjectKey]) -> Result<Option<ObjectKey>> {
    let Some(&root) = chunk.last() else {
        return Ok(None);
    };
    if !scene.contains_object(root) {
        return Err(Error::MissingMergeRoot(root));
    }
    let meshes: Vec<ObjectKey> = chunk
        .iter()
        .copied()
        .filter(|o| scene.object(*o).is_some_and(|obj| obj.kind.is_mesh()))
        .collect();
    let Some(&last_mesh) = meshes.last() else {
        return Ok(None);
    };
    let root_is_mesh = meshes.contains(&root);
    let survivor = if root_is_mesh { root } else { last_mesh };

    let orphans: Vec<(ObjectKey, Matrix4<f64>)> = chunk
        .iter()
        .flat_map(|m| scene.children(*m))
        .filter(|c| !chunk.contains(c))
        .map(|c| (c, scene.world_matrix(c)))
        .collect();

    for &m in &meshes {
        scene.make_single_user(m);
    }

    let survivor_world = scene.world_matrix(survivor);
    let to_survivor = survivor_world.try_inverse().unwrap_or_else(|| {
        tracing::warn!(object = %scene.object_name(survivor), "singular transform on merge survivor");
        Matrix4::identity()
    });

    for &m in meshes.iter().filter(|m| **m != survivor) {
        let world = scene.world_matrix(m);
        let Some((other, other_materials)) = scene
            .object_mesh(m)
            .map(|d| (d.mesh.clone(), d.materials.clone()))
        else {
            continue;
        };
        let Some(target) = scene.object_mesh_mut(survivor) else {
            continue;
        };
        let remap: Vec<u16> = other_materials
            .iter()
            .map(|name| {
                let slot = match target.materials.iter().position(|n| n == name) {
                    Some(i) => i,
                    None => {
                        target.materials.push(name.clone());
                        target.materials.len() - 1
                    }
                };
                slot as u16
            })
            .collect();
        target.mesh.append(&other, &(to_survivor * world), &remap);
    }

    if !root_is_mesh {
        let gizmo_world = scene.world_matrix(root);
        let pivot = gizmo_world.try_inverse().unwrap_or_else(Matrix4::identity) * survivor_world;
        if let Some(data) = scene.object_mesh_mut(survivor) {
            data.mesh.transform(&pivot);
        }
        let Some(gizmo) = scene.object(root).cloned() else {
            return Err(Error::MissingMergeRoot(root));
        };
        if let Some(obj) = scene.object_mut(survivor) {
            obj.parent = gizmo.parent;
            obj.local = gizmo.local;
            obj.origin = gizmo.origin;
            obj.props.bake_anchor = gizmo.props.bake_anchor;
            obj.props.export_anchor = gizmo.props.export_anchor;
        }
        scene.swap_object_names(survivor, root);
    }

    for (child, world) in orphans {
        if let Some(obj) = scene.object_mut(child) {
            obj.parent = Some(survivor);
        }
        scene.set_world_matrix(child, &world);
    }

    for &m in chunk.iter().filter(|m| **m != survivor) {
        scene.delete_object(m);
    }

    tracing::trace!(
        survivor = %scene.object_name(survivor),
        members = chunk.len(),
        "merged chunk"
    );
    Ok(Some(survivor))
}

/// Merges every hierarchy of `collection`. Returns the number of chunks
/// that joined two or more objects.
pub fn merge_collection(
    ctx: &mut CompilationContext<'_>,
    scene: &mut Scene,
    collection: CollectionKey,
) -> Result<usize> {
    let roots = scene.roots_in(collection);
    let chunks = build_chunks(scene, &roots, ctx.settings);
    let mut merged = 0;
    for chunk in chunks {
        if merge_chunk(scene, &chunk)?.is_some() && chunk.len() > 1 {
            merged += 1;
        }
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{ObjectKind, Shading};
    use approx::assert_relative_eq;
    use gamiflow_mesh::builders;
    use nalgebra::{Point3, Rotation3, Vector3};

    fn mesh(scene: &mut Scene, name: &str, material: &str) -> ObjectKey {
        let root = scene.root_collection();
        let data = scene.add_mesh(name, builders::cube(1.0), vec![material.into()]);
        scene.add_object(name, ObjectKind::Mesh(data), root)
    }

    fn empty(scene: &mut Scene, name: &str) -> ObjectKey {
        let root = scene.root_collection();
        scene.add_object(name, ObjectKind::empty(), root)
    }

    fn place(scene: &mut Scene, obj: ObjectKey, parent: Option<ObjectKey>, local: Matrix4<f64>) {
        let o = scene.object_mut(obj).unwrap();
        o.parent = parent;
        o.local = local;
    }

    #[test]
    fn compatibility_rules() {
        let mut scene = Scene::new("s");
        let settings = Settings::default();
        let a = mesh(&mut scene, "A", "m");
        let b = mesh(&mut scene, "B", "m");
        let loc = empty(&mut scene, "L");
        let coll = scene.root_collection();
        let rig = scene.add_object("Rig", ObjectKind::Armature, coll);

        assert!(compatible(&scene, a, b, &settings));
        scene.object_mut(b).unwrap().props.texture_set = 1;
        assert!(!compatible(&scene, a, b, &settings));
        assert!(compatible(&scene, loc, b, &settings));
        let shared = Settings {
            merge_texture_sets: true,
            ..Settings::default()
        };
        assert!(compatible(&scene, a, b, &shared));

        scene.object_mut(b).unwrap().props.texture_set = 0;
        scene.object_mut(b).unwrap().props.shading = Shading::Smooth;
        assert!(compatible(&scene, a, b, &settings));
        let strict = Settings {
            merge_requires_matching_shading: true,
            ..Settings::default()
        };
        assert!(!compatible(&scene, a, b, &strict));

        assert!(!compatible(&scene, rig, a, &settings));
        assert!(!compatible(&scene, a, rig, &settings));
        scene.object_mut(b).unwrap().props.merge_with_parent = false;
        assert!(!compatible(&scene, a, b, &settings));
    }

    #[test]
    fn chunks_partition_hierarchy() {
        let mut scene = Scene::new("s");
        let settings = Settings::default();
        let root = empty(&mut scene, "Root");
        let a = mesh(&mut scene, "A", "m");
        let b = mesh(&mut scene, "B", "m");
        let c = mesh(&mut scene, "C", "m");
        let d = mesh(&mut scene, "D", "m");
        place(&mut scene, a, Some(root), Matrix4::identity());
        place(&mut scene, b, Some(a), Matrix4::identity());
        place(&mut scene, c, Some(a), Matrix4::identity());
        place(&mut scene, d, Some(c), Matrix4::identity());
        scene.object_mut(c).unwrap().props.texture_set = 1;
        scene.object_mut(d).unwrap().props.texture_set = 1;

        let chunks = build_chunks(&scene, &[root], &settings);
        assert_eq!(chunks, vec![vec![a, b, root], vec![d, c]]);
    }

    #[test]
    fn gizmo_root_keeps_transform_name_and_orphans() {
        let mut scene = Scene::new("s");
        let holder = empty(&mut scene, "Holder");
        let root = empty(&mut scene, "Root");
        let a = mesh(&mut scene, "A", "red");
        let b = mesh(&mut scene, "B", "blue");
        let orphan = mesh(&mut scene, "Orphan", "red");

        let root_local = Matrix4::new_translation(&Vector3::new(0.0, 0.0, 4.0))
            * Rotation3::from_euler_angles(0.0, 0.0, 0.7).to_homogeneous();
        place(&mut scene, holder, None, Matrix4::new_translation(&Vector3::new(10.0, 0.0, 0.0)));
        place(&mut scene, root, Some(holder), root_local);
        place(&mut scene, a, Some(root), Matrix4::new_translation(&Vector3::new(1.0, 0.0, 0.0)));
        place(&mut scene, b, Some(a), Matrix4::new_translation(&Vector3::new(0.0, 2.0, 0.0)));
        place(&mut scene, orphan, Some(b), Matrix4::new_translation(&Vector3::new(0.0, 0.0, 1.0)));
        scene.object_mut(orphan).unwrap().props.merge_with_parent = false;
        scene.object_mut(root).unwrap().props.export_anchor = Some(holder);

        let root_world = scene.world_matrix(root);
        let orphan_world = scene.world_matrix(orphan);
        let b_corner = scene.world_matrix(b).transform_point(&Point3::new(0.5, 0.5, 0.5));

        let chunk = vec![a, b, root];
        let survivor = merge_chunk(&mut scene, &chunk).unwrap().unwrap();
        assert_eq!(survivor, b);
        assert_eq!(scene.object_name(survivor), "Root");
        assert!(!scene.contains_object(a));
        assert!(!scene.contains_object(root));

        let obj = scene.object(survivor).unwrap();
        assert_eq!(obj.parent, Some(holder));
        assert_eq!(obj.props.export_anchor, Some(holder));
        assert_relative_eq!(scene.world_matrix(survivor), root_world, epsilon = 1e-9);

        assert_eq!(scene.object(orphan).unwrap().parent, Some(survivor));
        assert_relative_eq!(scene.world_matrix(orphan), orphan_world, epsilon = 1e-9);

        let data = scene.object_mesh(survivor).unwrap();
        assert_eq!(data.mesh.face_count(), 12);
        assert_eq!(data.materials, vec!["blue".to_string(), "red".to_string()]);
        let world = scene.world_matrix(survivor);
        let found = data
            .mesh
            .vertex_keys()
            .filter_map(|v| data.mesh.position(v))
            .any(|p| (world.transform_point(&p) - b_corner).norm() < 1e-9);
        assert!(found);
    }

    #[test]
    fn mesh_root_survives_and_joins_shared_data_safely() {
        let mut scene = Scene::new("s");
        let a = mesh(&mut scene, "A", "m");
        let coll = scene.root_collection();
        let b = scene.duplicate_object(a, "B", coll, true).unwrap();
        let outsider = scene.duplicate_object(a, "Outsider", coll, true).unwrap();
        place(&mut scene, b, Some(a), Matrix4::new_translation(&Vector3::new(3.0, 0.0, 0.0)));

        let survivor = merge_chunk(&mut scene, &[b, a]).unwrap().unwrap();
        assert_eq!(survivor, a);
        assert_eq!(scene.object_name(a), "A");
        assert_eq!(scene.object_mesh(a).unwrap().mesh.face_count(), 12);
        assert_eq!(scene.object_mesh(outsider).unwrap().mesh.face_count(), 6);
    }

    #[test]
    fn chunk_without_mesh_is_a_no_op() {
        let mut scene = Scene::new("s");
        let root = empty(&mut scene, "Root");
        let child = empty(&mut scene, "Child");
        place(&mut scene, child, Some(root), Matrix4::identity());
        assert_eq!(merge_chunk(&mut scene, &[child, root]).unwrap(), None);
        assert!(scene.contains_object(child));
    }

    #[test]
    fn missing_root_is_fatal() {
        let mut scene = Scene::new("s");
        let root = empty(&mut scene, "Root");
        scene.delete_object(root);
        assert!(matches!(
            merge_chunk(&mut scene, &[root]),
            Err(Error::MissingMergeRoot(_))
        ));
    }
}
