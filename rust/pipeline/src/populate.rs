// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The population pass shared by every builder and by template builds.
//!
//! Sources are visited parents first. Each accepted object is duplicated
//! into the destination, detached from its source parent and processed by
//! the policy. Instancers get an empty stand-in that receives stamped
//! template copies. Parenting and modifier object references are wired only
//! once every duplicate exists.

use rustc_hash::FxHashSet;

use crate::context::CompilationContext;
use crate::error::Result;
use crate::provenance::{find_best_match, Provenance};
use crate::scene::{CollectionKey, ObjectKey, ObjectKind, Scene};
use crate::sets::SetPolicy;
use crate::template;

/// `members` with parents before children. A member whose parent is not a
/// member counts as a root.
pub(crate) fn visit_order(scene: &Scene, members: &[ObjectKey]) -> Vec<ObjectKey> {
    let set: FxHashSet<ObjectKey> = members.iter().copied().collect();
    let mut stack: Vec<ObjectKey> = members
        .iter()
        .copied()
        .filter(|o| {
            scene
                .object(*o)
                .and_then(|obj| obj.parent)
                .map_or(true, |p| !set.contains(&p))
        })
        .rev()
        .collect();
    let mut seen = FxHashSet::default();
    let mut order = Vec::with_capacity(members.len());
    while let Some(o) = stack.pop() {
        if !seen.insert(o) {
            continue;
        }
        order.push(o);
        let children: Vec<ObjectKey> = scene
            .children(o)
            .into_iter()
            .filter(|c| set.contains(c))
            .collect();
        stack.extend(children.into_iter().rev());
    }
    order
}

/// Duplicates `source` into `dest` as a root object with an unchanged world
/// transform, remembering the working-scene object it stems from.
fn detached_copy(
    scene: &mut Scene,
    source: ObjectKey,
    name: &str,
    dest: CollectionKey,
) -> Result<ObjectKey> {
    let origin = scene.object(source).and_then(|o| o.origin).unwrap_or(source);
    let copy = scene.duplicate_object(source, name, dest, false)?;
    scene.set_parent_keep_transform(copy, None)?;
    if let Some(obj) = scene.object_mut(copy) {
        obj.origin = Some(origin);
    }
    Ok(copy)
}

/// Populates `dest` from `members` with `policy`.
///
/// Returns every object registered during the pass, in registration order.
pub fn populate<P: SetPolicy>(
    ctx: &mut CompilationContext<'_>,
    scene: &mut Scene,
    policy: &P,
    members: &[ObjectKey],
    dest: CollectionKey,
    namespace: &str,
) -> Result<Vec<ObjectKey>> {
    let mut provenance = Provenance::new();

    for source in visit_order(scene, members) {
        let Some(obj) = scene.object(source) else {
            continue;
        };
        let instanced = obj.kind.instance_collection();
        let props = obj.props.clone();

        if let Some(collection) = instanced {
            if !policy.accepts_instance(&props) {
                tracing::trace!(object = %scene.object_name(source), "instance excluded from set");
                continue;
            }
            let name = format!("{namespace}{}", policy.object_name(ctx.settings, scene, source));
            let stand_in = detached_copy(scene, source, &name, dest)?;
            if let Some(obj) = scene.object_mut(stand_in) {
                obj.kind = ObjectKind::empty();
            }
            provenance.register(stand_in, Some(source));

            if let Some(tpl) = template::get_or_build(ctx, scene, policy, collection)? {
                template::stamp(ctx, scene, policy, &tpl, stand_in, dest, namespace, &mut provenance)?;
            }
            continue;
        }

        if !policy.accepts(scene, source) {
            tracing::trace!(object = %scene.object_name(source), "object excluded from set");
            continue;
        }

        let generated = if policy.includes_self(scene, source) {
            let name = format!("{namespace}{}", policy.object_name(ctx.settings, scene, source));
            let copy = detached_copy(scene, source, &name, dest)?;
            provenance.register(copy, Some(source));
            policy.process_object(ctx, scene, copy, source)?;
            Some(copy)
        } else {
            None
        };

        for extra in policy.extra_objects(ctx, scene, source, generated, dest, namespace)? {
            provenance.register(extra, None);
        }
    }

    let registered = provenance.generated_objects().to_vec();
    for &g in &registered {
        if scene.contains_object(g) {
            provenance.reparent(scene, g)?;
        }
    }
    remap_modifier_objects(scene, &provenance, &registered);

    Ok(registered)
}

fn remap_modifier_objects(scene: &mut Scene, provenance: &Provenance, generated: &[ObjectKey]) {
    for &g in generated {
        let Some(obj) = scene.object(g) else {
            continue;
        };
        let updates: Vec<(usize, ObjectKey)> = obj
            .modifiers
            .iter()
            .enumerate()
            .filter_map(|(i, m)| {
                let target = m.kind.object()?;
                let candidates = provenance.find_generated(target);
                find_best_match(scene, candidates, target).map(|c| (i, c))
            })
            .collect();
        if let Some(obj) = scene.object_mut(g) {
            for (i, target) in updates {
                obj.modifiers[i].kind.set_object(target);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::ObjectKind;
    use nalgebra::{Matrix4, Vector3};

    #[test]
    fn visit_order_puts_parents_first() {
        let mut scene = Scene::new("s");
        let root = scene.root_collection();
        let child = scene.add_object("Child", ObjectKind::empty(), root);
        let parent = scene.add_object("Parent", ObjectKind::empty(), root);
        let loose = scene.add_object("Loose", ObjectKind::empty(), root);
        scene.object_mut(child).unwrap().parent = Some(parent);

        let order = visit_order(&scene, &[child, parent, loose]);
        assert_eq!(order, vec![parent, child, loose]);

        // a parent outside the member list makes the child a root
        assert_eq!(visit_order(&scene, &[child]), vec![child]);
    }

    #[test]
    fn detached_copy_keeps_world_and_origin() {
        let mut scene = Scene::new("s");
        let root = scene.root_collection();
        let dest = scene.add_collection("out", None);
        let parent = scene.add_object("P", ObjectKind::empty(), root);
        let child = scene.add_object("C", ObjectKind::empty(), root);
        scene.object_mut(parent).unwrap().local =
            Matrix4::new_translation(&Vector3::new(1.0, 2.0, 3.0));
        scene.object_mut(child).unwrap().parent = Some(parent);

        let copy = detached_copy(&mut scene, child, "C_low", dest).unwrap();
        let obj = scene.object(copy).unwrap();
        assert_eq!(obj.parent, None);
        assert_eq!(obj.origin, Some(child));
        assert_eq!(scene.world_matrix(copy), scene.world_matrix(child));
        assert_eq!(scene.objects_in(dest), vec![copy]);

        let again = detached_copy(&mut scene, copy, "C_cage", dest).unwrap();
        assert_eq!(scene.object(again).unwrap().origin, Some(child));
    }
}
