// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Collection instance templates.
//!
//! The first time a builder meets an instanced collection it compiles the
//! collection's objects once, with the builder's own policy, into a scratch
//! collection. The result is merged, moved so the collection's instance
//! offset sits on the origin, and cached. Every instancer then receives
//! stamped copies of the template, parented under its stand-in. Scratch
//! collections are deleted when the run ends.

use nalgebra::Matrix4;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::context::CompilationContext;
use crate::error::Result;
use crate::merge;
use crate::populate::{populate, visit_order};
use crate::provenance::Provenance;
use crate::scene::{CollectionKey, ObjectKey, Scene};
use crate::sets::SetPolicy;

/// A compiled collection.
#[derive(Debug, Clone)]
pub struct Template {
    pub collection: CollectionKey,
    pub scratch: CollectionKey,
    /// Name prefix of the template objects.
    pub namespace: String,
    /// Members, parents before children.
    pub objects: Vec<ObjectKey>,
    pub roots: Vec<ObjectKey>,
}

/// Templates compiled during one run.
#[derive(Debug, Default)]
pub struct TemplateCache {
    templates: FxHashMap<CollectionKey, Template>,
    builds: FxHashMap<CollectionKey, usize>,
    building: FxHashSet<CollectionKey>,
    scratch: Vec<CollectionKey>,
}

impl TemplateCache {
    pub fn get(&self, collection: CollectionKey) -> Option<&Template> {
        self.templates.get(&collection)
    }

    /// How many times the template of `collection` was compiled.
    pub fn build_count(&self, collection: CollectionKey) -> usize {
        self.builds.get(&collection).copied().unwrap_or(0)
    }

    pub fn total_builds(&self) -> usize {
        self.builds.values().sum()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Deletes every scratch collection and forgets the templates.
    pub fn teardown(&mut self, scene: &mut Scene) {
        for scratch in self.scratch.drain(..) {
            if let Err(err) = scene.delete_collection(scratch) {
                tracing::debug!(%err, "template scratch collection already gone");
            }
        }
        self.templates.clear();
        self.building.clear();
    }
}

/// Returns the template of `collection`, compiling it on first use.
///
/// Returns `None` when the collection is gone or instances itself.
pub fn get_or_build<P: SetPolicy>(
    ctx: &mut CompilationContext<'_>,
    scene: &mut Scene,
    policy: &P,
    collection: CollectionKey,
) -> Result<Option<Template>> {
    if let Some(template) = ctx.templates.get(collection) {
        return Ok(Some(template.clone()));
    }
    let Some(name) = scene.collection(collection).map(|c| c.name.clone()) else {
        ctx.diagnostic(format!("instanced collection {collection:?} no longer exists"));
        return Ok(None);
    };
    if !ctx.templates.building.insert(collection) {
        ctx.diagnostic(format!("collection {name} instances itself, skipped"));
        return Ok(None);
    }

    let result = compile(ctx, scene, policy, collection, &name);
    ctx.templates.building.remove(&collection);
    let template = result?;

    *ctx.templates.builds.entry(collection).or_insert(0) += 1;
    ctx.report.template_builds += 1;
    tracing::debug!(
        collection = %name,
        objects = template.objects.len(),
        "compiled instance template"
    );
    ctx.templates.templates.insert(collection, template.clone());
    Ok(Some(template))
}

fn compile<P: SetPolicy>(
    ctx: &mut CompilationContext<'_>,
    scene: &mut Scene,
    policy: &P,
    collection: CollectionKey,
    name: &str,
) -> Result<Template> {
    let members = scene.objects_in(collection);
    let offset = scene
        .collection(collection)
        .map(|c| c.instance_offset)
        .unwrap_or_default();

    let scratch = scene.add_collection(&format!("{name}:template"), None);
    ctx.templates.scratch.push(scratch);
    let namespace = format!("{name}:");

    populate(ctx, scene, policy, &members, scratch, &namespace)?;
    merge::merge_collection(ctx, scene, scratch)?;

    let recenter = Matrix4::new_translation(&-offset);
    let roots = scene.roots_in(scratch);
    for &root in &roots {
        let world = recenter * scene.world_matrix(root);
        scene.set_world_matrix(root, &world);
    }

    Ok(Template {
        collection,
        scratch,
        namespace,
        objects: visit_order(scene, &scene.objects_in(scratch)),
        roots,
    })
}

/// Stamps copies of `template` into `dest` under `stand_in`.
///
/// Stamped objects are registered without a source. Returns the copies,
/// parents before children.
#[allow(clippy::too_many_arguments)]
pub fn stamp<P: SetPolicy>(
    ctx: &mut CompilationContext<'_>,
    scene: &mut Scene,
    policy: &P,
    template: &Template,
    stand_in: ObjectKey,
    dest: CollectionKey,
    namespace: &str,
    provenance: &mut Provenance,
) -> Result<Vec<ObjectKey>> {
    let mut copies: FxHashMap<ObjectKey, ObjectKey> = FxHashMap::default();
    let mut stamped = Vec::with_capacity(template.objects.len());

    for &member in &template.objects {
        let Some(obj) = scene.object(member) else {
            continue;
        };
        let parent = obj.parent;
        let base = obj
            .name()
            .strip_prefix(&template.namespace)
            .unwrap_or(obj.name())
            .to_string();
        let template_world = scene.world_matrix(member);

        let copy = scene.duplicate_object(
            member,
            &format!("{namespace}{base}"),
            dest,
            policy.links_template_meshes(),
        )?;
        if let Some(obj) = scene.object_mut(copy) {
            match parent.and_then(|p| copies.get(&p)) {
                Some(&mapped) => obj.parent = Some(mapped),
                None => {
                    obj.parent = Some(stand_in);
                    obj.local = template_world;
                }
            }
        }
        copies.insert(member, copy);
        provenance.register(copy, None);
        stamped.push(copy);
    }

    for &copy in &stamped {
        if let Some(obj) = scene.object_mut(copy) {
            for m in obj.modifiers.iter_mut() {
                if let Some(&mapped) = m.kind.object().and_then(|t| copies.get(&t)) {
                    m.kind.set_object(mapped);
                }
            }
        }
    }

    ctx.report.stamped += stamped.len();
    Ok(stamped)
}
