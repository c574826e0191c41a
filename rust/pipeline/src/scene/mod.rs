// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host scene graph.
//!
//! Objects, mesh data blocks and collections live in slot maps addressed by
//! generational keys. Parent, anchor and instance references are keys, so
//! deleting an object mid-pipeline leaves stale keys that simply stop
//! resolving.
//!
//! Object names are unique within a scene. A clashing name gets a numeric
//! suffix (`Cube`, `Cube.001`, ...). Mesh data is reference counted by the
//! objects using it and removed with its last user.
//!
//! Children are looked up through a parent index. Inserting and deleting
//! objects keep it current, any other mutable access to an object drops it
//! and the next lookup rebuilds it.

mod guards;
mod object;

pub use guards::{AutoMergeGuard, ToolSettings};
pub use object::{InstanceBake, ObjectKind, ObjectProps, Role, SceneObject, Shading};

use std::cell::OnceCell;

use gamiflow_mesh::PolyMesh;
use nalgebra::{Matrix4, Vector3};
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::{new_key_type, SlotMap};

use crate::error::{Error, Result};
use crate::sets::TargetSet;

new_key_type! {
    /// Key of a scene object.
    pub struct ObjectKey;

    /// Key of a mesh data block.
    pub struct MeshKey;

    /// Key of a collection.
    pub struct CollectionKey;
}

/// A mesh data block shared by one or more objects.
#[derive(Debug, Clone)]
pub struct MeshData {
    pub name: String,
    pub mesh: PolyMesh,
    /// Material slot names. Face material indices point into this list.
    pub materials: Vec<String>,
    users: usize,
}

impl MeshData {
    /// Number of objects using this mesh.
    pub fn users(&self) -> usize {
        self.users
    }
}

/// A named group of objects and child collections.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    pub name: String,
    pub objects: Vec<ObjectKey>,
    pub children: Vec<CollectionKey>,
    /// Origin used when the collection is instanced.
    pub instance_offset: Vector3<f64>,
}

fn unique_name(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    let mut i = 1u32;
    loop {
        let candidate = format!("{base}.{i:03}");
        if !taken(&candidate) {
            return candidate;
        }
        i += 1;
    }
}

/// The scene: object graph, mesh data, collections and tool state.
#[derive(Debug, Clone)]
pub struct Scene {
    pub name: String,
    objects: SlotMap<ObjectKey, SceneObject>,
    meshes: SlotMap<MeshKey, MeshData>,
    collections: SlotMap<CollectionKey, Collection>,
    object_names: FxHashMap<String, ObjectKey>,
    /// Children of each parent, sorted by key.
    child_index: OnceCell<FxHashMap<ObjectKey, Vec<ObjectKey>>>,
    root: CollectionKey,
    /// The authored collection every set is derived from.
    pub working: Option<CollectionKey>,
    outputs: [Option<CollectionKey>; 4],
    pub tool_settings: ToolSettings,
    /// Texture set (UDIM) names; the index is `ObjectProps::texture_set`.
    pub texture_sets: Vec<String>,
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        let mut collections = SlotMap::with_key();
        let root = collections.insert(Collection {
            name: "Scene Collection".into(),
            ..Default::default()
        });
        Self {
            name: name.into(),
            objects: SlotMap::with_key(),
            meshes: SlotMap::with_key(),
            collections,
            object_names: FxHashMap::default(),
            child_index: OnceCell::new(),
            root,
            working: None,
            outputs: [None; 4],
            tool_settings: ToolSettings::default(),
            texture_sets: vec!["UDIM_0".into()],
        }
    }

    /// Stable set name used by exporters for file naming.
    pub fn set_name(&self) -> &str {
        &self.name
    }

    /// Material name of a texture set.
    pub fn texture_set_name(&self, index: u32) -> String {
        self.texture_sets
            .get(index as usize)
            .cloned()
            .unwrap_or_else(|| format!("UDIM_{index}"))
    }

    // --- Collections ---

    pub fn root_collection(&self) -> CollectionKey {
        self.root
    }

    /// Creates a collection under `parent`, or under the scene root.
    pub fn add_collection(
        &mut self,
        name: &str,
        parent: Option<CollectionKey>,
    ) -> CollectionKey {
        let name = unique_name(name, |n| self.find_collection(n).is_some());
        let key = self.collections.insert(Collection {
            name,
            ..Default::default()
        });
        let parent = parent
            .filter(|p| self.collections.contains_key(*p))
            .unwrap_or(self.root);
        if let Some(p) = self.collections.get_mut(parent) {
            p.children.push(key);
        }
        key
    }

    pub fn collection(&self, key: CollectionKey) -> Option<&Collection> {
        self.collections.get(key)
    }

    pub fn collection_mut(&mut self, key: CollectionKey) -> Option<&mut Collection> {
        self.collections.get_mut(key)
    }

    pub fn find_collection(&self, name: &str) -> Option<CollectionKey> {
        self.collections
            .iter()
            .find(|(_, c)| c.name == name)
            .map(|(k, _)| k)
    }

    pub fn collection_keys(&self) -> impl Iterator<Item = CollectionKey> + '_ {
        self.collections.keys()
    }

    /// `collection` followed by all of its descendants, depth-first.
    pub fn collection_tree(&self, collection: CollectionKey) -> Vec<CollectionKey> {
        let mut out = Vec::new();
        let mut stack = vec![collection];
        let mut seen = FxHashSet::default();
        while let Some(c) = stack.pop() {
            if !seen.insert(c) {
                continue;
            }
            let Some(coll) = self.collections.get(c) else {
                continue;
            };
            out.push(c);
            stack.extend(coll.children.iter().rev().copied());
        }
        out
    }

    pub fn link_object(&mut self, collection: CollectionKey, object: ObjectKey) {
        if let Some(c) = self.collections.get_mut(collection) {
            if !c.objects.contains(&object) {
                c.objects.push(object);
            }
        }
    }

    pub fn unlink_object(&mut self, collection: CollectionKey, object: ObjectKey) {
        if let Some(c) = self.collections.get_mut(collection) {
            c.objects.retain(|o| *o != object);
        }
    }

    /// Every object of the collection and its descendants, without repeats.
    pub fn objects_in(&self, collection: CollectionKey) -> Vec<ObjectKey> {
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        for c in self.collection_tree(collection) {
            if let Some(coll) = self.collections.get(c) {
                for &o in &coll.objects {
                    if self.objects.contains_key(o) && seen.insert(o) {
                        out.push(o);
                    }
                }
            }
        }
        out
    }

    /// Objects of the collection tree without a parent.
    pub fn roots_in(&self, collection: CollectionKey) -> Vec<ObjectKey> {
        self.objects_in(collection)
            .into_iter()
            .filter(|o| self.objects.get(*o).is_some_and(|obj| obj.parent.is_none()))
            .collect()
    }

    /// Deletes every object of the collection tree. The collections stay.
    pub fn clear_collection(&mut self, collection: CollectionKey) -> usize {
        let objects = self.objects_in(collection);
        let mut deleted = 0;
        for o in objects {
            if self.delete_object(o) {
                deleted += 1;
            }
        }
        deleted
    }

    /// Deletes the collection tree and every object in it.
    pub fn delete_collection(&mut self, collection: CollectionKey) -> Result<()> {
        if collection == self.root {
            return Err(Error::CollectionNotFound(collection));
        }
        if !self.collections.contains_key(collection) {
            return Err(Error::CollectionNotFound(collection));
        }
        self.clear_collection(collection);
        let tree = self.collection_tree(collection);
        for c in &tree {
            self.collections.remove(*c);
        }
        for coll in self.collections.values_mut() {
            coll.children.retain(|c| !tree.contains(c));
        }
        if self.working.is_some_and(|w| tree.contains(&w)) {
            self.working = None;
        }
        for out in self.outputs.iter_mut() {
            if out.is_some_and(|o| tree.contains(&o)) {
                *out = None;
            }
        }
        Ok(())
    }

    /// The generated collection of a target set, if it exists.
    pub fn output_collection(&self, target: TargetSet) -> Option<CollectionKey> {
        self.outputs[target.index()].filter(|c| self.collections.contains_key(*c))
    }

    /// Finds or creates the collection of a target set, named
    /// `{set_name}_{target}`.
    pub fn ensure_output_collection(&mut self, target: TargetSet) -> CollectionKey {
        let name = format!("{}_{}", self.name, target.as_str());
        if let Some(c) = self.output_collection(target) {
            if let Some(coll) = self.collections.get_mut(c) {
                coll.name = name;
            }
            return c;
        }
        let c = self.add_collection(&name, None);
        self.outputs[target.index()] = Some(c);
        c
    }

    // --- Meshes ---

    pub fn add_mesh(&mut self, name: &str, mesh: PolyMesh, materials: Vec<String>) -> MeshKey {
        self.meshes.insert(MeshData {
            name: name.to_string(),
            mesh,
            materials,
            users: 0,
        })
    }

    pub fn mesh(&self, key: MeshKey) -> Option<&MeshData> {
        self.meshes.get(key)
    }

    pub fn mesh_mut(&mut self, key: MeshKey) -> Option<&mut MeshData> {
        self.meshes.get_mut(key)
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Mesh data of a mesh object.
    pub fn object_mesh(&self, object: ObjectKey) -> Option<&MeshData> {
        let key = self.objects.get(object)?.kind.mesh()?;
        self.meshes.get(key)
    }

    pub fn object_mesh_mut(&mut self, object: ObjectKey) -> Option<&mut MeshData> {
        let key = self.objects.get(object)?.kind.mesh()?;
        self.meshes.get_mut(key)
    }

    /// Mesh data and tool settings borrowed together, for edit operators.
    pub fn mesh_and_tools_mut(
        &mut self,
        object: ObjectKey,
    ) -> Option<(&mut MeshData, &mut ToolSettings)> {
        let key = self.objects.get(object)?.kind.mesh()?;
        let mesh = self.meshes.get_mut(key)?;
        Some((mesh, &mut self.tool_settings))
    }

    /// Gives the object its own copy of shared mesh data.
    pub fn make_single_user(&mut self, object: ObjectKey) -> Option<MeshKey> {
        let key = self.objects.get(object)?.kind.mesh()?;
        let data = self.meshes.get(key)?;
        if data.users <= 1 {
            return Some(key);
        }
        let copy = MeshData {
            users: 1,
            ..data.clone()
        };
        let new_key = self.meshes.insert(copy);
        if let Some(d) = self.meshes.get_mut(key) {
            d.users -= 1;
        }
        if let Some(obj) = self.objects.get_mut(object) {
            obj.kind = ObjectKind::Mesh(new_key);
        }
        Some(new_key)
    }

    fn release_mesh(&mut self, key: MeshKey) {
        let remove = match self.meshes.get_mut(key) {
            Some(d) => {
                d.users = d.users.saturating_sub(1);
                d.users == 0
            }
            None => false,
        };
        if remove {
            self.meshes.remove(key);
        }
    }

    // --- Objects ---

    /// Adds an object to `collection`. The name is made unique.
    pub fn add_object(
        &mut self,
        name: &str,
        kind: ObjectKind,
        collection: CollectionKey,
    ) -> ObjectKey {
        self.insert_object(SceneObject::new(name, kind), collection)
    }

    /// Inserts a prepared object. Its name is made unique.
    pub fn insert_object(&mut self, mut object: SceneObject, collection: CollectionKey) -> ObjectKey {
        object.name = unique_name(&object.name, |n| self.object_names.contains_key(n));
        if let Some(m) = object.kind.mesh().and_then(|m| self.meshes.get_mut(m)) {
            m.users += 1;
        }
        let name = object.name.clone();
        let parent = object.parent;
        let key = self.objects.insert(object);
        self.object_names.insert(name, key);
        if let (Some(p), Some(index)) = (parent, self.child_index.get_mut()) {
            let children = index.entry(p).or_default();
            if let Err(i) = children.binary_search(&key) {
                children.insert(i, key);
            }
        }
        self.link_object(collection, key);
        key
    }

    pub fn object(&self, key: ObjectKey) -> Option<&SceneObject> {
        self.objects.get(key)
    }

    pub fn object_mut(&mut self, key: ObjectKey) -> Option<&mut SceneObject> {
        self.child_index.take();
        self.objects.get_mut(key)
    }

    pub fn contains_object(&self, key: ObjectKey) -> bool {
        self.objects.contains_key(key)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn object_keys(&self) -> impl Iterator<Item = ObjectKey> + '_ {
        self.objects.keys()
    }

    pub fn find_object(&self, name: &str) -> Option<ObjectKey> {
        self.object_names.get(name).copied()
    }

    pub fn object_name(&self, key: ObjectKey) -> &str {
        self.objects.get(key).map(|o| o.name.as_str()).unwrap_or("<deleted>")
    }

    /// Renames an object and returns the name it actually received.
    pub fn rename_object(&mut self, key: ObjectKey, name: &str) -> Option<String> {
        let old = self.objects.get(key)?.name.clone();
        if old == name {
            return Some(old);
        }
        self.object_names.remove(&old);
        let new = unique_name(name, |n| self.object_names.contains_key(n));
        self.object_names.insert(new.clone(), key);
        if let Some(obj) = self.objects.get_mut(key) {
            obj.name = new.clone();
        }
        Some(new)
    }

    /// Exchanges the names of two objects.
    pub fn swap_object_names(&mut self, a: ObjectKey, b: ObjectKey) {
        let (Some(na), Some(nb)) = (
            self.objects.get(a).map(|o| o.name.clone()),
            self.objects.get(b).map(|o| o.name.clone()),
        ) else {
            return;
        };
        self.object_names.insert(na.clone(), b);
        self.object_names.insert(nb.clone(), a);
        if let Some(o) = self.objects.get_mut(a) {
            o.name = nb;
        }
        if let Some(o) = self.objects.get_mut(b) {
            o.name = na;
        }
    }

    fn child_index(&self) -> &FxHashMap<ObjectKey, Vec<ObjectKey>> {
        self.child_index.get_or_init(|| {
            let mut index: FxHashMap<ObjectKey, Vec<ObjectKey>> = FxHashMap::default();
            for (k, o) in self.objects.iter() {
                if let Some(p) = o.parent {
                    index.entry(p).or_default().push(k);
                }
            }
            for children in index.values_mut() {
                children.sort();
            }
            index
        })
    }

    /// Direct children, in key order.
    pub fn children(&self, key: ObjectKey) -> Vec<ObjectKey> {
        self.child_index()
            .get(&key)
            .map(|c| c.iter().copied().filter(|k| self.objects.contains_key(*k)).collect())
            .unwrap_or_default()
    }

    /// Returns `true` when `ancestor` is a (transitive) parent of `object`.
    pub fn is_ancestor(&self, ancestor: ObjectKey, object: ObjectKey) -> bool {
        let mut current = self.objects.get(object).and_then(|o| o.parent);
        let mut steps = 0;
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.objects.len() {
                return false;
            }
            current = self.objects.get(p).and_then(|o| o.parent);
        }
        false
    }

    /// World transform: the parent chain composed with the local transform.
    pub fn world_matrix(&self, key: ObjectKey) -> Matrix4<f64> {
        let mut world = Matrix4::identity();
        let mut current = Some(key);
        let mut steps = 0;
        while let Some(k) = current {
            let Some(obj) = self.objects.get(k) else {
                break;
            };
            world = obj.local * world;
            current = obj.parent;
            steps += 1;
            if steps > self.objects.len() {
                tracing::warn!(object = %self.object_name(key), "parent cycle while computing world transform");
                break;
            }
        }
        world
    }

    /// Sets the local transform so the object lands on `world`.
    pub fn set_world_matrix(&mut self, key: ObjectKey, world: &Matrix4<f64>) {
        let Some(parent) = self.objects.get(key).map(|o| o.parent) else {
            return;
        };
        let local = match parent {
            Some(p) => match self.world_matrix(p).try_inverse() {
                Some(inv) => inv * world,
                None => {
                    tracing::warn!(
                        object = %self.object_name(key),
                        "parent transform is singular, using world transform as local"
                    );
                    *world
                }
            },
            None => *world,
        };
        if let Some(obj) = self.objects.get_mut(key) {
            obj.local = local;
        }
    }

    /// Re-parents an object without moving it in world space.
    pub fn set_parent_keep_transform(
        &mut self,
        child: ObjectKey,
        parent: Option<ObjectKey>,
    ) -> Result<()> {
        if !self.objects.contains_key(child) {
            return Err(Error::ObjectNotFound(child));
        }
        if let Some(p) = parent {
            if !self.objects.contains_key(p) {
                return Err(Error::ObjectNotFound(p));
            }
            if p == child || self.is_ancestor(child, p) {
                return Err(Error::ParentCycle {
                    child: self.object_name(child).to_string(),
                    parent: self.object_name(p).to_string(),
                });
            }
        }
        let world = self.world_matrix(child);
        self.child_index.take();
        if let Some(obj) = self.objects.get_mut(child) {
            obj.parent = parent;
        }
        self.set_world_matrix(child, &world);
        Ok(())
    }

    /// Copies an object into `collection` under a new name.
    ///
    /// The copy keeps the parent and local transform of the source. Mesh
    /// data is copied, or shared when `linked` is set.
    pub fn duplicate_object(
        &mut self,
        source: ObjectKey,
        name: &str,
        collection: CollectionKey,
        linked: bool,
    ) -> Result<ObjectKey> {
        let mut copy = self
            .objects
            .get(source)
            .cloned()
            .ok_or(Error::ObjectNotFound(source))?;
        copy.name = name.to_string();
        if let (false, Some(mesh_key)) = (linked, copy.kind.mesh()) {
            if let Some(data) = self.meshes.get(mesh_key) {
                let new_mesh = MeshData {
                    users: 0,
                    ..data.clone()
                };
                copy.kind = ObjectKind::Mesh(self.meshes.insert(new_mesh));
            }
        }
        Ok(self.insert_object(copy, collection))
    }

    /// Deletes an object. Its children keep their world transforms.
    pub fn delete_object(&mut self, key: ObjectKey) -> bool {
        if !self.objects.contains_key(key) {
            return false;
        }
        let orphans: Vec<(ObjectKey, Matrix4<f64>)> = self
            .children(key)
            .into_iter()
            .map(|c| (c, self.world_matrix(c)))
            .collect();

        let Some(obj) = self.objects.remove(key) else {
            return false;
        };
        if let Some(index) = self.child_index.get_mut() {
            index.remove(&key);
            if let Some(siblings) = obj.parent.and_then(|p| index.get_mut(&p)) {
                siblings.retain(|k| *k != key);
            }
        }
        if self.object_names.get(&obj.name) == Some(&key) {
            self.object_names.remove(&obj.name);
        }
        for coll in self.collections.values_mut() {
            coll.objects.retain(|o| *o != key);
        }
        if let Some(m) = obj.kind.mesh() {
            self.release_mesh(m);
        }
        for (child, world) in orphans {
            if let Some(c) = self.objects.get_mut(child) {
                c.parent = None;
                c.local = world;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use gamiflow_mesh::builders;
    use nalgebra::Vector3;

    fn translation(x: f64, y: f64, z: f64) -> Matrix4<f64> {
        Matrix4::new_translation(&Vector3::new(x, y, z))
    }

    fn mesh_object(scene: &mut Scene, name: &str, coll: CollectionKey) -> ObjectKey {
        let mesh = scene.add_mesh(name, builders::cube(1.0), Vec::new());
        scene.add_object(name, ObjectKind::Mesh(mesh), coll)
    }

    #[test]
    fn names_are_made_unique() {
        let mut scene = Scene::new("s");
        let root = scene.root_collection();
        let a = scene.add_object("Cube", ObjectKind::empty(), root);
        let b = scene.add_object("Cube", ObjectKind::empty(), root);
        let c = scene.add_object("Cube", ObjectKind::empty(), root);
        assert_eq!(scene.object_name(a), "Cube");
        assert_eq!(scene.object_name(b), "Cube.001");
        assert_eq!(scene.object_name(c), "Cube.002");

        scene.delete_object(a);
        assert_eq!(scene.rename_object(c, "Cube").as_deref(), Some("Cube"));
        assert_eq!(scene.find_object("Cube"), Some(c));
    }

    #[test]
    fn parenting_keeps_world_transform() {
        let mut scene = Scene::new("s");
        let root = scene.root_collection();
        let parent = scene.add_object("P", ObjectKind::empty(), root);
        let child = scene.add_object("C", ObjectKind::empty(), root);
        scene.object_mut(parent).unwrap().local = translation(1.0, 2.0, 3.0);
        scene.object_mut(child).unwrap().local = translation(5.0, 0.0, 0.0);

        scene.set_parent_keep_transform(child, Some(parent)).unwrap();
        assert_relative_eq!(scene.world_matrix(child), translation(5.0, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(
            scene.object(child).unwrap().local,
            translation(4.0, -2.0, -3.0),
            epsilon = 1e-12
        );

        assert!(matches!(
            scene.set_parent_keep_transform(parent, Some(child)),
            Err(Error::ParentCycle { .. })
        ));
    }

    #[test]
    fn delete_keeps_children_in_place_and_frees_mesh() {
        let mut scene = Scene::new("s");
        let root = scene.root_collection();
        let parent = mesh_object(&mut scene, "P", root);
        let child = scene.add_object("C", ObjectKind::empty(), root);
        scene.object_mut(parent).unwrap().local = translation(0.0, 0.0, 2.0);
        scene.object_mut(child).unwrap().parent = Some(parent);

        assert_eq!(scene.mesh_count(), 1);
        assert!(scene.delete_object(parent));
        assert_eq!(scene.mesh_count(), 0);
        assert_eq!(scene.object(child).unwrap().parent, None);
        assert_relative_eq!(scene.world_matrix(child), translation(0.0, 0.0, 2.0), epsilon = 1e-12);
    }

    #[test]
    fn children_follow_every_kind_of_edit() {
        let mut scene = Scene::new("s");
        let root = scene.root_collection();
        let a = scene.add_object("A", ObjectKind::empty(), root);
        let b = scene.add_object("B", ObjectKind::empty(), root);
        let c = scene.add_object("C", ObjectKind::empty(), root);
        scene.object_mut(b).unwrap().parent = Some(a);
        assert_eq!(scene.children(a), vec![b]);

        // copies keep the parent and land in the cached index
        let d = scene.duplicate_object(b, "D", root, false).unwrap();
        assert_eq!(scene.children(a), vec![b, d]);

        scene.object_mut(c).unwrap().parent = Some(a);
        assert_eq!(scene.children(a), vec![b, c, d]);

        scene.set_parent_keep_transform(b, Some(c)).unwrap();
        assert_eq!(scene.children(a), vec![c, d]);
        assert_eq!(scene.children(c), vec![b]);

        assert!(scene.delete_object(c));
        assert_eq!(scene.children(a), vec![d]);
        assert!(scene.children(c).is_empty());
        assert_eq!(scene.object(b).unwrap().parent, None);

        scene.clear_collection(root);
        assert!(scene.children(a).is_empty());
    }

    #[test]
    fn linked_duplicates_share_mesh_until_made_single_user() {
        let mut scene = Scene::new("s");
        let root = scene.root_collection();
        let a = mesh_object(&mut scene, "A", root);
        let b = scene.duplicate_object(a, "B", root, true).unwrap();
        let c = scene.duplicate_object(a, "C", root, false).unwrap();

        let mesh_a = scene.object(a).unwrap().kind.mesh().unwrap();
        assert_eq!(scene.object(b).unwrap().kind.mesh(), Some(mesh_a));
        assert_ne!(scene.object(c).unwrap().kind.mesh(), Some(mesh_a));
        assert_eq!(scene.mesh(mesh_a).unwrap().users(), 2);

        let own = scene.make_single_user(b).unwrap();
        assert_ne!(own, mesh_a);
        assert_eq!(scene.mesh(mesh_a).unwrap().users(), 1);
        assert_eq!(scene.mesh(own).unwrap().users(), 1);
    }

    #[test]
    fn collections_nest_and_clear() {
        let mut scene = Scene::new("s");
        let outer = scene.add_collection("outer", None);
        let inner = scene.add_collection("inner", Some(outer));
        let a = mesh_object(&mut scene, "A", outer);
        let b = mesh_object(&mut scene, "B", inner);
        assert_eq!(scene.objects_in(outer), vec![a, b]);
        assert_eq!(scene.roots_in(outer), vec![a, b]);

        assert_eq!(scene.clear_collection(outer), 2);
        assert_eq!(scene.object_count(), 0);
        assert!(scene.collection(inner).is_some());

        scene.delete_collection(outer).unwrap();
        assert!(scene.collection(inner).is_none());
        assert!(scene.collection(scene.root_collection()).unwrap().children.is_empty());
    }

    #[test]
    fn output_collections_follow_scene_name() {
        let mut scene = Scene::new("Crate");
        let low = scene.ensure_output_collection(TargetSet::Low);
        assert_eq!(scene.collection(low).unwrap().name, "Crate_low");
        assert_eq!(scene.ensure_output_collection(TargetSet::Low), low);
        assert_eq!(scene.output_collection(TargetSet::Export), None);
    }
}
