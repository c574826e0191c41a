// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON scene documents.
//!
//! A document describes a working scene by names: collections, mesh data
//! (positions, faces, UVs and tag layers), objects with their transforms,
//! properties and modifier stacks, plus the pipeline settings. References
//! between objects are resolved after every object exists, so a document may
//! list children before their parents.
//!
//! ```json
//! {
//!   "name": "Crate",
//!   "working": "Work",
//!   "collections": [{ "name": "Work" }],
//!   "meshes": [{ "name": "Box", "positions": [[0,0,0],[1,0,0],[1,1,0]],
//!                "faces": [{ "vertices": [0,1,2] }] }],
//!   "objects": [{ "name": "Box", "type": "mesh", "mesh": "Box",
//!                 "collections": ["Work"] }]
//! }
//! ```

use gamiflow_mesh::{MeshSnapshot, PolyMesh};
use nalgebra::{Matrix4, Rotation3, Vector3};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::modifiers::{Modifier, ModifierKind};
use crate::scene::{
    CollectionKey, InstanceBake, MeshKey, ObjectKey, ObjectKind, ObjectProps, Role, Scene,
    SceneObject, Shading,
};

fn yes() -> bool {
    true
}

fn unit_scale() -> [f64; 3] {
    [1.0, 1.0, 1.0]
}

fn is_false(b: &bool) -> bool {
    !*b
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    pub name: String,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub texture_sets: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working: Option<String>,
    #[serde(default)]
    pub collections: Vec<CollectionDoc>,
    #[serde(default)]
    pub meshes: Vec<MeshDoc>,
    #[serde(default)]
    pub objects: Vec<ObjectDoc>,
}

/// A collection. `parent` must name a collection listed earlier; top-level
/// collections go under the scene root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionDoc {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub instance_offset: [f64; 3],
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshDoc {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<String>,
    #[serde(flatten)]
    pub geometry: MeshSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KindDoc {
    Mesh {
        mesh: String,
    },
    Empty {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        instance_collection: Option<String>,
    },
    Armature,
}

/// Location, XYZ euler rotation in radians and scale, or a full row-major
/// matrix that takes precedence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformDoc {
    #[serde(default)]
    pub location: [f64; 3],
    #[serde(default)]
    pub rotation: [f64; 3],
    #[serde(default = "unit_scale")]
    pub scale: [f64; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix: Option<[[f64; 4]; 4]>,
}

impl Default for TransformDoc {
    fn default() -> Self {
        Self {
            location: [0.0; 3],
            rotation: [0.0; 3],
            scale: unit_scale(),
            matrix: None,
        }
    }
}

impl TransformDoc {
    pub fn to_matrix(&self) -> Matrix4<f64> {
        if let Some(rows) = &self.matrix {
            return Matrix4::from_fn(|r, c| rows[r][c]);
        }
        let [x, y, z] = self.location;
        let [rx, ry, rz] = self.rotation;
        Matrix4::new_translation(&Vector3::new(x, y, z))
            * Rotation3::from_euler_angles(rx, ry, rz).to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&Vector3::from(self.scale))
    }

    pub fn from_matrix(matrix: &Matrix4<f64>) -> Self {
        let mut rows = [[0.0; 4]; 4];
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, value) in row.iter_mut().enumerate() {
                *value = matrix[(r, c)];
            }
        }
        Self {
            matrix: Some(rows),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropsDoc {
    pub role: Role,
    pub texture_set: u32,
    pub merge_with_parent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bake_anchor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_anchor: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub bake_ghost: bool,
    pub include_self: bool,
    pub remove_hard_edges: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub high_polys: Vec<String>,
    pub cage_offset: f64,
    pub instance_bake: InstanceBake,
    pub instance_allow_export: bool,
    pub unwrap: bool,
    pub shading: Shading,
}

impl Default for PropsDoc {
    fn default() -> Self {
        let props = ObjectProps::default();
        Self {
            role: props.role,
            texture_set: props.texture_set,
            merge_with_parent: props.merge_with_parent,
            bake_anchor: None,
            export_anchor: None,
            bake_ghost: props.bake_ghost,
            include_self: props.include_self,
            remove_hard_edges: props.remove_hard_edges,
            high_polys: Vec::new(),
            cage_offset: props.cage_offset,
            instance_bake: props.instance_bake,
            instance_allow_export: props.instance_allow_export,
            unwrap: props.unwrap,
            shading: props.shading,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModifierKindDoc {
    Triangulate,
    Mirror {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mirror_object: Option<String>,
        #[serde(default = "yes")]
        merge: bool,
        #[serde(default = "default_merge_threshold")]
        merge_threshold: f64,
        #[serde(default)]
        offset_u: f64,
        #[serde(default)]
        offset_v: f64,
    },
    Array {
        count: u32,
        #[serde(default)]
        constant_offset: [f64; 3],
        #[serde(default)]
        offset_u: f64,
        #[serde(default)]
        offset_v: f64,
    },
    WeightedNormal,
    Bevel {
        #[serde(default)]
        width: f64,
        #[serde(default)]
        segments: u32,
    },
    Armature {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        object: Option<String>,
    },
    Other {
        kind: String,
    },
}

fn default_merge_threshold() -> f64 {
    1e-3
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierDoc {
    pub name: String,
    #[serde(default = "yes")]
    pub show_render: bool,
    #[serde(flatten)]
    pub kind: ModifierKindDoc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDoc {
    pub name: String,
    #[serde(flatten)]
    pub kind: KindDoc,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub transform: TransformDoc,
    /// Collections the object is linked to. Empty means the working
    /// collection, or the scene root without one.
    #[serde(default)]
    pub collections: Vec<String>,
    #[serde(default)]
    pub props: PropsDoc,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modifiers: Vec<ModifierDoc>,
}

struct Names<'a> {
    objects: &'a FxHashMap<String, ObjectKey>,
}

impl Names<'_> {
    fn object(&self, owner: &str, name: &str) -> Result<ObjectKey> {
        self.objects
            .get(name)
            .copied()
            .ok_or_else(|| Error::Document(format!("{owner}: unknown object '{name}'")))
    }

    fn optional(&self, owner: &str, name: Option<&String>) -> Result<Option<ObjectKey>> {
        name.map(|n| self.object(owner, n)).transpose()
    }
}

impl SceneDocument {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Builds the scene described by the document.
    pub fn to_scene(&self) -> Result<Scene> {
        let mut scene = Scene::new(self.name.clone());
        if !self.texture_sets.is_empty() {
            scene.texture_sets = self.texture_sets.clone();
        }

        let mut collections: FxHashMap<String, CollectionKey> = FxHashMap::default();
        for doc in &self.collections {
            if collections.contains_key(&doc.name) {
                return Err(Error::Document(format!("duplicate collection '{}'", doc.name)));
            }
            let parent = match &doc.parent {
                Some(p) => Some(*collections.get(p).ok_or_else(|| {
                    Error::Document(format!("collection {}: unknown parent '{p}'", doc.name))
                })?),
                None => None,
            };
            let key = scene.add_collection(&doc.name, parent);
            if let Some(c) = scene.collection_mut(key) {
                c.instance_offset = Vector3::from(doc.instance_offset);
            }
            collections.insert(doc.name.clone(), key);
        }
        let collection = |name: &str| {
            collections
                .get(name)
                .copied()
                .ok_or_else(|| Error::Document(format!("unknown collection '{name}'")))
        };

        scene.working = self.working.as_deref().map(collection).transpose()?;
        let default_collection = scene.working.unwrap_or(scene.root_collection());

        let mut meshes: FxHashMap<String, MeshKey> = FxHashMap::default();
        for doc in &self.meshes {
            let mesh = PolyMesh::from_snapshot(&doc.geometry)?;
            let key = scene.add_mesh(&doc.name, mesh, doc.materials.clone());
            if meshes.insert(doc.name.clone(), key).is_some() {
                return Err(Error::Document(format!("duplicate mesh '{}'", doc.name)));
            }
        }

        let mut objects: FxHashMap<String, ObjectKey> = FxHashMap::default();
        for doc in &self.objects {
            if objects.contains_key(&doc.name) {
                return Err(Error::Document(format!("duplicate object '{}'", doc.name)));
            }
            let kind = match &doc.kind {
                KindDoc::Mesh { mesh } => ObjectKind::Mesh(*meshes.get(mesh).ok_or_else(|| {
                    Error::Document(format!("{}: unknown mesh '{mesh}'", doc.name))
                })?),
                KindDoc::Empty {
                    instance_collection,
                } => ObjectKind::Empty {
                    instance_collection: instance_collection
                        .as_deref()
                        .map(collection)
                        .transpose()?,
                },
                KindDoc::Armature => ObjectKind::Armature,
            };
            let mut obj = SceneObject::new(doc.name.clone(), kind);
            obj.local = doc.transform.to_matrix();

            let links: Vec<CollectionKey> = if doc.collections.is_empty() {
                vec![default_collection]
            } else {
                doc.collections
                    .iter()
                    .map(|c| collection(c.as_str()))
                    .collect::<Result<_>>()?
            };
            let key = scene.insert_object(obj, links[0]);
            for &c in &links[1..] {
                scene.link_object(c, key);
            }
            objects.insert(doc.name.clone(), key);
        }

        let names = Names { objects: &objects };
        for doc in &self.objects {
            let key = names.object("objects", &doc.name)?;
            let parent = names.optional(&doc.name, doc.parent.as_ref())?;
            let props = ObjectProps {
                role: doc.props.role,
                texture_set: doc.props.texture_set,
                merge_with_parent: doc.props.merge_with_parent,
                bake_anchor: names.optional(&doc.name, doc.props.bake_anchor.as_ref())?,
                export_anchor: names.optional(&doc.name, doc.props.export_anchor.as_ref())?,
                bake_ghost: doc.props.bake_ghost,
                include_self: doc.props.include_self,
                remove_hard_edges: doc.props.remove_hard_edges,
                high_polys: doc
                    .props
                    .high_polys
                    .iter()
                    .map(|h| names.object(&doc.name, h))
                    .collect::<Result<_>>()?,
                cage_offset: doc.props.cage_offset,
                instance_bake: doc.props.instance_bake,
                instance_allow_export: doc.props.instance_allow_export,
                unwrap: doc.props.unwrap,
                shading: doc.props.shading,
            };
            let modifiers = doc
                .modifiers
                .iter()
                .map(|m| modifier_from_doc(&names, &doc.name, m))
                .collect::<Result<Vec<_>>>()?;

            if let Some(obj) = scene.object_mut(key) {
                obj.parent = parent;
                obj.props = props;
                obj.modifiers = modifiers;
            }
        }

        for (name, &key) in &objects {
            if scene.is_ancestor(key, key) {
                return Err(Error::Document(format!("parent cycle through '{name}'")));
            }
        }
        Ok(scene)
    }

    /// Describes the objects of `collections` (and their sub-collections).
    ///
    /// References to objects outside the dump are dropped; an object whose
    /// parent is outside keeps its world transform.
    pub fn from_scene(scene: &Scene, settings: &Settings, collections: &[CollectionKey]) -> Self {
        let mut doc = SceneDocument {
            name: scene.name.clone(),
            settings: settings.clone(),
            texture_sets: scene.texture_sets.clone(),
            ..Default::default()
        };

        let mut dumped: Vec<CollectionKey> = Vec::new();
        for &top in collections {
            for c in scene.collection_tree(top) {
                if !dumped.contains(&c) {
                    dumped.push(c);
                }
            }
        }
        for &c in &dumped {
            let Some(coll) = scene.collection(c) else {
                continue;
            };
            let parent = dumped
                .iter()
                .find(|p| scene.collection(**p).is_some_and(|pc| pc.children.contains(&c)))
                .and_then(|p| scene.collection(*p))
                .map(|p| p.name.clone());
            doc.collections.push(CollectionDoc {
                name: coll.name.clone(),
                parent,
                instance_offset: coll.instance_offset.into(),
            });
        }
        doc.working = scene
            .working
            .filter(|w| dumped.contains(w))
            .and_then(|w| scene.collection(w))
            .map(|c| c.name.clone());

        let mut objects: Vec<ObjectKey> = Vec::new();
        for &c in &dumped {
            for o in scene.objects_in(c) {
                if !objects.contains(&o) {
                    objects.push(o);
                }
            }
        }
        let included: FxHashSet<ObjectKey> = objects.iter().copied().collect();
        let name_of = |key: Option<ObjectKey>| {
            key.filter(|k| included.contains(k))
                .map(|k| scene.object_name(k).to_string())
        };

        let mut mesh_names: FxHashMap<MeshKey, String> = FxHashMap::default();
        let mut taken: FxHashSet<String> = FxHashSet::default();
        for &o in &objects {
            let Some(obj) = scene.object(o) else {
                continue;
            };
            let kind = match obj.kind {
                ObjectKind::Mesh(m) => {
                    let name = match mesh_names.get(&m) {
                        Some(n) => n.clone(),
                        None => {
                            let Some(data) = scene.mesh(m) else {
                                continue;
                            };
                            let mut name = data.name.clone();
                            let mut i = 1;
                            while taken.contains(&name) {
                                name = format!("{}.{i:03}", data.name);
                                i += 1;
                            }
                            taken.insert(name.clone());
                            mesh_names.insert(m, name.clone());
                            doc.meshes.push(MeshDoc {
                                name: name.clone(),
                                materials: data.materials.clone(),
                                geometry: data.mesh.to_snapshot(),
                            });
                            name
                        }
                    };
                    KindDoc::Mesh { mesh: name }
                }
                ObjectKind::Empty {
                    instance_collection,
                } => KindDoc::Empty {
                    instance_collection: instance_collection
                        .filter(|c| dumped.contains(c))
                        .and_then(|c| scene.collection(c))
                        .map(|c| c.name.clone()),
                },
                ObjectKind::Armature => KindDoc::Armature,
            };

            let parent = name_of(obj.parent);
            let transform = if parent.is_some() {
                obj.local
            } else {
                scene.world_matrix(o)
            };
            let p = &obj.props;
            doc.objects.push(ObjectDoc {
                name: obj.name().to_string(),
                kind,
                parent,
                transform: TransformDoc::from_matrix(&transform),
                collections: dumped
                    .iter()
                    .filter_map(|c| scene.collection(*c))
                    .filter(|c| c.objects.contains(&o))
                    .map(|c| c.name.clone())
                    .collect(),
                props: PropsDoc {
                    role: p.role,
                    texture_set: p.texture_set,
                    merge_with_parent: p.merge_with_parent,
                    bake_anchor: name_of(p.bake_anchor),
                    export_anchor: name_of(p.export_anchor),
                    bake_ghost: p.bake_ghost,
                    include_self: p.include_self,
                    remove_hard_edges: p.remove_hard_edges,
                    high_polys: p
                        .high_polys
                        .iter()
                        .filter_map(|h| name_of(Some(*h)))
                        .collect(),
                    cage_offset: p.cage_offset,
                    instance_bake: p.instance_bake,
                    instance_allow_export: p.instance_allow_export,
                    unwrap: p.unwrap,
                    shading: p.shading,
                },
                modifiers: obj
                    .modifiers
                    .iter()
                    .map(|m| modifier_to_doc(m, &name_of))
                    .collect(),
            });
        }
        doc
    }
}

fn modifier_from_doc(names: &Names<'_>, owner: &str, doc: &ModifierDoc) -> Result<Modifier> {
    let kind = match &doc.kind {
        ModifierKindDoc::Triangulate => ModifierKind::Triangulate,
        ModifierKindDoc::Mirror {
            mirror_object,
            merge,
            merge_threshold,
            offset_u,
            offset_v,
        } => ModifierKind::Mirror {
            mirror_object: names.optional(owner, mirror_object.as_ref())?,
            merge: *merge,
            merge_threshold: *merge_threshold,
            offset_u: *offset_u,
            offset_v: *offset_v,
        },
        ModifierKindDoc::Array {
            count,
            constant_offset,
            offset_u,
            offset_v,
        } => ModifierKind::Array {
            count: *count,
            constant_offset: Vector3::from(*constant_offset),
            offset_u: *offset_u,
            offset_v: *offset_v,
        },
        ModifierKindDoc::WeightedNormal => ModifierKind::WeightedNormal,
        ModifierKindDoc::Bevel { width, segments } => ModifierKind::Bevel {
            width: *width,
            segments: *segments,
        },
        ModifierKindDoc::Armature { object } => ModifierKind::Armature {
            object: names.optional(owner, object.as_ref())?,
        },
        ModifierKindDoc::Other { kind } => ModifierKind::Other(kind.clone()),
    };
    Ok(Modifier {
        name: doc.name.clone(),
        kind,
        show_render: doc.show_render,
    })
}

fn modifier_to_doc(modifier: &Modifier, name_of: &impl Fn(Option<ObjectKey>) -> Option<String>) -> ModifierDoc {
    let kind = match &modifier.kind {
        ModifierKind::Triangulate => ModifierKindDoc::Triangulate,
        ModifierKind::Mirror {
            mirror_object,
            merge,
            merge_threshold,
            offset_u,
            offset_v,
        } => ModifierKindDoc::Mirror {
            mirror_object: name_of(*mirror_object),
            merge: *merge,
            merge_threshold: *merge_threshold,
            offset_u: *offset_u,
            offset_v: *offset_v,
        },
        ModifierKind::Array {
            count,
            constant_offset,
            offset_u,
            offset_v,
        } => ModifierKindDoc::Array {
            count: *count,
            constant_offset: (*constant_offset).into(),
            offset_u: *offset_u,
            offset_v: *offset_v,
        },
        ModifierKind::WeightedNormal => ModifierKindDoc::WeightedNormal,
        ModifierKind::Bevel { width, segments } => ModifierKindDoc::Bevel {
            width: *width,
            segments: *segments,
        },
        ModifierKind::Armature { object } => ModifierKindDoc::Armature {
            object: name_of(*object),
        },
        ModifierKind::Other(kind) => ModifierKindDoc::Other { kind: kind.clone() },
    };
    ModifierDoc {
        name: modifier.name.clone(),
        show_render: modifier.show_render,
        kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    const CRATE: &str = r#"{
        "name": "Crate",
        "working": "Work",
        "texture_sets": ["Wood"],
        "settings": { "lp_suffix": "_lp" },
        "collections": [
            { "name": "Work" },
            { "name": "Bolts", "instance_offset": [0, 0, 1] }
        ],
        "meshes": [
            {
                "name": "Quad",
                "materials": ["wood"],
                "positions": [[0,0,0],[1,0,0],[1,1,0],[0,1,0]],
                "faces": [{ "vertices": [0,1,2,3] }],
                "layers": [{ "name": "gflow_face_mirror", "entries": [{ "element": [0], "value": 1 }] }]
            }
        ],
        "objects": [
            {
                "name": "Panel", "type": "mesh", "mesh": "Quad",
                "parent": "Root",
                "transform": { "location": [1, 0, 0] },
                "props": { "texture_set": 0, "export_anchor": "Root" },
                "modifiers": [
                    { "name": "Mirror", "type": "mirror", "mirror_object": "Root" },
                    { "name": "Hidden", "type": "bevel", "width": 0.1, "show_render": false }
                ]
            },
            { "name": "Root", "type": "empty", "transform": { "location": [0, 0, 2] } },
            { "name": "Bolt", "type": "empty", "instance_collection": "Bolts" }
        ]
    }"#;

    #[test]
    fn loads_scene() {
        let doc = SceneDocument::from_json(CRATE).unwrap();
        assert_eq!(doc.settings.lp_suffix, "_lp");
        assert_eq!(doc.settings.hp_suffix, "_high");
        let scene = doc.to_scene().unwrap();

        let work = scene.working.unwrap();
        assert_eq!(scene.objects_in(work).len(), 3);
        assert_eq!(scene.texture_set_name(0), "Wood");

        let panel = scene.find_object("Panel").unwrap();
        let root = scene.find_object("Root").unwrap();
        let obj = scene.object(panel).unwrap();
        assert_eq!(obj.parent, Some(root));
        assert_eq!(obj.props.export_anchor, Some(root));
        assert_eq!(obj.modifiers.len(), 2);
        assert_eq!(obj.modifiers[0].kind.object(), Some(root));
        assert!(!obj.modifiers[1].show_render);
        assert_relative_eq!(
            scene.world_matrix(panel).transform_point(&Point3::origin()),
            Point3::new(1.0, 0.0, 2.0)
        );

        let bolts = scene.find_collection("Bolts").unwrap();
        let bolt = scene.find_object("Bolt").unwrap();
        assert_eq!(scene.object(bolt).unwrap().kind.instance_collection(), Some(bolts));
        assert_eq!(scene.collection(bolts).unwrap().instance_offset.z, 1.0);

        let data = scene.object_mesh(panel).unwrap();
        assert_eq!(data.materials, vec!["wood".to_string()]);
        assert!(data.mesh.layer::<gamiflow_mesh::tags::FaceMirror>().is_some());
    }

    #[test]
    fn unknown_reference_is_rejected() {
        let json = r#"{ "name": "s", "objects": [
            { "name": "A", "type": "empty", "parent": "Ghost" }
        ] }"#;
        let err = SceneDocument::from_json(json).unwrap().to_scene().unwrap_err();
        assert!(matches!(err, Error::Document(msg) if msg.contains("Ghost")));
    }

    #[test]
    fn parent_cycle_is_rejected() {
        let json = r#"{ "name": "s", "objects": [
            { "name": "A", "type": "empty", "parent": "B" },
            { "name": "B", "type": "empty", "parent": "A" }
        ] }"#;
        let err = SceneDocument::from_json(json).unwrap().to_scene().unwrap_err();
        assert!(matches!(err, Error::Document(_)));
    }

    #[test]
    fn dump_and_reload_keeps_world_transforms() {
        let scene = SceneDocument::from_json(CRATE).unwrap().to_scene().unwrap();
        let work = scene.working.unwrap();
        let doc = SceneDocument::from_scene(&scene, &Settings::default(), &[work]);
        assert_eq!(doc.objects.len(), 3);
        assert_eq!(doc.meshes.len(), 1);
        // the instanced collection is outside the dump
        assert!(doc
            .objects
            .iter()
            .any(|o| o.kind == KindDoc::Empty { instance_collection: None }));

        let json = doc.to_json().unwrap();
        let again = SceneDocument::from_json(&json).unwrap().to_scene().unwrap();
        for name in ["Panel", "Root"] {
            let a = scene.find_object(name).unwrap();
            let b = again.find_object(name).unwrap();
            assert_relative_eq!(scene.world_matrix(a), again.world_matrix(b), epsilon = 1e-12);
        }
        let panel = again.find_object("Panel").unwrap();
        assert_eq!(again.object(panel).unwrap().modifiers.len(), 2);
    }

    #[test]
    fn euler_transform() {
        let t = TransformDoc {
            location: [1.0, 2.0, 3.0],
            rotation: [0.0, 0.0, std::f64::consts::FRAC_PI_2],
            scale: [2.0, 2.0, 2.0],
            matrix: None,
        };
        let p = t.to_matrix().transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Point3::new(1.0, 4.0, 3.0), epsilon = 1e-12);
        let back = TransformDoc::from_matrix(&t.to_matrix()).to_matrix();
        assert_relative_eq!(back, t.to_matrix(), epsilon = 1e-12);
    }
}
