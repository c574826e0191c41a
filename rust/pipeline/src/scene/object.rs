// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene objects and their declarative per-object tags.

use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};

use super::{CollectionKey, MeshKey, ObjectKey};
use crate::modifiers::Modifier;

/// What an object holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Mesh(MeshKey),
    /// Locator. May instance a collection.
    Empty {
        instance_collection: Option<CollectionKey>,
    },
    /// Skeleton root. Never merged with its children.
    Armature,
}

impl ObjectKind {
    pub fn empty() -> Self {
        ObjectKind::Empty {
            instance_collection: None,
        }
    }

    pub fn mesh(&self) -> Option<MeshKey> {
        match self {
            ObjectKind::Mesh(m) => Some(*m),
            _ => None,
        }
    }

    pub fn is_mesh(&self) -> bool {
        matches!(self, ObjectKind::Mesh(_))
    }

    /// Non-geometry locators (empties).
    pub fn is_locator(&self) -> bool {
        matches!(self, ObjectKind::Empty { .. })
    }

    pub fn is_armature(&self) -> bool {
        matches!(self, ObjectKind::Armature)
    }

    pub fn instance_collection(&self) -> Option<CollectionKey> {
        match self {
            ObjectKind::Empty {
                instance_collection,
            } => *instance_collection,
            _ => None,
        }
    }
}

/// How an object takes part in baking and export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Standard,
    /// Baking-only source, for example a sculpt.
    Projected,
    /// Deprecated projected decal.
    Decal,
    /// Pre-made trim sheet geometry. Exported with its own materials.
    Trim,
    /// Shadow caster in the high-poly set.
    Occluder,
    Ignored,
}

/// Which bake sets receive a collection instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceBake {
    None,
    Low,
    #[default]
    LowHigh,
    High,
}

impl InstanceBake {
    pub fn in_low(self) -> bool {
        matches!(self, InstanceBake::Low | InstanceBake::LowHigh)
    }

    pub fn in_high(self) -> bool {
        matches!(self, InstanceBake::High | InstanceBake::LowHigh)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shading {
    #[default]
    Flat,
    Smooth,
    WeightedNormals,
}

/// Declarative object-level tags.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectProps {
    pub role: Role,
    pub texture_set: u32,
    pub merge_with_parent: bool,
    pub bake_anchor: Option<ObjectKey>,
    pub export_anchor: Option<ObjectKey>,
    /// Leave an occluder copy behind when the bake anchor moves the object.
    pub bake_ghost: bool,
    /// Bake the object onto itself in the high-poly set.
    pub include_self: bool,
    pub remove_hard_edges: bool,
    /// Manually linked high-poly sources.
    pub high_polys: Vec<ObjectKey>,
    /// 0 uses the scene default.
    pub cage_offset: f64,
    pub instance_bake: InstanceBake,
    pub instance_allow_export: bool,
    /// Read by external unwrap tooling only.
    pub unwrap: bool,
    pub shading: Shading,
}

impl Default for ObjectProps {
    fn default() -> Self {
        Self {
            role: Role::Standard,
            texture_set: 0,
            merge_with_parent: true,
            bake_anchor: None,
            export_anchor: None,
            bake_ghost: false,
            include_self: true,
            remove_hard_edges: true,
            high_polys: Vec::new(),
            cage_offset: 0.0,
            instance_bake: InstanceBake::default(),
            instance_allow_export: true,
            unwrap: true,
            shading: Shading::default(),
        }
    }
}

/// An object of the scene graph.
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub(crate) name: String,
    pub kind: ObjectKind,
    pub parent: Option<ObjectKey>,
    /// Transform relative to the parent.
    pub local: Matrix4<f64>,
    pub props: ObjectProps,
    pub modifiers: Vec<Modifier>,
    /// Working-scene object this one was generated from, kept across runs.
    pub origin: Option<ObjectKey>,
}

impl SceneObject {
    pub fn new(name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            name: name.into(),
            kind,
            parent: None,
            local: Matrix4::identity(),
            props: ObjectProps::default(),
            modifiers: Vec::new(),
            origin: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
