// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed per-element tag layers.
//!
//! A tag layer is a sparse, typed array aligned with one element domain of a
//! mesh (vertices, edges, faces or face corners). Elements without a stored
//! value read as the layer's default (`0`). A mesh without a given layer
//! means "nothing tagged", which is never an error.
//!
//! Layers are a closed set described by [`LayerKind`]. Each kind has a marker
//! type implementing [`TagLayer`] so that accessors are statically typed:
//!
//! ```
//! use gamiflow_mesh::{tags, PolyMesh};
//! use gamiflow_mesh::tags::EdgeDissolve;
//! use nalgebra::Point3;
//!
//! let mut mesh = PolyMesh::new();
//! let a = mesh.add_vertex(Point3::origin());
//! let b = mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
//! let e = mesh.ensure_edge(a, b);
//!
//! assert!(mesh.layer::<EdgeDissolve>().is_none());
//! mesh.get_or_create_layer::<EdgeDissolve>().set(e, tags::LOD0);
//! assert_eq!(mesh.tag::<EdgeDissolve>(e), tags::LOD0);
//! ```

use std::fmt::Debug;
use std::hash::Hash;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::arena::PolyMesh;
use crate::keys::{Domain, EdgeKey, FaceKey, VertexKey};

/// Untagged element.
pub const DEFAULT: i32 = 0;
/// Edge removed for baking and LOD0 but kept in the painter set.
pub const PAINTER: i32 = 1;
/// Edge removed only by the cage pass.
pub const CAGE: i32 = -1;
/// First LOD code. `LOD0 + n` is removed once the active level reaches `n`.
pub const LOD0: i32 = 2;

pub const MIRROR_NONE: i32 = 0;
pub const MIRROR_X: i32 = 1;

pub const UV_ORIENTATION_NEUTRAL: i32 = 0;
pub const UV_ORIENTATION_VERTICAL: i32 = 1;
pub const UV_ORIENTATION_HORIZONTAL: i32 = 2;

pub const GRIDIFY_EXCLUDE: i32 = 0;
pub const GRIDIFY_INCLUDE: i32 = 1;

/// Encodes a UV scale factor so that the layer default (`0.0`) means 100%.
pub fn uv_scale_code(scale: f32) -> f32 {
    scale - 1.0
}

/// Decodes a stored UV scale code back to a scale factor.
pub fn uv_scale_from_code(code: f32) -> f32 {
    code + 1.0
}

/// Identifies one corner of a face. A face never visits the same vertex
/// twice, so `(face, vertex)` is unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CornerKey {
    pub face: FaceKey,
    pub vertex: VertexKey,
}

impl CornerKey {
    pub fn new(face: FaceKey, vertex: VertexKey) -> Self {
        Self { face, vertex }
    }
}

/// The closed set of tag layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayerKind {
    EdgeDissolve,
    EdgeCollapse,
    FaceDetail,
    FaceMirror,
    FaceUvScale,
    EdgeUvOrientation,
    FaceGridify,
    VertexCageWeight,
    CornerCageHardness,
}

impl LayerKind {
    pub const ALL: [LayerKind; 9] = [
        LayerKind::EdgeDissolve,
        LayerKind::EdgeCollapse,
        LayerKind::FaceDetail,
        LayerKind::FaceMirror,
        LayerKind::FaceUvScale,
        LayerKind::EdgeUvOrientation,
        LayerKind::FaceGridify,
        LayerKind::VertexCageWeight,
        LayerKind::CornerCageHardness,
    ];

    /// Storage name used in scene documents.
    pub fn name(&self) -> &'static str {
        match self {
            LayerKind::EdgeDissolve => "gflow_edge_lowpoly",
            LayerKind::EdgeCollapse => "gflow_edge_collapse",
            LayerKind::FaceDetail => "gflow_face_lowpoly",
            LayerKind::FaceMirror => "gflow_face_mirror",
            LayerKind::FaceUvScale => "gflow_face_uv_scale",
            LayerKind::EdgeUvOrientation => "gflow_edge_uv_orientation",
            // Historical spelling, kept for file compatibility.
            LayerKind::FaceGridify => "gflow_face_grifidy",
            LayerKind::VertexCageWeight => "gflow_vertex_cage_weight",
            LayerKind::CornerCageHardness => "gflow_corner_cage_hardness",
        }
    }

    /// Looks up a layer kind by storage name.
    pub fn from_name(name: &str) -> Option<LayerKind> {
        Self::ALL.iter().copied().find(|k| k.name() == name)
    }

    pub fn domain(&self) -> Domain {
        match self {
            LayerKind::EdgeDissolve | LayerKind::EdgeCollapse | LayerKind::EdgeUvOrientation => {
                Domain::Edge
            }
            LayerKind::FaceDetail
            | LayerKind::FaceMirror
            | LayerKind::FaceUvScale
            | LayerKind::FaceGridify => Domain::Face,
            LayerKind::VertexCageWeight => Domain::Vertex,
            LayerKind::CornerCageHardness => Domain::Corner,
        }
    }

    /// Returns `true` for float-valued layers.
    pub fn is_float(&self) -> bool {
        matches!(
            self,
            LayerKind::FaceUvScale | LayerKind::VertexCageWeight | LayerKind::CornerCageHardness
        )
    }
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A sparse typed layer. Missing entries read as `V::default()`.
#[derive(Debug, Clone)]
pub struct Layer<K, V> {
    values: FxHashMap<K, V>,
}

impl<K, V> Default for Layer<K, V> {
    fn default() -> Self {
        Self {
            values: FxHashMap::default(),
        }
    }
}

impl<K, V> Layer<K, V>
where
    K: Copy + Eq + Hash,
    V: Copy + Default + PartialEq,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored value, or `None` when the element was never set.
    pub fn get(&self, key: K) -> Option<V> {
        self.values.get(&key).copied()
    }

    /// Returns the stored value or the layer default.
    pub fn value(&self, key: K) -> V {
        self.values.get(&key).copied().unwrap_or_default()
    }

    /// Stores a value. Storing the default clears the entry.
    pub fn set(&mut self, key: K, value: V) {
        if value == V::default() {
            self.values.remove(&key);
        } else {
            self.values.insert(key, value);
        }
    }

    pub fn remove(&mut self, key: K) -> Option<V> {
        self.values.remove(&key)
    }

    /// Number of elements holding a non-default value.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, V)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub(crate) fn retain(&mut self, mut keep: impl FnMut(&K) -> bool) {
        self.values.retain(|k, _| keep(k));
    }
}

/// Statically typed access to one layer of a [`TagStore`].
pub trait TagLayer {
    type Key: Copy + Eq + Hash + Debug;
    type Value: Copy + Default + PartialEq + Debug;
    const KIND: LayerKind;

    fn slot(store: &TagStore) -> &Option<Layer<Self::Key, Self::Value>>;
    fn slot_mut(store: &mut TagStore) -> &mut Option<Layer<Self::Key, Self::Value>>;
}

macro_rules! tag_layers {
    ($($(#[$meta:meta])* $marker:ident => $field:ident : $key:ty, $value:ty;)*) => {
        /// All tag layers of one mesh.
        #[derive(Debug, Clone, Default)]
        pub struct TagStore {
            $(pub(crate) $field: Option<Layer<$key, $value>>,)*
        }

        impl TagStore {
            /// Returns `true` when the given layer exists.
            pub fn has(&self, kind: LayerKind) -> bool {
                match kind {
                    $(LayerKind::$marker => self.$field.is_some(),)*
                }
            }

            /// Kinds of all existing layers, in declaration order.
            pub fn kinds(&self) -> Vec<LayerKind> {
                LayerKind::ALL.iter().copied().filter(|k| self.has(*k)).collect()
            }
        }

        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy)]
            pub struct $marker;

            impl TagLayer for $marker {
                type Key = $key;
                type Value = $value;
                const KIND: LayerKind = LayerKind::$marker;

                fn slot(store: &TagStore) -> &Option<Layer<$key, $value>> {
                    &store.$field
                }

                fn slot_mut(store: &mut TagStore) -> &mut Option<Layer<$key, $value>> {
                    &mut store.$field
                }
            }
        )*
    };
}

tag_layers! {
    /// Per-edge dissolve level.
    EdgeDissolve => edge_dissolve: EdgeKey, i32;
    /// Per-edge collapse level.
    EdgeCollapse => edge_collapse: EdgeKey, i32;
    /// Per-face detail level; detail faces are deleted by the reducer.
    FaceDetail => face_detail: FaceKey, i32;
    FaceMirror => face_mirror: FaceKey, i32;
    /// Encoded with [`uv_scale_code`].
    FaceUvScale => face_uv_scale: FaceKey, f32;
    EdgeUvOrientation => edge_uv_orientation: EdgeKey, i32;
    FaceGridify => face_gridify: FaceKey, i32;
    /// 0 is fully displaced by cage inflation, 1 is pinned.
    VertexCageWeight => vertex_cage_weight: VertexKey, f32;
    /// 0 follows the smooth vertex normal, 1 the face normal.
    CornerCageHardness => corner_cage_hardness: CornerKey, f32;
}

fn copy_entry<K, V>(layer: &mut Option<Layer<K, V>>, from: K, to: K)
where
    K: Copy + Eq + Hash,
    V: Copy + Default + PartialEq,
{
    if let Some(layer) = layer {
        match layer.get(from) {
            Some(v) => layer.set(to, v),
            None => {
                layer.remove(to);
            }
        }
    }
}

fn drop_entry<K, V>(layer: &mut Option<Layer<K, V>>, key: K)
where
    K: Copy + Eq + Hash,
    V: Copy + Default + PartialEq,
{
    if let Some(layer) = layer {
        layer.remove(key);
    }
}

// Tag propagation used by the topology operators.
impl TagStore {
    pub(crate) fn copy_edge(&mut self, from: EdgeKey, to: EdgeKey) {
        copy_entry(&mut self.edge_dissolve, from, to);
        copy_entry(&mut self.edge_collapse, from, to);
        copy_entry(&mut self.edge_uv_orientation, from, to);
    }

    pub(crate) fn copy_face(&mut self, from: FaceKey, to: FaceKey) {
        copy_entry(&mut self.face_detail, from, to);
        copy_entry(&mut self.face_mirror, from, to);
        copy_entry(&mut self.face_uv_scale, from, to);
        copy_entry(&mut self.face_gridify, from, to);
    }

    pub(crate) fn copy_vertex(&mut self, from: VertexKey, to: VertexKey) {
        copy_entry(&mut self.vertex_cage_weight, from, to);
    }

    pub(crate) fn copy_corner(&mut self, from: CornerKey, to: CornerKey) {
        copy_entry(&mut self.corner_cage_hardness, from, to);
    }

    pub(crate) fn drop_edge(&mut self, key: EdgeKey) {
        drop_entry(&mut self.edge_dissolve, key);
        drop_entry(&mut self.edge_collapse, key);
        drop_entry(&mut self.edge_uv_orientation, key);
    }

    pub(crate) fn drop_face(&mut self, key: FaceKey) {
        drop_entry(&mut self.face_detail, key);
        drop_entry(&mut self.face_mirror, key);
        drop_entry(&mut self.face_uv_scale, key);
        drop_entry(&mut self.face_gridify, key);
    }

    pub(crate) fn drop_vertex(&mut self, key: VertexKey) {
        drop_entry(&mut self.vertex_cage_weight, key);
    }

    pub(crate) fn drop_corner(&mut self, key: CornerKey) {
        drop_entry(&mut self.corner_cage_hardness, key);
    }

    /// Removes every corner entry of a face.
    pub(crate) fn drop_face_corners(&mut self, face: FaceKey) {
        if let Some(layer) = &mut self.corner_cage_hardness {
            layer.retain(|k| k.face != face);
        }
    }
}

impl PolyMesh {
    /// Returns the layer, or `None` when it was never created.
    pub fn layer<T: TagLayer>(&self) -> Option<&Layer<T::Key, T::Value>> {
        T::slot(&self.tags).as_ref()
    }

    pub fn layer_mut<T: TagLayer>(&mut self) -> Option<&mut Layer<T::Key, T::Value>> {
        T::slot_mut(&mut self.tags).as_mut()
    }

    /// Returns the layer, creating an empty one if needed.
    pub fn get_or_create_layer<T: TagLayer>(&mut self) -> &mut Layer<T::Key, T::Value> {
        T::slot_mut(&mut self.tags).get_or_insert_with(Layer::default)
    }

    /// Removes a layer and returns its contents.
    pub fn remove_layer<T: TagLayer>(&mut self) -> Option<Layer<T::Key, T::Value>> {
        T::slot_mut(&mut self.tags).take()
    }

    pub fn has_layer(&self, kind: LayerKind) -> bool {
        self.tags.has(kind)
    }

    /// Kinds of all layers present on this mesh.
    pub fn layer_kinds(&self) -> Vec<LayerKind> {
        self.tags.kinds()
    }

    /// Reads a tag value, returning the default when the layer or the entry
    /// is missing.
    pub fn tag<T: TagLayer>(&self, key: T::Key) -> T::Value {
        self.layer::<T>().map(|l| l.value(key)).unwrap_or_default()
    }

    /// Writes a tag value, creating the layer if needed.
    pub fn set_tag<T: TagLayer>(&mut self, key: T::Key, value: T::Value) {
        self.get_or_create_layer::<T>().set(key, value);
    }

    /// Sets the dissolve level of the given edges.
    pub fn set_edge_level(&mut self, edges: &[EdgeKey], level: i32) {
        let live: Vec<EdgeKey> = edges
            .iter()
            .copied()
            .filter(|e| self.edges.contains_key(*e))
            .collect();
        let layer = self.get_or_create_layer::<EdgeDissolve>();
        for e in live {
            layer.set(e, level);
        }
    }

    /// Selects every tagged edge that is removed at `level` or above
    /// (`code >= LOD0 + level`). The previous edge selection is replaced.
    pub fn select_edges_at_level(&mut self, level: i32) -> Vec<EdgeKey> {
        let mut found: Vec<EdgeKey> = match self.layer::<EdgeDissolve>() {
            Some(layer) => layer
                .iter()
                .filter(|(_, code)| *code != DEFAULT && *code >= LOD0 + level)
                .map(|(e, _)| e)
                .filter(|e| self.edges.contains_key(*e))
                .collect(),
            None => Vec::new(),
        };
        found.sort();
        self.selection.edges = found.iter().copied().collect();
        found
    }

    /// Marks faces as detail faces (deleted in the low sets, zero-sized in
    /// the UV layout) or resets them.
    ///
    /// Marking also flags the boundary of the face region as UV seams.
    pub fn mark_faces_as_detail(&mut self, faces: &[FaceKey], detail: bool) {
        let (scale, code) = if detail {
            (uv_scale_code(0.0), LOD0)
        } else {
            (uv_scale_code(1.0), DEFAULT)
        };

        let live: Vec<FaceKey> = faces
            .iter()
            .copied()
            .filter(|f| self.faces.contains_key(*f))
            .collect();

        if detail {
            let region: FxHashSet<FaceKey> = live.iter().copied().collect();
            let mut boundary = Vec::new();
            for &fk in &live {
                for ek in self.face_edges(fk) {
                    let inside = self
                        .edge_faces(ek)
                        .iter()
                        .filter(|f| region.contains(*f))
                        .count();
                    let total = self.edge_faces(ek).len();
                    if inside < total || total == 1 {
                        boundary.push(ek);
                    }
                }
            }
            for ek in boundary {
                if let Some(edge) = self.edges.get_mut(ek) {
                    edge.seam = true;
                }
            }
        }

        for &fk in &live {
            self.get_or_create_layer::<FaceUvScale>().set(fk, scale);
            self.get_or_create_layer::<FaceDetail>().set(fk, code);
        }
    }

    /// Tags faces for mirror expansion around the local X axis, or clears
    /// the tag.
    pub fn set_face_mirror(&mut self, faces: &[FaceKey], mirror: bool) {
        let code = if mirror { MIRROR_X } else { MIRROR_NONE };
        let live: Vec<FaceKey> = faces
            .iter()
            .copied()
            .filter(|f| self.faces.contains_key(*f))
            .collect();
        let layer = self.get_or_create_layer::<FaceMirror>();
        for fk in live {
            layer.set(fk, code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders;

    #[test]
    fn layer_names_round_trip() {
        for kind in LayerKind::ALL {
            assert_eq!(LayerKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(LayerKind::from_name("gflow_unknown"), None);
        assert_eq!(LayerKind::FaceGridify.name(), "gflow_face_grifidy");
    }

    #[test]
    fn absent_layer_reads_default() {
        let mesh = builders::quad_grid(2, 1, 1.0);
        let e = mesh.edge_keys().next().unwrap();
        assert!(mesh.layer::<EdgeCollapse>().is_none());
        assert_eq!(mesh.tag::<EdgeCollapse>(e), DEFAULT);
        assert!(!mesh.has_layer(LayerKind::EdgeCollapse));
    }

    #[test]
    fn create_set_and_remove_layer() {
        let mut mesh = builders::quad_grid(2, 1, 1.0);
        let e = mesh.edge_keys().next().unwrap();

        mesh.get_or_create_layer::<EdgeDissolve>().set(e, LOD0 + 1);
        assert_eq!(mesh.tag::<EdgeDissolve>(e), LOD0 + 1);
        assert_eq!(mesh.layer_kinds(), vec![LayerKind::EdgeDissolve]);

        let removed = mesh.remove_layer::<EdgeDissolve>().unwrap();
        assert_eq!(removed.len(), 1);
        assert!(mesh.layer::<EdgeDissolve>().is_none());
    }

    #[test]
    fn setting_default_clears_entry() {
        let mut layer: Layer<u32, i32> = Layer::new();
        layer.set(3, 5);
        assert_eq!(layer.len(), 1);
        layer.set(3, 0);
        assert!(layer.is_empty());
        assert_eq!(layer.value(3), 0);
    }

    #[test]
    fn uv_scale_codes() {
        assert_eq!(uv_scale_code(1.0), 0.0);
        assert_eq!(uv_scale_code(0.0), -1.0);
        assert_eq!(uv_scale_from_code(uv_scale_code(0.25)), 0.25);
    }

    #[test]
    fn select_edges_at_level_uses_threshold() {
        let mut mesh = builders::quad_grid(3, 1, 1.0);
        let edges: Vec<EdgeKey> = mesh.edge_keys().collect();
        mesh.set_edge_level(&edges[0..1], LOD0);
        mesh.set_edge_level(&edges[1..2], LOD0 + 1);
        mesh.set_edge_level(&edges[2..3], PAINTER);

        let selected = mesh.select_edges_at_level(1);
        assert_eq!(selected, vec![edges[1]]);

        let selected = mesh.select_edges_at_level(0);
        assert_eq!(selected.len(), 2);
        assert_eq!(mesh.selection().edges.len(), 2);
    }

    #[test]
    fn mark_detail_sets_scale_and_seams() {
        let mut mesh = builders::quad_grid(2, 1, 1.0);
        let faces: Vec<FaceKey> = mesh.face_keys().collect();

        mesh.mark_faces_as_detail(&faces[0..1], true);
        assert_eq!(mesh.tag::<FaceDetail>(faces[0]), LOD0);
        assert_eq!(mesh.tag::<FaceUvScale>(faces[0]), -1.0);
        assert_eq!(mesh.tag::<FaceDetail>(faces[1]), DEFAULT);

        let seams = mesh.edge_keys().filter(|e| mesh.edge(*e).unwrap().seam).count();
        assert_eq!(seams, 4);

        mesh.mark_faces_as_detail(&faces[0..1], false);
        assert_eq!(mesh.tag::<FaceDetail>(faces[0]), DEFAULT);
        assert_eq!(mesh.tag::<FaceUvScale>(faces[0]), 0.0);
    }

    #[test]
    fn face_mirror_toggle() {
        let mut mesh = builders::quad_grid(2, 2, 1.0);
        let faces: Vec<FaceKey> = mesh.face_keys().collect();
        mesh.set_face_mirror(&faces, true);
        assert_eq!(mesh.layer::<FaceMirror>().unwrap().len(), 4);
        mesh.set_face_mirror(&faces[..2], false);
        assert_eq!(mesh.layer::<FaceMirror>().unwrap().len(), 2);
    }
}
