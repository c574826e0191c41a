// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON serialization for meshes.
//!
//! Slot map keys are replaced by sequential indices: vertices and faces by
//! their position in the snapshot lists, edges by their endpoint pair and
//! corners by `(face, corner index)`. Tag layers are stored sparsely under
//! their storage names.

use nalgebra::{Point3, Vector2};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::arena::PolyMesh;
use crate::error::{Error, Result};
use crate::keys::*;
use crate::tags::*;

/// Serializable representation of a mesh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshSnapshot {
    pub positions: Vec<[f64; 3]>,
    pub faces: Vec<FaceSnapshot>,
    /// Edges carrying flags, plus loose edges.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edges: Vec<EdgeSnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub layers: Vec<LayerSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceSnapshot {
    pub vertices: Vec<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uvs: Vec<[f64; 2]>,
    #[serde(default)]
    pub material: u16,
    #[serde(default)]
    pub smooth: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSnapshot {
    pub a: usize,
    pub b: usize,
    #[serde(default)]
    pub sharp: bool,
    #[serde(default)]
    pub seam: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSnapshot {
    pub name: String,
    pub entries: Vec<LayerEntry>,
}

/// One tagged element. `element` is `[vertex]`, `[a, b]` for an edge,
/// `[face]` or `[face, corner]`, depending on the layer domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerEntry {
    pub element: Vec<usize>,
    pub value: f64,
}

struct IdMaps {
    vertices: FxHashMap<VertexKey, usize>,
    faces: FxHashMap<FaceKey, usize>,
}

fn collect_entries<T: TagLayer>(
    mesh: &PolyMesh,
    element: impl Fn(T::Key) -> Option<Vec<usize>>,
) -> Vec<LayerEntry>
where
    T::Value: Into<f64>,
{
    let Some(layer) = mesh.layer::<T>() else {
        return Vec::new();
    };
    let mut entries: Vec<LayerEntry> = layer
        .iter()
        .filter_map(|(k, v)| {
            element(k).map(|element| LayerEntry {
                element,
                value: v.into(),
            })
        })
        .collect();
    entries.sort_by(|a, b| a.element.cmp(&b.element));
    entries
}

fn apply_entries<T: TagLayer>(
    mesh: &mut PolyMesh,
    entries: &[LayerEntry],
    key: impl Fn(&PolyMesh, &[usize]) -> Result<T::Key>,
    value: impl Fn(f64) -> T::Value,
) -> Result<()> {
    mesh.get_or_create_layer::<T>();
    for entry in entries {
        let k = key(mesh, &entry.element)?;
        mesh.set_tag::<T>(k, value(entry.value));
    }
    Ok(())
}

fn index_at(element: &[usize], i: usize, domain: &'static str) -> Result<usize> {
    element
        .get(i)
        .copied()
        .ok_or(Error::IndexOutOfRange { domain, index: i })
}

fn as_int(v: f64) -> i32 {
    v.round() as i32
}

fn as_float(v: f64) -> f32 {
    v as f32
}

impl PolyMesh {
    /// Serializes the mesh to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.to_snapshot())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserializes a mesh from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: MeshSnapshot =
            serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))?;
        Self::from_snapshot(&snapshot)
    }

    /// Creates a serializable snapshot of the mesh.
    pub fn to_snapshot(&self) -> MeshSnapshot {
        let mut ids = IdMaps {
            vertices: FxHashMap::default(),
            faces: FxHashMap::default(),
        };

        let positions: Vec<[f64; 3]> = self
            .vertices
            .iter()
            .enumerate()
            .map(|(i, (k, v))| {
                ids.vertices.insert(k, i);
                [v.position.x, v.position.y, v.position.z]
            })
            .collect();

        let faces: Vec<FaceSnapshot> = self
            .faces
            .iter()
            .enumerate()
            .map(|(i, (k, f))| {
                ids.faces.insert(k, i);
                let has_uvs = f.corners.iter().any(|c| c.uv != Vector2::zeros());
                FaceSnapshot {
                    vertices: f.vertices().map(|v| ids.vertices[&v]).collect(),
                    uvs: if has_uvs {
                        f.corners.iter().map(|c| [c.uv.x, c.uv.y]).collect()
                    } else {
                        Vec::new()
                    },
                    material: f.material,
                    smooth: f.smooth,
                }
            })
            .collect();

        let edges: Vec<EdgeSnapshot> = self
            .edges
            .iter()
            .filter(|(k, e)| e.sharp || e.seam || self.edge_faces(*k).is_empty())
            .map(|(_, e)| EdgeSnapshot {
                a: ids.vertices[&e.a],
                b: ids.vertices[&e.b],
                sharp: e.sharp,
                seam: e.seam,
            })
            .collect();

        let edge_element = |k: EdgeKey| {
            let (a, b) = self.edge_vertices(k)?;
            let (a, b) = (*ids.vertices.get(&a)?, *ids.vertices.get(&b)?);
            Some(vec![a.min(b), a.max(b)])
        };
        let face_element = |k: FaceKey| Some(vec![*ids.faces.get(&k)?]);
        let vertex_element = |k: VertexKey| Some(vec![*ids.vertices.get(&k)?]);
        let corner_element = |k: CornerKey| {
            let face = self.faces.get(k.face)?;
            let corner = face.vertices().position(|v| v == k.vertex)?;
            Some(vec![*ids.faces.get(&k.face)?, corner])
        };

        let layers = self
            .layer_kinds()
            .into_iter()
            .map(|kind| {
                let entries = match kind {
                    LayerKind::EdgeDissolve => collect_entries::<EdgeDissolve>(self, edge_element),
                    LayerKind::EdgeCollapse => collect_entries::<EdgeCollapse>(self, edge_element),
                    LayerKind::EdgeUvOrientation => {
                        collect_entries::<EdgeUvOrientation>(self, edge_element)
                    }
                    LayerKind::FaceDetail => collect_entries::<FaceDetail>(self, face_element),
                    LayerKind::FaceMirror => collect_entries::<FaceMirror>(self, face_element),
                    LayerKind::FaceUvScale => collect_entries::<FaceUvScale>(self, face_element),
                    LayerKind::FaceGridify => collect_entries::<FaceGridify>(self, face_element),
                    LayerKind::VertexCageWeight => {
                        collect_entries::<VertexCageWeight>(self, vertex_element)
                    }
                    LayerKind::CornerCageHardness => {
                        collect_entries::<CornerCageHardness>(self, corner_element)
                    }
                };
                LayerSnapshot {
                    name: kind.name().to_string(),
                    entries,
                }
            })
            .collect();

        MeshSnapshot {
            positions,
            faces,
            edges,
            layers,
        }
    }

    /// Rebuilds a mesh from a snapshot, validating every index.
    pub fn from_snapshot(snapshot: &MeshSnapshot) -> Result<Self> {
        let mut mesh = PolyMesh::new();

        let verts: Vec<VertexKey> = snapshot
            .positions
            .iter()
            .map(|p| mesh.add_vertex(Point3::new(p[0], p[1], p[2])))
            .collect();
        let vertex = |i: usize| {
            verts
                .get(i)
                .copied()
                .ok_or(Error::IndexOutOfRange { domain: "vertex", index: i })
        };

        let mut faces: Vec<FaceKey> = Vec::with_capacity(snapshot.faces.len());
        for f in &snapshot.faces {
            let loop_verts = f
                .vertices
                .iter()
                .map(|&i| vertex(i))
                .collect::<Result<Vec<_>>>()?;
            let uvs: Vec<Vector2<f64>> = f.uvs.iter().map(|uv| Vector2::new(uv[0], uv[1])).collect();
            let fk = mesh.add_face_with_uvs(&loop_verts, &uvs)?;
            if let Some(face) = mesh.face_mut(fk) {
                face.material = f.material;
                face.smooth = f.smooth;
            }
            faces.push(fk);
        }

        for e in &snapshot.edges {
            let ek = mesh.ensure_edge(vertex(e.a)?, vertex(e.b)?);
            if let Some(edge) = mesh.edge_mut(ek) {
                edge.sharp = e.sharp;
                edge.seam = e.seam;
            }
        }

        let face_at = |i: usize| {
            faces
                .get(i)
                .copied()
                .ok_or(Error::IndexOutOfRange { domain: "face", index: i })
        };
        let edge_key = |m: &PolyMesh, el: &[usize]| {
            let a = vertex(index_at(el, 0, "edge")?)?;
            let b = vertex(index_at(el, 1, "edge")?)?;
            m.find_edge(a, b).ok_or(Error::IndexOutOfRange {
                domain: "edge",
                index: el[0],
            })
        };
        let face_key = |_: &PolyMesh, el: &[usize]| face_at(index_at(el, 0, "face")?);
        let vertex_key = |_: &PolyMesh, el: &[usize]| vertex(index_at(el, 0, "vertex")?);
        let corner_key = |m: &PolyMesh, el: &[usize]| {
            let fk = face_at(index_at(el, 0, "corner")?)?;
            let ci = index_at(el, 1, "corner")?;
            let v = m
                .face(fk)
                .and_then(|f| f.corners.get(ci))
                .map(|c| c.vertex)
                .ok_or(Error::IndexOutOfRange {
                    domain: "corner",
                    index: ci,
                })?;
            Ok(CornerKey::new(fk, v))
        };

        for layer in &snapshot.layers {
            let kind = LayerKind::from_name(&layer.name)
                .ok_or_else(|| Error::UnknownLayer(layer.name.clone()))?;
            let entries = &layer.entries;
            match kind {
                LayerKind::EdgeDissolve => {
                    apply_entries::<EdgeDissolve>(&mut mesh, entries, edge_key, as_int)?
                }
                LayerKind::EdgeCollapse => {
                    apply_entries::<EdgeCollapse>(&mut mesh, entries, edge_key, as_int)?
                }
                LayerKind::EdgeUvOrientation => {
                    apply_entries::<EdgeUvOrientation>(&mut mesh, entries, edge_key, as_int)?
                }
                LayerKind::FaceDetail => {
                    apply_entries::<FaceDetail>(&mut mesh, entries, face_key, as_int)?
                }
                LayerKind::FaceMirror => {
                    apply_entries::<FaceMirror>(&mut mesh, entries, face_key, as_int)?
                }
                LayerKind::FaceUvScale => {
                    apply_entries::<FaceUvScale>(&mut mesh, entries, face_key, as_float)?
                }
                LayerKind::FaceGridify => {
                    apply_entries::<FaceGridify>(&mut mesh, entries, face_key, as_int)?
                }
                LayerKind::VertexCageWeight => {
                    apply_entries::<VertexCageWeight>(&mut mesh, entries, vertex_key, as_float)?
                }
                LayerKind::CornerCageHardness => {
                    apply_entries::<CornerCageHardness>(&mut mesh, entries, corner_key, as_float)?
                }
            }
        }

        Ok(mesh)
    }
}
