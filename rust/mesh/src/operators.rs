// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Topology operators.
//!
//! Every operator keeps the adjacency indices and the tag store consistent:
//!
//! - duplicated elements copy their tags,
//! - a merged face keeps the key and tags of the face it absorbed the other
//!   into,
//! - an edge that survives a collapse keeps its key and tags,
//! - removed elements drop their tags.
//!
//! Stale keys passed to an operator are skipped, never an error.

use nalgebra::{Matrix4, Point3};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::arena::{Corner, PolyMesh};
use crate::keys::*;
use crate::spatial::SpatialIndex;
use crate::tags::*;

/// Key mapping produced by [`PolyMesh::duplicate_faces`].
#[derive(Debug, Clone, Default)]
pub struct DuplicateMap {
    pub vertices: FxHashMap<VertexKey, VertexKey>,
    pub faces: FxHashMap<FaceKey, FaceKey>,
}

impl DuplicateMap {
    /// The newly created faces, in key order.
    pub fn new_faces(&self) -> Vec<FaceKey> {
        let mut faces: Vec<FaceKey> = self.faces.values().copied().collect();
        faces.sort();
        faces
    }

    /// The newly created vertices, in key order.
    pub fn new_vertices(&self) -> Vec<VertexKey> {
        let mut verts: Vec<VertexKey> = self.vertices.values().copied().collect();
        verts.sort();
        verts
    }
}

/// Key mapping produced by [`PolyMesh::append`].
#[derive(Debug, Clone, Default)]
pub struct AppendMap {
    pub vertices: FxHashMap<VertexKey, VertexKey>,
    pub edges: FxHashMap<EdgeKey, EdgeKey>,
    pub faces: FxHashMap<FaceKey, FaceKey>,
}

fn import_layer<T: TagLayer>(
    dst: &mut PolyMesh,
    src: &PolyMesh,
    map: impl Fn(T::Key) -> Option<T::Key>,
) {
    let Some(layer) = src.layer::<T>() else {
        return;
    };
    let entries: Vec<(T::Key, T::Value)> = layer
        .iter()
        .filter_map(|(k, v)| map(k).map(|k| (k, v)))
        .collect();
    let target = dst.get_or_create_layer::<T>();
    for (k, v) in entries {
        target.set(k, v);
    }
}

impl PolyMesh {
    // --- Dissolve ---

    /// Dissolves edges, merging the two faces on each side into one polygon
    /// without splitting.
    ///
    /// Boundary and non-manifold edges are skipped. With `use_verts`, the
    /// endpoints of dissolved edges that are left joining exactly two edges
    /// are dissolved as well, as long as no adjacent face would drop below
    /// three corners. Returns the number of listed edges that are gone,
    /// including those a neighbouring dissolve folded away.
    pub fn dissolve_edges(&mut self, edges: &[EdgeKey], use_verts: bool) -> usize {
        let mut ordered: Vec<(EdgeKey, VertexKey, VertexKey)> = edges
            .iter()
            .filter_map(|&ek| self.edge_vertices(ek).map(|(a, b)| (ek, a, b)))
            .collect();
        ordered.sort();
        ordered.dedup();

        for &(ek, _, _) in &ordered {
            if self.edges.contains_key(ek) {
                self.dissolve_edge(ek);
            }
        }

        let mut endpoints = Vec::new();
        let mut dissolved = 0;
        for &(ek, a, b) in &ordered {
            if !self.edges.contains_key(ek) {
                dissolved += 1;
                endpoints.push(a);
                endpoints.push(b);
            }
        }

        if use_verts {
            endpoints.sort();
            endpoints.dedup();
            for vk in endpoints {
                self.dissolve_chain_vertex(vk);
            }
        }

        self.prune_selection();
        dissolved
    }

    fn dissolve_edge(&mut self, edge: EdgeKey) -> bool {
        let Some((a, b)) = self.edge_vertices(edge) else {
            return false;
        };
        let mut faces: SmallVec<[FaceKey; 4]> = SmallVec::new();
        for &f in self.edge_faces(edge) {
            if !faces.contains(&f) {
                faces.push(f);
            }
        }
        if faces.len() != 2 {
            return false;
        }
        let (keep, gone) = (faces[0], faces[1]);
        let Some(merged) = self.merged_loop(keep, gone, a, b) else {
            return false;
        };

        for (corner, from) in &merged {
            if *from == gone {
                self.tags.copy_corner(
                    CornerKey::new(gone, corner.vertex),
                    CornerKey::new(keep, corner.vertex),
                );
            }
        }
        let corners: SmallVec<[Corner; 4]> = merged.iter().map(|(c, _)| *c).collect();
        let mut loose = self.face_edges(gone);
        loose.push(edge);

        if self.remove_face(gone).is_err() {
            return false;
        }
        self.rewrite_face(keep, corners);
        self.retain_face_corner_tags(keep);
        self.remove_loose(loose, std::iter::empty());
        true
    }

    /// Builds the corner loop of `keep` and `gone` joined across edge
    /// `(a, b)`. Each corner is paired with the face it comes from.
    fn merged_loop(
        &self,
        keep: FaceKey,
        gone: FaceKey,
        a: VertexKey,
        b: VertexKey,
    ) -> Option<Vec<(Corner, FaceKey)>> {
        let l1: Vec<Corner> = self.faces.get(keep)?.corners.to_vec();
        let mut l2: Vec<Corner> = self.faces.get(gone)?.corners.to_vec();
        let n1 = l1.len();
        let n2 = l2.len();

        let i = (0..n1).find(|&i| {
            let (p, q) = (l1[i].vertex, l1[(i + 1) % n1].vertex);
            (p == a && q == b) || (p == b && q == a)
        })?;
        let u = l1[i].vertex;
        let w = l1[(i + 1) % n1].vertex;

        let directed = |l: &[Corner], x: VertexKey, y: VertexKey| {
            (0..l.len()).find(|&j| l[j].vertex == x && l[(j + 1) % l.len()].vertex == y)
        };
        // Consistent winding traverses the shared edge the other way round
        let j = match directed(&l2, w, u) {
            Some(j) => j,
            None => {
                l2.reverse();
                directed(&l2, w, u)?
            }
        };

        // keep: w .. u, then gone: interior of u .. w
        let mut merged: Vec<(Corner, FaceKey)> =
            (1..=n1).map(|k| (l1[(i + k) % n1], keep)).collect();
        merged.extend((2..n2).map(|k| (l2[(j + k) % n2], gone)));

        // Faces sharing more than one consecutive edge leave spurs p, q, p
        loop {
            let n = merged.len();
            if n < 3 {
                return None;
            }
            let spur = (0..n).find(|&k| merged[(k + n - 1) % n].0.vertex == merged[(k + 1) % n].0.vertex);
            match spur {
                Some(k) => {
                    let k1 = (k + 1) % n;
                    let (hi, lo) = if k1 > k { (k1, k) } else { (k, k1) };
                    merged.remove(hi);
                    merged.remove(lo);
                }
                None => break,
            }
        }

        let mut seen = FxHashSet::default();
        if !merged.iter().all(|(c, _)| seen.insert(c.vertex)) {
            return None;
        }
        Some(merged)
    }

    /// Removes a vertex joining exactly two edges from the faces around it,
    /// replacing its two edges with one.
    fn dissolve_chain_vertex(&mut self, vertex: VertexKey) -> bool {
        let edges: SmallVec<[EdgeKey; 4]> = self.vertex_edges(vertex).iter().copied().collect();
        if edges.len() != 2 {
            return false;
        }
        let p = self.edges.get(edges[0]).and_then(|e| e.other(vertex));
        let q = self.edges.get(edges[1]).and_then(|e| e.other(vertex));
        let (Some(p), Some(q)) = (p, q) else {
            return false;
        };
        if p == q || self.find_edge(p, q).is_some() {
            return false;
        }

        let faces = self.vertex_faces(vertex);
        if faces.is_empty() {
            return false;
        }
        if faces
            .iter()
            .any(|f| self.faces.get(*f).map_or(true, |d| d.len() <= 3))
        {
            return false;
        }

        let kept = edges[0];
        let (sharp, seam) = self
            .edges
            .get(kept)
            .map(|e| (e.sharp, e.seam))
            .unwrap_or_default();

        for fk in faces {
            let Some(face) = self.faces.get(fk) else {
                continue;
            };
            let corners: SmallVec<[Corner; 4]> = face
                .corners
                .iter()
                .copied()
                .filter(|c| c.vertex != vertex)
                .collect();
            self.tags.drop_corner(CornerKey::new(fk, vertex));
            self.rewrite_face(fk, corners);
        }

        if let Some(joined) = self.find_edge(p, q) {
            self.tags.copy_edge(kept, joined);
            if let Some(e) = self.edges.get_mut(joined) {
                e.sharp = sharp;
                e.seam = seam;
            }
        }
        self.remove_loose(edges, [vertex]);
        true
    }

    fn retain_face_corner_tags(&mut self, face: FaceKey) {
        let verts: SmallVec<[VertexKey; 8]> = match self.faces.get(face) {
            Some(f) => f.vertices().collect(),
            None => SmallVec::new(),
        };
        if let Some(layer) = &mut self.tags.corner_cage_hardness {
            layer.retain(|k| k.face != face || verts.contains(&k.vertex));
        }
    }

    // --- Collapse / merge ---

    /// Collapses edges, welding both endpoints at the edge midpoint.
    ///
    /// Corner UVs are kept as they are. Faces that drop below three corners
    /// are removed. Returns the number of edges collapsed.
    pub fn collapse_edges(&mut self, edges: &[EdgeKey]) -> usize {
        let mut ordered = edges.to_vec();
        ordered.sort();
        ordered.dedup();

        let mut collapsed = 0;
        for ek in ordered {
            let Some((a, b)) = self.edge_vertices(ek) else {
                continue;
            };
            let (Some(pa), Some(pb)) = (self.position(a), self.position(b)) else {
                continue;
            };
            self.set_position(a, Point3::from((pa.coords + pb.coords) / 2.0));
            self.merge_vertex_into(b, a);
            collapsed += 1;
        }
        self.prune_selection();
        collapsed
    }

    /// Merges `src` into `dst`. `dst` keeps its position and tags.
    pub(crate) fn merge_vertex_into(&mut self, src: VertexKey, dst: VertexKey) {
        if src == dst || !self.vertices.contains_key(src) || !self.vertices.contains_key(dst) {
            return;
        }

        let faces = self.vertex_faces(src);
        for &fk in &faces {
            self.unlink_face_edges(fk);
        }

        let src_edges: SmallVec<[EdgeKey; 4]> = self.vertex_edges(src).iter().copied().collect();
        let mut touched: Vec<EdgeKey> = Vec::new();
        for ek in src_edges {
            let Some(other) = self.edges.get(ek).and_then(|e| e.other(src)) else {
                continue;
            };
            if other == dst {
                self.remove_edge_raw(ek);
                continue;
            }
            if let Some(existing) = self.find_edge(dst, other) {
                let (sharp, seam) = self
                    .edges
                    .get(ek)
                    .map(|e| (e.sharp, e.seam))
                    .unwrap_or_default();
                if let Some(e) = self.edges.get_mut(existing) {
                    e.sharp |= sharp;
                    e.seam |= seam;
                }
                self.remove_edge_raw(ek);
                touched.push(existing);
            } else {
                self.edge_lookup.remove(&crate::arena::edge_pair(src, other));
                if let Some(e) = self.edges.get_mut(ek) {
                    if e.a == src {
                        e.a = dst;
                    } else {
                        e.b = dst;
                    }
                }
                self.edge_lookup
                    .insert(crate::arena::edge_pair(dst, other), ek);
                self.unlink_vertex_edge(src, ek);
                self.link_vertex_edge(dst, ek);
                touched.push(ek);
            }
        }

        let mut orphaned: Vec<VertexKey> = Vec::new();
        for fk in faces {
            let Some(face) = self.faces.get(fk) else {
                continue;
            };
            let has_dst = face.vertices().any(|v| v == dst);
            let corners: SmallVec<[Corner; 4]> = if has_dst {
                face.corners
                    .iter()
                    .copied()
                    .filter(|c| c.vertex != src)
                    .collect()
            } else {
                face.corners
                    .iter()
                    .map(|c| {
                        if c.vertex == src {
                            Corner::new(dst, c.uv)
                        } else {
                            *c
                        }
                    })
                    .collect()
            };
            if !has_dst {
                self.tags
                    .copy_corner(CornerKey::new(fk, src), CornerKey::new(fk, dst));
            }
            self.tags.drop_corner(CornerKey::new(fk, src));

            if corners.len() < 3 {
                orphaned.extend(corners.iter().map(|c| c.vertex));
                self.tags.drop_face(fk);
                self.tags.drop_face_corners(fk);
                self.selection.faces.remove(&fk);
                self.faces.remove(fk);
                continue;
            }
            if let Some(face) = self.faces.get_mut(fk) {
                face.corners = corners;
            }
            self.link_face_edges(fk);
        }

        self.remove_vertex_raw(src);

        let mut candidates: Vec<EdgeKey> = self.vertex_edges(dst).to_vec();
        candidates.extend(touched);
        candidates.sort();
        candidates.dedup();
        self.remove_loose(candidates, orphaned);
    }

    // --- Duplicate ---

    /// Duplicates faces together with their vertices and edges.
    ///
    /// The copies are disconnected from the originals and carry the same
    /// UVs, materials, edge flags and tags.
    pub fn duplicate_faces(&mut self, faces: &[FaceKey]) -> DuplicateMap {
        let mut map = DuplicateMap::default();

        for &fk in faces {
            let Some(face) = self.faces.get(fk) else {
                continue;
            };
            if map.faces.contains_key(&fk) {
                continue;
            }
            let corners: Vec<Corner> = face.corners.to_vec();
            let (material, smooth) = (face.material, face.smooth);

            let mut new_corners: SmallVec<[Corner; 4]> = SmallVec::new();
            for c in &corners {
                let nv = match map.vertices.get(&c.vertex) {
                    Some(&nv) => nv,
                    None => {
                        let Some(p) = self.position(c.vertex) else {
                            continue;
                        };
                        let nv = self.add_vertex(p);
                        self.tags.copy_vertex(c.vertex, nv);
                        map.vertices.insert(c.vertex, nv);
                        nv
                    }
                };
                new_corners.push(Corner::new(nv, c.uv));
            }
            if new_corners.len() < 3 {
                continue;
            }

            let nf = self.insert_face(new_corners, material, smooth);
            self.tags.copy_face(fk, nf);
            for c in &corners {
                if let Some(&nv) = map.vertices.get(&c.vertex) {
                    self.tags
                        .copy_corner(CornerKey::new(fk, c.vertex), CornerKey::new(nf, nv));
                }
            }
            map.faces.insert(fk, nf);

            let n = corners.len();
            for i in 0..n {
                let (a, b) = (corners[i].vertex, corners[(i + 1) % n].vertex);
                let (Some(old), Some(&na), Some(&nb)) = (
                    self.find_edge(a, b),
                    map.vertices.get(&a),
                    map.vertices.get(&b),
                ) else {
                    continue;
                };
                let Some(new) = self.find_edge(na, nb) else {
                    continue;
                };
                self.tags.copy_edge(old, new);
                let flags = self.edges.get(old).map(|e| (e.sharp, e.seam));
                if let (Some((sharp, seam)), Some(e)) = (flags, self.edges.get_mut(new)) {
                    e.sharp = sharp;
                    e.seam = seam;
                }
            }
        }

        map
    }

    // --- Weld ---

    /// Merges vertices among `vertices` that lie within `threshold` of each
    /// other, then removes faces that became exact duplicates.
    ///
    /// The lowest key of each cluster survives. Returns the number of
    /// vertices merged away.
    pub fn weld_vertices(&mut self, vertices: &[VertexKey], threshold: f64) -> usize {
        let mut candidates: Vec<VertexKey> = vertices
            .iter()
            .copied()
            .filter(|v| self.vertices.contains_key(*v))
            .collect();
        candidates.sort();
        candidates.dedup();

        let index = SpatialIndex::from_vertices(self, &candidates, threshold.max(1e-10));
        let mut target: FxHashMap<VertexKey, VertexKey> = FxHashMap::default();
        let mut roots: FxHashSet<VertexKey> = FxHashSet::default();

        for &vk in &candidates {
            if target.contains_key(&vk) {
                continue;
            }
            let Some(p) = self.position(vk) else {
                continue;
            };
            for other in index.find_all_near(self, &p, threshold) {
                if other != vk && !target.contains_key(&other) && !roots.contains(&other) {
                    target.insert(other, vk);
                    roots.insert(vk);
                }
            }
        }

        let mut pairs: Vec<(VertexKey, VertexKey)> = target.into_iter().collect();
        pairs.sort();
        for &(src, dst) in &pairs {
            self.merge_vertex_into(src, dst);
        }

        let mut survivors: Vec<VertexKey> = roots.into_iter().collect();
        survivors.sort();
        self.remove_duplicate_faces(&survivors);
        self.prune_selection();
        pairs.len()
    }

    /// Removes faces around `around` that use exactly the same vertex set as
    /// an earlier face. Returns the number removed.
    pub fn remove_duplicate_faces(&mut self, around: &[VertexKey]) -> usize {
        let mut seen: FxHashMap<SmallVec<[VertexKey; 4]>, FaceKey> = FxHashMap::default();
        let mut duplicates: Vec<FaceKey> = Vec::new();

        for &vk in around {
            let mut faces = self.vertex_faces(vk);
            faces.sort();
            for fk in faces {
                let Some(face) = self.faces.get(fk) else {
                    continue;
                };
                let mut key: SmallVec<[VertexKey; 4]> = face.vertices().collect();
                key.sort();
                match seen.get(&key).copied() {
                    Some(first) if first != fk => {
                        if !duplicates.contains(&fk) {
                            duplicates.push(fk);
                        }
                    }
                    Some(_) => {}
                    None => {
                        seen.insert(key, fk);
                    }
                }
            }
        }

        duplicates
            .into_iter()
            .filter(|fk| self.remove_face(*fk).is_ok())
            .count()
    }

    // --- Join ---

    /// Appends a copy of `other`, transformed by `matrix`, to this mesh.
    ///
    /// `material_remap[i]` gives the slot in this mesh for slot `i` of
    /// `other`; slots beyond the table keep their index. Tags and edge flags
    /// are carried over. A mirroring matrix flips the appended faces.
    pub fn append(
        &mut self,
        other: &PolyMesh,
        matrix: &Matrix4<f64>,
        material_remap: &[u16],
    ) -> AppendMap {
        let mut map = AppendMap::default();
        let flip = matrix.determinant() < 0.0;

        for (vk, data) in other.vertices.iter() {
            let nv = self.add_vertex(matrix.transform_point(&data.position));
            map.vertices.insert(vk, nv);
        }

        for (fk, face) in other.faces.iter() {
            let mut corners: SmallVec<[Corner; 4]> = face
                .corners
                .iter()
                .filter_map(|c| map.vertices.get(&c.vertex).map(|&v| Corner::new(v, c.uv)))
                .collect();
            if corners.len() < 3 {
                continue;
            }
            if flip {
                corners.reverse();
            }
            let material = material_remap
                .get(face.material as usize)
                .copied()
                .unwrap_or(face.material);
            let nf = self.insert_face(corners, material, face.smooth);
            map.faces.insert(fk, nf);
        }

        for (ek, edge) in other.edges.iter() {
            let (Some(&a), Some(&b)) = (map.vertices.get(&edge.a), map.vertices.get(&edge.b)) else {
                continue;
            };
            let ne = self.ensure_edge(a, b);
            if let Some(e) = self.edges.get_mut(ne) {
                e.sharp = edge.sharp;
                e.seam = edge.seam;
            }
            map.edges.insert(ek, ne);
        }

        import_layer::<EdgeDissolve>(self, other, |k| map.edges.get(&k).copied());
        import_layer::<EdgeCollapse>(self, other, |k| map.edges.get(&k).copied());
        import_layer::<EdgeUvOrientation>(self, other, |k| map.edges.get(&k).copied());
        import_layer::<FaceDetail>(self, other, |k| map.faces.get(&k).copied());
        import_layer::<FaceMirror>(self, other, |k| map.faces.get(&k).copied());
        import_layer::<FaceUvScale>(self, other, |k| map.faces.get(&k).copied());
        import_layer::<FaceGridify>(self, other, |k| map.faces.get(&k).copied());
        import_layer::<VertexCageWeight>(self, other, |k| map.vertices.get(&k).copied());
        import_layer::<CornerCageHardness>(self, other, |k| {
            Some(CornerKey::new(
                *map.faces.get(&k.face)?,
                *map.vertices.get(&k.vertex)?,
            ))
        });

        map
    }
}
