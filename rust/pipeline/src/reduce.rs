// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! LOD reduction driven by level tags.
//!
//! Passes run in a fixed order: collapse, dissolve, then face deletion.
//! Collapsing first keeps the vertices that collapsed edges still need out
//! of reach of the vertex-merging dissolve.

use gamiflow_mesh::tags::{self, EdgeCollapse, EdgeDissolve, FaceDetail};
use gamiflow_mesh::{EdgeKey, FaceKey, PolyMesh};

/// Counts of one reduction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReductionReport {
    pub collapsed: usize,
    pub dissolved: usize,
    pub deleted_faces: usize,
}

impl ReductionReport {
    /// Edges removed by the collapse and dissolve passes.
    pub fn edges_removed(&self) -> usize {
        self.collapsed + self.dissolved
    }
}

/// Highest level code removed at `level`.
pub fn threshold(level: u32) -> i32 {
    tags::LOD0.saturating_add(level.min(i32::MAX as u32) as i32)
}

/// Returns `true` when a level-coded element is removed at `level`.
///
/// `PAINTER` only obeys `keep_painter`, `CAGE` and `DEFAULT` never match.
pub fn is_removed_at(code: i32, level: u32, keep_painter: bool) -> bool {
    match code {
        tags::DEFAULT | tags::CAGE => false,
        tags::PAINTER => !keep_painter,
        c if c >= tags::LOD0 => c <= threshold(level),
        _ => false,
    }
}

fn sorted<K: Ord>(mut keys: Vec<K>) -> Vec<K> {
    keys.sort();
    keys
}

/// Edges the dissolve pass removes at `level`.
pub fn select_reducible_edges(mesh: &PolyMesh, level: u32, keep_painter: bool) -> Vec<EdgeKey> {
    let Some(layer) = mesh.layer::<EdgeDissolve>() else {
        return Vec::new();
    };
    sorted(
        layer
            .iter()
            .filter(|(e, code)| mesh.edge(*e).is_some() && is_removed_at(*code, level, keep_painter))
            .map(|(e, _)| e)
            .collect(),
    )
}

/// Edges the collapse pass removes at `level`.
pub fn select_collapsible_edges(mesh: &PolyMesh, level: u32) -> Vec<EdgeKey> {
    let Some(layer) = mesh.layer::<EdgeCollapse>() else {
        return Vec::new();
    };
    sorted(
        layer
            .iter()
            .filter(|(e, code)| {
                mesh.edge(*e).is_some() && *code >= tags::LOD0 && *code <= threshold(level)
            })
            .map(|(e, _)| e)
            .collect(),
    )
}

/// Faces the deletion pass removes at `level`.
pub fn select_detail_faces(mesh: &PolyMesh, level: u32) -> Vec<FaceKey> {
    let Some(layer) = mesh.layer::<FaceDetail>() else {
        return Vec::new();
    };
    sorted(
        layer
            .iter()
            .filter(|(f, code)| {
                mesh.face(*f).is_some() && *code != tags::DEFAULT && *code <= threshold(level)
            })
            .map(|(f, _)| f)
            .collect(),
    )
}

/// Runs the three reduction passes and reports what each removed.
pub fn reduce_with_report(mesh: &mut PolyMesh, level: u32, keep_painter: bool) -> ReductionReport {
    let mut report = ReductionReport::default();

    let collapse = select_collapsible_edges(mesh, level);
    if !collapse.is_empty() {
        report.collapsed = mesh.collapse_edges(&collapse);
    }

    let dissolve = select_reducible_edges(mesh, level, keep_painter);
    if !dissolve.is_empty() {
        report.dissolved = mesh.dissolve_edges(&dissolve, true);
    }

    let faces = select_detail_faces(mesh, level);
    if !faces.is_empty() {
        report.deleted_faces = mesh.delete_faces(&faces);
    }

    tracing::trace!(
        level,
        collapsed = report.collapsed,
        dissolved = report.dissolved,
        deleted_faces = report.deleted_faces,
        "reduced mesh"
    );
    report
}

/// Reduces the mesh to `level`. Returns the number of edges removed.
pub fn reduce(mesh: &mut PolyMesh, level: u32, keep_painter: bool) -> usize {
    reduce_with_report(mesh, level, keep_painter).edges_removed()
}

/// Dissolves every `CAGE`-coded edge, whatever the level.
pub fn remove_cage_edges(mesh: &mut PolyMesh) -> usize {
    let Some(layer) = mesh.layer::<EdgeDissolve>() else {
        return 0;
    };
    let edges = sorted(
        layer
            .iter()
            .filter(|(e, code)| *code == tags::CAGE && mesh.edge(*e).is_some())
            .map(|(e, _)| e)
            .collect(),
    );
    if edges.is_empty() {
        return 0;
    }
    mesh.dissolve_edges(&edges, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamiflow_mesh::builders;
    use gamiflow_mesh::tags::{CAGE, LOD0, PAINTER};

    fn interior_edges(mesh: &PolyMesh) -> Vec<EdgeKey> {
        sorted(
            mesh.edge_keys()
                .filter(|e| mesh.edge_face_count(*e) == 2)
                .collect(),
        )
    }

    #[test]
    fn sentinel_codes() {
        assert!(!is_removed_at(tags::DEFAULT, 10, false));
        assert!(!is_removed_at(CAGE, 10, false));
        assert!(is_removed_at(PAINTER, 0, false));
        assert!(!is_removed_at(PAINTER, 10, true));
        assert!(is_removed_at(LOD0, 0, true));
        assert!(!is_removed_at(LOD0 + 1, 0, true));
        assert!(is_removed_at(LOD0 + 1, 1, true));
    }

    #[test]
    fn level_tagged_edge_waits_for_its_level() {
        let mut mesh = builders::quad_grid(2, 1, 1.0);
        let middle = interior_edges(&mesh);
        mesh.set_edge_level(&middle, LOD0 + 1);

        let mut at_zero = mesh.clone();
        assert_eq!(reduce(&mut at_zero, 0, false), 0);
        assert_eq!(at_zero.face_count(), 2);

        assert_eq!(reduce(&mut mesh, 1, false), 1);
        assert_eq!(mesh.face_count(), 1);
        assert!(mesh.edge(middle[0]).is_none());
    }

    #[test]
    fn painter_edges_follow_keep_painter() {
        let mut mesh = builders::quad_grid(2, 1, 1.0);
        let middle = interior_edges(&mesh);
        mesh.set_edge_level(&middle, PAINTER);

        let mut kept = mesh.clone();
        assert_eq!(reduce(&mut kept, 3, true), 0);
        assert_eq!(reduce(&mut mesh, 0, false), 1);
    }

    #[test]
    fn cage_edges_only_go_with_the_cage_pass() {
        let mut mesh = builders::quad_grid(2, 1, 1.0);
        let middle = interior_edges(&mesh);
        mesh.set_edge_level(&middle, CAGE);

        assert_eq!(reduce(&mut mesh, 5, false), 0);
        assert_eq!(remove_cage_edges(&mut mesh), 1);
        assert_eq!(mesh.face_count(), 1);
    }

    #[test]
    fn collapse_runs_before_dissolve() {
        let mut mesh = builders::quad_grid(3, 1, 1.0);
        let inner = interior_edges(&mesh);
        assert_eq!(inner.len(), 2);
        mesh.set_tag::<EdgeCollapse>(inner[0], LOD0);
        mesh.set_edge_level(&inner[1..], LOD0);

        let report = reduce_with_report(&mut mesh, 0, false);
        assert_eq!(report.collapsed, 1);
        assert_eq!(report.dissolved, 1);
        assert_eq!(report.edges_removed(), 2);
        // the collapsed edge leaves two triangles meeting at its midpoint,
        // the dissolved one merges its neighbours
        assert_eq!(mesh.face_count(), 2);
    }

    #[test]
    fn detail_faces_are_deleted_with_their_loose_geometry() {
        let mut mesh = builders::quad_grid(2, 1, 1.0);
        let faces: Vec<FaceKey> = mesh.face_keys().collect();
        mesh.set_tag::<FaceDetail>(faces[1], LOD0 + 2);

        let mut early = mesh.clone();
        assert_eq!(reduce_with_report(&mut early, 1, false).deleted_faces, 0);

        let report = reduce_with_report(&mut mesh, 2, false);
        assert_eq!(report.deleted_faces, 1);
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.edge_count(), 4);
    }

    #[test]
    fn untagged_mesh_is_a_no_op() {
        let mut mesh = builders::cube(1.0);
        assert_eq!(reduce_with_report(&mut mesh, 4, false), ReductionReport::default());
        assert_eq!(remove_cage_edges(&mut mesh), 0);
        assert_eq!(mesh.face_count(), 6);
    }
}
