// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Target set builders.
//!
//! Every builder runs the same recipe, parameterized by a [`SetPolicy`]:
//!
//! 1. check preconditions (nothing is touched when they fail),
//! 2. clear the destination collection,
//! 3. populate it from the source collection,
//! 4. merge hierarchies when the policy asks for it,
//! 5. move anchored objects onto their anchors,
//! 6. tear down the instance templates of the run.
//!
//! A failed run leaves its destination collection empty.

pub mod cage;
pub mod export;
pub mod high;
pub mod low;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::{ExportTarget, Settings};
use crate::context::{BuildReport, CompilationContext};
use crate::error::{Error, Result};
use crate::merge;
use crate::populate::{populate, visit_order};
use crate::scene::{CollectionKey, ObjectKey, ObjectProps, Scene};

pub use cage::CagePolicy;
pub use export::ExportPolicy;
pub use high::HighPolicy;
pub use low::LowPolicy;

/// The four generated sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetSet {
    Low,
    High,
    Cage,
    Export,
}

impl TargetSet {
    pub const ALL: [TargetSet; 4] = [
        TargetSet::Low,
        TargetSet::High,
        TargetSet::Cage,
        TargetSet::Export,
    ];

    pub fn index(self) -> usize {
        match self {
            TargetSet::Low => 0,
            TargetSet::High => 1,
            TargetSet::Cage => 2,
            TargetSet::Export => 3,
        }
    }

    /// Suffix of the output collection name.
    pub fn as_str(self) -> &'static str {
        match self {
            TargetSet::Low => "low",
            TargetSet::High => "high",
            TargetSet::Cage => "cage",
            TargetSet::Export => "export",
        }
    }
}

impl fmt::Display for TargetSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetSet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TargetSet::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::Document(format!("unknown set '{s}'")))
    }
}

/// What a builder takes from the scene and what it does to each copy.
pub trait SetPolicy {
    const TARGET: TargetSet;

    /// Collection the set is derived from.
    fn source_collection(&self, scene: &Scene) -> Result<CollectionKey> {
        scene
            .working
            .filter(|c| scene.collection(*c).is_some())
            .ok_or_else(|| Error::MissingPrerequisite("no working collection is set".into()))
    }

    /// Whether a plain (non-instancer) object enters the set.
    fn accepts(&self, scene: &Scene, object: ObjectKey) -> bool;

    /// Whether a collection instance enters the set.
    fn accepts_instance(&self, props: &ObjectProps) -> bool;

    /// Whether an accepted object is itself copied. Its extra objects are
    /// produced either way.
    fn includes_self(&self, _scene: &Scene, _object: ObjectKey) -> bool {
        true
    }

    /// Name of the copy of `source`, before any namespace.
    fn object_name(&self, settings: &Settings, scene: &Scene, source: ObjectKey) -> String;

    /// Set-specific edits on a fresh copy.
    fn process_object(
        &self,
        ctx: &mut CompilationContext<'_>,
        scene: &mut Scene,
        generated: ObjectKey,
        source: ObjectKey,
    ) -> Result<()>;

    /// Additional objects produced for `source`.
    fn extra_objects(
        &self,
        _ctx: &mut CompilationContext<'_>,
        _scene: &mut Scene,
        _source: ObjectKey,
        _generated: Option<ObjectKey>,
        _dest: CollectionKey,
        _namespace: &str,
    ) -> Result<Vec<ObjectKey>> {
        Ok(Vec::new())
    }

    /// Whether stamped template copies share mesh data.
    fn links_template_meshes(&self) -> bool {
        false
    }

    /// Whether the populated set is merged.
    fn merges(&self) -> bool {
        false
    }

    fn anchor(&self, props: &ObjectProps) -> Option<ObjectKey> {
        props.bake_anchor
    }

    /// Whether an anchored object leaves an occluder copy where it was.
    fn leaves_ghost(&self, _props: &ObjectProps) -> bool {
        false
    }
}

/// Runs a builder and returns its report.
pub fn run<P: SetPolicy>(scene: &mut Scene, settings: &Settings, policy: &P) -> Result<BuildReport> {
    let source = policy.source_collection(scene)?;

    let dest = scene.ensure_output_collection(P::TARGET);
    let cleared = scene.clear_collection(dest);
    let outputs: Vec<CollectionKey> = TargetSet::ALL
        .into_iter()
        .filter_map(|t| scene.output_collection(t))
        .filter(|c| *c != source)
        .collect();
    let members: Vec<ObjectKey> = scene
        .objects_in(source)
        .into_iter()
        .filter(|o| {
            !outputs
                .iter()
                .any(|c| scene.collection(*c).is_some_and(|coll| coll.objects.contains(o)))
        })
        .collect();

    tracing::info!(
        target_set = P::TARGET.as_str(),
        sources = members.len(),
        cleared,
        "building set"
    );

    let mut ctx = CompilationContext::new(settings, P::TARGET);
    let result = build(&mut ctx, scene, policy, &members, dest);
    ctx.templates.teardown(scene);

    match result {
        Ok(()) => {
            ctx.report.generated = scene.objects_in(dest).len();
            tracing::info!(
                target_set = P::TARGET.as_str(),
                generated = ctx.report.generated,
                templates = ctx.report.template_builds,
                stamped = ctx.report.stamped,
                merged = ctx.report.merged_chunks,
                diagnostics = ctx.report.diagnostics.len(),
                "set built"
            );
            Ok(ctx.report)
        }
        Err(err) => {
            scene.clear_collection(dest);
            tracing::error!(target_set = P::TARGET.as_str(), %err, "set build failed");
            Err(err)
        }
    }
}

fn build<P: SetPolicy>(
    ctx: &mut CompilationContext<'_>,
    scene: &mut Scene,
    policy: &P,
    members: &[ObjectKey],
    dest: CollectionKey,
) -> Result<()> {
    populate(ctx, scene, policy, members, dest, "")?;
    if policy.merges() {
        let merged = merge::merge_collection(ctx, scene, dest)?;
        ctx.report.merged_chunks += merged;
    }
    apply_anchors(ctx, scene, policy, dest)
}

/// Moves every anchored object of `dest` onto its anchor.
fn apply_anchors<P: SetPolicy>(
    ctx: &mut CompilationContext<'_>,
    scene: &mut Scene,
    policy: &P,
    dest: CollectionKey,
) -> Result<()> {
    for object in visit_order(scene, &scene.objects_in(dest)) {
        let Some(obj) = scene.object(object) else {
            continue;
        };
        let Some(anchor) = policy.anchor(&obj.props) else {
            continue;
        };
        let ghost = policy.leaves_ghost(&obj.props);
        if !scene.contains_object(anchor) {
            let message = format!("anchor of {} no longer exists", scene.object_name(object));
            ctx.diagnostic(message);
            continue;
        }

        if ghost {
            let name = format!("{}{}", scene.object_name(object), ctx.settings.ghost_suffix);
            let copy = scene.duplicate_object(object, &name, dest, false)?;
            scene.set_parent_keep_transform(copy, None)?;
            if let Some(obj) = scene.object_mut(copy) {
                obj.props.role = crate::scene::Role::Occluder;
                obj.props.bake_anchor = None;
                obj.props.export_anchor = None;
            }
        }

        let world = scene.world_matrix(anchor);
        scene.set_world_matrix(object, &world);
        ctx.report.anchors_applied += 1;
    }
    Ok(())
}

/// Empties the generated collections. The export set is kept when it is
/// the final product (`BlenderLibrary`). Returns the number of objects
/// deleted.
pub fn clear_generated_sets(scene: &mut Scene, settings: &Settings) -> usize {
    let outputs: Vec<CollectionKey> = TargetSet::ALL
        .into_iter()
        .filter(|t| *t != TargetSet::Export || settings.export_target != ExportTarget::BlenderLibrary)
        .filter_map(|t| scene.output_collection(t))
        .collect();
    outputs.into_iter().map(|c| scene.clear_collection(c)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::ObjectKind;
    use gamiflow_mesh::builders;

    #[test]
    fn target_names() {
        assert_eq!(TargetSet::Cage.as_str(), "cage");
        assert_eq!("EXPORT".parse::<TargetSet>().unwrap(), TargetSet::Export);
        assert!("mid".parse::<TargetSet>().is_err());
        let idx: Vec<usize> = TargetSet::ALL.iter().map(|t| t.index()).collect();
        assert_eq!(idx, vec![0, 1, 2, 3]);
        assert_eq!(serde_json::to_string(&TargetSet::High).unwrap(), "\"high\"");
    }

    #[test]
    fn clear_keeps_library_export() {
        let mut scene = Scene::new("Kit");
        let low = scene.ensure_output_collection(TargetSet::Low);
        let export = scene.ensure_output_collection(TargetSet::Export);
        let mesh = scene.add_mesh("m", builders::cube(1.0), Vec::new());
        scene.add_object("a", ObjectKind::Mesh(mesh), low);
        scene.add_object("b", ObjectKind::empty(), export);

        let library = Settings {
            export_target: ExportTarget::BlenderLibrary,
            ..Settings::default()
        };
        assert_eq!(clear_generated_sets(&mut scene, &library), 1);
        assert_eq!(scene.objects_in(export).len(), 1);
        assert_eq!(clear_generated_sets(&mut scene, &Settings::default()), 1);
        assert_eq!(scene.object_count(), 0);
        assert_eq!(scene.mesh_count(), 0);
    }
}
