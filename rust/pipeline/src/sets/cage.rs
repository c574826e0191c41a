// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bake cage set.
//!
//! The cage mirrors the low-poly set: same members, names with the cage
//! prefix, same anchors. Its copies are rebuilt from the working collection
//! with the low-poly edits, so cage-coded edges the low set dissolves are
//! still there when the copy is inflated.

use crate::cage;
use crate::config::Settings;
use crate::context::{BuildReport, CompilationContext};
use crate::error::{Error, Result};
use crate::scene::{CollectionKey, ObjectKey, ObjectProps, Scene};

use super::low::{process_low_copy, LowPolicy};
use super::{SetPolicy, TargetSet};

/// Low-poly copies inflated along their cage normals. Cage-coded edges are
/// kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct CagePolicy;

impl SetPolicy for CagePolicy {
    const TARGET: TargetSet = TargetSet::Cage;

    fn source_collection(&self, scene: &Scene) -> Result<CollectionKey> {
        if scene.output_collection(TargetSet::Low).is_none() {
            return Err(Error::MissingPrerequisite(
                "the low-poly set must be built before the cage".into(),
            ));
        }
        LowPolicy.source_collection(scene)
    }

    fn accepts(&self, scene: &Scene, object: ObjectKey) -> bool {
        LowPolicy.accepts(scene, object)
    }

    fn accepts_instance(&self, props: &ObjectProps) -> bool {
        LowPolicy.accepts_instance(props)
    }

    fn object_name(&self, settings: &Settings, scene: &Scene, source: ObjectKey) -> String {
        format!(
            "{}{}",
            settings.cage_prefix,
            LowPolicy.object_name(settings, scene, source)
        )
    }

    fn process_object(
        &self,
        ctx: &mut CompilationContext<'_>,
        scene: &mut Scene,
        generated: ObjectKey,
        _source: ObjectKey,
    ) -> Result<()> {
        process_low_copy(ctx, scene, generated, false);
        let offset = match scene.object(generated) {
            Some(o) => cage::cage_offset(&o.props, ctx.settings),
            None => return Ok(()),
        };
        if let Some(data) = scene.object_mesh_mut(generated) {
            cage::inflate(&mut data.mesh, offset);
        }
        Ok(())
    }
}

/// Builds the cage set. Fails when the low-poly set was never built.
pub fn build(scene: &mut Scene, settings: &Settings) -> Result<BuildReport> {
    super::run(scene, settings, &CagePolicy)
}
