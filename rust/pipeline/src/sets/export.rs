// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Final export set.

use crate::config::Settings;
use crate::context::{BuildReport, CompilationContext};
use crate::error::Result;
use crate::scene::{ObjectKey, ObjectProps, Role, Scene};
use crate::{modifiers, reduce, symmetry};

use super::low::assign_texture_set_material;
use super::{SetPolicy, TargetSet};

/// Reduced to the export LOD with painter edges dropped, modifiers applied
/// and hierarchies merged. Template copies share mesh data.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportPolicy;

impl SetPolicy for ExportPolicy {
    const TARGET: TargetSet = TargetSet::Export;

    fn accepts(&self, scene: &Scene, object: ObjectKey) -> bool {
        scene.object(object).is_some_and(|o| {
            (o.kind.is_mesh() || o.kind.is_locator())
                && matches!(o.props.role, Role::Standard | Role::Trim)
        })
    }

    fn accepts_instance(&self, props: &ObjectProps) -> bool {
        props.instance_allow_export
    }

    fn object_name(&self, settings: &Settings, scene: &Scene, source: ObjectKey) -> String {
        format!("{}{}", scene.object_name(source), settings.export_suffix)
    }

    fn process_object(
        &self,
        ctx: &mut CompilationContext<'_>,
        scene: &mut Scene,
        generated: ObjectKey,
        _source: ObjectKey,
    ) -> Result<()> {
        let Some(role) = scene.object(generated).map(|o| o.props.role) else {
            return Ok(());
        };
        let world = scene.world_matrix(generated);
        if let Some((data, tools)) = scene.mesh_and_tools_mut(generated) {
            reduce::reduce(&mut data.mesh, ctx.settings.export_lod, false);
            reduce::remove_cage_edges(&mut data.mesh);
            symmetry::expand(&mut data.mesh, &world, tools, false, ctx.settings.weld_threshold);
        }
        if role != Role::Trim {
            assign_texture_set_material(scene, generated);
        }
        modifiers::remove_hidden_modifiers(scene, generated);
        modifiers::ensure_triangulate(scene, generated);
        modifiers::apply_modifier_stack(scene, generated)?;
        Ok(())
    }

    fn links_template_meshes(&self) -> bool {
        true
    }

    fn merges(&self) -> bool {
        true
    }

    fn anchor(&self, props: &ObjectProps) -> Option<ObjectKey> {
        props.export_anchor
    }
}

/// Builds the export set.
pub fn build(scene: &mut Scene, settings: &Settings) -> Result<BuildReport> {
    super::run(scene, settings, &ExportPolicy)
}
