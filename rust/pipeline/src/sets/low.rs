// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Low-poly bake set.

use crate::config::Settings;
use crate::context::{BuildReport, CompilationContext};
use crate::error::Result;
use crate::scene::{ObjectKey, ObjectProps, Role, Scene};
use crate::{modifiers, reduce, symmetry};

use super::{SetPolicy, TargetSet};

/// Standard meshes at LOD 0, painter edges kept, one material per texture
/// set and mirrored UVs moved out of the 0-1 tile.
#[derive(Debug, Clone, Copy, Default)]
pub struct LowPolicy;

/// Replaces every material slot with the texture set material.
pub(crate) fn assign_texture_set_material(scene: &mut Scene, object: ObjectKey) {
    let Some(texture_set) = scene.object(object).map(|o| o.props.texture_set) else {
        return;
    };
    let material = scene.texture_set_name(texture_set);
    if let Some(data) = scene.object_mesh_mut(object) {
        data.materials = vec![material];
        data.mesh.set_all_materials(0);
    }
}

impl SetPolicy for LowPolicy {
    const TARGET: TargetSet = TargetSet::Low;

    fn accepts(&self, scene: &Scene, object: ObjectKey) -> bool {
        scene
            .object(object)
            .is_some_and(|o| o.kind.is_mesh() && o.props.role == Role::Standard)
    }

    fn accepts_instance(&self, props: &ObjectProps) -> bool {
        props.instance_bake.in_low()
    }

    fn object_name(&self, settings: &Settings, scene: &Scene, source: ObjectKey) -> String {
        format!("{}{}", scene.object_name(source), settings.lp_suffix)
    }

    fn process_object(
        &self,
        ctx: &mut CompilationContext<'_>,
        scene: &mut Scene,
        generated: ObjectKey,
        _source: ObjectKey,
    ) -> Result<()> {
        process_low_copy(ctx, scene, generated, true);
        Ok(())
    }
}

/// The low-poly edits of a fresh copy. The cage set runs them with
/// `remove_cage_edges` off.
pub(crate) fn process_low_copy(
    ctx: &CompilationContext<'_>,
    scene: &mut Scene,
    generated: ObjectKey,
    remove_cage_edges: bool,
) {
    let world = scene.world_matrix(generated);
    if let Some((data, tools)) = scene.mesh_and_tools_mut(generated) {
        reduce::reduce(&mut data.mesh, 0, true);
        if remove_cage_edges {
            reduce::remove_cage_edges(&mut data.mesh);
        }
        symmetry::expand(&mut data.mesh, &world, tools, true, ctx.settings.weld_threshold);
    }
    assign_texture_set_material(scene, generated);
    modifiers::remove_hidden_modifiers(scene, generated);
    modifiers::offset_copy_uvs(scene, generated);
    modifiers::ensure_triangulate(scene, generated);
}

/// Builds the low-poly set.
pub fn build(scene: &mut Scene, settings: &Settings) -> Result<BuildReport> {
    super::run(scene, settings, &LowPolicy)
}
