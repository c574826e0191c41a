// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! High-poly bake set.
//!
//! Besides the copy of each object, every manually linked high-poly source
//! is copied and parented to it, so bakers pick both up as one group.

use crate::config::Settings;
use crate::context::{BuildReport, CompilationContext};
use crate::error::Result;
use crate::scene::{CollectionKey, ObjectKey, ObjectProps, Role, Scene};
use crate::{modifiers, reduce, symmetry};

use super::{SetPolicy, TargetSet};

#[derive(Debug, Clone, Copy, Default)]
pub struct HighPolicy;

fn clear_hard_edges(scene: &mut Scene, object: ObjectKey) {
    if let Some(data) = scene.object_mesh_mut(object) {
        data.mesh.clear_sharp_edges();
    }
}

impl SetPolicy for HighPolicy {
    const TARGET: TargetSet = TargetSet::High;

    fn accepts(&self, scene: &Scene, object: ObjectKey) -> bool {
        scene.object(object).is_some_and(|o| {
            o.kind.is_mesh() && matches!(o.props.role, Role::Standard | Role::Occluder)
        })
    }

    fn accepts_instance(&self, props: &ObjectProps) -> bool {
        props.instance_bake.in_high()
    }

    fn includes_self(&self, scene: &Scene, object: ObjectKey) -> bool {
        scene.object(object).is_some_and(|o| o.props.include_self)
    }

    fn object_name(&self, settings: &Settings, scene: &Scene, source: ObjectKey) -> String {
        let occluder = scene
            .object(source)
            .is_some_and(|o| o.props.role == Role::Occluder);
        let suffix = if occluder {
            &settings.occluder_suffix
        } else {
            &settings.hp_suffix
        };
        format!("{}{}", scene.object_name(source), suffix)
    }

    fn process_object(
        &self,
        ctx: &mut CompilationContext<'_>,
        scene: &mut Scene,
        generated: ObjectKey,
        _source: ObjectKey,
    ) -> Result<()> {
        let world = scene.world_matrix(generated);
        if let Some((data, tools)) = scene.mesh_and_tools_mut(generated) {
            reduce::remove_cage_edges(&mut data.mesh);
            symmetry::expand(&mut data.mesh, &world, tools, false, ctx.settings.weld_threshold);
        }
        modifiers::ensure_triangulate(scene, generated);
        if scene
            .object(generated)
            .is_some_and(|o| o.props.remove_hard_edges)
        {
            clear_hard_edges(scene, generated);
        }
        Ok(())
    }

    fn extra_objects(
        &self,
        ctx: &mut CompilationContext<'_>,
        scene: &mut Scene,
        source: ObjectKey,
        generated: Option<ObjectKey>,
        dest: CollectionKey,
        namespace: &str,
    ) -> Result<Vec<ObjectKey>> {
        let Some(obj) = scene.object(source) else {
            return Ok(Vec::new());
        };
        let high_polys = obj.props.high_polys.clone();
        let remove_hard_edges = obj.props.remove_hard_edges;
        let source_name = scene.object_name(source).to_string();

        let mut extras = Vec::with_capacity(high_polys.len());
        for hp in high_polys {
            let Some(hp_obj) = scene.object(hp) else {
                ctx.diagnostic(format!("{source_name} links a high-poly that no longer exists"));
                continue;
            };
            let decal = if hp_obj.props.role == Role::Decal {
                ctx.settings.decal_suffix.as_str()
            } else {
                ""
            };
            let name = format!(
                "{namespace}{source_name}{}{decal}_{}",
                ctx.settings.hp_suffix,
                hp_obj.name()
            );

            let copy = scene.duplicate_object(hp, &name, dest, false)?;
            scene.set_parent_keep_transform(copy, None)?;
            if let Some(g) = generated {
                scene.set_parent_keep_transform(copy, Some(g))?;
            }
            if let Some(obj) = scene.object_mut(copy) {
                obj.origin = Some(hp);
            }
            modifiers::ensure_triangulate(scene, copy);
            if remove_hard_edges {
                clear_hard_edges(scene, copy);
            }
            extras.push(copy);
        }
        Ok(extras)
    }

    fn leaves_ghost(&self, props: &ObjectProps) -> bool {
        props.bake_ghost
    }
}

/// Builds the high-poly set.
pub fn build(scene: &mut Scene, settings: &Settings) -> Result<BuildReport> {
    super::run(scene, settings, &HighPolicy)
}
