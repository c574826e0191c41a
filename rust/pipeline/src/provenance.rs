// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Source/generated object bookkeeping for one builder run.
//!
//! Every duplicate is registered with the object it was copied from (or
//! none, for stamped template copies). Parenting is wired afterwards from
//! this map: a generated object goes under the generated counterpart of its
//! source's parent.

use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::scene::{ObjectKey, Scene};

/// Bidirectional map between source objects and their duplicates.
#[derive(Debug, Default, Clone)]
pub struct Provenance {
    order: Vec<ObjectKey>,
    sources: FxHashMap<ObjectKey, Option<ObjectKey>>,
    generated: FxHashMap<ObjectKey, Vec<ObjectKey>>,
}

impl Provenance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `generated` as a copy of `source`. Registering the same
    /// generated object twice keeps the first record.
    pub fn register(&mut self, generated: ObjectKey, source: Option<ObjectKey>) {
        if self.sources.contains_key(&generated) {
            return;
        }
        self.order.push(generated);
        self.sources.insert(generated, source);
        if let Some(s) = source {
            self.generated.entry(s).or_default().push(generated);
        }
    }

    pub fn find_source(&self, generated: ObjectKey) -> Option<ObjectKey> {
        self.sources.get(&generated).copied().flatten()
    }

    /// Objects generated from `source`, in registration order.
    pub fn find_generated(&self, source: ObjectKey) -> &[ObjectKey] {
        match self.generated.get(&source) {
            Some(list) => list,
            None => {
                tracing::debug!(?source, "no generated object for source");
                &[]
            }
        }
    }

    /// Every registered object, in registration order.
    pub fn generated_objects(&self) -> &[ObjectKey] {
        &self.order
    }

    pub fn contains(&self, generated: ObjectKey) -> bool {
        self.sources.contains_key(&generated)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Parents `generated` under the best generated counterpart of its
    /// source's parent, keeping its world transform.
    ///
    /// Returns the chosen parent. Objects without a source, or whose source
    /// has no generated parent counterpart, are left alone.
    pub fn reparent(&self, scene: &mut Scene, generated: ObjectKey) -> Result<Option<ObjectKey>> {
        let Some(source) = self.find_source(generated) else {
            return Ok(None);
        };
        let Some(source_parent) = scene.object(source).and_then(|o| o.parent) else {
            return Ok(None);
        };
        let candidates: Vec<ObjectKey> = self
            .generated
            .get(&source_parent)
            .map(|list| {
                list.iter()
                    .copied()
                    .filter(|c| *c != generated && scene.contains_object(*c))
                    .collect()
            })
            .unwrap_or_default();
        let Some(parent) = find_best_match(scene, &candidates, source_parent) else {
            return Ok(None);
        };
        scene.set_parent_keep_transform(generated, Some(parent))?;
        Ok(Some(parent))
    }
}

/// Picks the candidate whose world transform equals the world transform of
/// `source`, else the first candidate.
pub fn find_best_match(
    scene: &Scene,
    candidates: &[ObjectKey],
    source: ObjectKey,
) -> Option<ObjectKey> {
    let target = scene.world_matrix(source);
    candidates
        .iter()
        .copied()
        .find(|c| scene.world_matrix(*c) == target)
        .or_else(|| candidates.first().copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::ObjectKind;
    use approx::assert_relative_eq;
    use nalgebra::{Matrix4, Vector3};

    fn empty(scene: &mut Scene, name: &str, at: Vector3<f64>) -> ObjectKey {
        let root = scene.root_collection();
        let key = scene.add_object(name, ObjectKind::empty(), root);
        scene.object_mut(key).unwrap().local = Matrix4::new_translation(&at);
        key
    }

    #[test]
    fn register_and_lookup() {
        let mut scene = Scene::new("s");
        let src = empty(&mut scene, "A", Vector3::zeros());
        let g1 = empty(&mut scene, "A_low", Vector3::zeros());
        let g2 = empty(&mut scene, "A_low.001", Vector3::zeros());
        let stamped = empty(&mut scene, "Stamp", Vector3::zeros());

        let mut prov = Provenance::new();
        prov.register(g1, Some(src));
        prov.register(g2, Some(src));
        prov.register(stamped, None);
        prov.register(g1, None);

        assert_eq!(prov.find_source(g1), Some(src));
        assert_eq!(prov.find_source(stamped), None);
        assert_eq!(prov.find_generated(src), &[g1, g2]);
        assert!(prov.find_generated(stamped).is_empty());
        assert_eq!(prov.generated_objects(), &[g1, g2, stamped]);
    }

    #[test]
    fn best_match_prefers_equal_world_transform() {
        let mut scene = Scene::new("s");
        let src = empty(&mut scene, "Src", Vector3::new(1.0, 0.0, 0.0));
        let far = empty(&mut scene, "Far", Vector3::new(9.0, 0.0, 0.0));
        let near = empty(&mut scene, "Near", Vector3::new(1.0, 0.0, 0.0));

        assert_eq!(find_best_match(&scene, &[far, near], src), Some(near));
        assert_eq!(find_best_match(&scene, &[far], src), Some(far));
        assert_eq!(find_best_match(&scene, &[], src), None);
    }

    #[test]
    fn reparent_keeps_world_transform() {
        let mut scene = Scene::new("s");
        let parent = empty(&mut scene, "P", Vector3::new(2.0, 0.0, 0.0));
        let child = empty(&mut scene, "C", Vector3::new(0.0, 3.0, 0.0));
        scene.set_parent_keep_transform(child, Some(parent)).unwrap();

        let gp = empty(&mut scene, "P_low", Vector3::new(5.0, 5.0, 0.0));
        let gc = empty(&mut scene, "C_low", Vector3::new(0.0, 3.0, 0.0));
        let mut prov = Provenance::new();
        prov.register(gp, Some(parent));
        prov.register(gc, Some(child));

        let before = scene.world_matrix(gc);
        assert_eq!(prov.reparent(&mut scene, gc).unwrap(), Some(gp));
        assert_eq!(scene.object(gc).unwrap().parent, Some(gp));
        assert_relative_eq!(scene.world_matrix(gc), before, epsilon = 1e-12);

        // a root source has nothing to wire
        assert_eq!(prov.reparent(&mut scene, gp).unwrap(), None);
    }
}
