// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # GamiFlow Pipeline
//!
//! Compiles one authored working scene into four derived sets:
//!
//! - **low**: bake targets at LOD 0, one material per texture set,
//! - **high**: bake sources, with manually linked high-poly objects,
//! - **cage**: the low set inflated for ray casting,
//! - **export**: the final asset, reduced, with modifiers applied and
//!   hierarchies merged into single meshes.
//!
//! The working scene is never modified. Each builder clears and refills its
//! own output collection, so running it again gives the same result.
//!
//! ```no_run
//! use gamiflow_pipeline::{document::SceneDocument, sets};
//!
//! # fn main() -> gamiflow_pipeline::Result<()> {
//! let doc = SceneDocument::from_json(&std::fs::read_to_string("crate.json").unwrap())?;
//! let mut scene = doc.to_scene()?;
//! let report = sets::export::build(&mut scene, &doc.settings)?;
//! println!("{} objects exported", report.generated);
//! # Ok(())
//! # }
//! ```

pub mod cage;
pub mod config;
pub mod context;
pub mod document;
pub mod error;
pub mod merge;
pub mod modifiers;
pub mod populate;
pub mod provenance;
pub mod reduce;
pub mod scene;
pub mod sets;
pub mod symmetry;
pub mod template;

pub use gamiflow_mesh as mesh;

pub use config::{ExportTarget, Settings};
pub use context::{BuildReport, CompilationContext};
pub use document::SceneDocument;
pub use error::{Error, Result};
pub use modifiers::{Modifier, ModifierKind};
pub use provenance::{find_best_match, Provenance};
pub use reduce::{reduce, reduce_with_report, ReductionReport};
pub use scene::{
    Collection, CollectionKey, InstanceBake, MeshData, MeshKey, ObjectKey, ObjectKind,
    ObjectProps, Role, Scene, SceneObject, Shading,
};
pub use sets::{clear_generated_sets, SetPolicy, TargetSet};
pub use template::{Template, TemplateCache};

/// Builds one set.
pub fn build_set(scene: &mut Scene, settings: &Settings, target: TargetSet) -> Result<BuildReport> {
    match target {
        TargetSet::Low => sets::low::build(scene, settings),
        TargetSet::High => sets::high::build(scene, settings),
        TargetSet::Cage => sets::cage::build(scene, settings),
        TargetSet::Export => sets::export::build(scene, settings),
    }
}

/// Builds every set in dependency order (the cage needs the low set).
pub fn build_all(scene: &mut Scene, settings: &Settings) -> Result<Vec<BuildReport>> {
    TargetSet::ALL
        .into_iter()
        .map(|t| build_set(scene, settings, t))
        .collect()
}
