// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pipeline settings: naming conventions and scene-wide defaults.

use serde::{Deserialize, Serialize};

/// Destination format of the export set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportTarget {
    #[default]
    Unity,
    Unreal,
    Blender,
    /// The export set is the final product and is kept by
    /// [`clear_generated_sets`](crate::sets::clear_generated_sets).
    BlenderLibrary,
}

/// Settings shared by every set builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub lp_suffix: String,
    pub hp_suffix: String,
    /// Appended to high-poly names of decal objects.
    pub decal_suffix: String,
    pub export_suffix: String,
    pub cage_prefix: String,
    pub occluder_suffix: String,
    pub ghost_suffix: String,
    /// Scene-wide cage inflation, used when an object's own offset is 0.
    pub cage_offset: f64,
    /// Treat every object as part of the same texture set when merging.
    pub merge_texture_sets: bool,
    /// LOD level reduced to in the export set.
    pub export_lod: u32,
    /// Distance under which seam vertices are welded after mirroring.
    pub weld_threshold: f64,
    /// Refuse to merge objects whose shading modes differ.
    pub merge_requires_matching_shading: bool,
    pub export_target: ExportTarget,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            lp_suffix: "_low".into(),
            hp_suffix: "_high".into(),
            decal_suffix: "_ignorebf".into(),
            export_suffix: "_e".into(),
            cage_prefix: "cage_".into(),
            occluder_suffix: "_occluder".into(),
            ghost_suffix: "_ghost".into(),
            cage_offset: 0.01,
            merge_texture_sets: false,
            export_lod: 0,
            weld_threshold: 1e-4,
            merge_requires_matching_shading: false,
            export_target: ExportTarget::Unity,
        }
    }
}

impl Settings {
    /// Parses settings from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let settings =
            Settings::from_json(r#"{"export_lod": 2, "export_target": "blender_library"}"#)
                .unwrap();
        assert_eq!(settings.export_lod, 2);
        assert_eq!(settings.export_target, ExportTarget::BlenderLibrary);
        assert_eq!(settings.lp_suffix, "_low");
        assert_eq!(settings.cage_offset, 0.01);
    }
}
