// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the compilation pipeline.

use crate::scene::{CollectionKey, ObjectKey};

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a set builder run.
///
/// Missing optional data (absent tag layers, unknown provenance) is never an
/// error; it is logged and recorded in the build report instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A builder precondition does not hold. Nothing was modified.
    #[error("missing prerequisite: {0}")]
    MissingPrerequisite(String),

    #[error("object not found: {0:?}")]
    ObjectNotFound(ObjectKey),

    #[error("collection not found: {0:?}")]
    CollectionNotFound(CollectionKey),

    /// A merge chunk names a root that is no longer part of the scene.
    #[error("merge root {0:?} is not in the scene")]
    MissingMergeRoot(ObjectKey),

    /// Setting this parent would make an object its own ancestor.
    #[error("parenting {child} under {parent} would create a cycle")]
    ParentCycle { child: String, parent: String },

    #[error("mesh error: {0}")]
    Mesh(#[from] gamiflow_mesh::Error),

    /// A scene document is inconsistent (unknown names, cycles).
    #[error("invalid scene document: {0}")]
    Document(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
