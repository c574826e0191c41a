// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for mesh operations.

use crate::keys::{EdgeKey, FaceKey, VertexKey};

/// Result type alias for mesh operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during mesh operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Vertex key not found in the arena.
    #[error("vertex not found: {0:?}")]
    VertexNotFound(VertexKey),

    /// Edge key not found in the arena.
    #[error("edge not found: {0:?}")]
    EdgeNotFound(EdgeKey),

    /// Face key not found in the arena.
    #[error("face not found: {0:?}")]
    FaceNotFound(FaceKey),

    /// A face needs at least 3 distinct corners.
    #[error("face has fewer than 3 distinct corners")]
    DegenerateFace,

    /// A face visits the same vertex twice.
    #[error("face visits vertex {0:?} more than once")]
    RepeatedVertex(VertexKey),

    /// A snapshot index points outside of its element list.
    #[error("snapshot {domain} index {index} is out of range")]
    IndexOutOfRange { domain: &'static str, index: usize },

    /// A tag layer name is not one of the known layer kinds.
    #[error("unknown tag layer: {0}")]
    UnknownLayer(String),

    /// Triangulation of a polygon failed.
    #[error("triangulation failed: {0}")]
    Triangulation(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}
