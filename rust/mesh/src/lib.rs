// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # GamiFlow Mesh
//!
//! Editable polygon mesh used by the GamiFlow asset pipeline.
//!
//! Vertices, edges and faces live in slot maps with stable keys and upward
//! adjacency indices, so topology operators (dissolve, collapse, weld,
//! duplicate, append) can rewrite the mesh in place while every surviving
//! element keeps its identity.
//!
//! Authoring metadata is stored in sparse, typed tag layers
//! ([`tags::EdgeDissolve`], [`tags::FaceDetail`], ...). The operators carry
//! these tags along: duplicated elements copy them, merged faces keep the
//! tags of the surviving face and removed elements drop theirs.

pub mod arena;
pub mod builders;
pub mod construction;
pub mod error;
pub mod geometry;
pub mod keys;
pub mod operators;
pub mod selection;
pub mod serialization;
pub mod spatial;
pub mod tags;
pub mod transform;
pub mod traversal;
pub mod triangulate;

pub use arena::{Corner, EdgeData, FaceData, PolyMesh, VertexData};
pub use error::{Error, Result};
pub use keys::{Domain, EdgeKey, ElementKey, FaceKey, VertexKey};
pub use operators::{AppendMap, DuplicateMap};
pub use selection::{Selection, SelectionGuard};
pub use serialization::MeshSnapshot;
pub use spatial::SpatialIndex;
pub use tags::{CornerKey, Layer, LayerKind, TagLayer, TagStore};
