// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Element key types for arena-based mesh storage.
//!
//! Every mesh element gets a unique, type-safe key for O(1) lookup in the
//! arena. Keys are created by `slotmap::SlotMap` and stay valid even after
//! other elements are removed (generational indices). A key of a removed
//! element never resolves again, even if its slot gets reused.

use slotmap::new_key_type;

new_key_type! {
    /// Key for a vertex (point in 3D space).
    pub struct VertexKey;

    /// Key for an edge (undirected segment between two vertices).
    pub struct EdgeKey;

    /// Key for a face (polygon made of an ordered loop of corners).
    pub struct FaceKey;
}

/// A key that can reference any mesh element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKey {
    Vertex(VertexKey),
    Edge(EdgeKey),
    Face(FaceKey),
}

impl ElementKey {
    /// Returns the domain of this key.
    pub fn domain(&self) -> Domain {
        match self {
            ElementKey::Vertex(_) => Domain::Vertex,
            ElementKey::Edge(_) => Domain::Edge,
            ElementKey::Face(_) => Domain::Face,
        }
    }
}

/// The element domain a tag layer is aligned with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Domain {
    Vertex = 0,
    Edge = 1,
    Face = 2,
    /// Face corners (one value per corner of each face).
    Corner = 3,
}

impl Domain {
    /// Returns the domain name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Vertex => "Vertex",
            Domain::Edge => "Edge",
            Domain::Face => "Face",
            Domain::Corner => "Corner",
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<VertexKey> for ElementKey {
    fn from(k: VertexKey) -> Self {
        ElementKey::Vertex(k)
    }
}

impl From<EdgeKey> for ElementKey {
    fn from(k: EdgeKey) -> Self {
        ElementKey::Edge(k)
    }
}

impl From<FaceKey> for ElementKey {
    fn from(k: FaceKey) -> Self {
        ElementKey::Face(k)
    }
}
