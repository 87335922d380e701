// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use linkage_core::{LinkError, ObjectId};
use thiserror::Error;

use crate::graph::{EdgeKey, NodeKey};

/// Errors raised by graph and tree operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GraphError {
    /// No node has this key.
    #[error("missing node: {0}")]
    MissingNode(NodeKey),
    /// No edge has this key.
    #[error("missing edge: {0}")]
    MissingEdge(EdgeKey),
    /// A node with this key already exists.
    #[error("node already exists: {0}")]
    DuplicateNode(NodeKey),
    /// An edge with this key already exists.
    #[error("edge already exists: {0}")]
    DuplicateEdge(EdgeKey),
    /// Moving `child` under `parent` would make it its own ancestor.
    #[error("{child} cannot be placed under its descendant {parent}")]
    Cycle {
        /// Node being moved.
        child: ObjectId,
        /// Requested new parent.
        parent: ObjectId,
    },
    /// The underlying link operation failed.
    #[error(transparent)]
    Link(#[from] LinkError),
}
