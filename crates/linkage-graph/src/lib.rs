// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Structures built on `linkage-core` associations.
//!
//! - [`ObjectGraph`]: directed multigraph whose nodes and edges are both
//!   store objects, linked through `outgoing`/`incoming` set endpoints on
//!   nodes and `source`/`target` single endpoints on edges.
//! - [`Tree`]: `parent` single endpoint paired with an ordered `children`
//!   endpoint, with cycle-rejecting moves.
//! - [`walk_breadth_first`] / [`walk_depth_first`]: traversals along one role.

#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod graph;
mod tree;
mod walk;

pub use error::GraphError;
pub use graph::{
    EdgeKey, GraphItem, GraphOp, NodeKey, ObjectGraph, INCOMING, OUTGOING, SOURCE, TARGET,
};
pub use tree::{Tree, CHILDREN, PARENT};
pub use walk::{walk_breadth_first, walk_depth_first};
