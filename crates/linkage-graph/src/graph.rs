// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Directed multigraph on top of a [`LinkStore`].
//!
//! Every node and every edge is an object in the store. A node plays
//! [`OUTGOING`] and [`INCOMING`] (set endpoints); an edge plays [`SOURCE`]
//! and [`TARGET`] (single endpoints). Connecting an edge's `target` to a
//! node's `incoming` set is the only bookkeeping needed: the store mirrors it,
//! and retargeting an edge detaches it from the old node automatically.

use std::collections::BTreeMap;

use anyhow::Context;
use linkage_core::{Hash, LinkStore, ObjectId, Role, SetEnd, SingleEnd};
use serde::{Deserialize, Serialize};

use crate::error::GraphError;

/// Caller-chosen node identifier.
pub type NodeKey = u64;
/// Caller-chosen edge identifier.
pub type EdgeKey = u64;

/// Edges leaving a node.
pub const OUTGOING: Role = Role::new("outgoing");
/// Edges entering a node.
pub const INCOMING: Role = Role::new("incoming");
/// Node an edge leaves from.
pub const SOURCE: Role = Role::new("source");
/// Node an edge points at.
pub const TARGET: Role = Role::new("target");

/// Object stored for each graph element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphItem {
    /// A node and its key.
    Node(NodeKey),
    /// An edge and its key.
    Edge(EdgeKey),
}

/// Structural graph mutations, replayable through [`ObjectGraph::apply_op`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum GraphOp {
    /// Create a node.
    AddNode {
        /// Node key.
        id: NodeKey,
    },
    /// Remove a node (incident edges removed implicitly).
    RemoveNode {
        /// Node key.
        id: NodeKey,
    },
    /// Create an edge.
    AddEdge {
        /// Edge key.
        id: EdgeKey,
        /// Source node key.
        src: NodeKey,
        /// Destination node key.
        dst: NodeKey,
    },
    /// Remove an edge.
    RemoveEdge {
        /// Edge key.
        id: EdgeKey,
    },
    /// Point an existing edge at another node.
    RetargetEdge {
        /// Edge key.
        id: EdgeKey,
        /// New destination node key.
        dst: NodeKey,
    },
}

#[derive(Debug, Clone, Copy)]
struct NodeEnds {
    object: ObjectId,
    outgoing: SetEnd,
    incoming: SetEnd,
}

#[derive(Debug, Clone, Copy)]
struct EdgeEnds {
    object: ObjectId,
    source: SingleEnd,
    target: SingleEnd,
}

/// Keyed directed multigraph whose incidence lists are kept symmetric by the
/// link store.
#[derive(Debug, Default)]
pub struct ObjectGraph {
    store: LinkStore<GraphItem>,
    nodes: BTreeMap<NodeKey, NodeEnds>,
    edges: BTreeMap<EdgeKey, EdgeEnds>,
}

impl ObjectGraph {
    /// Empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// The backing store, for audits and digests.
    pub fn store(&self) -> &LinkStore<GraphItem> {
        &self.store
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// `true` if a node has `key`.
    pub fn contains_node(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(&key)
    }

    /// `true` if an edge has `key`.
    pub fn contains_edge(&self, key: EdgeKey) -> bool {
        self.edges.contains_key(&key)
    }

    /// Adds a node.
    pub fn add_node(&mut self, key: NodeKey) -> Result<ObjectId, GraphError> {
        if self.nodes.contains_key(&key) {
            return Err(GraphError::DuplicateNode(key));
        }
        let object = self.store.insert(GraphItem::Node(key));
        let outgoing = self.store.add_set(object, OUTGOING)?;
        let incoming = self.store.add_set(object, INCOMING)?;
        self.nodes.insert(
            key,
            NodeEnds {
                object,
                outgoing,
                incoming,
            },
        );
        Ok(object)
    }

    /// Adds an edge from `src` to `dst`. Parallel edges and self-loops are
    /// allowed.
    pub fn add_edge(
        &mut self,
        key: EdgeKey,
        src: NodeKey,
        dst: NodeKey,
    ) -> Result<ObjectId, GraphError> {
        if self.edges.contains_key(&key) {
            return Err(GraphError::DuplicateEdge(key));
        }
        let from = self.node(src)?;
        let to = self.node(dst)?;
        let object = self.store.insert(GraphItem::Edge(key));
        let source = self.store.add_single(object, SOURCE)?;
        let target = self.store.add_single(object, TARGET)?;
        self.store.connect(source, from.outgoing)?;
        self.store.connect(target, to.incoming)?;
        self.edges.insert(
            key,
            EdgeEnds {
                object,
                source,
                target,
            },
        );
        Ok(object)
    }

    /// Removes an edge; both incident nodes forget it.
    pub fn remove_edge(&mut self, key: EdgeKey) -> Result<(), GraphError> {
        let edge = self.edge(key)?;
        self.store.remove_object(edge.object)?;
        self.edges.remove(&key);
        Ok(())
    }

    /// Removes a node together with every edge touching it.
    pub fn remove_node(&mut self, key: NodeKey) -> Result<(), GraphError> {
        let node = self.node(key)?;
        let mut incident = self.edge_keys(node.outgoing)?;
        incident.extend(self.edge_keys(node.incoming)?);
        incident.sort_unstable();
        incident.dedup();
        for edge in &incident {
            self.remove_edge(*edge)?;
        }
        self.store.remove_object(node.object)?;
        self.nodes.remove(&key);
        tracing::debug!(node = key, edges = incident.len(), "node removed");
        Ok(())
    }

    /// Points edge `key` at `dst`. The old destination's incoming set drops
    /// the edge as part of the same request.
    pub fn retarget_edge(&mut self, key: EdgeKey, dst: NodeKey) -> Result<(), GraphError> {
        let edge = self.edge(key)?;
        let to = self.node(dst)?;
        self.store.connect(edge.target, to.incoming)?;
        Ok(())
    }

    /// Source and destination of edge `key`.
    pub fn endpoints(&self, key: EdgeKey) -> Result<(NodeKey, NodeKey), GraphError> {
        let edge = self.edge(key)?;
        let src = self.node_behind(key, edge.source)?;
        let dst = self.node_behind(key, edge.target)?;
        Ok((src, dst))
    }

    /// Destinations of the edges leaving `key`, one entry per edge, in edge
    /// creation order.
    pub fn successors(&self, key: NodeKey) -> Result<Vec<NodeKey>, GraphError> {
        let node = self.node(key)?;
        self.edge_keys(node.outgoing)?
            .into_iter()
            .map(|edge| self.endpoints(edge).map(|(_, dst)| dst))
            .collect()
    }

    /// Sources of the edges entering `key`, one entry per edge, in edge
    /// creation order.
    pub fn predecessors(&self, key: NodeKey) -> Result<Vec<NodeKey>, GraphError> {
        let node = self.node(key)?;
        self.edge_keys(node.incoming)?
            .into_iter()
            .map(|edge| self.endpoints(edge).map(|(src, _)| src))
            .collect()
    }

    /// Applies one structural op.
    pub fn apply_op(&mut self, op: GraphOp) -> anyhow::Result<()> {
        match op {
            GraphOp::AddNode { id } => {
                self.add_node(id).context("add node")?;
            }
            GraphOp::RemoveNode { id } => self.remove_node(id).context("remove node")?,
            GraphOp::AddEdge { id, src, dst } => {
                self.add_edge(id, src, dst)
                    .with_context(|| format!("add edge {src} -> {dst}"))?;
            }
            GraphOp::RemoveEdge { id } => self.remove_edge(id).context("remove edge")?,
            GraphOp::RetargetEdge { id, dst } => self
                .retarget_edge(id, dst)
                .with_context(|| format!("retarget edge {id}"))?,
        }
        Ok(())
    }

    /// Digest of the graph's link state.
    pub fn link_digest(&self) -> Hash {
        self.store.link_digest()
    }

    fn node(&self, key: NodeKey) -> Result<NodeEnds, GraphError> {
        self.nodes.get(&key).copied().ok_or(GraphError::MissingNode(key))
    }

    fn edge(&self, key: EdgeKey) -> Result<EdgeEnds, GraphError> {
        self.edges.get(&key).copied().ok_or(GraphError::MissingEdge(key))
    }

    /// Keys of the edges attached to a node endpoint.
    fn edge_keys(&self, end: SetEnd) -> Result<Vec<EdgeKey>, GraphError> {
        let mut keys = Vec::new();
        self.store.for_each_peer(end, |owner| {
            if let Some(GraphItem::Edge(key)) = self.store.object(owner) {
                keys.push(*key);
            }
        })?;
        Ok(keys)
    }

    /// Node an edge endpoint is attached to.
    fn node_behind(&self, key: EdgeKey, end: SingleEnd) -> Result<NodeKey, GraphError> {
        let peer = self.store.peer(end)?.ok_or(GraphError::MissingEdge(key))?;
        match self.store.object(self.store.owner_of(peer)?) {
            Some(GraphItem::Node(node)) => Ok(*node),
            _ => Err(GraphError::MissingEdge(key)),
        }
    }
}
