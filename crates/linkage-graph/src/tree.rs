// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Ordered trees.
//!
//! Each node plays [`PARENT`] (single) and [`CHILDREN`] (ordered). Moving a
//! node from either side keeps both in step: adding a child to a new parent
//! removes it from the old parent's children, and reparenting a node appends
//! it to the new parent's children.

use linkage_core::{LinkStore, ObjectId, OrderedEnd, Role, SingleEnd, StoreConfig};

use crate::error::GraphError;
use crate::walk::walk_breadth_first;

/// A node's parent.
pub const PARENT: Role = Role::new("parent");
/// A node's children, in insertion order.
pub const CHILDREN: Role = Role::new("children");

/// Forest of `T` values.
#[derive(Debug)]
pub struct Tree<T> {
    store: LinkStore<T>,
}

impl<T> Default for Tree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Tree<T> {
    /// Empty forest.
    pub fn new() -> Self {
        Self {
            store: LinkStore::new(),
        }
    }

    /// Empty forest over a store built with `config`.
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            store: LinkStore::with_config(config),
        }
    }

    /// The backing store.
    pub fn store(&self) -> &LinkStore<T> {
        &self.store
    }

    /// Adds a root node.
    pub fn insert(&mut self, value: T) -> Result<ObjectId, GraphError> {
        let node = self.store.insert(value);
        self.store.add_single(node, PARENT)?;
        self.store.add_ordered(node, CHILDREN)?;
        Ok(node)
    }

    /// Value stored at `node`.
    pub fn get(&self, node: ObjectId) -> Option<&T> {
        self.store.object(node)
    }

    /// Appends `child` to `parent`'s children, detaching it from its current
    /// parent. Adding a child to the parent it already has is a no-op.
    pub fn add_child(&mut self, parent: ObjectId, child: ObjectId) -> Result<(), GraphError> {
        let children = self.children_end(parent)?;
        let up = self.parent_end(child)?;
        if self.store.peer(up)? == Some(children.into()) {
            return Ok(());
        }
        self.check_acyclic(child, parent)?;
        self.store.add(children, up)?;
        Ok(())
    }

    /// Moves `child` under `parent` (appended last), or makes it a root when
    /// `parent` is `None`. A child already under `parent` keeps its place.
    pub fn reparent(&mut self, child: ObjectId, parent: Option<ObjectId>) -> Result<(), GraphError> {
        let up = self.parent_end(child)?;
        match parent {
            Some(parent) => {
                let children = self.children_end(parent)?;
                self.check_acyclic(child, parent)?;
                self.store.connect(up, children)?;
            }
            None => {
                self.store.disconnect(up)?;
            }
        }
        Ok(())
    }

    /// Makes `node` a root.
    pub fn detach(&mut self, node: ObjectId) -> Result<(), GraphError> {
        self.reparent(node, None)
    }

    /// Removes `node`; its children become roots.
    pub fn remove(&mut self, node: ObjectId) -> Result<T, GraphError> {
        Ok(self.store.remove_object(node)?)
    }

    /// Parent of `node`, if it has one.
    pub fn parent(&self, node: ObjectId) -> Result<Option<ObjectId>, GraphError> {
        let up = self.parent_end(node)?;
        match self.store.peer(up)? {
            Some(children) => Ok(Some(self.store.owner_of(children)?)),
            None => Ok(None),
        }
    }

    /// Children of `node` in insertion order.
    pub fn children(&self, node: ObjectId) -> Result<Vec<ObjectId>, GraphError> {
        let down = self.children_end(node)?;
        Ok(self.store.peer_objects(down)?.to_vec())
    }

    /// `node` and everything below it, level by level.
    pub fn descendants(&self, node: ObjectId) -> Result<Vec<ObjectId>, GraphError> {
        Ok(walk_breadth_first(&self.store, node, CHILDREN)?)
    }

    /// Top-most ancestor of `node` (itself for a root).
    pub fn root_of(&self, node: ObjectId) -> Result<ObjectId, GraphError> {
        let mut current = node;
        while let Some(parent) = self.parent(current)? {
            current = parent;
        }
        Ok(current)
    }

    fn check_acyclic(&self, child: ObjectId, parent: ObjectId) -> Result<(), GraphError> {
        if self.descendants(child)?.contains(&parent) {
            tracing::debug!(%child, %parent, "reparent rejected: cycle");
            return Err(GraphError::Cycle { child, parent });
        }
        Ok(())
    }

    fn parent_end(&self, node: ObjectId) -> Result<SingleEnd, GraphError> {
        Ok(self.store.single(node, PARENT)?)
    }

    fn children_end(&self, node: ObjectId) -> Result<OrderedEnd, GraphError> {
        Ok(self.store.ordered(node, CHILDREN)?)
    }
}
