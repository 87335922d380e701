// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Traversals along one role.
//!
//! From each visited object the walk follows the endpoint it has for `role`
//! (objects without one are leaves) to the owners of that endpoint's peers.
//! Each object is yielded once, starting with `start`, so cycles terminate.

use std::collections::{BTreeSet, VecDeque};

use linkage_core::{LinkError, LinkStore, ObjectId, Role};

/// Objects reachable from `start` along `role`, nearest first.
pub fn walk_breadth_first<T>(
    store: &LinkStore<T>,
    start: ObjectId,
    role: Role,
) -> Result<Vec<ObjectId>, LinkError> {
    if !store.contains_object(start) {
        return Err(LinkError::UnknownObject(start));
    }
    let mut seen = BTreeSet::from([start]);
    let mut order = Vec::new();
    let mut queue = VecDeque::from([start]);
    while let Some(object) = queue.pop_front() {
        order.push(object);
        let Some(end) = store.endpoint_of(object, role) else {
            continue;
        };
        store.for_each_peer(end, |next| {
            if seen.insert(next) {
                queue.push_back(next);
            }
        })?;
    }
    Ok(order)
}

/// Objects reachable from `start` along `role`, in pre-order; peers are
/// visited in their endpoint's order.
pub fn walk_depth_first<T>(
    store: &LinkStore<T>,
    start: ObjectId,
    role: Role,
) -> Result<Vec<ObjectId>, LinkError> {
    if !store.contains_object(start) {
        return Err(LinkError::UnknownObject(start));
    }
    let mut seen = BTreeSet::new();
    let mut order = Vec::new();
    let mut stack = vec![start];
    while let Some(object) = stack.pop() {
        if !seen.insert(object) {
            continue;
        }
        order.push(object);
        let Some(end) = store.endpoint_of(object, role) else {
            continue;
        };
        let mut next = Vec::new();
        store.for_each_peer(end, |peer| next.push(peer))?;
        stack.extend(next.into_iter().rev().filter(|peer| !seen.contains(peer)));
    }
    Ok(order)
}
