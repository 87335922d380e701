// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Change notifications.

use crate::ident::{EndpointId, ObjectId, Role};
use crate::store::LinkStore;

/// What happened to an endpoint's peer set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerChange {
    /// `peer` joined the peer set.
    Added(EndpointId),
    /// `peer` left the peer set.
    Removed(EndpointId),
    /// `old` was substituted by `new` (in place, for ordered endpoints).
    Replaced {
        /// Peer that left.
        old: EndpointId,
        /// Peer that took its place.
        new: EndpointId,
    },
}

/// Notification delivered to the listeners of `endpoint`.
///
/// Events are delivered after every endpoint touched by the operation has
/// been updated, so a listener never observes a half-made link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkEvent {
    /// Endpoint whose peer set changed.
    pub endpoint: EndpointId,
    /// Owner of `endpoint`.
    pub owner: ObjectId,
    /// Role of `endpoint`.
    pub role: Role,
    /// The change itself.
    pub change: PeerChange,
}

/// Change observer registered with [`LinkStore::subscribe`].
///
/// Listeners get the store back so they can react with further operations;
/// any operation that touches an endpoint of the in-flight change fails with
/// [`crate::LinkError::ConcurrentStructuralChange`].
pub type Listener<T> = Box<dyn FnMut(&mut LinkStore<T>, &LinkEvent)>;
