// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Endpoint records and typed endpoint handles.
//!
//! An endpoint is one side of a relationship. Its record lives in the store's
//! arena; callers hold one of the typed handles ([`SingleEnd`], [`SetEnd`],
//! [`OrderedEnd`]) whose type fixes which request operations apply to it.
//! Handles carry their owner, so [`EndpointRef::owner`] cannot fail.

use std::cell::OnceCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use crate::event::Listener;
use crate::ident::{EndpointId, ListenerId, ObjectId, Role};

/// Multiplicity of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Multiplicity {
    /// 0..1 peer.
    Single,
    /// 0..* peers, unordered, no duplicates.
    Set,
    /// 0..* peers, insertion-ordered, duplicates allowed.
    Ordered,
}

impl Multiplicity {
    pub(crate) const fn tag(self) -> u8 {
        match self {
            Self::Single => 1,
            Self::Set => 2,
            Self::Ordered => 3,
        }
    }
}

/// Read-only snapshot of the objects owning an endpoint's peers.
pub type PeerView = Rc<[ObjectId]>;

/// The peer an acceptance predicate is asked about.
#[derive(Debug)]
pub struct Candidate<'a, T> {
    /// Candidate peer endpoint.
    pub endpoint: EndpointId,
    /// Role the candidate endpoint plays for its owner.
    pub role: Role,
    /// Multiplicity of the candidate endpoint.
    pub multiplicity: Multiplicity,
    /// Owner of the candidate endpoint.
    pub owner: ObjectId,
    /// The owning domain object.
    pub object: &'a T,
}

/// Acceptance predicate installed when an endpoint is created.
///
/// Must be pure: it is consulted once per candidate, before any state
/// changes, and never again for the mirrored half of the same link.
pub type Acceptor<T> = Box<dyn Fn(&Candidate<'_, T>) -> bool>;

/// Common accessors of the typed endpoint handles.
pub trait EndpointRef: Copy {
    /// Arena id of the endpoint.
    fn id(self) -> EndpointId;
    /// Object that owns the endpoint.
    fn owner(self) -> ObjectId;
    /// Multiplicity of the endpoint.
    fn multiplicity(self) -> Multiplicity;
}

macro_rules! endpoint_handle {
    ($(#[$doc:meta])* $name:ident, $mult:expr) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
        pub struct $name {
            id: EndpointId,
            owner: ObjectId,
        }

        impl $name {
            pub(crate) const fn new(id: EndpointId, owner: ObjectId) -> Self {
                Self { id, owner }
            }
        }

        impl EndpointRef for $name {
            fn id(self) -> EndpointId {
                self.id
            }

            fn owner(self) -> ObjectId {
                self.owner
            }

            fn multiplicity(self) -> Multiplicity {
                $mult
            }
        }

        impl From<$name> for EndpointId {
            fn from(end: $name) -> Self {
                end.id
            }
        }
    };
}

endpoint_handle!(
    /// Handle to a 0..1 endpoint; mutated through [`crate::LinkStore::connect`].
    SingleEnd,
    Multiplicity::Single
);
endpoint_handle!(
    /// Handle to an unordered, duplicate-free 0..* endpoint.
    SetEnd,
    Multiplicity::Set
);
endpoint_handle!(
    /// Handle to an insertion-ordered 0..* endpoint that permits duplicates.
    OrderedEnd,
    Multiplicity::Ordered
);

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::SetEnd {}
    impl Sealed for super::OrderedEnd {}
}

/// Handles of the 0..* endpoint kinds, which take `add`, `remove` and
/// `replace` requests.
pub trait ManyEnd: EndpointRef + sealed::Sealed {}

impl ManyEnd for SetEnd {}
impl ManyEnd for OrderedEnd {}

/// Peer membership in the representation the multiplicity calls for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Peers {
    Single(Option<EndpointId>),
    Set(BTreeSet<EndpointId>),
    Ordered(Vec<EndpointId>),
}

impl Peers {
    pub(crate) fn empty(multiplicity: Multiplicity) -> Self {
        match multiplicity {
            Multiplicity::Single => Self::Single(None),
            Multiplicity::Set => Self::Set(BTreeSet::new()),
            Multiplicity::Ordered => Self::Ordered(Vec::new()),
        }
    }

    pub(crate) fn multiplicity(&self) -> Multiplicity {
        match self {
            Self::Single(_) => Multiplicity::Single,
            Self::Set(_) => Multiplicity::Set,
            Self::Ordered(_) => Multiplicity::Ordered,
        }
    }

    pub(crate) fn contains(&self, peer: EndpointId) -> bool {
        match self {
            Self::Single(p) => *p == Some(peer),
            Self::Set(s) => s.contains(&peer),
            Self::Ordered(v) => v.contains(&peer),
        }
    }

    /// Number of stored entries (duplicates counted for ordered endpoints).
    pub(crate) fn len(&self) -> usize {
        match self {
            Self::Single(p) => usize::from(p.is_some()),
            Self::Set(s) => s.len(),
            Self::Ordered(v) => v.len(),
        }
    }

    /// Entries in multiplicity order (ascending id for sets).
    pub(crate) fn iter(&self) -> Box<dyn Iterator<Item = EndpointId> + '_> {
        match self {
            Self::Single(p) => Box::new(p.iter().copied()),
            Self::Set(s) => Box::new(s.iter().copied()),
            Self::Ordered(v) => Box::new(v.iter().copied()),
        }
    }

    /// Distinct peers, first occurrence order.
    pub(crate) fn distinct(&self) -> Vec<EndpointId> {
        let mut seen = BTreeSet::new();
        self.iter().filter(|p| seen.insert(*p)).collect()
    }

    /// The single peer, if this is a single endpoint.
    pub(crate) fn single(&self) -> Option<EndpointId> {
        match self {
            Self::Single(p) => *p,
            Self::Set(_) | Self::Ordered(_) => None,
        }
    }
}

/// Arena record of one endpoint.
pub(crate) struct EndpointRecord<T> {
    pub(crate) owner: ObjectId,
    pub(crate) role: Role,
    pub(crate) peers: Peers,
    pub(crate) view: OnceCell<PeerView>,
    pub(crate) acceptor: Option<Acceptor<T>>,
    pub(crate) listeners: Vec<(ListenerId, Listener<T>)>,
    /// Listeners currently taken out of `listeners` for dispatch.
    pub(crate) dispatched: Vec<ListenerId>,
    /// Dispatched listeners unsubscribed before their dispatch returned.
    pub(crate) dropped: Vec<ListenerId>,
}

impl<T> EndpointRecord<T> {
    pub(crate) fn new(
        owner: ObjectId,
        role: Role,
        multiplicity: Multiplicity,
        acceptor: Option<Acceptor<T>>,
    ) -> Self {
        Self {
            owner,
            role,
            peers: Peers::empty(multiplicity),
            view: OnceCell::new(),
            acceptor,
            listeners: Vec::new(),
            dispatched: Vec::new(),
            dropped: Vec::new(),
        }
    }

    pub(crate) fn multiplicity(&self) -> Multiplicity {
        self.peers.multiplicity()
    }

    /// Mutable access to the peer set; drops the cached view.
    pub(crate) fn peers_mut(&mut self) -> &mut Peers {
        self.view.take();
        &mut self.peers
    }
}

impl<T> core::fmt::Debug for EndpointRecord<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EndpointRecord")
            .field("owner", &self.owner)
            .field("role", &self.role)
            .field("peers", &self.peers)
            .field("cached", &self.view.get().is_some())
            .field("listeners", &self.listeners.len())
            .field("dispatched", &self.dispatched.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ep(n: u64) -> EndpointId {
        EndpointId::from_raw(n)
    }

    #[test]
    fn ordered_distinct_keeps_first_occurrence_order() {
        let peers = Peers::Ordered(vec![ep(3), ep(1), ep(3), ep(2), ep(1)]);
        assert_eq!(peers.distinct(), vec![ep(3), ep(1), ep(2)]);
        assert_eq!(peers.len(), 5);
    }

    #[test]
    fn set_iterates_in_id_order() {
        let peers = Peers::Set([ep(9), ep(2), ep(5)].into_iter().collect());
        assert_eq!(peers.iter().collect::<Vec<_>>(), vec![ep(2), ep(5), ep(9)]);
        assert!(peers.single().is_none());
    }

    #[test]
    fn peers_mut_drops_cached_view() {
        let mut rec: EndpointRecord<()> = EndpointRecord::new(
            ObjectId::from_raw(1),
            Role::new("r"),
            Multiplicity::Single,
            None,
        );
        let _ = rec.view.set(Rc::from(vec![ObjectId::from_raw(2)]));
        assert!(rec.view.get().is_some());
        *rec.peers_mut() = Peers::Single(Some(ep(4)));
        assert!(rec.view.get().is_none());
    }
}
