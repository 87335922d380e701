// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Endpoint arena and the mirror half of the link protocol.
//!
//! Request operations (on [`crate::LinkStore`]) update the requesting
//! endpoint and then call [`Endpoints::mirror_attach`] /
//! [`Endpoints::mirror_detach`] on each affected peer. Mirror operations live
//! here, on the arena alone, so they cannot reach back into a request
//! operation: they compare current membership on both sides, update the
//! target's own peer set at most once and return.

use std::collections::BTreeMap;

use crate::endpoint::{EndpointRecord, Peers};
use crate::event::PeerChange;
use crate::ident::{EndpointId, ObjectId};

/// Effect of a mirrored attach on a peer endpoint.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MirrorAttach {
    /// Change the target should announce, if its peer set moved.
    pub(crate) change: Option<PeerChange>,
    /// Previous peer a single target let go of; it still lists the target and
    /// must be mirrored with a detach.
    pub(crate) displaced: Option<EndpointId>,
}

/// Arena of endpoint records keyed by id.
pub(crate) struct Endpoints<T> {
    records: BTreeMap<EndpointId, EndpointRecord<T>>,
}

impl<T> Default for Endpoints<T> {
    fn default() -> Self {
        Self {
            records: BTreeMap::new(),
        }
    }
}

impl<T> Endpoints<T> {
    pub(crate) fn get(&self, id: EndpointId) -> Option<&EndpointRecord<T>> {
        self.records.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: EndpointId) -> Option<&mut EndpointRecord<T>> {
        self.records.get_mut(&id)
    }

    pub(crate) fn insert(&mut self, id: EndpointId, record: EndpointRecord<T>) {
        self.records.insert(id, record);
    }

    pub(crate) fn remove(&mut self, id: EndpointId) -> Option<EndpointRecord<T>> {
        self.records.remove(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&EndpointId, &EndpointRecord<T>)> {
        self.records.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    /// `true` iff `peer` is in `id`'s peer set. Unknown ids contain nothing.
    pub(crate) fn contains(&self, id: EndpointId, peer: EndpointId) -> bool {
        self.records
            .get(&id)
            .is_some_and(|rec| rec.peers.contains(peer))
    }

    /// Single peer of `id`, if `id` is a single endpoint with a peer.
    pub(crate) fn single_peer(&self, id: EndpointId) -> Option<EndpointId> {
        self.records.get(&id).and_then(|rec| rec.peers.single())
    }

    /// Owners of `id`'s peers, in peer order.
    pub(crate) fn peer_owners(&self, id: EndpointId) -> Vec<ObjectId> {
        let Some(rec) = self.records.get(&id) else {
            return Vec::new();
        };
        rec.peers
            .iter()
            .filter_map(|p| self.records.get(&p).map(|peer| peer.owner))
            .collect()
    }

    /// The peer a single endpoint would drop if `from` attached to `target`.
    ///
    /// Computed before any state changes so the caller can claim it.
    pub(crate) fn would_displace(&self, target: EndpointId, from: EndpointId) -> Option<EndpointId> {
        if target == from {
            return None;
        }
        self.single_peer(target).filter(|d| *d != from)
    }

    /// Make `target` list `from`, mirroring a request that made `from` list
    /// `target`.
    ///
    /// No-op when `target` already lists `from`. A single target replaces its
    /// previous peer and reports it as displaced.
    pub(crate) fn mirror_attach(&mut self, target: EndpointId, from: EndpointId) -> MirrorAttach {
        let Some(rec) = self.records.get_mut(&target) else {
            return MirrorAttach::default();
        };
        if rec.peers.contains(from) {
            return MirrorAttach::default();
        }
        let attach = match rec.peers_mut() {
            Peers::Single(slot) => {
                let old = slot.replace(from);
                MirrorAttach {
                    change: Some(match old {
                        Some(old) => PeerChange::Replaced { old, new: from },
                        None => PeerChange::Added(from),
                    }),
                    displaced: old,
                }
            }
            Peers::Set(set) => {
                set.insert(from);
                MirrorAttach {
                    change: Some(PeerChange::Added(from)),
                    displaced: None,
                }
            }
            Peers::Ordered(seq) => {
                seq.push(from);
                MirrorAttach {
                    change: Some(PeerChange::Added(from)),
                    displaced: None,
                }
            }
        };
        tracing::trace!(%target, %from, "mirror attach");
        attach
    }

    /// Make `target` stop listing `from`, mirroring a request that made
    /// `from` drop `target`.
    ///
    /// No-op while `from` still lists `target` (an ordered endpoint that held
    /// a duplicate) or when `target` never listed `from`. Otherwise every
    /// occurrence goes, since membership must match on both sides.
    pub(crate) fn mirror_detach(&mut self, target: EndpointId, from: EndpointId) -> Option<PeerChange> {
        if self.contains(from, target) {
            return None;
        }
        let rec = self.records.get_mut(&target)?;
        if !rec.peers.contains(from) {
            return None;
        }
        match rec.peers_mut() {
            Peers::Single(slot) => {
                *slot = None;
            }
            Peers::Set(set) => {
                set.remove(&from);
            }
            Peers::Ordered(seq) => seq.retain(|p| *p != from),
        }
        tracing::trace!(%target, %from, "mirror detach");
        Some(PeerChange::Removed(from))
    }
}
