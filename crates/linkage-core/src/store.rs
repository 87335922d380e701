// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Arena store: domain objects, their endpoints, and the request half of the
//! link protocol.
//!
//! Every request follows the same sequence:
//!
//! 1. resolve ids and check multiplicity (errors leave the store untouched);
//! 2. claim every endpoint the request may touch (see [`crate::guard`]);
//! 3. settle no-ops and consult both acceptance predicates;
//! 4. update the requesting endpoint's own peers;
//! 5. mirror the change onto each affected peer (arena mirror ops);
//! 6. audit (per [`VerifyMode`](crate::VerifyMode)), then notify listeners;
//! 7. release the claim.
//!
//! Claims and listener lists are restored by drop guards, so a panicking
//! listener, acceptance predicate or audit leaves the store usable: the
//! endpoints are released and every listener stays registered.

use std::collections::BTreeMap;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::arena::Endpoints;
use crate::config::StoreConfig;
use crate::digest;
use crate::endpoint::{
    Acceptor, Candidate, EndpointRecord, EndpointRef, ManyEnd, Multiplicity, OrderedEnd, PeerView,
    Peers, SetEnd, SingleEnd,
};
use crate::error::{LinkError, LinkOutcome};
use crate::event::{LinkEvent, Listener, PeerChange};
use crate::guard::{self, BrokenInvariant, BusySet, Claim};
use crate::ident::{EndpointId, Hash, IdCounter, ListenerId, ObjectId, Role};
use crate::telemetry;

/// A domain object and the endpoints it owns, in creation order.
struct ObjectRecord<T> {
    value: T,
    endpoints: Vec<EndpointId>,
}

/// Peer changes collected while one request runs, requester first.
type Changes = Vec<(EndpointId, PeerChange)>;

/// Central store for related objects.
///
/// Objects are registered with [`LinkStore::insert`]; each role an object
/// plays gets one endpoint ([`LinkStore::add_single`], [`LinkStore::add_set`],
/// [`LinkStore::add_ordered`]). Endpoints reference their peers only by id,
/// so removing an object never leaves a live reference behind.
///
/// Mutation is single-threaded: the store is neither `Send` nor `Sync`.
pub struct LinkStore<T> {
    config: StoreConfig,
    objects: BTreeMap<ObjectId, ObjectRecord<T>>,
    endpoints: Endpoints<T>,
    roles: FxHashMap<(ObjectId, Role), EndpointId>,
    busy: BusySet,
    object_ids: IdCounter,
    endpoint_ids: IdCounter,
    listener_ids: IdCounter,
}

impl<T> Default for LinkStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> core::fmt::Debug for LinkStore<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LinkStore")
            .field("config", &self.config)
            .field("objects", &self.objects.len())
            .field("endpoints", &self.endpoints.len())
            .finish_non_exhaustive()
    }
}

impl<T> LinkStore<T> {
    /// Creates an empty store with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Creates an empty store with `config`.
    #[must_use]
    pub fn with_config(config: StoreConfig) -> Self {
        let mut roles = FxHashMap::default();
        roles.reserve(config.initial_capacity);
        Self {
            config,
            objects: BTreeMap::new(),
            endpoints: Endpoints::default(),
            roles,
            busy: BusySet::default(),
            object_ids: IdCounter::new(),
            endpoint_ids: IdCounter::new(),
            listener_ids: IdCounter::new(),
        }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // ── objects ────────────────────────────────────────────────────────────

    /// Registers a domain object and returns its handle.
    ///
    /// # Panics
    ///
    /// Panics with a [`LinkError::IdsExhausted`] payload once every object
    /// id has been issued; use [`LinkStore::try_insert`] to handle that case.
    pub fn insert(&mut self, value: T) -> ObjectId {
        match self.try_insert(value) {
            Ok(id) => id,
            Err(err) => std::panic::panic_any(err),
        }
    }

    /// Registers a domain object, failing once the object id space is spent.
    pub fn try_insert(&mut self, value: T) -> Result<ObjectId, LinkError> {
        let raw = self
            .object_ids
            .next()
            .ok_or(LinkError::IdsExhausted("object"))?;
        let id = ObjectId::from_raw(raw);
        self.objects.insert(
            id,
            ObjectRecord {
                value,
                endpoints: Vec::new(),
            },
        );
        Ok(id)
    }

    /// Returns the object behind `id`.
    pub fn object(&self, id: ObjectId) -> Option<&T> {
        self.objects.get(&id).map(|rec| &rec.value)
    }

    /// Returns the object behind `id` mutably.
    ///
    /// Only the domain payload is reachable this way; relationships change
    /// solely through the request operations.
    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut T> {
        self.objects.get_mut(&id).map(|rec| &mut rec.value)
    }

    /// Returns `true` if `id` is registered.
    pub fn contains_object(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    /// Number of registered objects.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Iterates objects in ascending id (registration) order.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &T)> {
        self.objects.iter().map(|(id, rec)| (*id, &rec.value))
    }

    /// Disconnects every endpoint `id` owns from all peers, frees those
    /// endpoints and returns the object.
    ///
    /// The object's endpoints and all of their peers are claimed for the
    /// whole removal, so listeners reacting to the disconnect notifications
    /// cannot re-link the departing object.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn remove_object(&mut self, id: ObjectId) -> Result<T, LinkError> {
        let owned = self
            .objects
            .get(&id)
            .ok_or(LinkError::UnknownObject(id))?
            .endpoints
            .clone();
        let mut involved = owned.clone();
        for ep in &owned {
            if let Some(rec) = self.endpoints.get(*ep) {
                involved.extend(rec.peers.distinct());
            }
        }
        let claim = guard::claim(&self.endpoints, &self.busy, &involved, &[])?;
        let held = claim.ids().to_vec();
        for ep in &owned {
            self.clear_held(*ep, &held)?;
        }
        for ep in &owned {
            if let Some(rec) = self.endpoints.remove(*ep) {
                self.roles.remove(&(rec.owner, rec.role));
            }
        }
        drop(claim);
        let rec = self.objects.remove(&id).ok_or(LinkError::UnknownObject(id))?;
        tracing::debug!(object = %id, endpoints = owned.len(), "object removed");
        Ok(rec.value)
    }

    // ── endpoints ──────────────────────────────────────────────────────────

    /// Gives `owner` a 0..1 endpoint for `role`.
    pub fn add_single(&mut self, owner: ObjectId, role: Role) -> Result<SingleEnd, LinkError> {
        let id = self.add_endpoint(owner, role, Multiplicity::Single, None)?;
        Ok(SingleEnd::new(id, owner))
    }

    /// Like [`LinkStore::add_single`], restricting peers to those `accepts`
    /// approves.
    pub fn add_single_with<F>(
        &mut self,
        owner: ObjectId,
        role: Role,
        accepts: F,
    ) -> Result<SingleEnd, LinkError>
    where
        F: Fn(&Candidate<'_, T>) -> bool + 'static,
    {
        let id = self.add_endpoint(owner, role, Multiplicity::Single, Some(Box::new(accepts)))?;
        Ok(SingleEnd::new(id, owner))
    }

    /// Gives `owner` an unordered, duplicate-free 0..* endpoint for `role`.
    pub fn add_set(&mut self, owner: ObjectId, role: Role) -> Result<SetEnd, LinkError> {
        let id = self.add_endpoint(owner, role, Multiplicity::Set, None)?;
        Ok(SetEnd::new(id, owner))
    }

    /// Like [`LinkStore::add_set`], restricting peers to those `accepts`
    /// approves.
    pub fn add_set_with<F>(
        &mut self,
        owner: ObjectId,
        role: Role,
        accepts: F,
    ) -> Result<SetEnd, LinkError>
    where
        F: Fn(&Candidate<'_, T>) -> bool + 'static,
    {
        let id = self.add_endpoint(owner, role, Multiplicity::Set, Some(Box::new(accepts)))?;
        Ok(SetEnd::new(id, owner))
    }

    /// Gives `owner` an insertion-ordered 0..* endpoint for `role`.
    pub fn add_ordered(&mut self, owner: ObjectId, role: Role) -> Result<OrderedEnd, LinkError> {
        let id = self.add_endpoint(owner, role, Multiplicity::Ordered, None)?;
        Ok(OrderedEnd::new(id, owner))
    }

    /// Like [`LinkStore::add_ordered`], restricting peers to those `accepts`
    /// approves.
    pub fn add_ordered_with<F>(
        &mut self,
        owner: ObjectId,
        role: Role,
        accepts: F,
    ) -> Result<OrderedEnd, LinkError>
    where
        F: Fn(&Candidate<'_, T>) -> bool + 'static,
    {
        let id = self.add_endpoint(owner, role, Multiplicity::Ordered, Some(Box::new(accepts)))?;
        Ok(OrderedEnd::new(id, owner))
    }

    fn add_endpoint(
        &mut self,
        owner: ObjectId,
        role: Role,
        multiplicity: Multiplicity,
        acceptor: Option<Acceptor<T>>,
    ) -> Result<EndpointId, LinkError> {
        if !self.objects.contains_key(&owner) {
            return Err(LinkError::UnknownObject(owner));
        }
        if self.roles.contains_key(&(owner, role)) {
            return Err(LinkError::DuplicateRole {
                object: owner,
                role,
            });
        }
        let raw = self
            .endpoint_ids
            .next()
            .ok_or(LinkError::IdsExhausted("endpoint"))?;
        let id = EndpointId::from_raw(raw);
        self.endpoints
            .insert(id, EndpointRecord::new(owner, role, multiplicity, acceptor));
        self.roles.insert((owner, role), id);
        if let Some(rec) = self.objects.get_mut(&owner) {
            rec.endpoints.push(id);
        }
        Ok(id)
    }

    /// Endpoint `owner` uses for `role`, if it plays that role.
    pub fn endpoint_of(&self, owner: ObjectId, role: Role) -> Option<EndpointId> {
        self.roles.get(&(owner, role)).copied()
    }

    /// Endpoints `owner` holds, in creation order.
    pub fn endpoints_of(&self, owner: ObjectId) -> Result<&[EndpointId], LinkError> {
        self.objects
            .get(&owner)
            .map(|rec| rec.endpoints.as_slice())
            .ok_or(LinkError::UnknownObject(owner))
    }

    /// Typed accessor for `owner`'s single endpoint in `role`.
    pub fn single(&self, owner: ObjectId, role: Role) -> Result<SingleEnd, LinkError> {
        let id = self.role_endpoint(owner, role, Multiplicity::Single)?;
        Ok(SingleEnd::new(id, owner))
    }

    /// Typed accessor for `owner`'s set endpoint in `role`.
    pub fn set(&self, owner: ObjectId, role: Role) -> Result<SetEnd, LinkError> {
        let id = self.role_endpoint(owner, role, Multiplicity::Set)?;
        Ok(SetEnd::new(id, owner))
    }

    /// Typed accessor for `owner`'s ordered endpoint in `role`.
    pub fn ordered(&self, owner: ObjectId, role: Role) -> Result<OrderedEnd, LinkError> {
        let id = self.role_endpoint(owner, role, Multiplicity::Ordered)?;
        Ok(OrderedEnd::new(id, owner))
    }

    fn role_endpoint(
        &self,
        owner: ObjectId,
        role: Role,
        expected: Multiplicity,
    ) -> Result<EndpointId, LinkError> {
        if !self.objects.contains_key(&owner) {
            return Err(LinkError::UnknownObject(owner));
        }
        let id = self
            .endpoint_of(owner, role)
            .ok_or(LinkError::UnknownRole {
                object: owner,
                role,
            })?;
        self.checked(id, expected)?;
        Ok(id)
    }

    fn record(&self, id: EndpointId) -> Result<&EndpointRecord<T>, LinkError> {
        self.endpoints.get(id).ok_or(LinkError::UnknownEndpoint(id))
    }

    fn checked(
        &self,
        id: EndpointId,
        expected: Multiplicity,
    ) -> Result<&EndpointRecord<T>, LinkError> {
        let rec = self.record(id)?;
        let actual = rec.multiplicity();
        if actual != expected {
            return Err(LinkError::WrongMultiplicity {
                endpoint: id,
                expected,
                actual,
            });
        }
        Ok(rec)
    }

    // ── queries ────────────────────────────────────────────────────────────

    /// Object owning `endpoint`.
    pub fn owner_of(&self, endpoint: impl Into<EndpointId>) -> Result<ObjectId, LinkError> {
        self.record(endpoint.into()).map(|rec| rec.owner)
    }

    /// Role `endpoint` plays for its owner.
    pub fn role_of(&self, endpoint: impl Into<EndpointId>) -> Result<Role, LinkError> {
        self.record(endpoint.into()).map(|rec| rec.role)
    }

    /// Multiplicity of `endpoint`.
    pub fn multiplicity_of(
        &self,
        endpoint: impl Into<EndpointId>,
    ) -> Result<Multiplicity, LinkError> {
        self.record(endpoint.into()).map(EndpointRecord::multiplicity)
    }

    /// `true` iff `peer` is currently a peer of `endpoint`.
    pub fn contains(
        &self,
        endpoint: impl Into<EndpointId>,
        peer: impl Into<EndpointId>,
    ) -> Result<bool, LinkError> {
        self.record(endpoint.into())
            .map(|rec| rec.peers.contains(peer.into()))
    }

    /// Number of peer entries (duplicates count for ordered endpoints).
    pub fn len(&self, endpoint: impl Into<EndpointId>) -> Result<usize, LinkError> {
        self.record(endpoint.into()).map(|rec| rec.peers.len())
    }

    /// `true` when `endpoint` has no peers.
    pub fn is_empty(&self, endpoint: impl Into<EndpointId>) -> Result<bool, LinkError> {
        self.len(endpoint).map(|n| n == 0)
    }

    /// Peer endpoints in multiplicity order (ascending id for sets).
    pub fn peers(&self, endpoint: impl Into<EndpointId>) -> Result<Vec<EndpointId>, LinkError> {
        self.record(endpoint.into())
            .map(|rec| rec.peers.iter().collect())
    }

    /// The single endpoint's current peer.
    pub fn peer(&self, end: SingleEnd) -> Result<Option<EndpointId>, LinkError> {
        self.checked(end.id(), Multiplicity::Single)
            .map(|rec| rec.peers.single())
    }

    /// Owners of `endpoint`'s peers, in multiplicity order.
    ///
    /// With [`StoreConfig::cache_views`] the view is memoized until the
    /// endpoint's peers next change; repeated calls share one allocation.
    pub fn peer_objects(&self, endpoint: impl Into<EndpointId>) -> Result<PeerView, LinkError> {
        let id = endpoint.into();
        let rec = self.record(id)?;
        if !self.config.cache_views {
            return Ok(Rc::from(self.endpoints.peer_owners(id)));
        }
        let view = rec
            .view
            .get_or_init(|| Rc::from(self.endpoints.peer_owners(id)));
        Ok(Rc::clone(view))
    }

    /// Calls `action` with the owner of each peer, in multiplicity order,
    /// without materializing a view.
    pub fn for_each_peer<F>(&self, endpoint: impl Into<EndpointId>, mut action: F) -> Result<(), LinkError>
    where
        F: FnMut(ObjectId),
    {
        let rec = self.record(endpoint.into())?;
        for peer in rec.peers.iter() {
            if let Some(peer) = self.endpoints.get(peer) {
                action(peer.owner);
            }
        }
        Ok(())
    }

    /// Position of the first occurrence of `peer`.
    pub fn index_of(
        &self,
        end: OrderedEnd,
        peer: impl Into<EndpointId>,
    ) -> Result<Option<usize>, LinkError> {
        let peer = peer.into();
        let rec = self.checked(end.id(), Multiplicity::Ordered)?;
        Ok(rec.peers.iter().position(|p| p == peer))
    }

    /// Peer at `index`.
    pub fn at(&self, end: OrderedEnd, index: usize) -> Result<EndpointId, LinkError> {
        let rec = self.checked(end.id(), Multiplicity::Ordered)?;
        let len = rec.peers.len();
        rec.peers
            .iter()
            .nth(index)
            .ok_or(LinkError::IndexOutOfBounds {
                endpoint: end.id(),
                index,
                len,
            })
    }

    // ── requests ───────────────────────────────────────────────────────────

    /// Links the single endpoint `end` to `peer`, detaching its previous peer.
    ///
    /// Fires one `Replaced`/`Added` event on `end`, plus the mirrored event
    /// on each affected peer.
    pub fn connect(
        &mut self,
        end: SingleEnd,
        peer: impl Into<EndpointId>,
    ) -> Result<LinkOutcome, LinkError> {
        self.set_peer_held(end.id(), Some(peer.into()), &[])
    }

    /// Detaches the single endpoint `end` from its peer, if any.
    pub fn disconnect(&mut self, end: SingleEnd) -> Result<LinkOutcome, LinkError> {
        self.set_peer_held(end.id(), None, &[])
    }

    /// [`LinkStore::connect`] for `Some`, [`LinkStore::disconnect`] for `None`.
    pub fn set_peer(
        &mut self,
        end: SingleEnd,
        peer: Option<EndpointId>,
    ) -> Result<LinkOutcome, LinkError> {
        self.set_peer_held(end.id(), peer, &[])
    }

    /// Adds `peer` to a 0..* endpoint.
    ///
    /// Set endpoints ignore a peer they already hold; ordered endpoints
    /// append it again.
    pub fn add(
        &mut self,
        end: impl ManyEnd,
        peer: impl Into<EndpointId>,
    ) -> Result<LinkOutcome, LinkError> {
        self.add_held(end.id(), end.multiplicity(), peer.into(), &[])
    }

    /// Removes `peer` from a 0..* endpoint (the first occurrence, for ordered
    /// endpoints). Absent peers are a no-op.
    pub fn remove(
        &mut self,
        end: impl ManyEnd,
        peer: impl Into<EndpointId>,
    ) -> Result<LinkOutcome, LinkError> {
        self.remove_held(end.id(), end.multiplicity(), peer.into(), &[])
    }

    /// Substitutes `new` for `old` in one step with a single `Replaced` event.
    ///
    /// Ordered endpoints keep `new` at `old`'s position. If `old` is absent
    /// this is [`LinkStore::add`]; if a set endpoint already holds `new` this
    /// is [`LinkStore::remove`] of `old`.
    pub fn replace(
        &mut self,
        end: impl ManyEnd,
        old: impl Into<EndpointId>,
        new: impl Into<EndpointId>,
    ) -> Result<LinkOutcome, LinkError> {
        self.replace_held(end.id(), end.multiplicity(), old.into(), new.into(), &[])
    }

    /// Removes every peer of `end`, symmetrically.
    pub fn clear(&mut self, end: impl EndpointRef) -> Result<LinkOutcome, LinkError> {
        self.checked(end.id(), end.multiplicity())?;
        self.clear_held(end.id(), &[])
    }

    fn set_peer_held(
        &mut self,
        a: EndpointId,
        new: Option<EndpointId>,
        held: &[EndpointId],
    ) -> Result<LinkOutcome, LinkError> {
        let old = self.checked(a, Multiplicity::Single)?.peers.single();
        if let Some(q) = new {
            self.record(q)?;
        }
        let displaced = new.and_then(|q| self.endpoints.would_displace(q, a));
        let involved: Vec<EndpointId> = [Some(a), old, new, displaced].into_iter().flatten().collect();
        let claim = guard::claim(&self.endpoints, &self.busy, &involved, held)?;

        let change = match (old, new) {
            (Some(old), Some(new)) if old == new => {
                return Ok(self.settle(claim, a, "connect", LinkOutcome::Unchanged));
            }
            (None, None) => {
                return Ok(self.settle(claim, a, "disconnect", LinkOutcome::Unchanged));
            }
            (Some(old), Some(new)) => PeerChange::Replaced { old, new },
            (None, Some(new)) => PeerChange::Added(new),
            (Some(old), None) => PeerChange::Removed(old),
        };
        if let Some(q) = new {
            if !self.acceptable(a, q) {
                telemetry::rejected(a, q);
                return Ok(self.settle(claim, a, "connect", LinkOutcome::Rejected));
            }
        }

        if let Some(rec) = self.endpoints.get_mut(a) {
            *rec.peers_mut() = Peers::Single(new);
        }
        let mut changes: Changes = vec![(a, change)];
        if let Some(x) = old {
            self.detach_mirrored(x, a, &mut changes);
        }
        if let Some(q) = new {
            self.attach_mirrored(q, a, &mut changes);
        }
        Ok(self.finish(claim, changes))
    }

    fn add_held(
        &mut self,
        a: EndpointId,
        multiplicity: Multiplicity,
        q: EndpointId,
        held: &[EndpointId],
    ) -> Result<LinkOutcome, LinkError> {
        let already = self.checked(a, multiplicity)?.peers.contains(q);
        self.record(q)?;
        let displaced = self.endpoints.would_displace(q, a);
        let involved: Vec<EndpointId> = [Some(a), Some(q), displaced].into_iter().flatten().collect();
        let claim = guard::claim(&self.endpoints, &self.busy, &involved, held)?;

        if already && multiplicity == Multiplicity::Set {
            return Ok(self.settle(claim, a, "add", LinkOutcome::Unchanged));
        }
        if !self.acceptable(a, q) {
            telemetry::rejected(a, q);
            return Ok(self.settle(claim, a, "add", LinkOutcome::Rejected));
        }

        if let Some(rec) = self.endpoints.get_mut(a) {
            match rec.peers_mut() {
                Peers::Set(set) => {
                    set.insert(q);
                }
                Peers::Ordered(seq) => seq.push(q),
                Peers::Single(slot) => *slot = Some(q),
            }
        }
        let mut changes: Changes = vec![(a, PeerChange::Added(q))];
        self.attach_mirrored(q, a, &mut changes);
        Ok(self.finish(claim, changes))
    }

    fn remove_held(
        &mut self,
        a: EndpointId,
        multiplicity: Multiplicity,
        q: EndpointId,
        held: &[EndpointId],
    ) -> Result<LinkOutcome, LinkError> {
        let present = self.checked(a, multiplicity)?.peers.contains(q);
        let claim = guard::claim(&self.endpoints, &self.busy, &[a, q], held)?;
        if !present {
            return Ok(self.settle(claim, a, "remove", LinkOutcome::Unchanged));
        }

        if let Some(rec) = self.endpoints.get_mut(a) {
            match rec.peers_mut() {
                Peers::Set(set) => {
                    set.remove(&q);
                }
                Peers::Ordered(seq) => {
                    if let Some(pos) = seq.iter().position(|p| *p == q) {
                        seq.remove(pos);
                    }
                }
                Peers::Single(slot) => *slot = None,
            }
        }
        let mut changes: Changes = vec![(a, PeerChange::Removed(q))];
        self.detach_mirrored(q, a, &mut changes);
        Ok(self.finish(claim, changes))
    }

    fn replace_held(
        &mut self,
        a: EndpointId,
        multiplicity: Multiplicity,
        old: EndpointId,
        new: EndpointId,
        held: &[EndpointId],
    ) -> Result<LinkOutcome, LinkError> {
        let rec = self.checked(a, multiplicity)?;
        let has_old = rec.peers.contains(old);
        let has_new = rec.peers.contains(new);
        self.record(new)?;
        let displaced = self.endpoints.would_displace(new, a);
        let involved: Vec<EndpointId> = [Some(a), Some(old), Some(new), displaced]
            .into_iter()
            .flatten()
            .collect();
        let claim = guard::claim(&self.endpoints, &self.busy, &involved, held)?;

        if old == new {
            return Ok(self.settle(claim, a, "replace", LinkOutcome::Unchanged));
        }
        if !has_old {
            drop(claim);
            return self.add_held(a, multiplicity, new, held);
        }
        if has_new && multiplicity == Multiplicity::Set {
            drop(claim);
            return self.remove_held(a, multiplicity, old, held);
        }
        if !self.acceptable(a, new) {
            telemetry::rejected(a, new);
            return Ok(self.settle(claim, a, "replace", LinkOutcome::Rejected));
        }

        if let Some(rec) = self.endpoints.get_mut(a) {
            match rec.peers_mut() {
                Peers::Set(set) => {
                    set.remove(&old);
                    set.insert(new);
                }
                Peers::Ordered(seq) => {
                    if let Some(slot) = seq.iter_mut().find(|p| **p == old) {
                        *slot = new;
                    }
                }
                Peers::Single(slot) => *slot = Some(new),
            }
        }
        let mut changes: Changes = vec![(a, PeerChange::Replaced { old, new })];
        self.detach_mirrored(old, a, &mut changes);
        self.attach_mirrored(new, a, &mut changes);
        Ok(self.finish(claim, changes))
    }

    fn clear_held(&mut self, a: EndpointId, held: &[EndpointId]) -> Result<LinkOutcome, LinkError> {
        let rec = self.record(a)?;
        let multiplicity = rec.multiplicity();
        let peers = rec.peers.distinct();
        let mut involved = Vec::with_capacity(peers.len() + 1);
        involved.push(a);
        involved.extend(peers.iter().copied());
        let claim = guard::claim(&self.endpoints, &self.busy, &involved, held)?;
        if peers.is_empty() {
            return Ok(self.settle(claim, a, "clear", LinkOutcome::Unchanged));
        }

        if let Some(rec) = self.endpoints.get_mut(a) {
            *rec.peers_mut() = Peers::empty(multiplicity);
        }
        let mut changes: Changes = peers
            .iter()
            .map(|p| (a, PeerChange::Removed(*p)))
            .collect();
        for p in peers {
            self.detach_mirrored(p, a, &mut changes);
        }
        Ok(self.finish(claim, changes))
    }

    fn attach_mirrored(&mut self, target: EndpointId, from: EndpointId, changes: &mut Changes) {
        let mirrored = self.endpoints.mirror_attach(target, from);
        if let Some(change) = mirrored.change {
            changes.push((target, change));
        }
        if let Some(displaced) = mirrored.displaced {
            self.detach_mirrored(displaced, target, changes);
        }
    }

    fn detach_mirrored(&mut self, target: EndpointId, from: EndpointId, changes: &mut Changes) {
        if let Some(change) = self.endpoints.mirror_detach(target, from) {
            changes.push((target, change));
        }
    }

    /// Both acceptance predicates approve linking `a` and `b`.
    fn acceptable(&self, a: EndpointId, b: EndpointId) -> bool {
        self.accepts(a, b) && self.accepts(b, a)
    }

    fn accepts(&self, endpoint: EndpointId, candidate: EndpointId) -> bool {
        let (Some(rec), Some(cand)) = (self.endpoints.get(endpoint), self.endpoints.get(candidate))
        else {
            return false;
        };
        let Some(acceptor) = rec.acceptor.as_ref() else {
            return true;
        };
        let Some(object) = self.objects.get(&cand.owner) else {
            return false;
        };
        acceptor(&Candidate {
            endpoint: candidate,
            role: cand.role,
            multiplicity: cand.multiplicity(),
            owner: cand.owner,
            object: &object.value,
        })
    }

    fn settle(
        &mut self,
        claim: Claim,
        a: EndpointId,
        op: &'static str,
        outcome: LinkOutcome,
    ) -> LinkOutcome {
        drop(claim);
        telemetry::settled(a, op, outcome);
        outcome
    }

    /// Audit, notify, release. Runs only after every side is updated.
    ///
    /// The claim is released when it drops, including on unwind out of the
    /// audit or a listener.
    fn finish(&mut self, claim: Claim, changes: Changes) -> LinkOutcome {
        if self.config.verify_symmetry.enabled() {
            let mut touched: Vec<EndpointId> = claim.ids().to_vec();
            touched.extend(changes.iter().map(|(ep, _)| *ep));
            guard::enforce(&self.endpoints, &touched);
        }
        let events: Vec<LinkEvent> = changes
            .into_iter()
            .filter_map(|(endpoint, change)| {
                let rec = self.endpoints.get(endpoint)?;
                Some(LinkEvent {
                    endpoint,
                    owner: rec.owner,
                    role: rec.role,
                    change,
                })
            })
            .collect();
        if self.config.trace_links {
            telemetry::changed(&events);
        }
        self.notify(&events);
        drop(claim);
        LinkOutcome::Changed
    }

    // ── listeners ──────────────────────────────────────────────────────────

    /// Registers `listener` on `endpoint`. Listeners run in registration
    /// order, once per change to that endpoint.
    pub fn subscribe<F>(
        &mut self,
        endpoint: impl Into<EndpointId>,
        listener: F,
    ) -> Result<ListenerId, LinkError>
    where
        F: FnMut(&mut LinkStore<T>, &LinkEvent) + 'static,
    {
        let endpoint = endpoint.into();
        let rec = self
            .endpoints
            .get_mut(endpoint)
            .ok_or(LinkError::UnknownEndpoint(endpoint))?;
        let raw = self
            .listener_ids
            .next()
            .ok_or(LinkError::IdsExhausted("listener"))?;
        let id = ListenerId::from_raw(raw);
        rec.listeners.push((id, Box::new(listener)));
        Ok(id)
    }

    /// Removes a listener. Returns `false` if it was not registered on
    /// `endpoint`.
    ///
    /// A listener of `endpoint` that is out for dispatch (the running one or
    /// a sibling queued after it) is skipped for the rest of the dispatch and
    /// dropped once it returns.
    pub fn unsubscribe(
        &mut self,
        endpoint: impl Into<EndpointId>,
        listener: ListenerId,
    ) -> Result<bool, LinkError> {
        let endpoint = endpoint.into();
        let rec = self
            .endpoints
            .get_mut(endpoint)
            .ok_or(LinkError::UnknownEndpoint(endpoint))?;
        if let Some(pos) = rec.listeners.iter().position(|(id, _)| *id == listener) {
            drop(rec.listeners.remove(pos));
            return Ok(true);
        }
        if rec.dispatched.contains(&listener) && !rec.dropped.contains(&listener) {
            rec.dropped.push(listener);
            return Ok(true);
        }
        Ok(false)
    }

    fn notify(&mut self, events: &[LinkEvent]) {
        for event in events {
            let Some(rec) = self.endpoints.get_mut(event.endpoint) else {
                continue;
            };
            if rec.listeners.is_empty() {
                continue;
            }
            let running = std::mem::take(&mut rec.listeners);
            rec.dispatched = running.iter().map(|(id, _)| *id).collect();
            let mut dispatch = Dispatch {
                store: &mut *self,
                endpoint: event.endpoint,
                running,
            };
            for (id, listener) in &mut dispatch.running {
                let dropped = dispatch
                    .store
                    .endpoints
                    .get(dispatch.endpoint)
                    .is_some_and(|rec| rec.dropped.contains(id));
                if !dropped {
                    listener(&mut *dispatch.store, event);
                }
            }
        }
    }

    // ── audit ──────────────────────────────────────────────────────────────

    /// Audits every endpoint: symmetry, dangling peers, cache coherence.
    pub fn verify(&self) -> Result<(), BrokenInvariant> {
        guard::audit(&self.endpoints, self.endpoints.iter().map(|(id, _)| *id))
    }

    /// BLAKE3 digest of all non-empty peer sets.
    ///
    /// Set links hash independently of the order they were made in; ordered
    /// endpoints hash their sequence. Equal digests mean equal link states
    /// for stores whose endpoints were created in the same order.
    pub fn link_digest(&self) -> Hash {
        digest::link_digest(&self.endpoints)
    }
}

/// Listeners of one endpoint, taken out while they run.
///
/// Dropping puts them back ahead of any subscribed meanwhile, minus those
/// unsubscribed meanwhile.
struct Dispatch<'s, T> {
    store: &'s mut LinkStore<T>,
    endpoint: EndpointId,
    running: Vec<(ListenerId, Listener<T>)>,
}

impl<T> Drop for Dispatch<'_, T> {
    fn drop(&mut self) {
        let mut running = std::mem::take(&mut self.running);
        if let Some(rec) = self.store.endpoints.get_mut(self.endpoint) {
            rec.dispatched.clear();
            let dropped = std::mem::take(&mut rec.dropped);
            running.retain(|(id, _)| !dropped.contains(id));
            let added = std::mem::replace(&mut rec.listeners, running);
            rec.listeners.extend(added);
        }
    }
}
