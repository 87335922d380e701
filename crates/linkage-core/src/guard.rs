// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Reentrancy guard and symmetry audit.
//!
//! # Reentrancy
//!
//! Every request operation claims the endpoints it is about to touch (the
//! requester, the peers it links or unlinks, and any peer a single endpoint
//! will let go of) before changing anything. Claims are held until the last
//! listener has returned. A request that needs an already-claimed endpoint
//! fails with [`LinkError::ConcurrentStructuralChange`] and changes nothing.
//!
//! # Broken invariants
//!
//! After an operation the touched endpoints can be audited (see
//! [`crate::VerifyMode`]). An asymmetric or dangling link cannot arise from
//! pure acceptance predicates, so a failed audit is a programmer error and is
//! raised with [`std::panic::panic_any`] carrying a typed [`BrokenInvariant`]
//! payload, matchable via `downcast_ref` in tests.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::arena::Endpoints;
use crate::error::LinkError;
use crate::ident::EndpointId;

/// Classification of a failed audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantKind {
    /// `endpoint` lists `peer` but `peer` does not list `endpoint`.
    Asymmetric,
    /// `endpoint` lists a peer that is no longer in the arena.
    DanglingPeer,
    /// The cached peer view differs from a recomputation.
    StaleView,
}

/// Audit failure payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("broken invariant {kind:?} at {endpoint} (peer {peer:?})")]
pub struct BrokenInvariant {
    /// Endpoint whose state failed the audit.
    pub endpoint: EndpointId,
    /// Peer involved, when the failure concerns one link.
    pub peer: Option<EndpointId>,
    /// What failed.
    pub kind: InvariantKind,
}

/// Endpoints claimed by in-flight operations.
///
/// Shared between the store and every live [`Claim`], so a claim can release
/// itself when dropped.
#[derive(Debug, Default, Clone)]
pub(crate) struct BusySet(Rc<RefCell<FxHashSet<EndpointId>>>);

impl BusySet {
    pub(crate) fn contains(&self, id: EndpointId) -> bool {
        self.0.borrow().contains(&id)
    }
}

/// Endpoints claimed by one in-flight operation.
///
/// Dropping the claim releases them, also while unwinding out of a
/// panicking listener, predicate or audit.
#[derive(Debug)]
pub(crate) struct Claim {
    ids: Vec<EndpointId>,
    busy: BusySet,
}

impl Claim {
    pub(crate) fn ids(&self) -> &[EndpointId] {
        &self.ids
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        let mut busy = self.busy.0.borrow_mut();
        for id in &self.ids {
            busy.remove(id);
        }
    }
}

/// Claim `involved` for one operation.
///
/// `involved` lists the requester first; a trip reports the first busy id in
/// that order. Ids in `held` are already claimed by the enclosing operation
/// and are skipped. Unknown ids are the caller's business and are ignored.
pub(crate) fn claim<T>(
    arena: &Endpoints<T>,
    busy: &BusySet,
    involved: &[EndpointId],
    held: &[EndpointId],
) -> Result<Claim, LinkError> {
    let mut wanted: Vec<EndpointId> = Vec::with_capacity(involved.len());
    for id in involved {
        if !held.contains(id) && !wanted.contains(id) && arena.get(*id).is_some() {
            wanted.push(*id);
        }
    }
    if let Some(tripped) = wanted.iter().copied().find(|id| busy.contains(*id)) {
        tracing::warn!(endpoint = %tripped, "reentrant mutation rejected");
        return Err(LinkError::ConcurrentStructuralChange { endpoint: tripped });
    }
    busy.0.borrow_mut().extend(wanted.iter().copied());
    Ok(Claim {
        ids: wanted,
        busy: busy.clone(),
    })
}

/// Audit symmetry, dangling peers and cache coherence of `ids`.
pub(crate) fn audit<T>(
    arena: &Endpoints<T>,
    ids: impl IntoIterator<Item = EndpointId>,
) -> Result<(), BrokenInvariant> {
    for id in ids {
        let Some(rec) = arena.get(id) else {
            continue;
        };
        for peer in rec.peers.iter() {
            let Some(other) = arena.get(peer) else {
                return Err(BrokenInvariant {
                    endpoint: id,
                    peer: Some(peer),
                    kind: InvariantKind::DanglingPeer,
                });
            };
            if !other.peers.contains(id) {
                return Err(BrokenInvariant {
                    endpoint: id,
                    peer: Some(peer),
                    kind: InvariantKind::Asymmetric,
                });
            }
        }
        if let Some(view) = rec.view.get() {
            if view[..] != arena.peer_owners(id)[..] {
                return Err(BrokenInvariant {
                    endpoint: id,
                    peer: None,
                    kind: InvariantKind::StaleView,
                });
            }
        }
    }
    Ok(())
}

/// Audit `ids` and raise a failure as a typed panic.
pub(crate) fn enforce<T>(arena: &Endpoints<T>, ids: &[EndpointId]) {
    if let Err(broken) = audit(arena, ids.iter().copied()) {
        tracing::error!(%broken, "link invariant broken");
        std::panic::panic_any(broken);
    }
}
