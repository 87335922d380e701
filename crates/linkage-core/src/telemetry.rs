// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

// Structured `tracing` events for link changes. Library code never installs a
// subscriber; these are silent unless the embedding application does.

use crate::error::LinkOutcome;
use crate::event::{LinkEvent, PeerChange};
use crate::ident::EndpointId;

/// Emits one debug event per applied peer change.
pub(crate) fn changed(events: &[LinkEvent]) {
    for event in events {
        match event.change {
            PeerChange::Added(peer) => tracing::debug!(
                endpoint = %event.endpoint,
                role = %event.role,
                %peer,
                "peer added"
            ),
            PeerChange::Removed(peer) => tracing::debug!(
                endpoint = %event.endpoint,
                role = %event.role,
                %peer,
                "peer removed"
            ),
            PeerChange::Replaced { old, new } => tracing::debug!(
                endpoint = %event.endpoint,
                role = %event.role,
                %old,
                %new,
                "peer replaced"
            ),
        }
    }
}

/// Emits a debug event when an acceptance predicate refused a link.
pub(crate) fn rejected(endpoint: EndpointId, candidate: EndpointId) {
    tracing::debug!(%endpoint, %candidate, "link rejected by acceptance predicate");
}

/// Emits a trace event for requests that were already satisfied.
pub(crate) fn settled(endpoint: EndpointId, op: &'static str, outcome: LinkOutcome) {
    tracing::trace!(%endpoint, op, ?outcome, "request settled without change");
}
