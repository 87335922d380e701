// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Errors and outcomes of link operations.

use thiserror::Error;

use crate::endpoint::Multiplicity;
use crate::ident::{EndpointId, ObjectId, Role};

/// Errors returned by [`crate::LinkStore`] operations.
///
/// A returned error always means the store is unchanged: every check runs
/// before the first peer set is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LinkError {
    /// The object id is unknown (never issued or already removed).
    #[error("unknown object: {0}")]
    UnknownObject(ObjectId),
    /// The endpoint id is unknown (never issued or its owner was removed).
    #[error("unknown endpoint: {0}")]
    UnknownEndpoint(EndpointId),
    /// The object already has an endpoint for this role.
    #[error("object {object} already plays role {role}")]
    DuplicateRole {
        /// Owning object.
        object: ObjectId,
        /// Role that was registered twice.
        role: Role,
    },
    /// The object does not play this role.
    #[error("object {object} has no endpoint for role {role}")]
    UnknownRole {
        /// Object that was asked.
        object: ObjectId,
        /// Role it lacks.
        role: Role,
    },
    /// The endpoint exists but has a different multiplicity than requested.
    #[error("endpoint {endpoint} is {actual:?}, expected {expected:?}")]
    WrongMultiplicity {
        /// Offending endpoint.
        endpoint: EndpointId,
        /// Multiplicity the operation needs.
        expected: Multiplicity,
        /// Multiplicity the endpoint has.
        actual: Multiplicity,
    },
    /// A mutation touched an endpoint that is itself in the middle of
    /// applying (or notifying about) another mutation.
    #[error("concurrent structural change on {endpoint}")]
    ConcurrentStructuralChange {
        /// The endpoint whose guard tripped.
        endpoint: EndpointId,
    },
    /// Positional access beyond the end of an ordered endpoint.
    #[error("index {index} out of bounds for {endpoint} (len {len})")]
    IndexOutOfBounds {
        /// Ordered endpoint being indexed.
        endpoint: EndpointId,
        /// Requested position.
        index: usize,
        /// Current number of peers.
        len: usize,
    },
    /// An id space ran out; ids are never reused, so no further
    /// objects, endpoints or listeners of that kind can be issued.
    #[error("{0} ids exhausted")]
    IdsExhausted(&'static str),
}

/// Result of a mutating request that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// Peer sets changed and notifications were delivered.
    Changed,
    /// The request was already satisfied; nothing changed, nothing fired.
    Unchanged,
    /// An acceptance predicate refused the candidate peer; nothing changed.
    Rejected,
}

impl LinkOutcome {
    /// Returns `true` for [`LinkOutcome::Changed`].
    pub fn is_changed(self) -> bool {
        matches!(self, Self::Changed)
    }

    /// Returns `true` for [`LinkOutcome::Rejected`].
    pub fn is_rejected(self) -> bool {
        matches!(self, Self::Rejected)
    }
}
