// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Identifier types for arena-resident objects, endpoints and listeners.
//!
//! Ids are issued by [`crate::LinkStore`] from monotonically increasing
//! counters and are never reused within one store, so a stale id can never
//! alias a newer object or endpoint. Zero is reserved as invalid.

/// Canonical 256-bit hash used for link-state digests.
pub type Hash = [u8; 32];

/// Handle to a domain object registered in a [`crate::LinkStore`].
///
/// The handle is non-owning: holding an `ObjectId` keeps nothing alive, and
/// looking it up after [`crate::LinkStore::remove_object`] yields
/// [`crate::LinkError::UnknownObject`].
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Constructs an `ObjectId` from a raw value.
    ///
    /// The store never issues zero; a raw zero always resolves to
    /// [`crate::LinkError::UnknownObject`].
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the underlying raw value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

/// Handle to one endpoint (one side of a relationship) in a store.
///
/// Peer sets hold `EndpointId`s, never owning references, which is what
/// breaks the object -> endpoint -> peer endpoint -> object ownership cycle.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct EndpointId(u64);

impl EndpointId {
    /// Constructs an `EndpointId` from a raw value.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the underlying raw value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

/// Identifier returned by [`crate::LinkStore::subscribe`].
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ListenerId(u64);

impl ListenerId {
    pub(crate) const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the underlying raw value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

/// Name of the role an endpoint plays for its owner (e.g. `"owner"`,
/// `"children"`).
///
/// An object holds at most one endpoint per role; the store indexes endpoints
/// by `(ObjectId, Role)` so peers can be resolved through the role accessor.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Role(&'static str);

impl Role {
    /// Creates a role from a static label.
    #[must_use]
    pub const fn new(label: &'static str) -> Self {
        Self(label)
    }

    /// Returns the role label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        self.0
    }
}

impl core::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "obj#{}", self.0)
    }
}

impl core::fmt::Display for EndpointId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "ep#{}", self.0)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.0)
    }
}

/// Monotonic id issuer shared by the store's three id spaces.
///
/// Starts at `1`; zero stays reserved as invalid. Never wraps: once
/// `u64::MAX` has been issued the counter stays exhausted.
#[derive(Debug, Clone)]
pub(crate) struct IdCounter(u64);

impl IdCounter {
    pub(crate) const fn new() -> Self {
        Self(0)
    }

    /// Counter whose next id is `last + 1`.
    #[cfg(test)]
    pub(crate) const fn starting_after(last: u64) -> Self {
        Self(last)
    }

    pub(crate) fn next(&mut self) -> Option<u64> {
        self.0 = self.0.checked_add(1)?;
        Some(self.0)
    }
}
