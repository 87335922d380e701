// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Store configuration.

/// When the post-operation symmetry audit runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum VerifyMode {
    /// Never audit.
    Off,
    /// Audit in debug builds (or with the `verify_release` feature).
    #[default]
    Debug,
    /// Audit after every mutating operation.
    Always,
}

impl VerifyMode {
    /// Returns `true` when the audit should run in the current build.
    pub fn enabled(self) -> bool {
        match self {
            Self::Off => false,
            Self::Debug => cfg!(any(debug_assertions, feature = "verify_release")),
            Self::Always => true,
        }
    }
}

/// Tunables for a [`crate::LinkStore`].
///
/// Missing fields deserialize to their defaults, so a partial JSON document
/// (or `{}`) is a valid configuration. Unknown fields are refused, so a
/// misspelled key cannot silently fall back to its default.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct StoreConfig {
    /// Memoize `peer_objects` views until the next change.
    pub cache_views: bool,
    /// When to audit symmetry of the endpoints touched by an operation.
    pub verify_symmetry: VerifyMode,
    /// Emit a `tracing` event for every applied peer change.
    pub trace_links: bool,
    /// Entries to pre-reserve in the `(object, role)` index. Only that index
    /// is pre-allocated; the object and endpoint arenas grow on demand.
    pub initial_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cache_views: true,
            verify_symmetry: VerifyMode::Debug,
            trace_links: true,
            initial_capacity: 0,
        }
    }
}
