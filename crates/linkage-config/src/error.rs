// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Errors raised while reading, validating or writing store profiles.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for profile operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A profile name outside `[a-z0-9_-]{1,64}`.
    #[error("invalid profile name {0:?}")]
    InvalidProfile(String),
    /// The saved document is not a valid `StoreConfig` (bad JSON, a wrong
    /// type, or a field this version does not know).
    #[error("profile {profile} does not parse: {source}")]
    Parse {
        /// Profile being loaded.
        profile: String,
        /// Underlying decoder error.
        source: serde_json::Error,
    },
    /// A config could not be encoded for saving.
    #[error("could not encode store config: {0}")]
    Encode(#[source] serde_json::Error),
    /// The config parsed but a field is out of range.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// Why it was refused.
        reason: String,
    },
    /// I/O failure on a profile file.
    #[error("io error on {}: {source}", path.display())]
    Io {
        /// File or directory being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The platform has no per-user config directory.
    #[error("could not resolve config dir")]
    NoConfigDir,
}
