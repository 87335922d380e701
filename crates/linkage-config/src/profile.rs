// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Validated profile names.

use crate::error::ConfigError;

/// Longest accepted profile name.
pub const MAX_PROFILE_LEN: usize = 64;

/// Name of a saved store configuration.
///
/// Restricted to lower-case ASCII letters, digits, `_` and `-`, so a name is
/// always a plain file stem: no separators, no `..`, no hidden files.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProfileName(String);

impl ProfileName {
    /// Profile used when the caller does not pick one.
    pub const DEFAULT: &'static str = "default";

    /// Validates `name`.
    pub fn new(name: &str) -> Result<Self, ConfigError> {
        let valid = !name.is_empty()
            && name.len() <= MAX_PROFILE_LEN
            && !name.starts_with('-')
            && name
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-');
        if valid {
            Ok(Self(name.to_owned()))
        } else {
            Err(ConfigError::InvalidProfile(name.to_owned()))
        }
    }

    /// The `"default"` profile.
    pub fn default_profile() -> Self {
        Self(Self::DEFAULT.to_owned())
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ProfileName {
    fn default() -> Self {
        Self::default_profile()
    }
}

impl core::fmt::Display for ProfileName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
