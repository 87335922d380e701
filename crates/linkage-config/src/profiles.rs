// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Loading and saving `StoreConfig` profiles.

use linkage_core::StoreConfig;

use crate::error::ConfigError;
use crate::profile::ProfileName;
use crate::source::ProfileSource;

/// Upper bound on [`StoreConfig::initial_capacity`].
pub const MAX_INITIAL_CAPACITY: usize = 1 << 20;

/// Checks the ranges JSON decoding cannot express.
pub fn validate(config: &StoreConfig) -> Result<(), ConfigError> {
    if config.initial_capacity > MAX_INITIAL_CAPACITY {
        return Err(ConfigError::Invalid {
            field: "initial_capacity",
            reason: format!(
                "{} exceeds the limit of {MAX_INITIAL_CAPACITY}",
                config.initial_capacity
            ),
        });
    }
    Ok(())
}

/// Named [`StoreConfig`] documents kept in a [`ProfileSource`].
#[derive(Debug, Default)]
pub struct StoreProfiles<S> {
    source: S,
}

impl<S> StoreProfiles<S> {
    /// Profiles backed by `source`.
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Borrow the backing source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Consume the service and return the backing source.
    pub fn into_inner(self) -> S {
        self.source
    }
}

impl<S: ProfileSource> StoreProfiles<S> {
    /// Loads `profile`.
    ///
    /// A missing or empty document yields [`StoreConfig::default`]; fields
    /// the document omits keep their defaults.
    pub fn load(&self, profile: &ProfileName) -> Result<StoreConfig, ConfigError> {
        let bytes = match self.source.read(profile)? {
            Some(bytes) if !bytes.is_empty() => bytes,
            _ => {
                tracing::debug!(%profile, "no saved store config; using defaults");
                return Ok(StoreConfig::default());
            }
        };
        let config: StoreConfig =
            serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
                profile: profile.to_string(),
                source,
            })?;
        validate(&config)?;
        tracing::debug!(%profile, ?config, "loaded store config");
        Ok(config)
    }

    /// Loads the [`ProfileName::DEFAULT`] profile.
    pub fn load_default(&self) -> Result<StoreConfig, ConfigError> {
        self.load(&ProfileName::default_profile())
    }

    /// Validates `config` and saves it as `profile`.
    pub fn save(&self, profile: &ProfileName, config: &StoreConfig) -> Result<(), ConfigError> {
        validate(config)?;
        let data = serde_json::to_vec_pretty(config).map_err(ConfigError::Encode)?;
        self.source.write(profile, &data)?;
        tracing::trace!(%profile, bytes = data.len(), "store config saved");
        Ok(())
    }

    /// Profiles that have a saved document, in sorted order.
    pub fn profiles(&self) -> Result<Vec<ProfileName>, ConfigError> {
        self.source.profiles()
    }
}
