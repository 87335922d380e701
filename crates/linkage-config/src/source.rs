// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Storage port for raw profile documents, and an in-memory adapter.

use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::error::ConfigError;
use crate::profile::ProfileName;

/// Where profile documents live.
pub trait ProfileSource {
    /// Raw document saved for `profile`, or `None` if there is none.
    fn read(&self, profile: &ProfileName) -> Result<Option<Vec<u8>>, ConfigError>;
    /// Replaces the document for `profile`.
    fn write(&self, profile: &ProfileName, data: &[u8]) -> Result<(), ConfigError>;
    /// Profiles that currently have a document, in sorted order.
    fn profiles(&self) -> Result<Vec<ProfileName>, ConfigError>;
}

/// Keeps profile documents in a map. Nothing outlives the value.
#[derive(Debug, Default)]
pub struct MemorySource {
    docs: RefCell<BTreeMap<ProfileName, Vec<u8>>>,
}

impl MemorySource {
    /// Empty source.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileSource for MemorySource {
    fn read(&self, profile: &ProfileName) -> Result<Option<Vec<u8>>, ConfigError> {
        Ok(self.docs.borrow().get(profile).cloned())
    }

    fn write(&self, profile: &ProfileName, data: &[u8]) -> Result<(), ConfigError> {
        self.docs
            .borrow_mut()
            .insert(profile.clone(), data.to_vec());
        Ok(())
    }

    fn profiles(&self) -> Result<Vec<ProfileName>, ConfigError> {
        Ok(self.docs.borrow().keys().cloned().collect())
    }
}
