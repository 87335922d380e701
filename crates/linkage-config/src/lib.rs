// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Named, validated [`StoreConfig`] profiles for Linkage stores.
//!
//! [`StoreProfiles`] reads and writes profile documents (JSON) through a
//! [`ProfileSource`]. Two sources ship here: [`MemorySource`] for tests and
//! embedding, and [`DirSource`] for the platform config directory. A profile
//! with no document loads as [`StoreConfig::default`]; a document that names
//! an unknown field, or holds an out-of-range value, is refused.

mod dir;
mod error;
mod profile;
mod profiles;
mod source;

pub use dir::DirSource;
pub use error::ConfigError;
pub use profile::{ProfileName, MAX_PROFILE_LEN};
pub use profiles::{validate, StoreProfiles, MAX_INITIAL_CAPACITY};
pub use source::{MemorySource, ProfileSource};

pub use linkage_core::StoreConfig;
