// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Directory-backed `ProfileSource`: one `<profile>.json` per profile.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::error::ConfigError;
use crate::profile::ProfileName;
use crate::source::ProfileSource;

const EXTENSION: &str = "json";

/// Profile documents as JSON files under one directory.
#[derive(Debug, Clone)]
pub struct DirSource {
    base: PathBuf,
}

impl DirSource {
    /// Source rooted at the user config directory (e.g., `~/.config/linkage`).
    pub fn user() -> Result<Self, ConfigError> {
        let proj =
            ProjectDirs::from("dev", "flyingrobots", "Linkage").ok_or(ConfigError::NoConfigDir)?;
        Self::at(proj.config_dir())
    }

    /// Source rooted at `base`, creating the directory if needed.
    pub fn at(base: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let base = base.as_ref().to_path_buf();
        fs::create_dir_all(&base).map_err(|source| ConfigError::Io {
            path: base.clone(),
            source,
        })?;
        Ok(Self { base })
    }

    /// Directory the profile files live in.
    pub fn base(&self) -> &Path {
        &self.base
    }

    fn path_for(&self, profile: &ProfileName) -> PathBuf {
        self.base.join(format!("{profile}.{EXTENSION}"))
    }
}

impl ProfileSource for DirSource {
    fn read(&self, profile: &ProfileName) -> Result<Option<Vec<u8>>, ConfigError> {
        let path = self.path_for(profile);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ConfigError::Io { path, source }),
        }
    }

    /// Writes a sibling temp file, then renames it over the profile, so a
    /// reader never sees a half-written document.
    fn write(&self, profile: &ProfileName, data: &[u8]) -> Result<(), ConfigError> {
        let path = self.path_for(profile);
        let staged = self.base.join(format!(".{profile}.{EXTENSION}.tmp"));
        fs::write(&staged, data).map_err(|source| ConfigError::Io {
            path: staged.clone(),
            source,
        })?;
        fs::rename(&staged, &path).map_err(|source| ConfigError::Io { path, source })
    }

    /// Files whose stem is not a valid profile name are ignored.
    fn profiles(&self) -> Result<Vec<ProfileName>, ConfigError> {
        let io = |source| ConfigError::Io {
            path: self.base.clone(),
            source,
        };
        let mut found = Vec::new();
        for entry in fs::read_dir(&self.base).map_err(io)? {
            let path = entry.map_err(io)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(name) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| ProfileName::new(s).ok())
            {
                found.push(name);
            }
        }
        found.sort();
        Ok(found)
    }
}
