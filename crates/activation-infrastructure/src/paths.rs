//! Path management for activation configuration and local storage.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/activation/          # Config directory
//! └── config.toml                # ActivationConfig
//!
//! ~/.local/share/activation/     # Data directory
//! └── progress/                  # FileKeyValueStore (one file per key)
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;

const APP_DIR: &str = "activation";

/// The platform reported no directory of the given kind for this user.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("no platform {kind} directory; pass a base path instead")]
pub struct PathError {
    kind: &'static str,
}

/// Resolves platform paths, or everything under a base path when given one.
#[derive(Debug, Clone, Default)]
pub struct ActivationPaths {
    base_path: Option<PathBuf>,
}

impl ActivationPaths {
    /// `base_path` replaces both platform directories (tests, portable installs).
    pub fn new(base_path: Option<&Path>) -> Self {
        Self {
            base_path: base_path.map(Path::to_path_buf),
        }
    }

    pub fn config_dir(&self) -> Result<PathBuf, PathError> {
        match &self.base_path {
            Some(base) => Ok(base.clone()),
            None => dirs::config_dir()
                .map(|d| d.join(APP_DIR))
                .ok_or(PathError { kind: "config" }),
        }
    }

    pub fn data_dir(&self) -> Result<PathBuf, PathError> {
        match &self.base_path {
            Some(base) => Ok(base.clone()),
            None => dirs::data_dir()
                .map(|d| d.join(APP_DIR))
                .ok_or(PathError { kind: "data" }),
        }
    }

    pub fn config_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("config.toml"))
    }

    /// Default directory of the file-backed progress store.
    pub fn storage_dir(&self) -> Result<PathBuf, PathError> {
        Ok(self.data_dir()?.join("progress"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_path_overrides_platform_dirs() {
        let paths = ActivationPaths::new(Some(Path::new("/tmp/act")));
        assert_eq!(
            paths.config_file().unwrap(),
            PathBuf::from("/tmp/act/config.toml")
        );
        assert_eq!(
            paths.storage_dir().unwrap(),
            PathBuf::from("/tmp/act/progress")
        );
    }

    #[test]
    fn test_missing_platform_dir_names_its_kind() {
        let err = PathError { kind: "data" };
        assert_eq!(
            err.to_string(),
            "no platform data directory; pass a base path instead"
        );
    }
}
