//! Configuration for mounting photo libraries.
//!
//! Configuration is optional: every field has a default, and the command line can override any of
//! them.  A configuration file uses TOML:
//!
//! ```toml
//! catalog_file = "AlbumData.xml"
//! cache_timeout_secs = 1
//! mount_root = "/mnt/photos"
//! allow_other = true
//! ```

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::error::ConfigError;

/// The catalog file found at the root of every library.
pub const DEFAULT_CATALOG_FILE: &str = "AlbumData.xml";

/// Settings for opening and mounting a library.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Name of the catalog file, relative to the library root.
    pub catalog_file: PathBuf,

    /// How long the cache may go without an access before the catalog's modification time is
    /// checked again.  Zero checks on every access.
    pub cache_timeout_secs: u64,

    /// Directory in which mount points are created automatically.  Defaults to `/Volumes` on
    /// macOS and `/media` elsewhere.
    pub mount_root: Option<PathBuf>,

    /// Allow users other than the one mounting to access the filesystem.
    pub allow_other: bool,

    /// Unmount automatically when the serving process exits.
    pub auto_unmount: bool,

    /// Filesystem name shown in the mount table.
    pub fsname: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_file: PathBuf::from(DEFAULT_CATALOG_FILE),
            cache_timeout_secs: 1,
            mount_root: None,
            allow_other: false,
            auto_unmount: true,
            fsname: "photofs".to_string(),
        }
    }
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML content is invalid or has unknown fields.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Reads and parses a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn cache_timeout(&self) -> Duration {
        Duration::from_secs(self.cache_timeout_secs)
    }

    /// The directory in which automatic mount points are created.
    pub fn mount_root(&self) -> PathBuf {
        match &self.mount_root {
            Some(root) => root.clone(),
            None if cfg!(target_os = "macos") => PathBuf::from("/Volumes"),
            None => PathBuf::from("/media"),
        }
    }
}
