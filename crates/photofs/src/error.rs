//! Error types for the photofs library.
//!
//! Lookups of things that don't exist are not errors: they return `None`.  Errors are reserved for
//! the library itself being unreadable, which is fatal at mount time.

use std::path::PathBuf;

/// Result type alias for operations that may return an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while opening or reloading a photo library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The library root directory does not exist or is not a directory.
    #[error("photo library not found at {}", .0.display())]
    LibraryNotFound(PathBuf),

    /// The catalog file is absent or malformed.
    #[error("unable to decode catalog {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: plist::Error,
    },

    /// I/O error while inspecting the library.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("unable to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML, or has unexpected fields.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
