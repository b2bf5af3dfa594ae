//! Read-only access to photo libraries, addressed by virtual paths.
//!
//! A library is a folder holding a catalog file (`AlbumData.xml`) and the images it refers to.  The
//! catalog lists every image by numeric identifier and groups them into albums and rolls.  This
//! crate decodes the catalog into a [`Library`], and maps paths like `/Albums/Vacation/beach.jpg`
//! onto the catalog and from there onto the real file, even when the library has been moved since
//! the catalog was written.

pub mod cache;
pub mod catalog;
pub mod collection;
pub mod config;
pub mod error;
pub mod image;
pub mod library;
pub mod mountpoint;
pub mod resolve;
pub mod util;

#[cfg(any(test, feature = "test"))]
pub mod test;

pub use cache::Cache;
pub use catalog::ImageId;
pub use collection::{Collection, CollectionKind};
pub use config::Config;
pub use error::{ConfigError, Error, Result};
pub use image::Image;
pub use library::Library;
pub use resolve::{resolve, Resolved, VirtualPath};
