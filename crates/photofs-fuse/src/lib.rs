//! FUSE filesystem exposing a photo library.
//!
//! The library appears as a read-only tree with two top-level directories, `Albums` and `Rolls`,
//! holding one directory per collection, which in turn hold the collection's images.  File
//! contents are served straight from the image files inside the library.

#![forbid(unsafe_code)]

pub mod error;
pub mod ops;
pub mod session;

use std::path::Path;

use anyhow::Context as _;
use fuser::MountOption;

use photofs::{Config, Library};

pub use error::FsError;
pub use ops::{Attributes, Context, PhotoFs};
pub use session::PhotoFuse;

/// The mount options used for `config`.
pub fn mount_options(config: &Config) -> Vec<MountOption> {
    let mut options = vec![
        MountOption::RO,
        MountOption::FSName(config.fsname.clone()),
        MountOption::Subtype("photofs".to_string()),
    ];
    if config.allow_other {
        options.push(MountOption::AllowOther);
    }
    if config.auto_unmount {
        options.push(MountOption::AutoUnmount);
    }
    options
}

/// Mounts `library` read-only on `mountpoint` and serves it until the filesystem is unmounted.
pub fn mount_library(library: Library, mountpoint: &Path, config: &Config) -> anyhow::Result<()> {
    log::info!("mounting {library} on {}", mountpoint.display());
    let fs = PhotoFuse::new(PhotoFs::new(library));
    fuser::mount2(fs, mountpoint, &mount_options(config))
        .with_context(|| format!("Unable to mount on {}", mountpoint.display()))
}

#[cfg(test)]
mod test {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn test_mount_options() {
        let options = mount_options(&Config::default());
        assert_eq!(
            options,
            vec![
                MountOption::RO,
                MountOption::FSName("photofs".to_string()),
                MountOption::Subtype("photofs".to_string()),
                MountOption::AutoUnmount,
            ]
        );

        let config = Config {
            allow_other: true,
            auto_unmount: false,
            ..Config::default()
        };
        assert!(mount_options(&config).contains(&MountOption::AllowOther));
        assert!(!mount_options(&config).contains(&MountOption::AutoUnmount));
    }
}
