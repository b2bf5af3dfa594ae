//! Choosing, creating and cleaning up mount points.
//!
//! The mount point argument is optional:
//!
//!  - absent or `-`: a directory named after the library is made in the mount root (eg.
//!    `/Volumes/Vacation` for `~/Pictures/Vacation.photolibrary`)
//!  - `-DIR`: a directory named after the library is made inside `DIR`
//!  - anything else: used as-is, and must already exist
//!
//! Mount points made here are removed again when the [`MountPoint`] is dropped.

use std::{
    io::{Error, ErrorKind, Result},
    path::{Path, PathBuf},
};

use log::{debug, warn};

const LIBRARY_SUFFIX: &str = ".photolibrary";

/// The name used for automatically created mount points: the library's folder name without any
/// `.photolibrary` suffix.
pub fn library_base_name(library: &Path) -> String {
    let name = library
        .components()
        .next_back()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.strip_suffix(LIBRARY_SUFFIX) {
        Some(base) if !base.is_empty() => base.to_string(),
        _ => name,
    }
}

/// Where to mount, and whether the directory is ours to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPlan {
    pub path: PathBuf,
    pub create: bool,
}

impl MountPlan {
    pub fn new(arg: Option<&str>, library: &Path, mount_root: &Path) -> Self {
        match arg {
            None | Some("-") => MountPlan {
                path: mount_root.join(library_base_name(library)),
                create: true,
            },
            Some(arg) if arg.starts_with('-') => MountPlan {
                path: Path::new(&arg[1..]).join(library_base_name(library)),
                create: true,
            },
            Some(arg) => MountPlan {
                path: PathBuf::from(arg),
                create: false,
            },
        }
    }
}

/// A directory to mount on.  If it was created for the mount, it is removed on drop.
#[derive(Debug)]
pub struct MountPoint {
    path: PathBuf,
    created: bool,
}

impl MountPoint {
    /// Makes sure the planned mount point exists.
    ///
    /// # Errors
    ///
    /// Fails if the directory can't be created, or if a mount point given as-is doesn't exist or
    /// isn't a directory.
    pub fn prepare(plan: MountPlan) -> Result<Self> {
        if plan.path.is_dir() {
            return Ok(Self {
                path: std::path::absolute(&plan.path)?,
                created: false,
            });
        }

        if !plan.create {
            return Err(Error::new(
                ErrorKind::NotFound,
                format!("mount point {} is not a directory", plan.path.display()),
            ));
        }

        std::fs::create_dir_all(&plan.path)?;
        debug!("created mount point {}", plan.path.display());
        Ok(Self {
            // Remember the absolute path: the working directory may change before we're dropped
            path: std::path::absolute(&plan.path)?,
            created: true,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the directory was created for this mount.
    pub fn created(&self) -> bool {
        self.created
    }
}

impl Drop for MountPoint {
    fn drop(&mut self) {
        if !self.created {
            return;
        }
        // Only ever remove an empty directory: if the filesystem is somehow still mounted, or
        // someone put files there, leave it be.
        match std::fs::remove_dir(&self.path) {
            Ok(()) => debug!("removed mount point {}", self.path.display()),
            Err(err) => warn!("unable to remove mount point {}: {err}", self.path.display()),
        }
    }
}
