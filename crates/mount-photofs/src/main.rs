//! Command-line tool for mounting photo libraries.
//!
//! `mount-photofs mount` serves a library as a read-only filesystem until it is unmounted, and
//! `mount-photofs list` prints what such a mount would contain.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use photofs::{
    mountpoint::{MountPlan, MountPoint},
    CollectionKind, Config, Library,
};

/// mount-photofs
#[derive(Debug, Parser)]
#[clap(name = "mount-photofs", version)]
pub struct App {
    /// Read settings from this TOML file
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// Name of the catalog file inside the library
    #[clap(long, global = true)]
    catalog_file: Option<PathBuf>,

    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Mount a library and serve it until it is unmounted
    Mount {
        /// the library folder, eg. ~/Pictures/Vacation.photolibrary
        library: PathBuf,
        /// where to mount: an existing directory, '-DIR' to create one named after the library
        /// inside DIR, or '-' (the default) to create one in the mount root
        #[clap(allow_hyphen_values = true)]
        mountpoint: Option<String>,
        /// seconds between checks of the catalog for changes
        #[clap(long)]
        cache_timeout: Option<u64>,
        /// allow other users to access the mount
        #[clap(long)]
        allow_other: bool,
    },
    /// Print the collections of a library
    List {
        /// the library folder
        library: PathBuf,
        /// only list albums or rolls
        #[clap(long)]
        kind: Option<CollectionKind>,
        /// also list the images of each collection
        #[clap(long)]
        images: bool,
    },
}

fn load_config(args: &App) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(catalog_file) = &args.catalog_file {
        config.catalog_file = catalog_file.clone();
    }
    Ok(config)
}

fn open_library(path: &Path, config: &Config) -> Result<Library> {
    Library::open_with(path, config)
        .with_context(|| format!("Unable to open photo library {}", path.display()))
}

/// Automatic mount points are named after the library's normalized location, not the argument.
fn mount_plan(mountpoint: Option<&str>, library: &Library, config: &Config) -> MountPlan {
    MountPlan::new(mountpoint, library.abspath(), &config.mount_root())
}

fn mount(library_path: &Path, mountpoint: Option<&str>, config: &Config) -> Result<()> {
    // Fail before creating anything if the catalog can't be read
    let library = open_library(library_path, config)?;

    let plan = mount_plan(mountpoint, &library, config);
    let mountpoint = MountPoint::prepare(plan).context("Unable to prepare mount point")?;

    println!("Mounting {library} on {}", mountpoint.path().display());
    photofs_fuse::mount_library(library, mountpoint.path(), config)?;
    log::info!("{} unmounted", mountpoint.path().display());
    Ok(())
}

fn list(library: &Library, kind: Option<CollectionKind>, images: bool) {
    println!("{library}");
    let kinds = match kind {
        Some(kind) => vec![kind],
        None => CollectionKind::ALL.to_vec(),
    };

    for kind in kinds {
        println!("  {kind}:");
        for collection in library.collections(kind) {
            println!("    {collection}");
            if images {
                for image in collection.images(library) {
                    println!("      {image}");
                }
            }
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args = App::parse();
    let mut config = load_config(&args)?;

    match args.cmd {
        Command::Mount {
            ref library,
            ref mountpoint,
            cache_timeout,
            allow_other,
        } => {
            if let Some(secs) = cache_timeout {
                config.cache_timeout_secs = secs;
            }
            if allow_other {
                config.allow_other = true;
            }
            mount(library, mountpoint.as_deref(), &config)?;
        }
        Command::List {
            ref library,
            kind,
            images,
        } => {
            let library = open_library(library, &config)?;
            list(&library, kind, images);
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use clap::CommandFactory;
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn test_cli() {
        App::command().debug_assert();
    }

    #[test]
    fn test_parse_mount() {
        let args = App::parse_from([
            "mount-photofs",
            "mount",
            "--cache-timeout",
            "5",
            "/pics/Vacation.photolibrary",
            "-/mnt",
        ]);
        let Command::Mount {
            library,
            mountpoint,
            cache_timeout,
            allow_other,
        } = args.cmd
        else {
            panic!("expected mount");
        };
        assert_eq!(library, PathBuf::from("/pics/Vacation.photolibrary"));
        assert_eq!(mountpoint.as_deref(), Some("-/mnt"));
        assert_eq!(cache_timeout, Some(5));
        assert!(!allow_other);
    }

    #[test]
    fn test_mount_plan_for_dotted_library() {
        let lib = photofs::test::LibraryBuilder::new("Vacation.photolibrary")
            .image(1, "Masters/beach.jpg", b"beach")
            .build();
        let config = Config {
            mount_root: Some(PathBuf::from("/mnt/photos")),
            ..Config::default()
        };

        for path in [lib.path().join("."), lib.path().join("Masters/..")] {
            let library = Library::open(&path).unwrap();
            assert_eq!(
                mount_plan(None, &library, &config),
                MountPlan {
                    path: PathBuf::from("/mnt/photos/Vacation"),
                    create: true,
                },
                "{path:?}"
            );
            assert_eq!(
                mount_plan(Some("-/elsewhere"), &library, &config).path,
                PathBuf::from("/elsewhere/Vacation")
            );
        }
    }

    #[test]
    fn test_parse_list() {
        let args = App::parse_from([
            "mount-photofs",
            "list",
            "--kind",
            "roll",
            "--images",
            "--catalog-file",
            "Other.xml",
            "lib",
        ]);
        assert_eq!(args.catalog_file, Some(PathBuf::from("Other.xml")));
        let config = load_config(&args).unwrap();
        assert_eq!(config.catalog_file, PathBuf::from("Other.xml"));
        assert!(matches!(
            args.cmd,
            Command::List {
                kind: Some(CollectionKind::Rolls),
                images: true,
                ..
            }
        ));
    }
}
