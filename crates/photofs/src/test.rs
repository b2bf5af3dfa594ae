//! Fixtures for building throwaway photo libraries in tests.

use std::{
    ffi::OsString,
    fs::{create_dir_all, File},
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use once_cell::sync::Lazy;
use plist::{Dictionary, Value};
use tempfile::TempDir;

use crate::{config::Config, library::Library};

/// Where the library appears to have lived when its catalog was written.
pub const DECLARED_PARENT: &str = "/Users/someone/Pictures";

static TMPDIR: Lazy<OsString> = Lazy::new(|| {
    if let Some(path) = std::env::var_os("PHOTOFS_TEST_TMPDIR") {
        eprintln!("temporary directory from $PHOTOFS_TEST_TMPDIR: {path:?}");
        path
    } else {
        std::env::temp_dir().into()
    }
});

pub fn tempdir() -> TempDir {
    TempDir::with_prefix_in("photofs-test-", TMPDIR.as_os_str()).unwrap()
}

/// Builds a library folder with a catalog and real image files.
#[derive(Debug, Clone)]
pub struct LibraryBuilder {
    name: String,
    images: Vec<(u64, String, Vec<u8>)>,
    albums: Vec<(String, Vec<u64>)>,
    rolls: Vec<(String, Vec<u64>)>,
}

impl LibraryBuilder {
    /// `name` is the folder name of the library, eg. "Vacation.photolibrary".
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            images: vec![],
            albums: vec![],
            rolls: vec![],
        }
    }

    /// Adds an image file at `relpath` inside the library.  Its GUID is `GUID-<id>`.
    pub fn image(mut self, id: u64, relpath: &str, content: &[u8]) -> Self {
        self.images.push((id, relpath.to_string(), content.to_vec()));
        self
    }

    pub fn album(mut self, name: &str, ids: &[u64]) -> Self {
        self.albums.push((name.to_string(), ids.to_vec()));
        self
    }

    pub fn roll(mut self, name: &str, ids: &[u64]) -> Self {
        self.rolls.push((name.to_string(), ids.to_vec()));
        self
    }

    fn collections(list: &[(String, Vec<u64>)], name_key: &str) -> Value {
        Value::Array(
            list.iter()
                .map(|(name, ids)| {
                    let mut record = Dictionary::new();
                    record.insert(name_key.to_string(), Value::String(name.clone()));
                    record.insert(
                        "KeyList".to_string(),
                        Value::Array(ids.iter().map(|id| Value::String(id.to_string())).collect()),
                    );
                    Value::Dictionary(record)
                })
                .collect(),
        )
    }

    /// Writes the catalog (only) into an existing library folder.
    pub fn write_catalog(&self, library: &Path) {
        let declared_root = Path::new(DECLARED_PARENT).join(&self.name);

        let mut master = Dictionary::new();
        for (id, relpath, _) in &self.images {
            let mut record = Dictionary::new();
            record.insert(
                "ImagePath".to_string(),
                Value::String(declared_root.join(relpath).to_string_lossy().into()),
            );
            record.insert(
                "ThumbPath".to_string(),
                Value::String(
                    declared_root
                        .join("Thumbnails")
                        .join(relpath)
                        .to_string_lossy()
                        .into(),
                ),
            );
            record.insert("Caption".to_string(), Value::String(format!("image {id}")));
            record.insert("MediaType".to_string(), Value::String("Image".to_string()));
            record.insert("GUID".to_string(), Value::String(format!("GUID-{id}")));
            master.insert(id.to_string(), Value::Dictionary(record));
        }

        let mut root = Dictionary::new();
        root.insert(
            "Application Version".to_string(),
            Value::String("9.6.1".to_string()),
        );
        root.insert("Master Image List".to_string(), Value::Dictionary(master));
        root.insert(
            "List of Albums".to_string(),
            Self::collections(&self.albums, "AlbumName"),
        );
        root.insert(
            "List of Rolls".to_string(),
            Self::collections(&self.rolls, "RollName"),
        );

        Value::Dictionary(root)
            .to_file_xml(library.join(crate::config::DEFAULT_CATALOG_FILE))
            .unwrap();
    }

    /// Creates the library in a fresh temporary directory.
    pub fn build(self) -> TestLibrary {
        let dir = tempdir();
        let path = dir.path().join(&self.name);
        create_dir_all(&path).unwrap();

        for (_, relpath, content) in &self.images {
            let file = path.join(relpath);
            create_dir_all(file.parent().unwrap()).unwrap();
            std::fs::write(&file, content).unwrap();
        }
        self.write_catalog(&path);

        TestLibrary { _dir: dir, path }
    }
}

/// A library in a temporary directory, removed on drop.
#[derive(Debug)]
pub struct TestLibrary {
    _dir: TempDir,
    path: PathBuf,
}

impl TestLibrary {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn catalog_file(&self) -> PathBuf {
        self.path.join(crate::config::DEFAULT_CATALOG_FILE)
    }

    pub fn open(&self) -> Library {
        Library::open(&self.path).unwrap()
    }

    pub fn open_with(&self, config: &Config) -> Library {
        Library::open_with(&self.path, config).unwrap()
    }

    /// Moves the catalog's modification time `ahead` into the future, so that it is guaranteed to
    /// look newer than whatever a cache recorded.
    pub fn touch_catalog(&self, ahead: Duration) {
        File::options()
            .write(true)
            .open(self.catalog_file())
            .unwrap()
            .set_modified(SystemTime::now() + ahead)
            .unwrap();
    }
}
