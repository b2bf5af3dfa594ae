//! Reading photo libraries "statically", including libraries that no application currently has
//! open, backups, and libraries on network shares.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock},
};

use log::{info, warn};

use crate::{
    cache::Cache,
    catalog::{AlbumData, ImageId},
    collection::{Collection, CollectionKind},
    config::Config,
    error::{Error, Result},
    image::Image,
    util::normalize_path,
};

// Cache domains
const CK_ALBUM_DATA: &str = "album_data";
const CK_IMAGE_FROM_ID: &str = "image_from_id";
const CK_IMAGE_FROM_GUID: &str = "image_from_guid";
const CK_COLLECTIONS_BY_TYPE: &str = "collections_by_type";
const CK_COLLECTION_BY_TYPE_NAME: &str = "collection_by_type_name";
const CK_COLLECTION_NAMES_BY_TYPE: &str = "collection_names_by_type";
const CK_MASTER_IMAGE_LIST: &str = "master_image_list";

/// A photo library: a folder holding a catalog file and the images it describes.
///
/// Everything derived from the catalog is memoized in a [`Cache`] owned by the library.  The cache
/// watches the catalog file, and once it notices the file has changed, the catalog is decoded
/// again on the next lookup.
#[derive(Debug)]
pub struct Library {
    path: PathBuf,
    abspath: Arc<Path>,
    catalog_file: PathBuf,
    cache: Arc<Cache>,
    album_data: RwLock<Arc<AlbumData>>,
}

impl Library {
    /// Opens the library at `path` with the default configuration.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, &Config::default())
    }

    /// Opens the library at `path`, decoding its catalog file.
    ///
    /// # Errors
    ///
    /// Fails if `path` is not a directory or the catalog can't be decoded.
    pub fn open_with(path: impl AsRef<Path>, config: &Config) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(Error::LibraryNotFound(path.to_path_buf()));
        }

        // Normalized, so that a trailing slash doesn't leave us with an empty folder name
        let path: PathBuf = path.components().collect();
        let abspath: Arc<Path> = normalize_path(&std::path::absolute(&path)?).into();
        let catalog_file = path.join(&config.catalog_file);

        let album_data = Arc::new(AlbumData::from_file(&catalog_file)?);
        let cache = Arc::new(Cache::watching(&catalog_file, config.cache_timeout())?);
        cache.set(CK_ALBUM_DATA, None, Arc::clone(&album_data));

        info!(
            "opened {} with {} images",
            abspath.display(),
            album_data.master_image_list.len()
        );

        Ok(Self {
            path,
            abspath,
            catalog_file,
            cache,
            album_data: RwLock::new(album_data),
        })
    }

    /// The cache shared by everything derived from this library.
    pub fn cache(&self) -> &Arc<Cache> {
        &self.cache
    }

    /// The library name: its folder name without the extension.
    pub fn name(&self) -> &str {
        self.abspath
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default()
    }

    /// The path to the library as originally provided (normalized).
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The absolute path to the library.
    pub fn abspath(&self) -> &Path {
        &self.abspath
    }

    pub fn catalog_file(&self) -> &Path {
        &self.catalog_file
    }

    /// Decodes the catalog file again and drops everything cached.
    ///
    /// # Errors
    ///
    /// If the catalog can't be decoded, the error is returned and the previous catalog stays.
    pub fn reload(&self) -> Result<()> {
        let album_data = Arc::new(AlbumData::from_file(&self.catalog_file)?);
        *self.album_data.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&album_data);
        self.cache.clear();
        self.cache.set(CK_ALBUM_DATA, None, album_data);
        info!("reloaded {}", self.catalog_file.display());
        Ok(())
    }

    /// The current catalog.  If the cache was flushed since the last call, the catalog file is
    /// decoded again; if that fails the previous catalog is kept.
    pub fn album_data(&self) -> Arc<AlbumData> {
        if let Some(album_data) = self.cache.get(CK_ALBUM_DATA, None) {
            return album_data;
        }

        let album_data = match AlbumData::from_file(&self.catalog_file) {
            Ok(album_data) => {
                info!("catalog {} changed, decoded again", self.catalog_file.display());
                let album_data = Arc::new(album_data);
                let mut current = self.album_data.write().unwrap_or_else(PoisonError::into_inner);
                *current = Arc::clone(&album_data);
                album_data
            }
            Err(err) => {
                warn!("{err}; keeping the previous catalog");
                Arc::clone(&self.album_data.read().unwrap_or_else(PoisonError::into_inner))
            }
        };

        self.cache.set(CK_ALBUM_DATA, None, album_data)
    }

    /// The collections of the given kind, in catalog order.  Typically there will be, at a
    /// minimum, albums named Photos, Flagged, Last 12 Months and Last Import.
    pub fn collections(&self, kind: CollectionKind) -> Vec<Collection> {
        let key = kind.as_str();
        if let Some(collections) = self.cache.get(CK_COLLECTIONS_BY_TYPE, Some(key)) {
            return collections;
        }

        let album_data = self.album_data();
        let records = match kind {
            CollectionKind::Albums => &album_data.list_of_albums,
            CollectionKind::Rolls => &album_data.list_of_rolls,
        };
        let collections: Vec<Collection> = records
            .iter()
            .filter_map(|record| {
                let collection = Collection::new(kind, record.clone());
                if collection.is_none() {
                    warn!("skipping unnamed entry in the list of {kind}");
                }
                collection
            })
            .collect();

        self.cache.set(CK_COLLECTIONS_BY_TYPE, Some(key), collections)
    }

    pub fn albums(&self) -> Vec<Collection> {
        self.collections(CollectionKind::Albums)
    }

    pub fn rolls(&self) -> Vec<Collection> {
        self.collections(CollectionKind::Rolls)
    }

    /// The first collection of the given kind with the given name.
    pub fn collection(&self, kind: CollectionKind, name: &str) -> Option<Collection> {
        let key = format!("{kind}::{name}");
        if let Some(collection) = self.cache.get(CK_COLLECTION_BY_TYPE_NAME, Some(&key)) {
            return Some(collection);
        }

        let collection = self
            .collections(kind)
            .into_iter()
            .find(|collection| collection.name() == name)?;
        Some(self.cache.set(CK_COLLECTION_BY_TYPE_NAME, Some(&key), collection))
    }

    pub fn album(&self, name: &str) -> Option<Collection> {
        self.collection(CollectionKind::Albums, name)
    }

    pub fn roll(&self, name: &str) -> Option<Collection> {
        self.collection(CollectionKind::Rolls, name)
    }

    /// The names of all collections of the given kind, in catalog order.
    pub fn collection_names(&self, kind: CollectionKind) -> Vec<String> {
        self.cache
            .get_or_else(CK_COLLECTION_NAMES_BY_TYPE, Some(kind.as_str()), || {
                let names: Vec<String> = self
                    .collections(kind)
                    .iter()
                    .map(|collection| collection.name().to_string())
                    .collect();
                self.cache
                    .set(CK_COLLECTION_NAMES_BY_TYPE, Some(kind.as_str()), names)
            })
    }

    pub fn album_names(&self) -> Vec<String> {
        self.collection_names(CollectionKind::Albums)
    }

    pub fn roll_names(&self) -> Vec<String> {
        self.collection_names(CollectionKind::Rolls)
    }

    /// The number of catalog entries of the given kind.  This counts raw entries, whether or not
    /// they make usable collections.
    pub fn num_collections(&self, kind: CollectionKind) -> usize {
        let album_data = self.album_data();
        match kind {
            CollectionKind::Albums => album_data.list_of_albums.len(),
            CollectionKind::Rolls => album_data.list_of_rolls.len(),
        }
    }

    pub fn num_albums(&self) -> usize {
        self.num_collections(CollectionKind::Albums)
    }

    pub fn num_rolls(&self) -> usize {
        self.num_collections(CollectionKind::Rolls)
    }

    /// The image with the given catalog identifier.  Misses are memoized too.
    pub fn image_from_id(&self, id: ImageId) -> Option<Image> {
        let key = id.to_string();
        if let Some(image) = self.cache.get(CK_IMAGE_FROM_ID, Some(&key)) {
            return image;
        }

        let image = self
            .album_data()
            .master_image_list
            .get(&id)
            .map(|record| Image::new(id, record.clone(), Arc::clone(&self.abspath)));
        self.cache.set(CK_IMAGE_FROM_ID, Some(&key), image)
    }

    /// The image with the given GUID.  This scans the whole catalog on a miss.
    pub fn image_from_guid(&self, guid: &str) -> Option<Image> {
        if let Some(image) = self.cache.get(CK_IMAGE_FROM_GUID, Some(guid)) {
            return Some(image);
        }

        let album_data = self.album_data();
        let (id, record) = album_data
            .master_image_list
            .iter()
            .find(|(_, record)| record.guid.as_deref() == Some(guid))?;
        let image = Image::new(*id, record.clone(), Arc::clone(&self.abspath));
        Some(self.cache.set(CK_IMAGE_FROM_GUID, Some(guid), image))
    }

    /// Every image in the library, in catalog order.
    pub fn images(&self) -> Vec<Image> {
        self.cache.get_or_else(CK_MASTER_IMAGE_LIST, None, || {
            let images: Vec<Image> = self
                .album_data()
                .master_image_list
                .keys()
                .filter_map(|&id| self.image_from_id(id))
                .collect();
            self.cache.set(CK_MASTER_IMAGE_LIST, None, images)
        })
    }

    pub fn num_images(&self) -> usize {
        self.album_data().master_image_list.len()
    }
}

impl fmt::Display for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Library '{}']", self.name())
    }
}
