use std::{fmt, str::FromStr, sync::Arc};

use crate::{
    catalog::{CollectionRecord, ImageId},
    image::Image,
    library::Library,
};

const CK_COLLECTION_IMAGES: &str = "collection_images_by_type_name";
const CK_IMAGE_BY_FILENAME: &str = "image_by_type_name_filename";

/// The two kinds of collection found in a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    Albums,
    Rolls,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 2] = [CollectionKind::Albums, CollectionKind::Rolls];

    /// The directory name used for this kind at the top of the mount.
    pub fn as_str(self) -> &'static str {
        match self {
            CollectionKind::Albums => "Albums",
            CollectionKind::Rolls => "Rolls",
        }
    }

    /// The singular form, for display.
    pub fn singular(self) -> &'static str {
        match self {
            CollectionKind::Albums => "Album",
            CollectionKind::Rolls => "Roll",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown collection kind {0:?}")]
pub struct UnknownCollectionKind(pub String);

impl FromStr for CollectionKind {
    type Err = UnknownCollectionKind;

    /// Accepts the directory names "Albums" and "Rolls"; case-insensitively, and in the singular
    /// too, so that command line arguments like `--kind album` work.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "albums" | "album" => Ok(CollectionKind::Albums),
            "rolls" | "roll" => Ok(CollectionKind::Rolls),
            _ => Err(UnknownCollectionKind(s.to_string())),
        }
    }
}

/// An album or a roll: a named, ordered group of images.
///
/// A collection doesn't own its images, it only refers to them by [`ImageId`].  Methods that need
/// to resolve those identifiers take the [`Library`] the collection came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    kind: CollectionKind,
    name: String,
    record: Arc<CollectionRecord>,
}

impl Collection {
    /// Builds a collection from its catalog record.  Returns `None` if the record has no name for
    /// its kind.
    pub fn new(kind: CollectionKind, record: CollectionRecord) -> Option<Self> {
        let name = match kind {
            CollectionKind::Albums => record.album_name.clone(),
            CollectionKind::Rolls => record.roll_name.clone(),
        }?;
        Some(Self {
            kind,
            name,
            record: Arc::new(record),
        })
    }

    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    /// The display name of the album, roll, etc.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The identifiers of the member images, in collection order.
    pub fn image_ids(&self) -> &[ImageId] {
        &self.record.key_list
    }

    pub fn num_images(&self) -> usize {
        self.record.key_list.len()
    }

    /// Identifies the collection in cache keys.  The name is length-prefixed, so that whatever
    /// is appended to the key can't be confused with part of the name.
    fn cache_key(&self) -> String {
        format!("{}::{}:{}", self.kind, self.name.len(), self.name)
    }

    /// The member images in collection order.  Identifiers missing from the catalog are skipped.
    pub fn images(&self, library: &Library) -> Vec<Image> {
        let cache = library.cache();
        let key = self.cache_key();
        cache.get_or_else(CK_COLLECTION_IMAGES, Some(&key), || {
            let images: Vec<Image> = self
                .image_ids()
                .iter()
                .filter_map(|&id| library.image_from_id(id))
                .collect();
            cache.set(CK_COLLECTION_IMAGES, Some(&key), images)
        })
    }

    /// The first member image whose filename is `filename`.
    ///
    /// Filenames aren't necessarily unique within a collection; if two members share one, only
    /// the earlier is reachable this way.
    pub fn image_by_filename(&self, library: &Library, filename: &str) -> Option<Image> {
        let cache = library.cache();
        let key = format!("{}::{filename}", self.cache_key());
        if let Some(image) = cache.get(CK_IMAGE_BY_FILENAME, Some(&key)) {
            return Some(image);
        }

        let image = self
            .image_ids()
            .iter()
            .filter_map(|&id| library.image_from_id(id))
            .find(|image| image.filename() == filename)?;
        Some(cache.set(CK_IMAGE_BY_FILENAME, Some(&key), image))
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} '{}', images={}]",
            self.kind.singular(),
            self.name,
            self.num_images()
        )
    }
}
