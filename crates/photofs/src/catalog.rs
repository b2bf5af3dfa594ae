//! The decoded form of a library's catalog file (`AlbumData.xml`).
//!
//! The catalog is an Apple property list.  Only the parts needed to present albums and rolls are
//! decoded; everything else in the file is ignored.

use std::{fmt, path::Path, str::FromStr};

use indexmap::IndexMap;
use serde::{de, Deserialize, Deserializer};

use crate::error::{Error, Result};

/// The numeric identifier of an image within a catalog.
///
/// The catalog usually writes these as strings (both as dictionary keys and inside `KeyList`),
/// but integers are accepted too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(pub u64);

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ImageId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.trim().parse().map(ImageId)
    }
}

impl From<u64> for ImageId {
    fn from(id: u64) -> Self {
        ImageId(id)
    }
}

impl<'de> Deserialize<'de> for ImageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ImageIdVisitor;

        impl de::Visitor<'_> for ImageIdVisitor {
            type Value = ImageId;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an image identifier, as an integer or a string of digits")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<ImageId, E> {
                Ok(ImageId(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<ImageId, E> {
                u64::try_from(v)
                    .map(ImageId)
                    .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<ImageId, E> {
                v.parse()
                    .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
            }
        }

        deserializer.deserialize_any(ImageIdVisitor)
    }
}

/// One entry of the "Master Image List".
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImageRecord {
    /// Absolute path of the image, as of the last time the application wrote the catalog.
    #[serde(rename = "ImagePath")]
    pub image_path: String,
    #[serde(rename = "ThumbPath", default)]
    pub thumb_path: Option<String>,
    #[serde(rename = "Caption", default)]
    pub caption: Option<String>,
    #[serde(rename = "MediaType", default)]
    pub media_type: Option<String>,
    #[serde(rename = "GUID", default)]
    pub guid: Option<String>,
}

/// One entry of "List of Albums" or "List of Rolls".  Albums carry `AlbumName`, rolls carry
/// `RollName`; which one is meaningful is decided by the list the record came from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CollectionRecord {
    #[serde(rename = "AlbumName", default)]
    pub album_name: Option<String>,
    #[serde(rename = "RollName", default)]
    pub roll_name: Option<String>,
    #[serde(rename = "KeyList", default)]
    pub key_list: Vec<ImageId>,
}

/// The decoded catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AlbumData {
    #[serde(rename = "Master Image List", default)]
    pub master_image_list: IndexMap<ImageId, ImageRecord>,
    #[serde(rename = "List of Albums", default)]
    pub list_of_albums: Vec<CollectionRecord>,
    #[serde(rename = "List of Rolls", default)]
    pub list_of_rolls: Vec<CollectionRecord>,
}

impl AlbumData {
    /// Decodes a catalog file.  Both XML and binary property lists are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the file is absent or malformed.
    pub fn from_file(path: &Path) -> Result<Self> {
        plist::from_file(path).map_err(|source| Error::Decode {
            path: path.to_path_buf(),
            source,
        })
    }
}
