use std::{
    fmt,
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use log::debug;

use crate::{
    catalog::{ImageId, ImageRecord},
    util::human_size,
};

/// A photo or video in a library.
///
/// Images are cheap to clone: the catalog record and the library root are shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    id: ImageId,
    record: Arc<ImageRecord>,
    library_root: Arc<Path>,
}

impl Image {
    pub(crate) fn new(id: ImageId, record: ImageRecord, library_root: Arc<Path>) -> Self {
        Self {
            id,
            record: Arc::new(record),
            library_root,
        }
    }

    /// The identifier of this image within the catalog.
    pub fn id(&self) -> ImageId {
        self.id
    }

    /// The image path recorded in the catalog.
    ///
    /// This is an absolute path, hard coded to wherever the library was stored the last time the
    /// application opened it.  If the library has since been moved, copied to a backup, or is
    /// mounted over the network, it almost certainly points nowhere useful; see
    /// [`Image::abspath`].
    pub fn declared_image_path(&self) -> &Path {
        Path::new(&self.record.image_path)
    }

    /// Where the image actually lives, given where the library is now.
    pub fn abspath(&self) -> PathBuf {
        match rel_internal_path(self.declared_image_path(), &self.library_root) {
            Some(rel) => self.library_root.join(rel),
            None => {
                debug!(
                    "{} is outside of {}, using it as-is",
                    self.record.image_path,
                    self.library_root.display()
                );
                self.declared_image_path().to_path_buf()
            }
        }
    }

    /// The thumbnail path exactly as recorded in the catalog.
    pub fn thumbpath(&self) -> Option<&str> {
        self.record.thumb_path.as_deref()
    }

    pub fn caption(&self) -> Option<&str> {
        self.record.caption.as_deref()
    }

    /// The media type tag, eg. "Image" or "Movie".
    pub fn media_type(&self) -> Option<&str> {
        self.record.media_type.as_deref()
    }

    pub fn guid(&self) -> Option<&str> {
        self.record.guid.as_deref()
    }

    /// The original filename of the image, eg. `IMG_4358.JPG`.
    pub fn filename(&self) -> &str {
        let path = self.record.image_path.trim_end_matches('/');
        path.rsplit('/').next().unwrap_or(path)
    }

    /// The size of the image file in bytes.  This stats the file every time.
    pub fn size(&self) -> std::io::Result<u64> {
        Ok(rustix::fs::stat(self.abspath())?.st_size as u64)
    }
}

impl fmt::Display for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.size() {
            Ok(size) => write!(f, "[Image '{}', size={}]", self.filename(), human_size(size)),
            Err(_) => write!(f, "[Image '{}', missing]", self.filename()),
        }
    }
}

/// Returns the part of `declared` that lies within the library, by finding the first path
/// component equal to the name of the library's root folder.
///
/// For instance with a library at `/Volumes/Backup/Colorado.photolibrary` and a declared path of
/// `/Users/rob/Pictures/Colorado.photolibrary/Masters/2014/IMG_5348.JPG` this returns
/// `Masters/2014/IMG_5348.JPG`.  Returns `None` if the library's folder name doesn't appear.
pub(crate) fn rel_internal_path<'a>(declared: &'a Path, library_root: &Path) -> Option<&'a Path> {
    let target = library_root.file_name()?;

    let mut components = declared.components();
    while let Some(component) = components.next() {
        if let Component::Normal(name) = component {
            if name == target {
                return Some(components.as_path());
            }
        }
    }

    None
}

#[cfg(test)]
mod test {
    use similar_asserts::assert_eq;

    use super::*;

    fn image(path: &str, root: &str) -> Image {
        Image::new(
            ImageId(1),
            ImageRecord {
                image_path: path.to_string(),
                thumb_path: Some("/thumbs/1.jpg".to_string()),
                caption: Some("caption".to_string()),
                media_type: Some("Image".to_string()),
                guid: Some("guid-1".to_string()),
            },
            Arc::from(Path::new(root)),
        )
    }

    #[test]
    fn test_relocated_abspath() {
        let img = image(
            "/old/mount/MyLibrary.photolibrary/Masters/2020/img.jpg",
            "/new/mount/MyLibrary.photolibrary",
        );
        assert_eq!(
            img.abspath(),
            PathBuf::from("/new/mount/MyLibrary.photolibrary/Masters/2020/img.jpg")
        );
        assert_eq!(
            img.declared_image_path(),
            Path::new("/old/mount/MyLibrary.photolibrary/Masters/2020/img.jpg")
        );
    }

    #[test]
    fn test_first_matching_component_wins() {
        let img = image(
            "/a/Lib.photolibrary/Masters/Lib.photolibrary/img.jpg",
            "/b/Lib.photolibrary",
        );
        assert_eq!(
            img.abspath(),
            PathBuf::from("/b/Lib.photolibrary/Masters/Lib.photolibrary/img.jpg")
        );
    }

    #[test]
    fn test_unrelated_path_is_kept() {
        let img = image("/elsewhere/img.jpg", "/b/Lib.photolibrary");
        assert_eq!(img.abspath(), PathBuf::from("/elsewhere/img.jpg"));

        // partial name matches don't count
        let img = image("/a/Lib.photolibrary2/img.jpg", "/b/Lib.photolibrary");
        assert_eq!(img.abspath(), PathBuf::from("/a/Lib.photolibrary2/img.jpg"));
    }

    #[test]
    fn test_rel_internal_path() {
        let root = Path::new("/x/Lib");
        assert_eq!(
            rel_internal_path(Path::new("/y/Lib/a/b.jpg"), root),
            Some(Path::new("a/b.jpg"))
        );
        assert_eq!(rel_internal_path(Path::new("/y/Lib"), root), Some(Path::new("")));
        assert_eq!(rel_internal_path(Path::new("/y/z/b.jpg"), root), None);
        assert_eq!(rel_internal_path(Path::new("/y/Lib/b.jpg"), Path::new("/")), None);
    }

    #[test]
    fn test_accessors() {
        let img = image("/lib/Masters/IMG_4358.JPG", "/lib");
        assert_eq!(img.id(), ImageId(1));
        assert_eq!(img.filename(), "IMG_4358.JPG");
        assert_eq!(img.caption(), Some("caption"));
        assert_eq!(img.media_type(), Some("Image"));
        assert_eq!(img.guid(), Some("guid-1"));
        assert_eq!(img.thumbpath(), Some("/thumbs/1.jpg"));
        assert!(img.size().is_err());
        assert_eq!(img.to_string(), "[Image 'IMG_4358.JPG', missing]");
    }

    #[test]
    fn test_size() {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("Lib.photolibrary");
        std::fs::create_dir_all(lib.join("Masters")).unwrap();
        std::fs::write(lib.join("Masters/a.jpg"), vec![0u8; 1229]).unwrap();

        let img = image(
            "/Users/x/Lib.photolibrary/Masters/a.jpg",
            lib.to_str().unwrap(),
        );
        assert_eq!(img.size().unwrap(), 1229);
        assert_eq!(img.to_string(), "[Image 'a.jpg', size=1.2 KB]");
    }
}
