//! Mapping virtual paths onto the catalog.
//!
//! The mounted tree has a fixed shape:
//!
//! ```text
//! /
//! ├── Albums
//! │   └── <album name>
//! │       └── <image filename>
//! └── Rolls
//!     └── <roll name>
//!         └── <image filename>
//! ```
//!
//! Parsing a path only classifies it.  Resolving looks the pieces up in a [`Library`], which is
//! where the caching happens.

use std::path::PathBuf;

use crate::{
    collection::{Collection, CollectionKind},
    image::Image,
    library::Library,
};

/// A syntactically valid virtual path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VirtualPath<'a> {
    /// `/`
    Root,
    /// `/Albums` or `/Rolls`
    Kind(CollectionKind),
    /// `/Albums/<name>`
    Collection { kind: CollectionKind, name: &'a str },
    /// `/Albums/<name>/<filename>`
    Image {
        kind: CollectionKind,
        collection: &'a str,
        filename: &'a str,
    },
}

impl<'a> VirtualPath<'a> {
    /// Classifies `path`.  Returns `None` for anything outside the fixed tree shape, including
    /// relative paths, empty segments and unknown top-level names.
    pub fn parse(path: &'a str) -> Option<Self> {
        let rest = path.strip_prefix('/')?;
        if rest.is_empty() {
            return Some(VirtualPath::Root);
        }

        let mut segments = rest.split('/');
        let kind = match segments.next()? {
            "Albums" => CollectionKind::Albums,
            "Rolls" => CollectionKind::Rolls,
            _ => return None,
        };

        let parsed = match (segments.next(), segments.next(), segments.next()) {
            (None, _, _) => VirtualPath::Kind(kind),
            (Some(name), None, _) if !name.is_empty() => VirtualPath::Collection { kind, name },
            (Some(collection), Some(filename), None)
                if !collection.is_empty() && !filename.is_empty() =>
            {
                VirtualPath::Image {
                    kind,
                    collection,
                    filename,
                }
            }
            _ => return None,
        };
        Some(parsed)
    }

    pub fn is_dir(&self) -> bool {
        !matches!(self, VirtualPath::Image { .. })
    }
}

/// What a virtual path refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Root,
    Kind(CollectionKind),
    Collection(Collection),
    Image(Image),
}

impl Resolved {
    pub fn is_dir(&self) -> bool {
        !matches!(self, Resolved::Image(..))
    }

    /// The number of entries in this directory, not counting `.` and `..`.  Zero for images.
    pub fn num_children(&self, library: &Library) -> usize {
        match self {
            Resolved::Root => CollectionKind::ALL.len(),
            Resolved::Kind(kind) => library.num_collections(*kind),
            Resolved::Collection(collection) => collection.num_images(),
            Resolved::Image(..) => 0,
        }
    }

    /// The names of the entries in this directory, not counting `.` and `..`.  Empty for images.
    pub fn children(&self, library: &Library) -> Vec<String> {
        match self {
            Resolved::Root => CollectionKind::ALL
                .iter()
                .map(|kind| kind.as_str().to_string())
                .collect(),
            Resolved::Kind(kind) => library.collection_names(*kind),
            Resolved::Collection(collection) => collection
                .images(library)
                .iter()
                .map(|image| image.filename().to_string())
                .collect(),
            Resolved::Image(..) => vec![],
        }
    }

    /// The location of the image on disk; `None` for directories.
    pub fn real_path(&self) -> Option<PathBuf> {
        match self {
            Resolved::Image(image) => Some(image.abspath()),
            _ => None,
        }
    }
}

/// Resolves a virtual path against `library`.  `None` means there is no such entry.
pub fn resolve(library: &Library, path: &str) -> Option<Resolved> {
    Some(match VirtualPath::parse(path)? {
        VirtualPath::Root => Resolved::Root,
        VirtualPath::Kind(kind) => Resolved::Kind(kind),
        VirtualPath::Collection { kind, name } => {
            Resolved::Collection(library.collection(kind, name)?)
        }
        VirtualPath::Image {
            kind,
            collection,
            filename,
        } => Resolved::Image(
            library
                .collection(kind, collection)?
                .image_by_filename(library, filename)?,
        ),
    })
}

#[cfg(test)]
mod test {
    use similar_asserts::assert_eq;

    use super::*;
    use crate::{catalog::ImageId, test::LibraryBuilder};

    #[test]
    fn test_parse() {
        assert_eq!(VirtualPath::parse("/"), Some(VirtualPath::Root));
        assert_eq!(
            VirtualPath::parse("/Albums"),
            Some(VirtualPath::Kind(CollectionKind::Albums))
        );
        assert_eq!(
            VirtualPath::parse("/Rolls/Summer 2020"),
            Some(VirtualPath::Collection {
                kind: CollectionKind::Rolls,
                name: "Summer 2020"
            })
        );
        assert_eq!(
            VirtualPath::parse("/Albums/Vacation/beach.jpg"),
            Some(VirtualPath::Image {
                kind: CollectionKind::Albums,
                collection: "Vacation",
                filename: "beach.jpg"
            })
        );
    }

    #[test]
    fn test_parse_rejects() {
        for path in [
            "",
            "Albums",
            "//",
            "/Events",
            "/albums",
            "/Albums/",
            "/Albums//x.jpg",
            "/Albums/Vacation/",
            "/Albums/Vacation/beach.jpg/more",
        ] {
            assert_eq!(VirtualPath::parse(path), None, "{path:?}");
        }
    }

    #[test]
    fn test_is_dir() {
        assert!(VirtualPath::parse("/").unwrap().is_dir());
        assert!(VirtualPath::parse("/Rolls/x").unwrap().is_dir());
        assert!(!VirtualPath::parse("/Rolls/x/y").unwrap().is_dir());
    }

    #[test]
    fn test_resolve() {
        let lib = LibraryBuilder::new("Vacation.photolibrary")
            .image(1, "Masters/beach.jpg", b"beach")
            .image(2, "Masters/sunset.jpg", b"sunset")
            .album("Vacation", &[1, 2])
            .roll("Roll", &[2])
            .build();
        let library = lib.open();

        let root = resolve(&library, "/").unwrap();
        assert_eq!(root, Resolved::Root);
        assert_eq!(root.children(&library), vec!["Albums", "Rolls"]);
        assert_eq!(root.num_children(&library), 2);

        let albums = resolve(&library, "/Albums").unwrap();
        assert_eq!(albums.children(&library), vec!["Vacation"]);
        assert_eq!(albums.num_children(&library), 1);

        let vacation = resolve(&library, "/Albums/Vacation").unwrap();
        assert!(vacation.is_dir());
        assert_eq!(vacation.children(&library), vec!["beach.jpg", "sunset.jpg"]);
        assert_eq!(vacation.num_children(&library), 2);
        assert_eq!(vacation.real_path(), None);

        let Some(Resolved::Image(sunset)) = resolve(&library, "/Rolls/Roll/sunset.jpg") else {
            panic!("expected an image");
        };
        assert_eq!(sunset.id(), ImageId(2));
        assert_eq!(
            resolve(&library, "/Rolls/Roll/sunset.jpg").unwrap().real_path(),
            Some(library.abspath().join("Masters/sunset.jpg"))
        );

        assert_eq!(resolve(&library, "/Albums/NoSuchAlbum"), None);
        assert_eq!(resolve(&library, "/Rolls/Roll/beach.jpg"), None);
        assert_eq!(resolve(&library, "/Rolls/Nope/beach.jpg"), None);
        assert_eq!(resolve(&library, "/Other"), None);
    }

    #[test]
    fn test_resolve_names_with_separators() {
        let lib = LibraryBuilder::new("Odd.photolibrary")
            .image(1, "Masters/one.jpg", b"one")
            .image(2, "Masters/c.jpg", b"c")
            .album("a", &[1])
            .album("a::b", &[2])
            .build();
        let library = lib.open();

        let Some(Resolved::Image(image)) = resolve(&library, "/Albums/a::b/c.jpg") else {
            panic!("expected an image");
        };
        assert_eq!(image.id(), ImageId(2));

        // Album "a" has no member "b::c.jpg", whatever is cached for "a::b"
        assert_eq!(resolve(&library, "/Albums/a/b::c.jpg"), None);
        assert_eq!(
            resolve(&library, "/Albums/a/one.jpg").map(|r| r.is_dir()),
            Some(false)
        );
    }
}
