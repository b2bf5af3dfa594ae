//! Path-based filesystem operations over a [`Library`].
//!
//! Every operation takes the virtual path it applies to, eg. `/Albums/Vacation/beach.jpg`.  The
//! results of the expensive ones (attributes, listings, and the image behind a path) are kept in
//! the library's cache, so they are recomputed whenever the catalog changes.

use std::{
    os::fd::{BorrowedFd, OwnedFd},
    sync::Mutex,
    time::SystemTime,
};

use rustix::{
    fs::{FileType, Mode, OFlags, RawMode, SeekFrom},
    io::Errno,
};

use photofs::{resolve, util::system_time, Image, Library, Resolved, VirtualPath};

use crate::error::FsError;

const CK_ST_BY_PATH: &str = "st_by_path";
const CK_IMAGE_BY_PATH: &str = "image_by_path";
const CK_FOLDER_LISTING: &str = "folder_listing";

const DIR_PERM: u32 = 0o755;

/// Who is asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Context {
    pub uid: u32,
    pub gid: u32,
    pub pid: u32,
}

/// The attributes reported for a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attributes {
    /// File type and permission bits, as in `st_mode`.
    pub mode: u32,
    pub nlink: u64,
    pub size: u64,
    pub atime: SystemTime,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
    pub uid: u32,
    pub gid: u32,
    pub pid: u32,
}

impl Attributes {
    fn directory(nlink: u64, ctx: Context) -> Self {
        let now = SystemTime::now();
        Self {
            mode: FileType::Directory.as_raw_mode() as u32 | DIR_PERM,
            nlink,
            size: 0,
            atime: now,
            mtime: now,
            ctime: now,
            uid: ctx.uid,
            gid: ctx.gid,
            pid: ctx.pid,
        }
    }

    fn file(st: &rustix::fs::Stat, ctx: Context) -> Self {
        Self {
            mode: st.st_mode as u32,
            nlink: st.st_nlink as u64,
            size: st.st_size as u64,
            atime: system_time(st.st_atime as i64, st.st_atime_nsec as i64),
            mtime: system_time(st.st_mtime as i64, st.st_mtime_nsec as i64),
            ctime: system_time(st.st_ctime as i64, st.st_ctime_nsec as i64),
            uid: ctx.uid,
            gid: ctx.gid,
            pid: ctx.pid,
        }
    }

    pub fn file_type(&self) -> FileType {
        FileType::from_raw_mode(self.mode as RawMode)
    }

    pub fn is_dir(&self) -> bool {
        self.file_type() == FileType::Directory
    }

    /// The permission bits alone.
    pub fn perm(&self) -> u16 {
        (self.mode & 0o7777) as u16
    }
}

/// The filesystem operations, addressed by virtual path.
#[derive(Debug)]
pub struct PhotoFs {
    library: Library,
    // Serializes seek+read pairs on shared handles
    read_lock: Mutex<()>,
}

impl PhotoFs {
    pub fn new(library: Library) -> Self {
        Self {
            library,
            read_lock: Mutex::new(()),
        }
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    /// The image that a previous [`PhotoFs::getattr`] found at `path`, if it is still cached.
    fn cached_image(&self, path: &str) -> Option<Image> {
        self.library.cache().get(CK_IMAGE_BY_PATH, Some(path))
    }

    fn resolve(&self, path: &str) -> Result<Resolved, FsError> {
        resolve(&self.library, path).ok_or_else(|| FsError::NotFound(path.to_string()))
    }

    /// Returns the attributes of `path`.
    ///
    /// Directories are synthesized, owned by the caller, with a link count of two plus the
    /// number of entries.  Images report the `lstat` of the real file, but owned by the caller,
    /// so an image stored as a symbolic link shows up as one.
    /// Nothing is cached for paths that don't exist.
    pub fn getattr(&self, path: &str, ctx: Context) -> Result<Attributes, FsError> {
        let cache = self.library.cache();
        if let Some(attrs) = cache.get(CK_ST_BY_PATH, Some(path)) {
            return Ok(attrs);
        }

        let attrs = match self.resolve(path)? {
            Resolved::Image(image) => {
                let st = rustix::fs::lstat(image.abspath())?;
                cache.set(CK_IMAGE_BY_PATH, Some(path), image);
                Attributes::file(&st, ctx)
            }
            dir => Attributes::directory(2 + dir.num_children(&self.library) as u64, ctx),
        };

        Ok(cache.set(CK_ST_BY_PATH, Some(path), attrs))
    }

    /// Lists a directory, including `.` and `..`.  Anything that isn't a directory lists as empty.
    pub fn readdir(&self, path: &str) -> Vec<String> {
        let cache = self.library.cache();
        if let Some(listing) = cache.get(CK_FOLDER_LISTING, Some(path)) {
            return listing;
        }

        let Some(dir) = resolve(&self.library, path).filter(Resolved::is_dir) else {
            return vec![];
        };

        let mut listing = vec![".".to_string(), "..".to_string()];
        listing.extend(dir.children(&self.library));
        cache.set(CK_FOLDER_LISTING, Some(path), listing)
    }

    /// Opens the real file behind `path`.  Returns `None` if `path` isn't an image.
    pub fn open(
        &self,
        path: &str,
        flags: OFlags,
        mode: Mode,
        ctx: Context,
    ) -> Result<Option<OwnedFd>, FsError> {
        // Makes sure the image behind the path is cached
        if let Err(err) = self.getattr(path, ctx) {
            log::debug!("open({path}): {err}");
        }

        let Some(image) = self.cached_image(path) else {
            return Ok(None);
        };

        let fd = rustix::fs::open(image.abspath(), flags | OFlags::CLOEXEC, mode)?;
        log::debug!("opened {} for {path}", image.abspath().display());
        Ok(Some(fd))
    }

    /// Reads up to `size` bytes at `offset` from `fd`, which must have come from
    /// [`PhotoFs::open`] of the same path.  Fewer bytes are returned only at end of file.
    pub fn read(
        &self,
        path: &str,
        size: usize,
        offset: u64,
        fd: BorrowedFd<'_>,
    ) -> Result<Vec<u8>, FsError> {
        if self.cached_image(path).is_none() {
            return Err(FsError::ReadWithoutOpen(path.to_string()));
        }

        let _guard = self
            .read_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        rustix::fs::seek(fd, SeekFrom::Start(offset))?;

        let mut data = vec![0; size];
        let mut filled = 0;
        while filled < size {
            match rustix::io::read(fd, &mut data[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(Errno::INTR) => continue,
                Err(errno) => return Err(errno.into()),
            }
        }
        data.truncate(filled);
        Ok(data)
    }

    pub fn flush(&self, path: &str, fd: BorrowedFd<'_>) -> Result<(), FsError> {
        log::trace!("flush({path})");
        Ok(rustix::fs::fsync(fd)?)
    }

    pub fn fsync(&self, path: &str, datasync: bool, fd: BorrowedFd<'_>) -> Result<(), FsError> {
        log::trace!("fsync({path}, datasync={datasync})");
        Ok(rustix::fs::fsync(fd)?)
    }

    /// Closes a handle returned by [`PhotoFs::open`].
    pub fn release(&self, path: &str, fd: OwnedFd) {
        log::debug!("release({path})");
        drop(fd);
    }

    /// The real file behind `path`, for operations which pass straight through to it.
    fn real_image(
        &self,
        path: &str,
        not_an_image: fn(String) -> FsError,
    ) -> Result<Image, FsError> {
        match self.resolve(path)? {
            Resolved::Image(image) => Ok(image),
            _ => Err(not_an_image(path.to_string())),
        }
    }

    /// Changes the permissions of the real file.  Directories can't be changed.
    pub fn chmod(&self, path: &str, mode: u32) -> Result<(), FsError> {
        let image = self.real_image(path, FsError::ReadOnly)?;
        rustix::fs::chmod(
            image.abspath(),
            Mode::from_raw_mode((mode & 0o7777) as RawMode),
        )?;
        Ok(())
    }

    /// Changes the ownership of the real file.  Directories can't be changed.
    pub fn chown(&self, path: &str, uid: Option<u32>, gid: Option<u32>) -> Result<(), FsError> {
        let image = self.real_image(path, FsError::ReadOnly)?;
        std::os::unix::fs::chown(image.abspath(), uid, gid)?;
        Ok(())
    }

    /// Reads the real file as a symbolic link.  Only meaningful if the library stores images as
    /// links; anything else is `EINVAL`.
    pub fn readlink(&self, path: &str) -> Result<Vec<u8>, FsError> {
        let image = self.real_image(path, FsError::Invalid)?;
        Ok(rustix::fs::readlink(image.abspath(), Vec::new())?.into_bytes())
    }

    /// Whether the attribute cache currently holds an entry for `path`.
    pub fn has_cached_attributes(&self, path: &str) -> bool {
        self.library.cache().contains(CK_ST_BY_PATH, Some(path))
    }

    /// Guesses whether `path` names a directory, from its shape alone.
    pub fn looks_like_dir(path: &str) -> bool {
        VirtualPath::parse(path).is_some_and(|parsed| parsed.is_dir())
    }
}
