//! The glue between the kernel's inode-based requests and the path-based [`PhotoFs`].

use std::{
    collections::HashMap,
    ffi::OsStr,
    os::fd::{AsFd, OwnedFd},
    time::{Duration, SystemTime},
};

use fuser::{
    FileAttr, FileType, Filesystem, ReplyAttr, ReplyData, ReplyDirectory, ReplyEmpty, ReplyEntry,
    ReplyOpen, Request, TimeOrNow, FUSE_ROOT_ID,
};
use rustix::{
    fs::{Mode, OFlags},
    io::Errno,
};

use crate::{
    error::FsError,
    ops::{Attributes, Context, PhotoFs},
};

const TTL: Duration = Duration::from_secs(1);

/// Hands out inode numbers for virtual paths.  Numbers are never reused, even when the catalog
/// changes and the path disappears.
#[derive(Debug)]
struct Inodes {
    paths: HashMap<u64, String>,
    numbers: HashMap<String, u64>,
    next_ino: u64,
}

impl Inodes {
    fn new() -> Self {
        Self {
            paths: HashMap::from([(FUSE_ROOT_ID, "/".to_string())]),
            numbers: HashMap::from([("/".to_string(), FUSE_ROOT_ID)]),
            next_ino: FUSE_ROOT_ID + 1,
        }
    }

    fn path(&self, ino: u64) -> Option<&str> {
        self.paths.get(&ino).map(String::as_str)
    }

    fn intern(&mut self, path: &str) -> u64 {
        if let Some(ino) = self.numbers.get(path) {
            return *ino;
        }
        let ino = self.next_ino;
        self.next_ino += 1;
        self.paths.insert(ino, path.to_string());
        self.numbers.insert(path.to_string(), ino);
        ino
    }
}

fn child_path(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

fn parent_path(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some(("", _)) | None => "/",
        Some((parent, _)) => parent,
    }
}

fn context(req: &Request<'_>) -> Context {
    Context {
        uid: req.uid(),
        gid: req.gid(),
        pid: req.pid(),
    }
}

fn file_kind(attrs: &Attributes) -> FileType {
    match attrs.file_type() {
        rustix::fs::FileType::Directory => FileType::Directory,
        rustix::fs::FileType::Symlink => FileType::Symlink,
        _ => FileType::RegularFile,
    }
}

fn fileattr(ino: u64, attrs: &Attributes) -> FileAttr {
    FileAttr {
        ino,
        size: attrs.size,
        blocks: attrs.size.div_ceil(512),
        atime: attrs.atime,
        mtime: attrs.mtime,
        ctime: attrs.ctime,
        crtime: attrs.ctime,
        kind: file_kind(attrs),
        perm: attrs.perm(),
        nlink: attrs.nlink as u32,
        uid: attrs.uid,
        gid: attrs.gid,
        rdev: 0,
        blksize: 4096,
        flags: 0,
    }
}

fn raw(err: &FsError) -> i32 {
    err.errno().raw_os_error()
}

/// A [`Filesystem`] serving a photo library.
#[derive(Debug)]
pub struct PhotoFuse {
    fs: PhotoFs,
    inodes: Inodes,
    handles: HashMap<u64, OwnedFd>,
    next_fh: u64,
}

impl PhotoFuse {
    pub fn new(fs: PhotoFs) -> Self {
        Self {
            fs,
            inodes: Inodes::new(),
            handles: HashMap::new(),
            next_fh: 1,
        }
    }

    pub fn photofs(&self) -> &PhotoFs {
        &self.fs
    }

    fn path(&self, ino: u64) -> Option<String> {
        self.inodes.path(ino).map(String::from)
    }

    fn attr_reply(&mut self, req: &Request<'_>, ino: u64, path: &str, reply: ReplyAttr) {
        match self.fs.getattr(path, context(req)) {
            Ok(attrs) => reply.attr(&TTL, &fileattr(ino, &attrs)),
            Err(err) => {
                log::trace!("getattr({path}): {err}");
                reply.error(raw(&err))
            }
        }
    }
}

impl Filesystem for PhotoFuse {
    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: fuser::ReplyStatfs) {
        reply.statfs(0, 0, 0, 0, 0, 4096, 255, 4096);
    }

    fn lookup(&mut self, req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        log::trace!("lookup {parent} {name:?}");
        let Some(parent_path) = self.path(parent) else {
            log::error!("lookup({parent}, {name:?}) parent does not exist");
            return reply.error(Errno::BADF.raw_os_error());
        };
        let Some(name) = name.to_str() else {
            return reply.error(Errno::NOENT.raw_os_error());
        };

        let path = child_path(&parent_path, name);
        match self.fs.getattr(&path, context(req)) {
            Ok(attrs) => {
                let ino = self.inodes.intern(&path);
                reply.entry(&TTL, &fileattr(ino, &attrs), 0)
            }
            Err(err) => reply.error(raw(&err)),
        }
    }

    fn getattr(&mut self, req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        let Some(path) = self.path(ino) else {
            log::error!("getattr({ino}) inode does not exist");
            return reply.error(Errno::BADF.raw_os_error());
        };
        self.attr_reply(req, ino, &path, reply);
    }

    fn setattr(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let Some(path) = self.path(ino) else {
            log::error!("setattr({ino}) inode does not exist");
            return reply.error(Errno::BADF.raw_os_error());
        };

        if size.is_some() {
            return reply.error(Errno::ROFS.raw_os_error());
        }
        if let Some(mode) = mode {
            if let Err(err) = self.fs.chmod(&path, mode) {
                return reply.error(raw(&err));
            }
        }
        if uid.is_some() || gid.is_some() {
            if let Err(err) = self.fs.chown(&path, uid, gid) {
                return reply.error(raw(&err));
            }
        }

        self.attr_reply(req, ino, &path, reply);
    }

    fn readlink(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyData) {
        let Some(path) = self.path(ino) else {
            return reply.error(Errno::INVAL.raw_os_error());
        };

        match self.fs.readlink(&path) {
            Ok(target) => reply.data(&target),
            Err(err) => reply.error(raw(&err)),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let Some(path) = self.path(ino) else {
            log::error!("readdir({ino}) inode does not exist");
            return reply.error(Errno::BADF.raw_os_error());
        };

        let listing = self.fs.readdir(&path);
        if listing.is_empty() {
            let errno = if PhotoFs::looks_like_dir(&path) {
                Errno::NOENT
            } else {
                Errno::NOTDIR
            };
            return reply.error(errno.raw_os_error());
        }

        for (index, name) in listing.iter().enumerate().skip(offset as usize) {
            let (entry_ino, kind) = match name.as_str() {
                "." => (ino, FileType::Directory),
                ".." => (self.inodes.intern(parent_path(&path)), FileType::Directory),
                name => {
                    let child = child_path(&path, name);
                    let kind = if PhotoFs::looks_like_dir(&child) {
                        FileType::Directory
                    } else {
                        FileType::RegularFile
                    };
                    (self.inodes.intern(&child), kind)
                }
            };

            if reply.add(entry_ino, index as i64 + 1, kind, name) {
                break;
            }
        }

        reply.ok();
    }

    fn open(&mut self, req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        log::trace!("open({ino})");
        let Some(path) = self.path(ino) else {
            log::error!("open({ino}) inode does not exist");
            return reply.error(Errno::BADF.raw_os_error());
        };

        let flags = OFlags::from_bits_truncate(flags as _) & !(OFlags::CREATE | OFlags::TRUNC);
        let fd = match self.fs.open(&path, flags, Mode::empty(), context(req)) {
            Ok(Some(fd)) => fd,
            Ok(None) => return reply.error(Errno::NOENT.raw_os_error()),
            Err(err) => return reply.error(raw(&err)),
        };

        let fh = self.next_fh;
        self.next_fh += 1;
        log::debug!("self.handles.insert({fh}, {fd:?}) for {path}");
        self.handles.insert(fh, fd);
        reply.opened(fh, 0);
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let (Some(path), Some(fd)) = (self.inodes.path(ino), self.handles.get(&fh)) else {
            log::error!("Handle doesn't exist: read({ino}, {fh}, {size}, {offset})");
            return reply.error(Errno::BADF.raw_os_error());
        };

        match self.fs.read(path, size as usize, offset as u64, fd.as_fd()) {
            Ok(data) => reply.data(&data),
            Err(err @ FsError::ReadWithoutOpen(..)) => {
                log::error!("{err}");
                reply.error(raw(&err))
            }
            Err(err) => reply.error(raw(&err)),
        }
    }

    fn flush(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        fh: u64,
        _lock_owner: u64,
        reply: ReplyEmpty,
    ) {
        let (Some(path), Some(fd)) = (self.inodes.path(ino), self.handles.get(&fh)) else {
            log::error!("Handle doesn't exist: flush({ino}, {fh})");
            return reply.error(Errno::BADF.raw_os_error());
        };

        match self.fs.flush(path, fd.as_fd()) {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(raw(&err)),
        }
    }

    fn fsync(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        fh: u64,
        datasync: bool,
        reply: ReplyEmpty,
    ) {
        let (Some(path), Some(fd)) = (self.inodes.path(ino), self.handles.get(&fh)) else {
            log::error!("Handle doesn't exist: fsync({ino}, {fh})");
            return reply.error(Errno::BADF.raw_os_error());
        };

        match self.fs.fsync(path, datasync, fd.as_fd()) {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(raw(&err)),
        }
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        match self.handles.remove(&fh) {
            Some(fd) => {
                let path = self.inodes.path(ino).unwrap_or("?");
                self.fs.release(path, fd);
                reply.ok()
            }
            None => {
                log::error!("Handle doesn't exist: close({fh})");
                reply.error(Errno::BADF.raw_os_error())
            }
        }
    }
}
