use rustix::io::Errno;

/// Why a filesystem operation failed.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// The path doesn't name anything in the library.
    #[error("no such entry: {0}")]
    NotFound(String),
    /// A read arrived for a path that was never opened, or whose open was forgotten when the
    /// cache was flushed.
    #[error("read of {0} without a prior open")]
    ReadWithoutOpen(String),
    /// An attempt to change something that only exists virtually.
    #[error("{0} is read-only")]
    ReadOnly(String),
    /// The operation makes no sense for the path, eg. readlink on a directory.
    #[error("invalid operation on {0}")]
    Invalid(String),
    #[error(transparent)]
    Os(#[from] Errno),
}

impl FsError {
    /// The error number to report to the kernel.
    pub fn errno(&self) -> Errno {
        match self {
            FsError::NotFound(..) => Errno::NOENT,
            FsError::ReadWithoutOpen(..) => Errno::IO,
            FsError::ReadOnly(..) => Errno::ROFS,
            FsError::Invalid(..) => Errno::INVAL,
            FsError::Os(errno) => *errno,
        }
    }
}

impl From<std::io::Error> for FsError {
    fn from(err: std::io::Error) -> Self {
        FsError::Os(Errno::from_io_error(&err).unwrap_or(Errno::IO))
    }
}
