use thiserror::Error;

/// The standard result type used throughout BangFS.
pub type Result<T> = std::result::Result<T, FsError>;

/// Error kinds surfaced by the backends and the node operations.
///
/// Errors are surfaced to the caller immediately; no retries are attempted
/// anywhere in the core. A CAS `Conflict` observed inside a mutating
/// operation is reported to the host bridge as an I/O failure.
#[derive(Debug, Clone, Error)]
pub enum FsError {
    /// A key or a directory child is missing.
    #[error("not found: {0}")]
    NotFound(String),

    /// Name collision on create/mkdir, or an insert-only metadata write
    /// against an existing key.
    #[error("already exists: {0}")]
    Exists(String),

    /// Version-token mismatch on a conditional metadata write or delete.
    #[error("version conflict: {0}")]
    Conflict(String),

    /// rmdir on a directory that still has children.
    #[error("directory not empty: {0}")]
    NotEmpty(String),

    /// Feature explicitly rejected (chown, extending truncate, ...).
    #[error("not supported: {0}")]
    Unsupported(String),

    /// Operating on a wrong-type inode.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Marshalling failure, transport failure, malformed stored record,
    /// or a conflict observed mid-mutation.
    #[error("i/o failure: {0}")]
    Io(String),
}

impl FsError {
    /// The POSIX errno the host bridge reports for this error.
    pub fn errno(&self) -> i32 {
        match self {
            FsError::NotFound(_) => libc::ENOENT,
            FsError::Exists(_) => libc::EEXIST,
            FsError::Conflict(_) => libc::EIO,
            FsError::NotEmpty(_) => libc::ENOTEMPTY,
            FsError::Unsupported(_) => libc::ENOTSUP,
            FsError::InvalidArgument(_) => libc::EINVAL,
            FsError::Io(_) => libc::EIO,
        }
    }
}

impl From<std::io::Error> for FsError {
    fn from(err: std::io::Error) -> Self {
        FsError::Io(err.to_string())
    }
}
