//! Structures exchanged with the host kernel bridge.
//!
//! These mirror the FUSE protocol shapes the bridge consumes without
//! depending on any concrete kernel binding.

use bangfs_types::{Gid, Uid};

/// Context of the process issuing a filesystem request.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext {
    pub uid: Uid,
    pub gid: Gid,
}

/// A single directory entry returned by readdir.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub ino: u64,
    pub name: String,
    pub mode: u32,
}

/// The attribute fields a setattr request marked as set.
///
/// Times arrive as nanoseconds since the epoch, matching the record's
/// timestamp fields; the bridge converts from the kernel's timespec.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetAttrIn {
    pub mode: Option<u32>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub size: Option<u64>,
    pub atime_ns: Option<i64>,
    pub mtime_ns: Option<i64>,
}

/// Parsed POSIX open flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenFlags {
    pub read_only: bool,
    pub write_only: bool,
    pub read_write: bool,
    pub create: bool,
    pub exclusive: bool,
    pub truncate: bool,
    pub append: bool,
}

impl OpenFlags {
    /// Parse raw POSIX open flags into structured form.
    pub fn from_raw(flags: i32) -> Self {
        let access_mode = flags & libc::O_ACCMODE;
        Self {
            read_only: access_mode == libc::O_RDONLY,
            write_only: access_mode == libc::O_WRONLY,
            read_write: access_mode == libc::O_RDWR,
            create: flags & libc::O_CREAT != 0,
            exclusive: flags & libc::O_EXCL != 0,
            truncate: flags & libc::O_TRUNC != 0,
            append: flags & libc::O_APPEND != 0,
        }
    }

    /// Whether the file is opened for writing.
    pub fn is_writable(&self) -> bool {
        self.write_only || self.read_write
    }

    /// Convert back to raw POSIX flags.
    pub fn to_raw(&self) -> i32 {
        let mut flags = if self.read_write {
            libc::O_RDWR
        } else if self.write_only {
            libc::O_WRONLY
        } else {
            libc::O_RDONLY
        };
        if self.create {
            flags |= libc::O_CREAT;
        }
        if self.exclusive {
            flags |= libc::O_EXCL;
        }
        if self.truncate {
            flags |= libc::O_TRUNC;
        }
        if self.append {
            flags |= libc::O_APPEND;
        }
        flags
    }
}
