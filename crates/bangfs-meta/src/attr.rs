//! Projection of an inode record into kernel-facing attributes.

use bangfs_types::InodeId;

use crate::record::InodeRecord;

/// Attributes handed back to the host bridge for getattr/setattr replies.
///
/// Each nanosecond timestamp in the record is split into whole seconds and
/// a nanosecond remainder, the shape the kernel expects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttrOut {
    pub ino: u64,
    pub mode: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub atime: i64,
    pub atime_nsec: u32,
    pub mtime: i64,
    pub mtime_nsec: u32,
    pub ctime: i64,
    pub ctime_nsec: u32,
}

const NS_PER_SEC: i64 = 1_000_000_000;

/// Fill kernel-facing attributes from a record. The inode number is passed
/// separately because it is the KV key, not a stored field.
pub fn project_attrs(inum: InodeId, rec: &InodeRecord) -> AttrOut {
    AttrOut {
        ino: *inum,
        mode: rec.mode,
        nlink: rec.nlink,
        uid: rec.uid,
        gid: rec.gid,
        size: rec.size,
        atime: rec.atime_ns / NS_PER_SEC,
        atime_nsec: (rec.atime_ns % NS_PER_SEC) as u32,
        mtime: rec.mtime_ns / NS_PER_SEC,
        mtime_nsec: (rec.mtime_ns % NS_PER_SEC) as u32,
        ctime: rec.ctime_ns / NS_PER_SEC,
        ctime_nsec: (rec.ctime_ns % NS_PER_SEC) as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bangfs_types::ROOT_INODE;

    #[test]
    fn test_projection_splits_timestamps() {
        let mut rec = InodeRecord::new_file("f", ROOT_INODE, 0o644, 10, 20, 0);
        rec.atime_ns = 1_500_000_000; // 1s + 500ms
        rec.mtime_ns = 2_000_000_001;
        rec.ctime_ns = 3 * 1_000_000_000;
        rec.size = 99;

        let attr = project_attrs(InodeId(42), &rec);
        assert_eq!(attr.ino, 42);
        assert_eq!(attr.size, 99);
        assert_eq!(attr.uid, 10);
        assert_eq!(attr.gid, 20);
        assert_eq!(attr.nlink, 1);
        assert_eq!((attr.atime, attr.atime_nsec), (1, 500_000_000));
        assert_eq!((attr.mtime, attr.mtime_nsec), (2, 1));
        assert_eq!((attr.ctime, attr.ctime_nsec), (3, 0));
    }

    #[test]
    fn test_projection_keeps_mode_bits() {
        let rec = InodeRecord::new_directory("d", ROOT_INODE, 0o700, 0, 0, 0);
        let attr = project_attrs(InodeId(1), &rec);
        assert_eq!(attr.mode, rec.mode);
        assert_eq!(attr.nlink, 2);
    }
}
