//! The inode record: the metadata value stored per inode number.

use std::fmt::Write as _;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use bangfs_types::{ChunkKey, InodeId, ROOT_INODE};

use crate::mode;

/// A directory entry: a name bound to a child inode number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildEntry {
    pub name: String,
    pub inode: InodeId,
}

/// Reference to one chunk of a regular file's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRef {
    pub key: ChunkKey,
    pub size: u32,
}

/// The metadata value stored per inode number.
///
/// A file's logical bytes are the concatenation of its chunk values in
/// order, so `size` always equals the sum of the chunk sizes. `children`
/// is present only on directories and `chunks` only on regular files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InodeRecord {
    /// Entry name; empty for the root.
    pub name: String,
    /// Owning directory; the root is its own parent.
    pub parent_inode: InodeId,
    /// POSIX type + permission bits.
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    /// Bytes of file content; 0 for directories.
    #[serde(default)]
    pub size: u64,
    pub nlink: u32,
    pub ctime_ns: i64,
    pub mtime_ns: i64,
    pub atime_ns: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ChildEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks: Option<Vec<ChunkRef>>,
}

impl InodeRecord {
    /// The root directory record written by mkfs.
    pub fn root(now_ns: i64) -> Self {
        Self {
            name: String::new(),
            parent_inode: ROOT_INODE,
            mode: 0o755 | mode::S_IFDIR,
            uid: 0,
            gid: 0,
            size: 0,
            nlink: 2,
            ctime_ns: now_ns,
            mtime_ns: now_ns,
            atime_ns: now_ns,
            children: Some(Vec::new()),
            chunks: None,
        }
    }

    /// A fresh regular-file record with an empty chunk list.
    pub fn new_file(
        name: &str,
        parent: InodeId,
        perm: u32,
        uid: u32,
        gid: u32,
        now_ns: i64,
    ) -> Self {
        Self {
            name: name.to_string(),
            parent_inode: parent,
            mode: perm | mode::S_IFREG,
            uid,
            gid,
            size: 0,
            nlink: 1,
            ctime_ns: now_ns,
            mtime_ns: now_ns,
            atime_ns: now_ns,
            children: None,
            chunks: Some(Vec::new()),
        }
    }

    /// A fresh directory record. nlink starts at 2: the self entry plus
    /// the entry in the parent.
    pub fn new_directory(
        name: &str,
        parent: InodeId,
        perm: u32,
        uid: u32,
        gid: u32,
        now_ns: i64,
    ) -> Self {
        Self {
            name: name.to_string(),
            parent_inode: parent,
            mode: perm | mode::S_IFDIR,
            uid,
            gid,
            size: 0,
            nlink: 2,
            ctime_ns: now_ns,
            mtime_ns: now_ns,
            atime_ns: now_ns,
            children: Some(Vec::new()),
            chunks: None,
        }
    }

    pub fn is_dir(&self) -> bool {
        mode::is_dir(self.mode)
    }

    pub fn is_file(&self) -> bool {
        mode::is_file(self.mode)
    }

    /// The directory's children; empty for non-directories.
    pub fn children(&self) -> &[ChildEntry] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// The file's chunk list; empty for non-files.
    pub fn chunks(&self) -> &[ChunkRef] {
        self.chunks.as_deref().unwrap_or(&[])
    }

    /// Find a child entry by name (case-sensitive byte match).
    pub fn child(&self, name: &str) -> Option<&ChildEntry> {
        self.children().iter().find(|c| c.name == name)
    }

    /// Human-readable dump of all fields, for the command-line tools.
    pub fn dump(&self, inum: InodeId) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "inode {} {:?}", inum, self.name);
        let _ = writeln!(out, "  parent:  {}", self.parent_inode);
        let _ = writeln!(
            out,
            "  mode:    {} (0{:o})",
            mode::format_mode(self.mode),
            self.mode & 0o7777
        );
        let _ = writeln!(out, "  uid/gid: {}/{}", self.uid, self.gid);
        let _ = writeln!(out, "  nlink:   {}", self.nlink);
        let _ = writeln!(out, "  size:    {}", self.size);
        if let Some(children) = &self.children {
            let _ = writeln!(out, "  children: {} entries", children.len());
        }
        if let Some(chunks) = &self.chunks {
            let _ = writeln!(out, "  chunks:  {} entries", chunks.len());
        }
        out
    }
}

/// Nanoseconds since the Unix epoch, for the record's timestamp fields.
pub fn unix_now_ns() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_record() {
        let root = InodeRecord::root(1_000);
        assert!(root.is_dir());
        assert_eq!(root.parent_inode, ROOT_INODE);
        assert_eq!(root.mode, 0o755 | mode::S_IFDIR);
        assert_eq!(root.nlink, 2);
        assert!(root.children().is_empty());
        assert!(root.chunks.is_none());
    }

    #[test]
    fn test_new_file() {
        let rec = InodeRecord::new_file("a.txt", InodeId(7), 0o644, 1000, 100, 42);
        assert!(rec.is_file());
        assert!(!rec.is_dir());
        assert_eq!(rec.parent_inode, InodeId(7));
        assert_eq!(rec.nlink, 1);
        assert_eq!(rec.size, 0);
        assert!(rec.chunks().is_empty());
        assert!(rec.children.is_none());
        assert_eq!(rec.ctime_ns, 42);
    }

    #[test]
    fn test_new_directory() {
        let rec = InodeRecord::new_directory("sub", InodeId(7), 0o755, 0, 0, 42);
        assert!(rec.is_dir());
        assert_eq!(rec.nlink, 2);
        assert!(rec.children().is_empty());
        assert!(rec.chunks.is_none());
    }

    #[test]
    fn test_child_lookup() {
        let mut rec = InodeRecord::new_directory("d", ROOT_INODE, 0o755, 0, 0, 1);
        rec.children.as_mut().unwrap().push(ChildEntry {
            name: "x".into(),
            inode: InodeId(9),
        });
        assert_eq!(rec.child("x").unwrap().inode, InodeId(9));
        assert!(rec.child("X").is_none());
        assert!(rec.child("y").is_none());
    }

    #[test]
    fn test_serde_roundtrip() {
        let mut rec = InodeRecord::new_file("f", ROOT_INODE, 0o600, 1, 2, 3);
        rec.size = 10;
        rec.chunks = Some(vec![
            ChunkRef {
                key: ChunkKey(0xAB),
                size: 4,
            },
            ChunkRef {
                key: ChunkKey(0xCD),
                size: 6,
            },
        ]);
        let bytes = serde_json::to_vec(&rec).unwrap();
        let back: InodeRecord = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn test_serde_omits_absent_shapes() {
        let file = InodeRecord::new_file("f", ROOT_INODE, 0o644, 0, 0, 0);
        let json = serde_json::to_string(&file).unwrap();
        assert!(!json.contains("children"));
        assert!(json.contains("chunks"));

        let dir = InodeRecord::new_directory("d", ROOT_INODE, 0o755, 0, 0, 0);
        let json = serde_json::to_string(&dir).unwrap();
        assert!(json.contains("children"));
        assert!(!json.contains("chunks"));
    }

    #[test]
    fn test_dump_contains_fields() {
        let rec = InodeRecord::new_file("f.txt", ROOT_INODE, 0o644, 1000, 1000, 0);
        let dump = rec.dump(InodeId(5));
        assert!(dump.contains("inode 5"));
        assert!(dump.contains("-rw-r--r--"));
        assert!(dump.contains("uid/gid: 1000/1000"));
    }
}
