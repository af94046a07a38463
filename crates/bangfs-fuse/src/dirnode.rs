//! Directory operations: readdir, lookup, create, mkdir, unlink, rmdir.
//!
//! Every mutation follows the same shape: fetch the acting record plus its
//! version token, mutate an in-memory copy, commit with one CAS. A
//! conflict is surfaced as an I/O failure; nothing is retried.

use std::sync::Arc;

use tracing::{debug, warn};

use bangfs_meta::{mode, unix_now_ns, AttrOut, ChildEntry, InodeRecord};
use bangfs_types::{FsError, InodeId, Result};

use crate::filenode::FileNode;
use crate::handle::FileHandle;
use crate::server::BangFs;
use crate::types::{DirEntry, OpenFlags, RequestContext, SetAttrIn};

/// A child resolved by lookup, shaped by its mode bits.
#[derive(Debug)]
pub enum Node {
    Dir(DirNode),
    File(FileNode),
}

impl Node {
    pub fn ino(&self) -> InodeId {
        match self {
            Node::Dir(d) => d.ino(),
            Node::File(f) => f.ino(),
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Node::Dir(_))
    }
}

/// Operations on a directory inode. Directories also answer the common
/// inode operations (getattr, setattr) through the embedded [`FileNode`].
#[derive(Clone)]
pub struct DirNode {
    inner: FileNode,
}

impl DirNode {
    pub(crate) fn new(fs: Arc<BangFs>, ino: InodeId) -> Self {
        Self {
            inner: FileNode::new(fs, ino),
        }
    }

    pub fn ino(&self) -> InodeId {
        self.inner.ino()
    }

    pub async fn getattr(&self) -> Result<AttrOut> {
        self.inner.getattr().await
    }

    pub async fn setattr(&self, attrs: &SetAttrIn) -> Result<AttrOut> {
        self.inner.setattr(attrs).await
    }

    fn fs(&self) -> &Arc<BangFs> {
        self.inner.fs()
    }

    async fn fetch(&self) -> Result<(InodeRecord, bangfs_types::VersionToken)> {
        self.fs().kv().get_metadata(self.ino()).await
    }

    /// List the directory: `.` and `..` first (the kernel does not add
    /// them), then every child. A child whose record cannot be fetched is
    /// logged and skipped; the listing itself never fails for that.
    pub async fn readdir(&self) -> Result<Vec<DirEntry>> {
        let ino = self.ino();
        debug!(ino = %ino, "readdir");

        let (record, _) = self.fetch().await?;
        if !record.is_dir() {
            return Err(FsError::InvalidArgument(format!(
                "inode {ino} is not a directory (mode {:o})",
                record.mode
            )));
        }

        let mut entries = vec![
            DirEntry {
                ino: *ino,
                name: ".".into(),
                mode: record.mode,
            },
            DirEntry {
                ino: *record.parent_inode,
                name: "..".into(),
                mode: mode::S_IFDIR,
            },
        ];
        for child in record.children() {
            let child_record = match self.fs().kv().get_metadata(child.inode).await {
                Ok((rec, _)) => rec,
                Err(e) => {
                    warn!(ino = %ino, child = %child.inode, error = %e, "skipping unreadable child");
                    continue;
                }
            };
            entries.push(DirEntry {
                ino: *child.inode,
                name: child_record.name,
                mode: child_record.mode,
            });
        }

        Ok(entries)
    }

    /// Resolve a child by name, yielding a node of the matching kind.
    pub async fn lookup(&self, name: &str) -> Result<Node> {
        let ino = self.ino();
        debug!(ino = %ino, name, "lookup");

        let (record, _) = self.fetch().await?;
        let child = record
            .child(name)
            .ok_or_else(|| FsError::NotFound(format!("no entry {name:?} in inode {ino}")))?;

        let (child_record, _) = self.fs().kv().get_metadata(child.inode).await?;
        if child_record.is_dir() {
            Ok(Node::Dir(DirNode::new(Arc::clone(self.fs()), child.inode)))
        } else if child_record.is_file() {
            Ok(Node::File(FileNode::new(Arc::clone(self.fs()), child.inode)))
        } else {
            Err(FsError::Unsupported(format!(
                "inode {} is neither file nor directory",
                child.inode
            )))
        }
    }

    /// Create a regular file and return its node together with an open
    /// handle pre-populated with the fresh record and token.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        name: &str,
        flags: i32,
        perm: u32,
    ) -> Result<(FileNode, FileHandle)> {
        let ino = self.ino();
        debug!(ino = %ino, name, flags, perm, "create");

        let (mut dir_record, dir_token) = self.fetch().await?;
        if dir_record.child(name).is_some() {
            return Err(FsError::Exists(format!("entry {name:?} in inode {ino}")));
        }

        let now = unix_now_ns();
        let new_ino = self.fs().next_inode_id();
        let child = InodeRecord::new_file(name, ino, perm, *ctx.uid, *ctx.gid, now);
        let child_token = self
            .fs()
            .kv()
            .put_metadata(new_ino, &child)
            .await
            .map_err(|e| FsError::Io(format!("storing new file metadata: {e}")))?;

        // A conflict here orphans the child record written above.
        dir_record
            .children
            .get_or_insert_with(Vec::new)
            .push(ChildEntry {
                name: name.to_string(),
                inode: new_ino,
            });
        dir_record.mtime_ns = now;
        dir_record.ctime_ns = now;
        self.fs()
            .kv()
            .update_metadata(ino, &dir_record, &dir_token)
            .await
            .map_err(|e| FsError::Io(format!("updating parent directory: {e}")))?;

        let node = FileNode::new(Arc::clone(self.fs()), new_ino);
        let handle = FileHandle::new(
            Arc::clone(self.fs()),
            new_ino,
            OpenFlags::from_raw(flags),
            child,
            child_token,
        );
        Ok((node, handle))
    }

    /// Create a subdirectory. The parent gains a link: the new child's
    /// `..` points back at it.
    pub async fn mkdir(&self, ctx: &RequestContext, name: &str, perm: u32) -> Result<DirNode> {
        let ino = self.ino();
        debug!(ino = %ino, name, perm, "mkdir");

        let (mut dir_record, dir_token) = self.fetch().await?;
        if dir_record.child(name).is_some() {
            return Err(FsError::Exists(format!("entry {name:?} in inode {ino}")));
        }

        let now = unix_now_ns();
        let new_ino = self.fs().next_inode_id();
        let child = InodeRecord::new_directory(name, ino, perm, *ctx.uid, *ctx.gid, now);
        self.fs()
            .kv()
            .put_metadata(new_ino, &child)
            .await
            .map_err(|e| FsError::Io(format!("storing new directory metadata: {e}")))?;

        dir_record
            .children
            .get_or_insert_with(Vec::new)
            .push(ChildEntry {
                name: name.to_string(),
                inode: new_ino,
            });
        dir_record.mtime_ns = now;
        dir_record.ctime_ns = now;
        dir_record.nlink += 1;
        self.fs()
            .kv()
            .update_metadata(ino, &dir_record, &dir_token)
            .await
            .map_err(|e| FsError::Io(format!("updating parent directory: {e}")))?;

        Ok(DirNode::new(Arc::clone(self.fs()), new_ino))
    }

    /// Remove a file entry, then its chunks, then its metadata record.
    pub async fn unlink(&self, name: &str) -> Result<()> {
        let ino = self.ino();
        debug!(ino = %ino, name, "unlink");

        let (mut dir_record, dir_token) = self.fetch().await?;
        let children = dir_record.children.get_or_insert_with(Vec::new);
        let position = children
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| FsError::NotFound(format!("no entry {name:?} in inode {ino}")))?;
        let child_ino = children.remove(position).inode;

        self.fs()
            .kv()
            .update_metadata(ino, &dir_record, &dir_token)
            .await
            .map_err(|e| FsError::Io(format!("updating parent directory: {e}")))?;

        // The entry is gone from the committed parent; the child record is
        // now unreferenced.
        let (child_record, child_token) = self
            .fs()
            .kv()
            .get_metadata(child_ino)
            .await
            .map_err(|e| FsError::Io(format!("fetching unlinked file metadata: {e}")))?;

        for chunk in child_record.chunks() {
            if let Err(e) = self.fs().kv().delete_chunk(chunk.key).await {
                warn!(ino = %child_ino, chunk = %chunk.key.hex(), error = %e, "failed to delete chunk");
            }
        }

        if let Err(e) = self
            .fs()
            .kv()
            .delete_metadata(child_ino, Some(&child_token))
            .await
        {
            warn!(ino = %child_ino, error = %e, "failed to delete unlinked file metadata");
        }

        Ok(())
    }

    /// Remove an empty subdirectory and drop the parent's extra link.
    pub async fn rmdir(&self, name: &str) -> Result<()> {
        let ino = self.ino();
        debug!(ino = %ino, name, "rmdir");

        let (mut dir_record, dir_token) = self.fetch().await?;
        let children = dir_record.children.get_or_insert_with(Vec::new);
        let position = children
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| FsError::NotFound(format!("no entry {name:?} in inode {ino}")))?;
        let child_ino = children[position].inode;

        let (child_record, child_token) = self
            .fs()
            .kv()
            .get_metadata(child_ino)
            .await
            .map_err(|e| FsError::Io(format!("fetching child directory metadata: {e}")))?;
        if !child_record.children().is_empty() {
            return Err(FsError::NotEmpty(format!(
                "directory {name:?} (inode {child_ino})"
            )));
        }

        children.remove(position);
        dir_record.nlink -= 1;
        self.fs()
            .kv()
            .update_metadata(ino, &dir_record, &dir_token)
            .await
            .map_err(|e| FsError::Io(format!("updating parent directory: {e}")))?;

        if let Err(e) = self
            .fs()
            .kv()
            .delete_metadata(child_ino, Some(&child_token))
            .await
        {
            warn!(ino = %child_ino, error = %e, "failed to delete child directory metadata");
        }

        Ok(())
    }
}

impl std::fmt::Debug for DirNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DirNode({})", self.ino())
    }
}
