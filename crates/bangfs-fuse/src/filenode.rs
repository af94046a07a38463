//! Inode operations shared by files and directories: getattr, setattr
//! (including shrink-only truncate), and open.

use std::sync::Arc;

use tracing::{debug, warn};

use bangfs_meta::{mode, project_attrs, AttrOut, ChunkRef, InodeRecord};
use bangfs_types::{ChunkKey, FsError, InodeId, Result};

use crate::handle::FileHandle;
use crate::server::BangFs;
use crate::types::{OpenFlags, SetAttrIn};

/// Operations on a single inode. Every operation derives its state from
/// the stable inode number and fetches the record (plus version token)
/// fresh from the backend; nothing is cached across operations.
#[derive(Clone)]
pub struct FileNode {
    fs: Arc<BangFs>,
    ino: InodeId,
}

impl FileNode {
    pub(crate) fn new(fs: Arc<BangFs>, ino: InodeId) -> Self {
        Self { fs, ino }
    }

    pub fn ino(&self) -> InodeId {
        self.ino
    }

    pub(crate) fn fs(&self) -> &Arc<BangFs> {
        &self.fs
    }

    /// Fetch the record and project its attributes.
    pub async fn getattr(&self) -> Result<AttrOut> {
        debug!(ino = %self.ino, "getattr");
        let (record, _) = self.fs.kv().get_metadata(self.ino).await?;
        Ok(project_attrs(self.ino, &record))
    }

    /// Apply the fields the kernel marked as set, then commit with a
    /// single CAS. Ownership changes are rejected wholesale; truncate only
    /// shrinks. Stale chunks produced by a truncate are deleted after the
    /// commit succeeds, never before.
    pub async fn setattr(&self, attrs: &SetAttrIn) -> Result<AttrOut> {
        debug!(ino = %self.ino, ?attrs, "setattr");

        let (mut record, token) = self.fs.kv().get_metadata(self.ino).await?;

        if attrs.uid.is_some() || attrs.gid.is_some() {
            return Err(FsError::Unsupported("changing uid/gid".into()));
        }

        let mut stale_chunks: Vec<ChunkKey> = Vec::new();
        if let Some(new_size) = attrs.size {
            if !record.is_file() {
                return Err(FsError::Unsupported("truncate on non-file".into()));
            }
            if new_size > record.size {
                return Err(FsError::Unsupported("extending a file via truncate".into()));
            }
            self.truncate_chunks(&mut record, new_size, &mut stale_chunks)
                .await?;
        }

        if let Some(new_mode) = attrs.mode {
            record.mode = mode::chmod(record.mode, new_mode);
        }
        if let Some(mtime_ns) = attrs.mtime_ns {
            record.mtime_ns = mtime_ns;
        }
        if let Some(atime_ns) = attrs.atime_ns {
            record.atime_ns = atime_ns;
        }

        // On conflict the freshly written truncated chunk is orphaned.
        self.fs
            .kv()
            .update_metadata(self.ino, &record, &token)
            .await
            .map_err(|e| FsError::Io(format!("committing attributes: {e}")))?;

        for key in stale_chunks {
            if let Err(e) = self.fs.kv().delete_chunk(key).await {
                warn!(ino = %self.ino, chunk = %key.hex(), error = %e, "failed to delete stale chunk");
            }
        }

        Ok(project_attrs(self.ino, &record))
    }

    /// Shrink the chunk list to `new_size` bytes. Dropped chunk keys (and
    /// the replaced last chunk, when the new EOF falls mid-chunk) are
    /// collected into `stale_chunks` for deletion after the metadata
    /// commit.
    async fn truncate_chunks(
        &self,
        record: &mut InodeRecord,
        new_size: u64,
        stale_chunks: &mut Vec<ChunkKey>,
    ) -> Result<()> {
        let chunks = record.chunks().to_vec();

        // Walk until the cumulative size covers the new EOF.
        let mut cumulative: u64 = 0;
        let mut keep = 0;
        while keep < chunks.len() {
            cumulative += chunks[keep].size as u64;
            keep += 1;
            if cumulative >= new_size {
                break;
            }
        }

        for chunk in &chunks[keep..] {
            stale_chunks.push(chunk.key);
        }

        if new_size == 0 {
            record.chunks = Some(Vec::new());
        } else if keep > 0 {
            let mut kept = chunks[..keep].to_vec();
            let last = keep - 1;
            let chunk_start = cumulative - chunks[last].size as u64;
            let last_new_size = (new_size - chunk_start) as u32;
            if last_new_size < chunks[last].size {
                // The new EOF falls inside the last kept chunk: rewrite it
                // shortened under a fresh key.
                let data = self
                    .fs
                    .kv()
                    .get_chunk(chunks[last].key)
                    .await
                    .map_err(|e| FsError::Io(format!("reading chunk for truncate: {e}")))?;
                let key = self.fs.next_chunk_key();
                self.fs
                    .kv()
                    .put_chunk(key, &data[..last_new_size as usize])
                    .await
                    .map_err(|e| FsError::Io(format!("writing truncated chunk: {e}")))?;
                stale_chunks.push(chunks[last].key);
                kept[last] = ChunkRef {
                    key,
                    size: last_new_size,
                };
            }
            record.chunks = Some(kept);
        }

        record.size = new_size;
        Ok(())
    }

    /// Open the file, returning a handle pre-populated with the current
    /// record and version token.
    pub async fn open(&self, flags: i32) -> Result<FileHandle> {
        debug!(ino = %self.ino, flags, "open");
        let (record, token) = self.fs.kv().get_metadata(self.ino).await?;
        Ok(FileHandle::new(
            Arc::clone(&self.fs),
            self.ino,
            OpenFlags::from_raw(flags),
            record,
            token,
        ))
    }
}

impl std::fmt::Debug for FileNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FileNode({})", self.ino)
    }
}
