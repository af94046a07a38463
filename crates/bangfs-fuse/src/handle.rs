//! The open-file handle and its chunked I/O engine.
//!
//! A file's bytes are the concatenation of its chunk values in order.
//! Every chunk except the last is exactly the configured chunk size, which
//! lets the write path locate a chunk by arithmetic instead of a
//! prefix-sum scan. Chunk identity is per-write: overwriting any part of a
//! logical chunk stores the new bytes under a fresh key and repoints the
//! record, so a failed metadata commit can orphan chunk values but can
//! never leave committed metadata referencing missing ones.

use std::sync::Arc;

use tracing::debug;

use bangfs_meta::{ChunkRef, InodeRecord};
use bangfs_types::{FsError, InodeId, Result, VersionToken};

use crate::server::BangFs;
use crate::types::OpenFlags;

/// An open file: the inode number, the open flags, and a private copy of
/// the record plus the version token it was read under.
pub struct FileHandle {
    fs: Arc<BangFs>,
    ino: InodeId,
    flags: OpenFlags,
    record: InodeRecord,
    token: VersionToken,
}

impl FileHandle {
    pub(crate) fn new(
        fs: Arc<BangFs>,
        ino: InodeId,
        flags: OpenFlags,
        record: InodeRecord,
        token: VersionToken,
    ) -> Self {
        Self {
            fs,
            ino,
            flags,
            record,
            token,
        }
    }

    pub fn ino(&self) -> InodeId {
        self.ino
    }

    pub fn flags(&self) -> OpenFlags {
        self.flags
    }

    /// Re-read the record: a concurrent setattr (e.g. O_TRUNC) may have
    /// changed it since the handle was opened.
    async fn resync(&mut self) -> Result<()> {
        let (record, token) = self.fs.kv().get_metadata(self.ino).await?;
        self.record = record;
        self.token = token;
        Ok(())
    }

    /// Commit the record via CAS and keep the fresh token. On failure the
    /// token is left untouched; the local record is stale until the next
    /// resync.
    async fn write_meta(&mut self) -> Result<()> {
        let token = self
            .fs
            .kv()
            .update_metadata(self.ino, &self.record, &self.token)
            .await?;
        self.token = token;
        Ok(())
    }

    async fn read_chunk(&self, idx: usize) -> Result<Vec<u8>> {
        let chunks = self.record.chunks();
        let chunk = chunks.get(idx).ok_or_else(|| {
            FsError::Io(format!(
                "chunk index {idx} out of range ({} chunks)",
                chunks.len()
            ))
        })?;
        self.fs.kv().get_chunk(chunk.key).await
    }

    /// Store `data` under a fresh key and repoint chunk `idx` at it.
    /// The previous key is left behind for a later sweep.
    async fn replace_chunk(&mut self, idx: usize, data: &[u8]) -> Result<()> {
        if idx >= self.record.chunks().len() {
            return Err(FsError::Io(format!(
                "chunk index {idx} out of range ({} chunks)",
                self.record.chunks().len()
            )));
        }
        let key = self.fs.next_chunk_key();
        self.fs.kv().put_chunk(key, data).await?;
        let chunks = self.record.chunks.get_or_insert_with(Vec::new);
        chunks[idx] = ChunkRef {
            key,
            size: data.len() as u32,
        };
        Ok(())
    }

    /// Store `data` as a new trailing chunk; the metadata commit is
    /// deferred to the caller.
    async fn append_chunk(&mut self, data: &[u8]) -> Result<()> {
        let key = self.fs.next_chunk_key();
        self.fs.kv().put_chunk(key, data).await?;
        self.record
            .chunks
            .get_or_insert_with(Vec::new)
            .push(ChunkRef {
                key,
                size: data.len() as u32,
            });
        Ok(())
    }

    /// Splice `data` into the file at `off`, replacing existing chunks and
    /// appending new ones as needed.
    async fn write_at(&mut self, data: &[u8], off: u64) -> Result<()> {
        let chunk_size = self.fs.chunk_size() as usize;
        let mut pos = off;
        let mut data_pos = 0usize;

        while data_pos < data.len() {
            let chunk_idx = (pos / chunk_size as u64) as usize;
            let offset_in_chunk = (pos % chunk_size as u64) as usize;
            let remaining = data.len() - data_pos;

            if chunk_idx < self.record.chunks().len() {
                // Overwrite within an existing chunk.
                let mut existing = self.read_chunk(chunk_idx).await?;
                // Grow the buffer if the write runs past its current end;
                // only the last chunk may be shorter than the chunk size.
                if offset_in_chunk + remaining > existing.len() && existing.len() < chunk_size {
                    existing.resize(chunk_size.min(offset_in_chunk + remaining), 0);
                }
                let n = (existing.len() - offset_in_chunk).min(remaining);
                existing[offset_in_chunk..offset_in_chunk + n]
                    .copy_from_slice(&data[data_pos..data_pos + n]);
                data_pos += n;
                pos += n as u64;
                self.replace_chunk(chunk_idx, &existing).await?;
            } else {
                // Past the last chunk: append up to one chunk's worth.
                let n = remaining.min(chunk_size);
                self.append_chunk(&data[data_pos..data_pos + n]).await?;
                data_pos += n;
                pos += n as u64;
            }
        }

        Ok(())
    }

    /// Write at the given offset and return the number of bytes written.
    /// Handles append mode, overwrite, and write-past-EOF (zero-filling
    /// the gap). The chunk puts all precede the single metadata CAS; a
    /// conflict there orphans the fresh chunks and surfaces as an I/O
    /// failure.
    pub async fn write(&mut self, data: &[u8], off: u64) -> Result<u32> {
        debug!(ino = %self.ino, len = data.len(), off, "write");

        self.resync()
            .await
            .map_err(|e| FsError::Io(format!("resyncing metadata before write: {e}")))?;

        let mut off = off;
        if self.flags.append {
            off = self.record.size;
        }
        let write_end = off + data.len() as u64;

        if off > self.record.size {
            let gap = vec![0u8; (off - self.record.size) as usize];
            let gap_start = self.record.size;
            self.write_at(&gap, gap_start)
                .await
                .map_err(|e| FsError::Io(format!("zero-filling gap: {e}")))?;
        }

        self.write_at(data, off)
            .await
            .map_err(|e| FsError::Io(format!("writing chunks: {e}")))?;

        if write_end > self.record.size {
            self.record.size = write_end;
        }

        self.write_meta()
            .await
            .map_err(|e| FsError::Io(format!("committing metadata after write: {e}")))?;

        Ok(data.len() as u32)
    }

    /// Read up to `size` bytes at `off`, clamped to the current file size.
    pub async fn read(&mut self, size: u32, off: u64) -> Result<Vec<u8>> {
        debug!(ino = %self.ino, size, off, "read");

        // A concurrent truncate may have shrunk the file.
        self.resync().await?;

        let filesize = self.record.size;
        if off >= filesize {
            return Ok(Vec::new());
        }
        let end = (off + size as u64).min(filesize);

        let mut buf = Vec::with_capacity((end - off) as usize);
        let num_chunks = self.record.chunks().len();
        let mut chunk_off: u64 = 0;

        for idx in 0..num_chunks {
            let chunk = self.record.chunks()[idx];
            let chunk_end = chunk_off + chunk.size as u64;

            if chunk_end <= off {
                chunk_off = chunk_end;
                continue;
            }
            if chunk_off >= end {
                break;
            }

            let data = self
                .read_chunk(idx)
                .await
                .map_err(|e| FsError::Io(format!("fetching chunk {idx}: {e}")))?;

            let start = off.saturating_sub(chunk_off) as usize;
            let stop = if end < chunk_end {
                (end - chunk_off) as usize
            } else {
                chunk.size as usize
            };
            buf.extend_from_slice(&data[start..stop]);
            chunk_off = chunk_end;
        }

        Ok(buf)
    }
}

impl std::fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "FileHandle{{ino={} name={:?} flags={:?}}}",
            self.ino, self.record.name, self.flags
        )
    }
}
