//! Filesystem-backed reference implementation of [`KvStore`].
//!
//! Layout under a namespaced directory:
//!
//! ```text
//! /tmp/bangfs_<namespace>/metadata/<inode>          JSON-encoded record
//! /tmp/bangfs_<namespace>/metadata/<inode>.vclock   8-byte LE version counter
//! /tmp/bangfs_<namespace>/chunks/<16-hex-key>       raw chunk bytes
//! ```
//!
//! Compare-and-swap is emulated with the counter file: an update reads the
//! counter, rejects on mismatch with the caller's token, then writes the
//! record and increments the counter.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{info, warn};

use bangfs_meta::InodeRecord;
use bangfs_types::{ChunkKey, FsError, InodeId, Result, VersionToken};

use crate::KvStore;

/// Wipe refuses to operate on directories outside this prefix.
const WIPE_PREFIX: &str = "/tmp/";

/// [`KvStore`] backed by flat files, for tests and single-host use.
#[derive(Debug)]
pub struct FileKvStore {
    base_dir: PathBuf,
    metadata_dir: PathBuf,
    chunk_dir: PathBuf,
}

impl FileKvStore {
    /// Open (creating if needed) the store for a namespace under `/tmp`.
    pub async fn new(namespace: &str) -> Result<Self> {
        Self::with_base_dir(Path::new("/tmp").join(format!("bangfs_{namespace}"))).await
    }

    /// Open a store rooted at an explicit directory.
    pub async fn with_base_dir(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        let store = Self {
            metadata_dir: base_dir.join("metadata"),
            chunk_dir: base_dir.join("chunks"),
            base_dir,
        };
        fs::create_dir_all(&store.metadata_dir).await?;
        fs::create_dir_all(&store.chunk_dir).await?;
        Ok(store)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn meta_path(&self, key: InodeId) -> PathBuf {
        self.metadata_dir.join(key.to_string())
    }

    fn vclock_path(&self, key: InodeId) -> PathBuf {
        self.metadata_dir.join(format!("{key}.vclock"))
    }

    fn chunk_path(&self, key: ChunkKey) -> PathBuf {
        self.chunk_dir.join(key.hex())
    }

    async fn read_vclock(&self, key: InodeId) -> Result<Vec<u8>> {
        match fs::read(self.vclock_path(key)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(FsError::NotFound(format!("no version counter for key {key}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Increment the version counter and return the new token.
    async fn bump_vclock(&self, key: InodeId) -> Result<VersionToken> {
        let mut version: u64 = 1;
        if let Ok(old) = self.read_vclock(key).await {
            if let Ok(bytes) = <[u8; 8]>::try_from(old.as_slice()) {
                version = u64::from_le_bytes(bytes) + 1;
            }
        }
        let bytes = version.to_le_bytes().to_vec();
        fs::write(self.vclock_path(key), &bytes).await?;
        Ok(VersionToken::new(bytes))
    }

    fn encode(record: &InodeRecord) -> Result<Vec<u8>> {
        serde_json::to_vec(record)
            .map_err(|e| FsError::Io(format!("failed to encode metadata record: {e}")))
    }
}

#[async_trait]
impl KvStore for FileKvStore {
    async fn put_metadata(&self, key: InodeId, record: &InodeRecord) -> Result<VersionToken> {
        if fs::try_exists(self.meta_path(key)).await? {
            return Err(FsError::Exists(format!("metadata key {key} already exists")));
        }
        let data = Self::encode(record)?;
        fs::write(self.meta_path(key), &data).await?;
        self.bump_vclock(key).await
    }

    async fn get_metadata(&self, key: InodeId) -> Result<(InodeRecord, VersionToken)> {
        let data = match fs::read(self.meta_path(key)).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(FsError::NotFound(format!("metadata key {key}")))
            }
            Err(e) => return Err(e.into()),
        };
        let record: InodeRecord = serde_json::from_slice(&data)
            .map_err(|e| FsError::Io(format!("malformed metadata record {key}: {e}")))?;
        let vclock = self.read_vclock(key).await?;
        Ok((record, VersionToken::new(vclock)))
    }

    async fn update_metadata(
        &self,
        key: InodeId,
        record: &InodeRecord,
        token: &VersionToken,
    ) -> Result<VersionToken> {
        let current = self.read_vclock(key).await?;
        if token.as_bytes() != current.as_slice() {
            return Err(FsError::Conflict(format!(
                "version mismatch on key {key} (concurrent modification)"
            )));
        }
        let data = Self::encode(record)?;
        fs::write(self.meta_path(key), &data).await?;
        self.bump_vclock(key).await
    }

    async fn delete_metadata(&self, key: InodeId, token: Option<&VersionToken>) -> Result<()> {
        if let Some(token) = token {
            let current = self.read_vclock(key).await?;
            if token.as_bytes() != current.as_slice() {
                return Err(FsError::Conflict(format!(
                    "version mismatch deleting key {key} (concurrent modification)"
                )));
            }
        }
        if let Err(e) = fs::remove_file(self.vclock_path(key)).await {
            if e.kind() != ErrorKind::NotFound {
                return Err(e.into());
            }
        }
        match fs::remove_file(self.meta_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn put_chunk(&self, key: ChunkKey, data: &[u8]) -> Result<()> {
        fs::write(self.chunk_path(key), data).await?;
        Ok(())
    }

    async fn get_chunk(&self, key: ChunkKey) -> Result<Vec<u8>> {
        match fs::read(self.chunk_path(key)).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(FsError::NotFound(format!("chunk {}", key.hex())))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_chunk(&self, key: ChunkKey) -> Result<()> {
        match fs::remove_file(self.chunk_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(FsError::NotFound(format!("chunk {}", key.hex())))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn wipe_backend(&self) -> Result<()> {
        for dir in [&self.metadata_dir, &self.chunk_dir] {
            if !dir.starts_with(WIPE_PREFIX) {
                return Err(FsError::InvalidArgument(format!(
                    "refusing to wipe {:?}: not under {WIPE_PREFIX}",
                    self.base_dir
                )));
            }
            let mut entries = match fs::read_dir(dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            let mut deleted = 0usize;
            while let Some(entry) = entries.next_entry().await? {
                if let Err(e) = fs::remove_file(entry.path()).await {
                    warn!(path = ?entry.path(), error = %e, "failed to delete during wipe");
                    return Err(e.into());
                }
                deleted += 1;
            }
            info!(dir = ?dir, deleted, "wiped");
        }
        Ok(())
    }
}
