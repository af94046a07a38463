//! The abstract key-value backend contract, with a filesystem-backed
//! reference implementation and an adapter to a Riak-style versioned KV
//! service.
//!
//! Persistent state lives in two logical buckets per namespace: *metadata*
//! (strongly consistent, one record per inode, guarded by per-key version
//! tokens) and *chunks* (eventually consistent, unconditional puts keyed by
//! fresh chunk keys).

use async_trait::async_trait;

use bangfs_meta::{unix_now_ns, InodeRecord};
use bangfs_types::{ChunkKey, FsError, InodeId, Result, VersionToken, ROOT_INODE};

pub mod file;
pub mod riak;

pub use file::FileKvStore;
pub use riak::RiakKvStore;

/// Versioned key-value backend.
///
/// Metadata writes are mediated by version tokens: every successful write
/// returns a fresh token, and conditional writes commit only when the
/// presented token still matches the stored one. Chunk operations are
/// unconditional. Implementations must be safe for concurrent calls; a
/// single instance is shared by every operation of a mounted filesystem.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Insert a metadata record only if the key does not exist.
    /// Fails with `Exists` if it does.
    async fn put_metadata(&self, key: InodeId, record: &InodeRecord) -> Result<VersionToken>;

    /// Fetch a metadata record together with its current version token.
    async fn get_metadata(&self, key: InodeId) -> Result<(InodeRecord, VersionToken)>;

    /// Commit a metadata record iff the stored token matches `token`;
    /// fails with `Conflict` on mismatch. Returns the new token.
    async fn update_metadata(
        &self,
        key: InodeId,
        record: &InodeRecord,
        token: &VersionToken,
    ) -> Result<VersionToken>;

    /// Delete a metadata record. With a token the delete is conditional
    /// (`Conflict` on mismatch); without one it is unconditional and
    /// idempotent.
    async fn delete_metadata(&self, key: InodeId, token: Option<&VersionToken>) -> Result<()>;

    /// Unconditional chunk insert/overwrite.
    async fn put_chunk(&self, key: ChunkKey, data: &[u8]) -> Result<()>;

    /// Fetch a chunk value. Readers of a freshly committed record may
    /// observe `NotFound` transiently under eventual consistency.
    async fn get_chunk(&self, key: ChunkKey) -> Result<Vec<u8>>;

    /// Delete a chunk value.
    async fn delete_chunk(&self, key: ChunkKey) -> Result<()>;

    /// Remove every metadata and chunk value in the configured namespace.
    /// Implementations must refuse to touch anything outside it.
    async fn wipe_backend(&self) -> Result<()>;

    /// Create the root inode, making a new filesystem in the namespace.
    /// Refuses if the root already exists.
    async fn init_backend(&self) -> Result<()> {
        match self.get_metadata(ROOT_INODE).await {
            Ok(_) => Err(FsError::Exists(
                "filesystem already exists (inode 0 present); wipe the namespace first".into(),
            )),
            Err(FsError::NotFound(_)) => {
                let root = InodeRecord::root(unix_now_ns());
                self.put_metadata(ROOT_INODE, &root).await?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
