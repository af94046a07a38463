//! The mount context: one shared backend handle, the two ID generators,
//! and the filesystem configuration.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use bangfs_kv::KvStore;
use bangfs_types::{ChunkKey, FsError, InodeId, Result, ROOT_INODE};
use bangfs_utils::IdGenerator;

use crate::dirnode::DirNode;

/// Recommended chunk size: 1 MiB.
pub const DEFAULT_CHUNK_SIZE: u32 = 1024 * 1024;

/// Filesystem configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FsConfig {
    /// Fixed chunk size in bytes. The I/O engine indexes chunks
    /// arithmetically, so this value must not change for the lifetime of a
    /// filesystem.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    /// Stable client identifier feeding the ID generators' local-id hash.
    /// Falls back to the hostname, then to a random value.
    #[serde(default)]
    pub client_id: Option<String>,
}

fn default_chunk_size() -> u32 {
    DEFAULT_CHUNK_SIZE
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            client_id: None,
        }
    }
}

/// The root context for one mounted filesystem.
///
/// Holds the single backend instance shared by all operations, and two
/// independent ID generators so that inode numbers and chunk keys never
/// share sequence space. Constructed explicitly at mount time and passed
/// to every node and handle; there is no ambient global state.
pub struct BangFs {
    kv: Arc<dyn KvStore>,
    inode_ids: IdGenerator,
    chunk_ids: IdGenerator,
    config: FsConfig,
}

impl BangFs {
    /// Build the context over an initialized backend. Refuses to start
    /// when the root inode is absent.
    pub async fn new(kv: Arc<dyn KvStore>, config: FsConfig) -> Result<Arc<Self>> {
        if let Err(e) = kv.get_metadata(ROOT_INODE).await {
            return Err(match e {
                FsError::NotFound(_) => {
                    FsError::Io("filesystem not initialized (run bangfs-mkfs first)".into())
                }
                other => other,
            });
        }
        let inode_ids = IdGenerator::new(config.client_id.as_deref());
        let chunk_ids = IdGenerator::new(config.client_id.as_deref());
        Ok(Arc::new(Self {
            inode_ids,
            chunk_ids,
            kv,
            config,
        }))
    }

    /// The root directory node, handed to the host bridge at mount.
    pub fn root(self: &Arc<Self>) -> DirNode {
        DirNode::new(Arc::clone(self), ROOT_INODE)
    }

    pub fn chunk_size(&self) -> u32 {
        self.config.chunk_size
    }

    pub(crate) fn kv(&self) -> &dyn KvStore {
        self.kv.as_ref()
    }

    pub(crate) fn next_inode_id(&self) -> InodeId {
        InodeId(self.inode_ids.next_id())
    }

    pub(crate) fn next_chunk_key(&self) -> ChunkKey {
        ChunkKey(self.chunk_ids.next_id())
    }
}

impl std::fmt::Debug for BangFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BangFs")
            .field("chunk_size", &self.config.chunk_size)
            .finish()
    }
}
