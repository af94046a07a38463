strong_type!(InodeId, u64);
strong_type!(ChunkKey, u64);
strong_type!(Uid, u32);
strong_type!(Gid, u32);

/// The root directory's inode number. Reserved at filesystem creation;
/// every other inode number is issued by the ID generator.
pub const ROOT_INODE: InodeId = InodeId(0);

impl ChunkKey {
    /// Render the key as the 16-hex-digit string used for backend keys.
    pub fn hex(&self) -> String {
        format!("{:016x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inode_id() {
        let id = InodeId(12345);
        assert_eq!(*id, 12345u64);
        assert_eq!(format!("{:?}", id), "InodeId(12345)");
        assert_eq!(format!("{}", id), "12345");
    }

    #[test]
    fn test_root_inode() {
        assert_eq!(*ROOT_INODE, 0);
    }

    #[test]
    fn test_chunk_key_hex() {
        assert_eq!(ChunkKey(0).hex(), "0000000000000000");
        assert_eq!(ChunkKey(0xDEADBEEF).hex(), "00000000deadbeef");
        assert_eq!(ChunkKey(u64::MAX).hex(), "ffffffffffffffff");
    }

    #[test]
    fn test_inode_id_serde() {
        let id = InodeId(999);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "999");
        let parsed: InodeId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }
}
