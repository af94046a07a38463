//! Conformance checks shared by every backend: each test file constructs
//! its own [`KvStore`] instance and runs this suite against it.

use bangfs_kv::KvStore;
use bangfs_meta::{unix_now_ns, InodeRecord};
use bangfs_types::{ChunkKey, FsError, InodeId, ROOT_INODE};

fn test_record(name: &str) -> InodeRecord {
    InodeRecord::new_file(name, ROOT_INODE, 0o644, 1000, 1000, unix_now_ns())
}

pub async fn run_suite(kv: &dyn KvStore) {
    put_and_get_metadata(kv).await;
    put_twice_fails(kv).await;
    update_metadata(kv).await;
    cas_monotonicity(kv).await;
    delete_without_token_is_idempotent(kv).await;
    metadata_not_found(kv).await;
    chunk_roundtrip(kv).await;
    delete_chunk(kv).await;
    chunk_not_found(kv).await;
}

async fn put_and_get_metadata(kv: &dyn KvStore) {
    let key = InodeId(9_999_900);
    let _ = kv.delete_metadata(key, None).await;

    let mut rec = test_record("testfile.txt");
    rec.size = 42;
    kv.put_metadata(key, &rec).await.unwrap();

    let (got, token) = kv.get_metadata(key).await.unwrap();
    assert!(!token.is_empty(), "expected a non-empty version token");
    assert_eq!(got, rec);

    kv.delete_metadata(key, None).await.unwrap();
}

async fn put_twice_fails(kv: &dyn KvStore) {
    let key = InodeId(9_999_901);
    let _ = kv.delete_metadata(key, None).await;

    let rec = test_record("once.txt");
    kv.put_metadata(key, &rec).await.unwrap();
    let err = kv.put_metadata(key, &rec).await.unwrap_err();
    assert!(matches!(err, FsError::Exists(_)), "got {err:?}");

    kv.delete_metadata(key, None).await.unwrap();
}

async fn update_metadata(kv: &dyn KvStore) {
    let key = InodeId(9_999_902);
    let _ = kv.delete_metadata(key, None).await;

    let mut rec = test_record("before.txt");
    kv.put_metadata(key, &rec).await.unwrap();
    let (_, token) = kv.get_metadata(key).await.unwrap();

    rec.name = "after.txt".into();
    rec.size = 100;
    kv.update_metadata(key, &rec, &token).await.unwrap();

    let (got, _) = kv.get_metadata(key).await.unwrap();
    assert_eq!(got.name, "after.txt");
    assert_eq!(got.size, 100);

    kv.delete_metadata(key, None).await.unwrap();
}

/// After a successful update with token `t`, a second update presenting `t`
/// must conflict.
async fn cas_monotonicity(kv: &dyn KvStore) {
    let key = InodeId(9_999_903);
    let _ = kv.delete_metadata(key, None).await;

    let mut rec = test_record("cas.txt");
    kv.put_metadata(key, &rec).await.unwrap();
    let (_, stale) = kv.get_metadata(key).await.unwrap();

    rec.size = 1;
    kv.update_metadata(key, &rec, &stale).await.unwrap();

    rec.size = 2;
    let err = kv.update_metadata(key, &rec, &stale).await.unwrap_err();
    assert!(matches!(err, FsError::Conflict(_)), "got {err:?}");

    kv.delete_metadata(key, None).await.unwrap();
}

async fn delete_without_token_is_idempotent(kv: &dyn KvStore) {
    let key = InodeId(9_999_904);
    let _ = kv.delete_metadata(key, None).await;

    let rec = test_record("deleteme.txt");
    kv.put_metadata(key, &rec).await.unwrap();

    kv.delete_metadata(key, None).await.unwrap();
    kv.delete_metadata(key, None).await.unwrap();

    let err = kv.get_metadata(key).await.unwrap_err();
    assert!(matches!(err, FsError::NotFound(_)), "got {err:?}");
}

async fn metadata_not_found(kv: &dyn KvStore) {
    let err = kv.get_metadata(InodeId(9_999_999)).await.unwrap_err();
    assert!(matches!(err, FsError::NotFound(_)), "got {err:?}");
}

async fn chunk_roundtrip(kv: &dyn KvStore) {
    let key = ChunkKey(0xDEAD_BEEF_9999);
    let data = b"hello bangfs chunk";
    let _ = kv.delete_chunk(key).await;

    kv.put_chunk(key, data).await.unwrap();
    let got = kv.get_chunk(key).await.unwrap();
    assert_eq!(got, data);

    kv.delete_chunk(key).await.unwrap();
}

async fn delete_chunk(kv: &dyn KvStore) {
    let key = ChunkKey(0xDEAD_BEEF_999A);
    let _ = kv.delete_chunk(key).await;

    kv.put_chunk(key, b"delete me").await.unwrap();
    kv.delete_chunk(key).await.unwrap();

    let err = kv.get_chunk(key).await.unwrap_err();
    assert!(matches!(err, FsError::NotFound(_)), "got {err:?}");
}

async fn chunk_not_found(kv: &dyn KvStore) {
    let err = kv.get_chunk(ChunkKey(0xFFFF_FFFF)).await.unwrap_err();
    assert!(matches!(err, FsError::NotFound(_)), "got {err:?}");
}
