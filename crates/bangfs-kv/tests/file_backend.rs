mod common;

use bangfs_kv::{FileKvStore, KvStore};

#[tokio::test]
async fn file_backend_conformance() {
    let ns = format!("conformance_{}", std::process::id());
    let store = FileKvStore::new(&ns).await.unwrap();
    store.wipe_backend().await.unwrap();

    common::run_suite(&store).await;

    store.wipe_backend().await.unwrap();
}
