//! Adapter from the [`KvStore`] contract to a Riak-style versioned KV
//! service over its HTTP interface.
//!
//! Two logical buckets per namespace, `<ns>_metadata` and `<ns>_chunks`.
//! Metadata keys are the decimal ASCII of the inode number; chunk keys are
//! 16 hex digits. Metadata writes use the service's compare-and-swap
//! primitives: `If-None-Match: *` for insert-if-absent, and the stored
//! vclock presented in `X-Riak-Vclock` for conditional updates. Every
//! successful metadata write must hand back the new vclock, which becomes
//! the caller's version token. Chunks use plain put/get/delete.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use tracing::info;

use bangfs_meta::InodeRecord;
use bangfs_types::{ChunkKey, FsError, InodeId, Result, VersionToken};

use crate::KvStore;

/// Header carrying the version token on metadata reads and writes.
const VCLOCK_HEADER: &str = "X-Riak-Vclock";

/// [`KvStore`] backed by a Riak-compatible HTTP endpoint.
pub struct RiakKvStore {
    client: Client,
    base_url: String,
    metadata_bucket: String,
    chunk_bucket: String,
}

impl RiakKvStore {
    /// Connect to the service at `base_url` (e.g. `http://127.0.0.1:8098`),
    /// scoping all keys to the given namespace.
    pub fn new(base_url: &str, namespace: &str) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| FsError::Io(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            metadata_bucket: format!("{namespace}_metadata"),
            chunk_bucket: format!("{namespace}_chunks"),
        })
    }

    fn key_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/buckets/{}/keys/{}", self.base_url, bucket, key)
    }

    fn meta_url(&self, key: InodeId) -> String {
        self.key_url(&self.metadata_bucket, &key.to_string())
    }

    fn chunk_url(&self, key: ChunkKey) -> String {
        self.key_url(&self.chunk_bucket, &key.hex())
    }

    fn list_keys_url(&self, bucket: &str) -> String {
        format!("{}/buckets/{}/keys?keys=true", self.base_url, bucket)
    }

    fn transport(e: reqwest::Error) -> FsError {
        FsError::Io(format!("backend transport failure: {e}"))
    }

    /// Pull the version token out of a store/fetch response.
    fn vclock_of(resp: &Response) -> Result<VersionToken> {
        match resp.headers().get(VCLOCK_HEADER) {
            Some(value) => Ok(VersionToken::from(value.as_bytes())),
            None => Err(FsError::Io(
                "metadata write returned no version token".into(),
            )),
        }
    }

    fn encode(record: &InodeRecord) -> Result<Vec<u8>> {
        serde_json::to_vec(record)
            .map_err(|e| FsError::Io(format!("failed to encode metadata record: {e}")))
    }

    /// List and delete every key in one bucket; returns the delete count.
    async fn wipe_bucket(&self, bucket: &str) -> Result<usize> {
        let resp = self
            .client
            .get(self.list_keys_url(bucket))
            .send()
            .await
            .map_err(Self::transport)?;
        if !resp.status().is_success() {
            return Err(FsError::Io(format!(
                "listing keys in bucket {bucket} failed: {}",
                resp.status()
            )));
        }
        let body = resp.bytes().await.map_err(Self::transport)?;
        let listing: serde_json::Value = serde_json::from_slice(&body)
            .map_err(|e| FsError::Io(format!("malformed key listing for {bucket}: {e}")))?;
        let keys: Vec<String> = listing["keys"]
            .as_array()
            .map(|keys| {
                keys.iter()
                    .filter_map(|k| k.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        let mut deleted = 0usize;
        for key in &keys {
            let resp = self
                .client
                .delete(self.key_url(bucket, key))
                .send()
                .await
                .map_err(Self::transport)?;
            if !resp.status().is_success() && resp.status() != StatusCode::NOT_FOUND {
                return Err(FsError::Io(format!(
                    "deleting key {key} in bucket {bucket} failed: {}",
                    resp.status()
                )));
            }
            deleted += 1;
        }
        Ok(deleted)
    }
}

#[async_trait]
impl KvStore for RiakKvStore {
    async fn put_metadata(&self, key: InodeId, record: &InodeRecord) -> Result<VersionToken> {
        let resp = self
            .client
            .put(format!("{}?returnbody=true", self.meta_url(key)))
            .header("If-None-Match", "*")
            .header("Content-Type", "application/json")
            .body(Self::encode(record)?)
            .send()
            .await
            .map_err(Self::transport)?;
        match resp.status() {
            StatusCode::PRECONDITION_FAILED | StatusCode::CONFLICT => Err(FsError::Exists(
                format!("metadata key {key} already exists"),
            )),
            status if status.is_success() => Self::vclock_of(&resp),
            status => Err(FsError::Io(format!(
                "storing metadata key {key} failed: {status}"
            ))),
        }
    }

    async fn get_metadata(&self, key: InodeId) -> Result<(InodeRecord, VersionToken)> {
        let resp = self
            .client
            .get(self.meta_url(key))
            .send()
            .await
            .map_err(Self::transport)?;
        match resp.status() {
            StatusCode::NOT_FOUND => Err(FsError::NotFound(format!("metadata key {key}"))),
            status if status.is_success() => {
                let token = Self::vclock_of(&resp)?;
                let body = resp.bytes().await.map_err(Self::transport)?;
                let record: InodeRecord = serde_json::from_slice(&body)
                    .map_err(|e| FsError::Io(format!("malformed metadata record {key}: {e}")))?;
                Ok((record, token))
            }
            status => Err(FsError::Io(format!(
                "fetching metadata key {key} failed: {status}"
            ))),
        }
    }

    async fn update_metadata(
        &self,
        key: InodeId,
        record: &InodeRecord,
        token: &VersionToken,
    ) -> Result<VersionToken> {
        let token_str = std::str::from_utf8(token.as_bytes())
            .map_err(|_| FsError::Io(format!("version token for key {key} is not ascii")))?;
        let resp = self
            .client
            .put(format!("{}?returnbody=true", self.meta_url(key)))
            .header(VCLOCK_HEADER, token_str)
            .header("Content-Type", "application/json")
            .body(Self::encode(record)?)
            .send()
            .await
            .map_err(Self::transport)?;
        match resp.status() {
            StatusCode::NOT_FOUND => Err(FsError::NotFound(format!("metadata key {key}"))),
            StatusCode::PRECONDITION_FAILED | StatusCode::CONFLICT => Err(FsError::Conflict(
                format!("version mismatch on key {key} (concurrent modification)"),
            )),
            status if status.is_success() => Self::vclock_of(&resp),
            status => Err(FsError::Io(format!(
                "updating metadata key {key} failed: {status}"
            ))),
        }
    }

    async fn delete_metadata(&self, key: InodeId, token: Option<&VersionToken>) -> Result<()> {
        let mut req = self.client.delete(self.meta_url(key));
        if let Some(token) = token {
            let token_str = std::str::from_utf8(token.as_bytes())
                .map_err(|_| FsError::Io(format!("version token for key {key} is not ascii")))?;
            req = req.header(VCLOCK_HEADER, token_str);
        }
        let resp = req.send().await.map_err(Self::transport)?;
        match resp.status() {
            // Unconditional deletes are idempotent; conditional ones report
            // the missing key.
            StatusCode::NOT_FOUND if token.is_some() => {
                Err(FsError::NotFound(format!("metadata key {key}")))
            }
            StatusCode::NOT_FOUND => Ok(()),
            StatusCode::PRECONDITION_FAILED | StatusCode::CONFLICT => Err(FsError::Conflict(
                format!("version mismatch deleting key {key} (concurrent modification)"),
            )),
            status if status.is_success() => Ok(()),
            status => Err(FsError::Io(format!(
                "deleting metadata key {key} failed: {status}"
            ))),
        }
    }

    async fn put_chunk(&self, key: ChunkKey, data: &[u8]) -> Result<()> {
        let resp = self
            .client
            .put(self.chunk_url(key))
            .header("Content-Type", "application/octet-stream")
            .body(data.to_vec())
            .send()
            .await
            .map_err(Self::transport)?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(FsError::Io(format!(
                "storing chunk {} failed: {}",
                key.hex(),
                resp.status()
            )))
        }
    }

    async fn get_chunk(&self, key: ChunkKey) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get(self.chunk_url(key))
            .send()
            .await
            .map_err(Self::transport)?;
        match resp.status() {
            StatusCode::NOT_FOUND => Err(FsError::NotFound(format!("chunk {}", key.hex()))),
            status if status.is_success() => {
                Ok(resp.bytes().await.map_err(Self::transport)?.to_vec())
            }
            status => Err(FsError::Io(format!(
                "fetching chunk {} failed: {status}",
                key.hex()
            ))),
        }
    }

    async fn delete_chunk(&self, key: ChunkKey) -> Result<()> {
        let resp = self
            .client
            .delete(self.chunk_url(key))
            .send()
            .await
            .map_err(Self::transport)?;
        match resp.status() {
            StatusCode::NOT_FOUND => Err(FsError::NotFound(format!("chunk {}", key.hex()))),
            status if status.is_success() => Ok(()),
            status => Err(FsError::Io(format!(
                "deleting chunk {} failed: {status}",
                key.hex()
            ))),
        }
    }

    async fn wipe_backend(&self) -> Result<()> {
        let meta = self.wipe_bucket(&self.metadata_bucket).await?;
        info!(bucket = %self.metadata_bucket, deleted = meta, "wiped metadata bucket");
        let chunks = self.wipe_bucket(&self.chunk_bucket).await?;
        info!(bucket = %self.chunk_bucket, deleted = chunks, "wiped chunk bucket");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_and_key_layout() {
        let store = RiakKvStore::new("http://localhost:8098/", "prod").unwrap();
        assert_eq!(
            store.meta_url(InodeId(42)),
            "http://localhost:8098/buckets/prod_metadata/keys/42"
        );
        assert_eq!(
            store.chunk_url(ChunkKey(0xBEEF)),
            "http://localhost:8098/buckets/prod_chunks/keys/000000000000beef"
        );
        assert_eq!(
            store.list_keys_url(&store.chunk_bucket),
            "http://localhost:8098/buckets/prod_chunks/keys?keys=true"
        );
    }
}
