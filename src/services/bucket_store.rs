//! `ObjectStore` over the local `StorageService`, bound to one bucket.

use crate::services::{
    object_store::{
        DeleteAck, ListPage, ObjectStore, ProgressSender, PutAck, StoreEntry, StoreError,
        StoreResult,
    },
    storage_service::{ListObjectsParams, StorageError, StorageService},
    url_signer::UrlSigner,
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use std::{io, time::Duration};
use tracing::debug;

/// Payloads are handed to the store in slices of this size so progress is
/// reported while the write is in flight.
const PUT_CHUNK_SIZE: usize = 64 * 1024;

pub const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Clone)]
pub struct BucketStore {
    storage: StorageService,
    bucket: String,
    signer: UrlSigner,
    page_size: usize,
}

impl BucketStore {
    pub fn new(storage: StorageService, bucket: impl Into<String>, signer: UrlSigner) -> Self {
        Self {
            storage,
            bucket: bucket.into(),
            signer,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Maximum keys per listing page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

fn store_error(operation: &'static str, key: &str, err: StorageError) -> StoreError {
    match err {
        StorageError::BucketNotFound(bucket) => StoreError::BucketUnavailable(bucket),
        StorageError::InvalidObjectKey => StoreError::InvalidKey(key.to_string()),
        other => StoreError::backend(operation, key, other),
    }
}

fn chunk_body(body: Bytes) -> Vec<io::Result<Bytes>> {
    (0..body.len())
        .step_by(PUT_CHUNK_SIZE)
        .map(|start| Ok(body.slice(start..(start + PUT_CHUNK_SIZE).min(body.len()))))
        .collect()
}

#[async_trait]
impl ObjectStore for BucketStore {
    async fn list_page(
        &self,
        prefix: &str,
        delimiter: Option<&str>,
        continuation_token: Option<&str>,
    ) -> StoreResult<ListPage> {
        let params = ListObjectsParams {
            prefix: Some(prefix.to_string()),
            delimiter: delimiter.map(str::to_string),
            continuation_token: continuation_token.map(str::to_string),
            max_keys: self.page_size,
        };
        let result = self
            .storage
            .list_objects_v2(&self.bucket, params)
            .await
            .map_err(|err| store_error("list", prefix, err))?;

        debug!(
            "listed {} keys and {} prefixes under `{}` (truncated: {})",
            result.objects.len(),
            result.common_prefixes.len(),
            prefix,
            result.is_truncated
        );

        let entries = result
            .objects
            .into_iter()
            .map(|object| StoreEntry {
                size: object.size(),
                key: object.key,
                last_modified: object.last_modified,
                content_type: object.content_type,
            })
            .collect();

        Ok(ListPage {
            entries,
            common_prefixes: result.common_prefixes,
            next_continuation_token: result.next_continuation_token,
            is_truncated: result.is_truncated,
        })
    }

    async fn put(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
        progress: Option<ProgressSender>,
    ) -> StoreResult<PutAck> {
        let object = self
            .storage
            .upload_object_stream(
                &self.bucket,
                key,
                Some(content_type.to_string()),
                stream::iter(chunk_body(body)),
                progress,
            )
            .await
            .map_err(|err| store_error("put", key, err))?;

        Ok(PutAck {
            size: object.size(),
            key: object.key,
            etag: object.etag,
        })
    }

    async fn copy(&self, source_key: &str, dest_key: &str) -> StoreResult<()> {
        self.storage
            .copy_object(&self.bucket, source_key, dest_key)
            .await
            .map(|_| ())
            .map_err(|err| store_error("copy", source_key, err))
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.storage
            .delete_object(&self.bucket, key)
            .await
            .map(|_| ())
            .map_err(|err| store_error("delete", key, err))
    }

    async fn bulk_delete(&self, keys: &[String]) -> StoreResult<Vec<DeleteAck>> {
        let results = self
            .storage
            .delete_objects(&self.bucket, keys)
            .await
            .map_err(|err| store_error("bulk delete", &self.bucket, err))?;

        Ok(results
            .into_iter()
            .map(|(key, outcome)| DeleteAck {
                key,
                error: outcome.err().map(|err| err.to_string()),
            })
            .collect())
    }

    fn signed_url(&self, key: &str, ttl: Duration) -> StoreResult<String> {
        Ok(self.signer.sign(&self.bucket, key, ttl))
    }
}
