//! The object-store client boundary.
//!
//! The hierarchy layer only talks to a store through [`ObjectStore`]: paged
//! prefix listing, put with progress, store-side copy, single and bulk
//! delete, and signed URLs. Nothing above this trait knows how keys are
//! persisted.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::{error::Error as StdError, time::Duration};
use thiserror::Error;
use tokio::sync::mpsc;

/// Receives cumulative byte counts as the store acknowledges a put.
pub type ProgressSender = mpsc::UnboundedSender<u64>;

type BoxError = Box<dyn StdError + Send + Sync>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("bucket `{0}` is not available")]
    BucketUnavailable(String),

    #[error("key `{0}` rejected by the store")]
    InvalidKey(String),

    #[error("{operation} `{key}` failed: {source}")]
    Backend {
        operation: &'static str,
        key: String,
        #[source]
        source: BoxError,
    },
}

impl StoreError {
    pub fn backend(
        operation: &'static str,
        key: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        StoreError::Backend {
            operation,
            key: key.into(),
            source: source.into(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A direct key returned by a listing page.
#[derive(Clone, Debug)]
pub struct StoreEntry {
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    pub content_type: Option<String>,
}

/// One page of a prefix listing.
#[derive(Clone, Debug, Default)]
pub struct ListPage {
    pub entries: Vec<StoreEntry>,
    /// Grouped prefixes, each ending with the delimiter.
    pub common_prefixes: Vec<String>,
    pub next_continuation_token: Option<String>,
    pub is_truncated: bool,
}

#[derive(Clone, Debug)]
pub struct PutAck {
    pub key: String,
    pub size: u64,
    pub etag: Option<String>,
}

/// Per-key result of a bulk delete. `error` is `None` when the key is gone.
#[derive(Clone, Debug)]
pub struct DeleteAck {
    pub key: String,
    pub error: Option<String>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List keys under `prefix`. With a delimiter, deeper keys collapse into
    /// `common_prefixes`.
    async fn list_page(
        &self,
        prefix: &str,
        delimiter: Option<&str>,
        continuation_token: Option<&str>,
    ) -> StoreResult<ListPage>;

    /// Write `body` at `key`. When `progress` is given, cumulative
    /// acknowledged byte counts are sent on it while the transfer runs.
    async fn put(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
        progress: Option<ProgressSender>,
    ) -> StoreResult<PutAck>;

    /// Store-side copy; the payload never leaves the store.
    async fn copy(&self, source_key: &str, dest_key: &str) -> StoreResult<()>;

    /// Delete one key. Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    async fn bulk_delete(&self, keys: &[String]) -> StoreResult<Vec<DeleteAck>>;

    /// URL granting read access to `key` until `ttl` elapses.
    fn signed_url(&self, key: &str, ttl: Duration) -> StoreResult<String>;
}
