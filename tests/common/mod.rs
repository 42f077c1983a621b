//! Shared fixtures: a real `StorageService` on a temp directory, plus a store
//! wrapper that fails chosen keys.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use object_gallery::{
    BucketStore, HierarchyConfig, HierarchyManager, StorageService, UrlSigner, db,
    services::object_store::{
        DeleteAck, ListPage, ObjectStore, ProgressSender, PutAck, StoreError, StoreResult,
    },
};
use std::{sync::Arc, time::Duration};
use tempfile::TempDir;

pub const BUCKET: &str = "gallery-test";
pub const SECRET: &str = "test-secret-key-for-testing-only";
pub const PUBLIC_URL: &str = "http://gallery.test";

pub struct TestEnv {
    /// Keeps the payload directory and database alive for the test.
    pub dir: TempDir,
    pub storage: StorageService,
    pub signer: UrlSigner,
}

impl TestEnv {
    pub async fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let db_url = format!("sqlite://{}", dir.path().join("meta").join("gallery.db").display());
        let pool = db::connect(&db_url).await.expect("connect sqlite");
        db::run_migrations(&pool).await.expect("run migrations");

        let storage = StorageService::new(Arc::new(pool), dir.path().join("objects"));
        storage
            .ensure_bucket(BUCKET, "local")
            .await
            .expect("create bucket");

        Self {
            dir,
            storage,
            signer: UrlSigner::new(SECRET, PUBLIC_URL),
        }
    }

    pub fn store(&self, page_size: usize) -> BucketStore {
        BucketStore::new(self.storage.clone(), BUCKET, self.signer.clone())
            .with_page_size(page_size)
    }

    pub fn manager(&self) -> HierarchyManager {
        self.manager_with(self.store(1000), HierarchyConfig::default())
    }

    pub fn manager_with(
        &self,
        store: impl ObjectStore + 'static,
        config: HierarchyConfig,
    ) -> HierarchyManager {
        HierarchyManager::new(Arc::new(store), config).expect("valid config")
    }

    /// Every live key under `prefix` at any depth, straight from the store.
    pub async fn keys_under(&self, prefix: &str) -> Vec<String> {
        let store = self.store(1000);
        let mut keys = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = store
                .list_page(prefix, None, token.as_deref())
                .await
                .expect("list page");
            keys.extend(page.entries.into_iter().map(|e| e.key));
            if !page.is_truncated {
                return keys;
            }
            token = page.next_continuation_token;
        }
    }

    pub async fn read(&self, key: &str) -> Vec<u8> {
        let (_, mut file) = self
            .storage
            .get_object_reader(BUCKET, key)
            .await
            .expect("object exists");
        let mut out = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut file, &mut out)
            .await
            .expect("read payload");
        out
    }
}

/// Which operation a [`FlakyStore`] rejects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailOn {
    Put,
    Copy,
    Delete,
}

/// Delegates to an inner store but fails `op` for any key ending in `suffix`.
/// For copies the source key is matched.
pub struct FlakyStore<S> {
    pub inner: S,
    pub op: FailOn,
    pub suffix: &'static str,
}

impl<S> FlakyStore<S> {
    pub fn new(inner: S, op: FailOn, suffix: &'static str) -> Self {
        Self { inner, op, suffix }
    }

    fn check(&self, op: FailOn, key: &str) -> StoreResult<()> {
        if op == self.op && key.ends_with(self.suffix) {
            return Err(StoreError::backend("injected", key, "simulated store failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl<S: ObjectStore> ObjectStore for FlakyStore<S> {
    async fn list_page(
        &self,
        prefix: &str,
        delimiter: Option<&str>,
        continuation_token: Option<&str>,
    ) -> StoreResult<ListPage> {
        self.inner.list_page(prefix, delimiter, continuation_token).await
    }

    async fn put(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
        progress: Option<ProgressSender>,
    ) -> StoreResult<PutAck> {
        self.check(FailOn::Put, key)?;
        self.inner.put(key, body, content_type, progress).await
    }

    async fn copy(&self, source_key: &str, dest_key: &str) -> StoreResult<()> {
        self.check(FailOn::Copy, source_key)?;
        self.inner.copy(source_key, dest_key).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.check(FailOn::Delete, key)?;
        self.inner.delete(key).await
    }

    async fn bulk_delete(&self, keys: &[String]) -> StoreResult<Vec<DeleteAck>> {
        let mut acks = Vec::with_capacity(keys.len());
        let mut allowed = Vec::new();
        for key in keys {
            match self.check(FailOn::Delete, key) {
                Ok(()) => allowed.push(key.clone()),
                Err(err) => acks.push(DeleteAck {
                    key: key.clone(),
                    error: Some(err.to_string()),
                }),
            }
        }
        acks.extend(self.inner.bulk_delete(&allowed).await?);
        Ok(acks)
    }

    fn signed_url(&self, key: &str, ttl: Duration) -> StoreResult<String> {
        self.inner.signed_url(key, ttl)
    }
}
