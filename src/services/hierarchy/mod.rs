//! Folder hierarchy over a flat object store.
//!
//! [`HierarchyManager`] is the facade the HTTP layer talks to. It validates
//! caller paths, delegates to the listing, upload and mutation engines, and
//! re-lists the affected folder after every mutation. It holds no state
//! besides its store handle and configuration.

pub mod listing;
pub mod mutation;
pub mod paths;
pub mod upload;

use crate::{
    errors::{HierarchyError, HierarchyResult},
    models::{
        blob::{Blob, UploadReceipt},
        records::{FolderRecord, Listing},
        report::{BatchReport, DeleteReport, MoveReport, Refreshed},
    },
    services::{image_resize::ResizeOptions, object_store::ObjectStore},
};
use std::{sync::Arc, time::Duration};
use tracing::info;

pub use upload::ProgressEvent;

/// Longest validity accepted for signed URLs.
pub const MAX_URL_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Clone, Debug)]
pub struct HierarchyConfig {
    /// Validity window of URLs minted by listings and uploads.
    pub url_ttl: Duration,
    /// Downscale box for image uploads; `None` disables resizing.
    pub resize: Option<ResizeOptions>,
    pub upload_concurrency: usize,
    /// Concurrent copy-then-delete pairs per folder level during a rename.
    pub move_concurrency: usize,
    /// Default depth of [`HierarchyManager::folder_tree`].
    pub tree_depth: usize,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            url_ttl: Duration::from_secs(3600),
            resize: Some(ResizeOptions::default()),
            upload_concurrency: 4,
            move_concurrency: 8,
            tree_depth: 2,
        }
    }
}

impl HierarchyConfig {
    pub fn validate(&self) -> HierarchyResult<()> {
        let invalid = |msg: String| Err(HierarchyError::Configuration(msg));

        if self.url_ttl.is_zero() || self.url_ttl > MAX_URL_TTL {
            return invalid(format!(
                "url ttl must be between 1s and {}s, got {}s",
                MAX_URL_TTL.as_secs(),
                self.url_ttl.as_secs()
            ));
        }
        if self.upload_concurrency == 0 || self.move_concurrency == 0 {
            return invalid("upload and move concurrency must be at least 1".into());
        }
        if let Some(resize) = self.resize {
            if resize.max_width == 0 || resize.max_height == 0 {
                return invalid("image bounds must be non-zero".into());
            }
            if !(1..=100).contains(&resize.quality) {
                return invalid(format!("image quality must be 1-100, got {}", resize.quality));
            }
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct HierarchyManager {
    store: Arc<dyn ObjectStore>,
    config: HierarchyConfig,
}

impl HierarchyManager {
    /// Bind a store handle and configuration. Invalid configuration is
    /// rejected here, before any store call.
    pub fn new(store: Arc<dyn ObjectStore>, config: HierarchyConfig) -> HierarchyResult<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    pub fn config(&self) -> &HierarchyConfig {
        &self.config
    }

    fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    async fn refreshed<T>(&self, outcome: T, folder: &str) -> HierarchyResult<Refreshed<T>> {
        let listing = listing::list(self.store(), folder, self.config.url_ttl).await?;
        Ok(Refreshed { outcome, listing })
    }

    /// Immediate files and folders of `prefix`, fetched from the store now.
    pub async fn list(&self, prefix: &str) -> HierarchyResult<Listing> {
        let prefix = paths::validate_folder(prefix)?;
        listing::list(self.store(), &prefix, self.config.url_ttl).await
    }

    /// Folders below `root`, `depth` levels deep (configured default when
    /// `None`).
    pub async fn folder_tree(
        &self,
        root: &str,
        depth: Option<usize>,
    ) -> HierarchyResult<Vec<FolderRecord>> {
        let root = paths::validate_folder(root)?;
        let depth = depth.unwrap_or(self.config.tree_depth);
        listing::folder_tree(self.store(), &root, depth).await
    }

    /// Upload a batch into `destination`. Every file runs to completion; the
    /// report says which were stored. The caller decides how to treat a
    /// partial batch, see [`BatchReport::status`].
    pub async fn upload<F>(
        &self,
        blobs: Vec<Blob>,
        destination: &str,
        on_progress: F,
    ) -> HierarchyResult<Refreshed<BatchReport>>
    where
        F: FnMut(ProgressEvent) + Send,
    {
        let destination = paths::validate_folder(destination)?;
        let count = blobs.len();
        let report =
            upload::upload_batch(self.store(), &self.config, blobs, &destination, on_progress)
                .await;
        info!(
            "upload batch into `{}`: {} of {} stored",
            destination,
            report.stored().count(),
            count
        );
        self.refreshed(report, &destination).await
    }

    /// Upload one file; a store rejection is returned as the error.
    pub async fn upload_file<F>(
        &self,
        blob: Blob,
        destination: &str,
        on_progress: F,
    ) -> HierarchyResult<Refreshed<UploadReceipt>>
    where
        F: FnMut(u8) + Send,
    {
        let destination = paths::validate_folder(destination)?;
        let receipt =
            upload::upload_one(self.store(), &self.config, blob, &destination, on_progress).await?;
        self.refreshed(receipt, &destination).await
    }

    pub async fn create_folder(
        &self,
        parent: &str,
        name: &str,
    ) -> HierarchyResult<Refreshed<FolderRecord>> {
        let parent = paths::validate_folder(parent)?;
        let name = paths::validate_name(name)?;
        let folder = mutation::create_folder(self.store(), &parent, name).await?;
        self.refreshed(folder, &parent).await
    }

    /// Rename `path` to `new_name` in place. See [`mutation::rename_folder`]
    /// for the failure contract.
    pub async fn rename_folder(
        &self,
        path: &str,
        new_name: &str,
    ) -> HierarchyResult<Refreshed<MoveReport>> {
        let path = paths::validate_folder(path)?;
        let new_name = paths::validate_name(new_name)?;
        let report = mutation::rename_folder(self.store(), &self.config, &path, new_name).await?;
        self.refreshed(report, &paths::parent_of(&path)).await
    }

    pub async fn delete_folder(&self, path: &str) -> HierarchyResult<Refreshed<DeleteReport>> {
        let path = paths::validate_folder(path)?;
        let report = mutation::delete_folder(self.store(), &path).await?;
        self.refreshed(report, &paths::parent_of(&path)).await
    }

    /// Delete a single file. Deleting a missing key succeeds.
    pub async fn delete_object(&self, key: &str) -> HierarchyResult<Refreshed<String>> {
        let key = paths::validate_key(key)?;
        mutation::delete_object(self.store(), key).await?;
        self.refreshed(key.to_string(), &paths::parent_of(key)).await
    }
}
