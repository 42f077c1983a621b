//! Defines routes for the hierarchy API and signed downloads.
//!
//! ## Structure
//! - **Hierarchy endpoints** (JSON)
//!   - `GET    /api/list?prefix=`          immediate files and folders
//!   - `GET    /api/folders?root=&depth=`  folder tree snapshot
//!   - `POST   /api/folders`               create folder
//!   - `POST   /api/folders/rename`        rename folder in place
//!   - `DELETE /api/folders?path=`         recursive folder delete
//!   - `DELETE /api/objects?key=`          delete one file
//!   - `POST   /api/upload`                multipart batch upload
//!
//! - **Download endpoint**
//!   - `GET    /objects/{bucket}/{*key}`   signed, time-limited download
//!
//! The wildcard `*key` allows nested keys like `photos/2025/img.jpg`.

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        hierarchy_handlers::{
            create_folder, delete_folder, delete_object, folder_tree, list_folder, rename_folder,
            upload,
        },
        object_handlers::get_signed_object,
    },
    errors::HierarchyResult,
    services::{
        bucket_store::BucketStore,
        hierarchy::{HierarchyConfig, HierarchyManager},
        storage_service::StorageService,
        url_signer::UrlSigner,
    },
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};
use std::sync::Arc;

/// Largest multipart body accepted by `/api/upload`.
pub const MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<HierarchyManager>,
    /// Backing store, used directly by downloads and readiness checks.
    pub storage: StorageService,
    pub signer: UrlSigner,
    pub bucket: String,
}

impl AppState {
    /// Bind the hierarchy manager to `bucket` in `storage`.
    pub fn new(
        storage: StorageService,
        bucket: impl Into<String>,
        signer: UrlSigner,
        config: HierarchyConfig,
        page_size: usize,
    ) -> HierarchyResult<Self> {
        let bucket = bucket.into();
        let store = BucketStore::new(storage.clone(), bucket.clone(), signer.clone())
            .with_page_size(page_size);
        let manager = HierarchyManager::new(Arc::new(store), config)?;
        Ok(Self {
            manager: Arc::new(manager),
            storage,
            signer,
            bucket,
        })
    }
}

/// Build the router for every endpoint. The caller supplies the state with
/// `.with_state(...)`.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/api/list", get(list_folder))
        .route(
            "/api/folders",
            get(folder_tree).post(create_folder).delete(delete_folder),
        )
        .route("/api/folders/rename", post(rename_folder))
        .route("/api/objects", delete(delete_object))
        .route(
            "/api/upload",
            post(upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/objects/{bucket}/{*key}", get(get_signed_object))
}

/// The full application router with its state attached.
pub fn app(state: AppState) -> Router {
    routes().with_state(state)
}
