//! Folder hierarchy manager over a flat object store.
//!
//! The store only knows keys. Folders are emulated with `/`-delimited
//! prefixes and zero-byte marker objects; rename is copy-then-delete and
//! folder delete is a paged bulk delete. The crate ships a local SQLite and
//! disk backed store plus an axum HTTP surface.

pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use errors::{AppError, HierarchyError, HierarchyResult};
pub use models::{
    blob::{Blob, UploadReceipt},
    records::{FileKind, FolderRecord, Listing, ObjectRecord, SortKey, SortOrder},
    report::{BatchReport, BatchStatus, DeleteReport, MoveReport, PartialReport, Refreshed},
};
pub use services::{
    bucket_store::BucketStore,
    hierarchy::{HierarchyConfig, HierarchyManager, ProgressEvent},
    object_store::ObjectStore,
    storage_service::StorageService,
    url_signer::UrlSigner,
};
