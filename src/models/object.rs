//! Metadata row for a payload held by the backing store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One stored key. Payload bytes live on disk; this row carries what a
/// listing needs (size, timestamp, media type) plus integrity data.
///
/// Folder markers are ordinary rows: zero bytes, key ending in `/`.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Object {
    pub id: Uuid,

    pub bucket_id: Uuid,

    /// Full key, `/`-delimited.
    pub key: String,

    /// Last key segment at write time.
    pub filename: String,

    pub content_type: Option<String>,

    pub size_bytes: i64,

    /// Hex MD5 of the payload.
    pub etag: Option<String>,

    pub storage_class: String,

    pub last_modified: DateTime<Utc>,

    pub version_id: Option<String>,

    /// Soft-delete flag; deleted rows are invisible to every read path.
    pub is_deleted: bool,
}

impl Object {
    /// Payload size, clamped at zero.
    pub fn size(&self) -> u64 {
        self.size_bytes.max(0) as u64
    }
}
