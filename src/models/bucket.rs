//! A bucket is the flat key namespace one hierarchy is laid over.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A storage bucket row.
///
/// The gallery binds exactly one bucket per `BucketStore`; every key, file and
/// folder marker lives inside it.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Bucket {
    pub id: Uuid,

    /// Unique bucket name (DNS-style naming rules).
    pub name: String,

    pub owner_id: Uuid,

    /// Region label, `local` for the on-disk store.
    pub region: String,

    pub created_at: DateTime<Utc>,

    pub versioning_enabled: bool,
}

impl Bucket {
    /// Fresh bucket record with generated ids and the current timestamp.
    pub fn new(name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            owner_id: Uuid::new_v4(),
            region: region.into(),
            created_at: Utc::now(),
            versioning_enabled: false,
        }
    }
}
