//! Upload inputs and receipts.

use super::records::{DEFAULT_MEDIA_TYPE, media_type_for};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// An in-memory file submitted for upload.
#[derive(Clone, Debug)]
pub struct Blob {
    pub name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl Blob {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Build a blob whose media type is taken from its extension.
    pub fn guessed(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let name = name.into();
        let content_type = media_type_for(&name);
        Self::new(name, content_type, bytes)
    }

    /// Use `declared` unless it is missing or the generic binary type.
    pub fn with_declared_type(
        name: impl Into<String>,
        declared: Option<&str>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        match declared {
            Some(ct) if !ct.is_empty() && ct != DEFAULT_MEDIA_TYPE => Self::new(name, ct, bytes),
            _ => Self::guessed(name, bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

/// What a successful upload stored.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UploadReceipt {
    /// Original file name as submitted.
    pub name: String,
    pub key: String,
    /// Bytes actually stored (after any resize).
    pub size: u64,
    pub content_type: String,
    pub resized: bool,
    /// Signed URL for the stored object.
    pub location: String,
}
