use crate::{
    models::report::PartialReport,
    services::{object_store::StoreError, storage_service::StorageError},
};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// Errors surfaced by the hierarchy manager and its engines.
#[derive(Debug, Error)]
pub enum HierarchyError {
    /// Missing or invalid settings; raised before any store call.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The store handle does not point at a usable bucket.
    #[error("object store not initialized: {0}")]
    NotInitialized(String),

    #[error("invalid path `{path}`: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("object store I/O failed: {0}")]
    Store(#[source] StoreError),

    /// Some sub-operations succeeded and others did not. Nothing was rolled back.
    #[error(
        "{operation} partially applied: {} succeeded, {} failed",
        .report.succeeded(),
        .report.failed()
    )]
    PartialFailure {
        operation: &'static str,
        report: Box<PartialReport>,
    },
}

impl HierarchyError {
    pub fn invalid_path(path: impl Into<String>, reason: &'static str) -> Self {
        HierarchyError::InvalidPath {
            path: path.into(),
            reason,
        }
    }

    pub fn partial(operation: &'static str, report: PartialReport) -> Self {
        HierarchyError::PartialFailure {
            operation,
            report: Box::new(report),
        }
    }
}

impl From<StoreError> for HierarchyError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::BucketUnavailable(bucket) => {
                HierarchyError::NotInitialized(format!("bucket `{}` does not exist", bucket))
            }
            other => HierarchyError::Store(other),
        }
    }
}

pub type HierarchyResult<T> = Result<T, HierarchyError>;

/// HTTP-facing error: a status, a message and optional structured details.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl AppError {
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
            details: None,
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": self.message,
            "status": self.status.as_u16()
        });
        if let Some(details) = self.details {
            body["details"] = details;
        }

        (self.status, Json(body)).into_response()
    }
}

impl From<HierarchyError> for AppError {
    fn from(err: HierarchyError) -> Self {
        let message = err.to_string();
        match err {
            HierarchyError::InvalidPath { .. } => AppError::bad_request(message),
            HierarchyError::NotInitialized(_) => {
                AppError::new(StatusCode::SERVICE_UNAVAILABLE, message)
            }
            HierarchyError::Configuration(_) => AppError::internal(message),
            HierarchyError::Store(_) => AppError::new(StatusCode::BAD_GATEWAY, message),
            HierarchyError::PartialFailure { report, .. } => {
                let details = serde_json::to_value(&*report).unwrap_or(serde_json::Value::Null);
                AppError::new(StatusCode::MULTI_STATUS, message).with_details(details)
            }
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        let message = err.to_string();
        match err {
            StorageError::BucketNotFound(_) | StorageError::ObjectNotFound { .. } => {
                AppError::not_found(message)
            }
            StorageError::InvalidObjectKey
            | StorageError::InvalidBucketName { .. }
            | StorageError::UnsupportedRegion(_) => AppError::bad_request(message),
            StorageError::BucketAlreadyExists(_) => AppError::new(StatusCode::CONFLICT, message),
            StorageError::Sqlx(_) | StorageError::Io(_) => AppError::internal(message),
        }
    }
}
