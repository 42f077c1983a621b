//! Signed downloads. Streams object bodies to avoid buffering in memory and
//! delegates storage concerns to `StorageService`.

use crate::{
    errors::AppError,
    models::object::Object,
    routes::AppState,
    services::url_signer::SignatureError,
};
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use chrono::Utc;
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use tracing::debug;

/// Query string carried by every signed URL.
#[derive(Debug, Deserialize)]
pub struct SignedQuery {
    pub expires: Option<i64>,
    pub signature: Option<String>,
}

/// `GET /objects/{bucket}/{*key}?expires=&signature=`: stream the payload
/// when the signature verifies.
pub async fn get_signed_object(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
    Query(q): Query<SignedQuery>,
) -> Result<Response, AppError> {
    let (Some(expires), Some(signature)) = (q.expires, q.signature.as_deref()) else {
        return Err(AppError::new(StatusCode::FORBIDDEN, "missing signature"));
    };

    state
        .signer
        .verify(&bucket, &key, expires, signature, Utc::now())
        .map_err(|err| {
            debug!("rejected signed download of {}/{}: {}", bucket, key, err);
            let status = match err {
                SignatureError::Expired(_) => StatusCode::GONE,
                SignatureError::Malformed | SignatureError::Mismatch => StatusCode::FORBIDDEN,
            };
            AppError::new(status, err.to_string())
        })?;

    let (meta, file) = state.storage.get_object_reader(&bucket, &key).await?;
    let body = Body::from_stream(ReaderStream::new(file));

    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    set_object_headers(response.headers_mut(), &meta);
    Ok(response)
}

fn set_object_headers(headers: &mut HeaderMap, meta: &Object) {
    let content_type = meta
        .content_type
        .clone()
        .unwrap_or_else(|| "application/octet-stream".into());
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );

    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(meta.size()));

    if let Some(etag) = meta.etag.as_ref() {
        let quoted = format!("\"{}\"", etag);
        if let Ok(value) = HeaderValue::from_str(&quoted) {
            headers.insert(header::ETAG, value);
        }
    }

    if let Ok(value) = HeaderValue::from_str(&meta.last_modified.to_rfc2822()) {
        headers.insert(header::LAST_MODIFIED, value);
    }

    // signed links are short-lived; never cache past the link's own lifetime
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("private, no-store"));
}
