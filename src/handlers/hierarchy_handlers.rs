//! JSON API over the hierarchy manager.
//!
//! Every mutation responds with the operation's outcome plus a fresh listing
//! of the affected folder.

use crate::{
    errors::AppError,
    models::{
        blob::Blob,
        records::{FileKind, FolderRecord, Listing, SortKey, SortOrder},
        report::{BatchStatus, DeleteReport, MoveReport, Refreshed},
    },
    routes::AppState,
};
use axum::{
    Json,
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub sort: SortKey,
    #[serde(default)]
    pub order: SortOrder,
    #[serde(default)]
    pub kind: FileKind,
}

#[derive(Debug, Deserialize)]
pub struct TreeQuery {
    #[serde(default)]
    pub root: String,
    pub depth: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct CreateFolderReq {
    #[serde(default)]
    pub parent: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameFolderReq {
    pub path: String,
    pub new_name: String,
}

#[derive(Debug, Deserialize)]
pub struct FolderQuery {
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct ObjectQuery {
    pub key: String,
}

/// `GET /api/list?prefix=&sort=&order=&kind=`
pub async fn list_folder(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Listing>, AppError> {
    let listing = state.manager.list(&q.prefix).await?;
    Ok(Json(listing.sorted_filtered(q.sort, q.order, q.kind)))
}

/// `GET /api/folders?root=&depth=`
pub async fn folder_tree(
    State(state): State<AppState>,
    Query(q): Query<TreeQuery>,
) -> Result<Json<Vec<FolderRecord>>, AppError> {
    Ok(Json(state.manager.folder_tree(&q.root, q.depth).await?))
}

/// `POST /api/folders`
pub async fn create_folder(
    State(state): State<AppState>,
    Json(req): Json<CreateFolderReq>,
) -> Result<(StatusCode, Json<Refreshed<FolderRecord>>), AppError> {
    let refreshed = state.manager.create_folder(&req.parent, &req.name).await?;
    Ok((StatusCode::CREATED, Json(refreshed)))
}

/// `POST /api/folders/rename`
pub async fn rename_folder(
    State(state): State<AppState>,
    Json(req): Json<RenameFolderReq>,
) -> Result<Json<Refreshed<MoveReport>>, AppError> {
    Ok(Json(state.manager.rename_folder(&req.path, &req.new_name).await?))
}

/// `DELETE /api/folders?path=`
pub async fn delete_folder(
    State(state): State<AppState>,
    Query(q): Query<FolderQuery>,
) -> Result<Json<Refreshed<DeleteReport>>, AppError> {
    Ok(Json(state.manager.delete_folder(&q.path).await?))
}

/// `DELETE /api/objects?key=`
pub async fn delete_object(
    State(state): State<AppState>,
    Query(q): Query<ObjectQuery>,
) -> Result<Json<Refreshed<String>>, AppError> {
    Ok(Json(state.manager.delete_object(&q.key).await?))
}

/// `POST /api/upload`, multipart with a `destination` text field and any
/// number of file parts.
///
/// 200 when every file was stored, 207 when some were, 502 when none were.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut destination = String::new();
    let mut blobs = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(format!("invalid multipart body: {}", err)))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            if field.name() == Some("destination") {
                destination = field
                    .text()
                    .await
                    .map_err(|err| AppError::bad_request(format!("invalid destination: {}", err)))?;
            }
            continue;
        };
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|err| AppError::bad_request(format!("reading `{}`: {}", file_name, err)))?;
        blobs.push(Blob::with_declared_type(file_name, content_type.as_deref(), bytes));
    }

    if blobs.is_empty() {
        return Err(AppError::bad_request("no files in upload"));
    }

    let refreshed = state
        .manager
        .upload(blobs, &destination, |event| {
            debug!("upload {} [{}]: {}%", event.name, event.index, event.percent);
        })
        .await?;

    let status = match refreshed.outcome.status() {
        BatchStatus::Empty | BatchStatus::Complete => StatusCode::OK,
        BatchStatus::Partial => StatusCode::MULTI_STATUS,
        BatchStatus::Failed => StatusCode::BAD_GATEWAY,
    };
    Ok((status, Json(refreshed)).into_response())
}
