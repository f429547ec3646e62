//! Artifact API handlers

use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use depot_common::ArtifactRecord;
use depot_registry::{BLOB_EXT, Error, Registry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tracing::{error, warn};

/// Application state shared across handlers
pub struct AppState {
    pub registry: Registry,
}

/// Caller-facing record shape. Carries a download reference instead of
/// the internal storage path.
#[derive(Debug, Serialize)]
pub struct ArtifactResponse {
    pub id: String,
    pub owner: String,
    pub name: String,
    pub version: String,
    pub sha256: String,
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
    pub download_url: String,
}

impl ArtifactResponse {
    fn from_record(record: ArtifactRecord, headers: &HeaderMap) -> Self {
        let download_url = build_download_url(headers, &record.id);
        Self {
            id: record.id,
            owner: record.owner,
            name: record.name,
            version: record.version,
            sha256: record.sha256,
            size: record.size,
            uploaded_at: record.uploaded_at,
            download_url,
        }
    }
}

/// Derive the externally reachable download URL from request headers.
fn build_download_url(headers: &HeaderMap, id: &str) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("{scheme}://{host}/v1/artifacts/{id}/download")
}

/// Quote characters in a caller-supplied name would break out of the
/// quoted Content-Disposition filename; strip them.
fn sanitize_filename(name: &str) -> String {
    name.replace('"', "")
}

fn registry_error(err: &Error) -> Response {
    if err.http_status_code() >= 500 {
        error!("Registry error: {}", err);
    } else {
        warn!("Rejected request: {}", err);
    }
    let status =
        StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(serde_json::json!({ "error": err.to_string() }))).into_response()
}

fn bad_request(msg: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": msg })),
    )
        .into_response()
}

pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// POST /v1/artifacts - multipart upload
///
/// Form fields: `owner` (required), `name`, `version`, and the file
/// under `package`. Hash and size are measured server-side during the
/// write; nothing the client declares is trusted.
pub async fn upload_artifact(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let mut owner = String::new();
    let mut name = String::new();
    let mut version = String::new();
    let mut package: Option<(String, bytes::Bytes)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(_) => return bad_request("invalid multipart payload"),
        };
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "owner" => owner = field.text().await.unwrap_or_default(),
            "name" => name = field.text().await.unwrap_or_default(),
            "version" => version = field.text().await.unwrap_or_default(),
            "package" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(bytes) => package = Some((filename, bytes)),
                    Err(_) => return bad_request("invalid multipart payload"),
                }
            }
            _ => {}
        }
    }

    let Some((filename, bytes)) = package else {
        return bad_request("package file is required");
    };

    match state
        .registry
        .save(&owner, &name, &version, bytes.as_ref(), &filename)
    {
        Ok(record) => (
            StatusCode::CREATED,
            Json(ArtifactResponse::from_record(record, &headers)),
        )
            .into_response(),
        Err(e) => registry_error(&e),
    }
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub owner: Option<String>,
}

/// GET /v1/artifacts
pub async fn list_artifacts(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Response {
    let records = state.registry.list(params.owner.as_deref());
    let resp: Vec<ArtifactResponse> = records
        .into_iter()
        .map(|r| ArtifactResponse::from_record(r, &headers))
        .collect();
    Json(resp).into_response()
}

/// GET /v1/artifacts/{id}
pub async fn get_artifact(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    match state.registry.get(&id) {
        Some(record) => Json(ArtifactResponse::from_record(record, &headers)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "not found" })),
        )
            .into_response(),
    }
}

/// GET /v1/artifacts/{id}/download - stream the blob bytes
pub async fn download_artifact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let (record, file) = match state.registry.open_blob(&id) {
        Ok(Some(found)) => found,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": "not found" })),
            )
                .into_response();
        }
        Err(e) => return registry_error(&e),
    };

    let stream = ReaderStream::new(tokio::fs::File::from_std(file));
    let filename = format!("{}.{BLOB_EXT}", sanitize_filename(&record.name));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_LENGTH, record.size)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(Body::from_stream(stream))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
