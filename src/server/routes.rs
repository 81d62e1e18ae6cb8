// HTTP handlers for ingestion and question answering
use axum::extract::rejection::JsonRejection;
use axum::extract::multipart::Field;
use axum::extract::{Multipart, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::document::{normalize_scope, safe_filename, validate_upload};
use crate::errors::RagError;
use crate::rag::{IngestReport, QueryResponse};
use crate::server::error::ApiError;
use crate::server::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UploadParams {
    pub scope: Option<String>,
    pub fresh: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UploadTextRequest {
    pub text: String,
    pub scope: Option<String>,
    pub fresh: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct QueryRequest {
    pub question: Option<String>,
    pub scope: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResetRequest {
    pub scope: Option<String>,
}

/// GET /
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "message": "Mini RAG backend running" }))
}

/// POST /upload?scope=&fresh=
///
/// Multipart body with a `file` field.
pub async fn upload(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    mut multipart: Multipart,
) -> Result<Json<IngestReport>, ApiError> {
    let scope = normalize_scope(params.scope.as_deref());

    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let original = field.file_name().unwrap_or("upload").to_string();
        let mime = field.content_type().unwrap_or("").to_string();
        validate_upload(&original, &mime)?;

        tokio::fs::create_dir_all(&state.upload_dir).await?;
        let path = state.upload_dir.join(safe_filename(&original));
        let written = match save_field(&mut field, &path).await {
            Ok(written) => written,
            Err(e) => {
                if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                    warn!(path = %path.display(), error = %remove_err, "failed to remove partial upload");
                }
                return Err(e);
            }
        };
        debug!(path = %path.display(), bytes = written, "upload saved");

        if params.fresh {
            state.pipeline.reset_scope(Some(&scope)).await?;
        }

        let report = state.pipeline.ingest_file(&path, Some(&scope)).await?;
        info!(source = %report.source, scope = %report.scope, chunks = report.chunks, "upload indexed");
        return Ok(Json(report));
    }

    Err(RagError::InvalidInput("A file is required.".to_string()).into())
}

/// Stream a multipart field to `path`, returning the bytes written
async fn save_field(field: &mut Field<'_>, path: &Path) -> Result<usize, ApiError> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0usize;
    while let Some(bytes) = field.chunk().await? {
        written += bytes.len();
        file.write_all(&bytes).await?;
    }
    file.flush().await?;
    Ok(written)
}

/// POST /upload_text
pub async fn upload_text(
    State(state): State<AppState>,
    payload: Result<Json<UploadTextRequest>, JsonRejection>,
) -> Result<Json<IngestReport>, ApiError> {
    let Json(request) = payload?;
    if request.text.trim().is_empty() {
        return Err(RagError::InvalidInput("Text is required.".to_string()).into());
    }

    let scope = normalize_scope(request.scope.as_deref());
    if request.fresh {
        state.pipeline.reset_scope(Some(&scope)).await?;
    }

    let report = state
        .pipeline
        .ingest_text(&request.text, Some(&scope), &state.upload_dir)
        .await?;
    Ok(Json(report))
}

/// POST /query
pub async fn query(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let Json(request) = payload?;
    let question = request.question.unwrap_or_default();

    let response = state
        .pipeline
        .query(&question, request.scope.as_deref())
        .await?;
    Ok(Json(response))
}

/// POST /reset
pub async fn reset(
    State(state): State<AppState>,
    payload: Result<Json<ResetRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload?;
    let scope = state.pipeline.reset_scope(request.scope.as_deref()).await?;
    Ok(Json(json!({ "message": format!("Cleared scope '{}'.", scope) })))
}
