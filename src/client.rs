//! HTTP client for a running minirag backend
//!
//! Used by the terminal chat; mirrors the server routes one to one.

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::document::FileKind;
use crate::errors::{RagError, Result};
use crate::rag::{IngestReport, QueryResponse};

/// Default backend address
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";

/// Uploads and queries can wait on model inference and the LLM
const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// Backend status from `GET /`
#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

/// minirag backend client
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET /
    pub async fn health(&self) -> Result<HealthStatus> {
        let response = self.client.get(format!("{}/", self.base_url)).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// POST /upload with the file as multipart field `file`
    pub async fn upload_file(&self, path: &Path, scope: &str, fresh: bool) -> Result<IngestReport> {
        let kind = FileKind::from_path(path)?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        let bytes = tokio::fs::read(path).await?;
        debug!(file = %file_name, bytes = bytes.len(), scope, "uploading file");

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime_for(kind))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(format!("{}/upload", self.base_url))
            .query(&[("scope", scope), ("fresh", if fresh { "true" } else { "false" })])
            .multipart(form)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// POST /upload_text
    pub async fn upload_text(&self, text: &str, scope: &str, fresh: bool) -> Result<IngestReport> {
        let response = self
            .client
            .post(format!("{}/upload_text", self.base_url))
            .json(&json!({ "text": text, "scope": scope, "fresh": fresh }))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// POST /query
    pub async fn query(&self, question: &str, scope: &str) -> Result<QueryResponse> {
        let response = self
            .client
            .post(format!("{}/query", self.base_url))
            .json(&json!({ "question": question, "scope": scope }))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// POST /reset
    pub async fn reset(&self, scope: &str) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/reset", self.base_url))
            .json(&json!({ "scope": scope }))
            .send()
            .await?;
        let body: MessageBody = Self::check(response).await?.json().await?;
        Ok(body.message)
    }

    /// Turn a non-success response into [`RagError::Backend`]
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .map(|e| e.detail)
            .unwrap_or(body);

        Err(RagError::Backend {
            status: status.as_u16(),
            detail,
        })
    }
}

fn mime_for(kind: FileKind) -> &'static str {
    match kind {
        FileKind::Text => "text/plain",
        FileKind::Pdf => "application/pdf",
        FileKind::Docx => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    }
}
