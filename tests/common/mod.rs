//! Shared fixtures: deterministic embedder, scripted chat model, test server

#![allow(dead_code)]

use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex};

use minirag::embedding::Embedder;
use minirag::llm::ChatModel;
use minirag::rag::{LexicalReranker, PipelineSettings, RagPipeline};
use minirag::server::{app_router, AppState};
use minirag::vector_db::MemoryStore;
use minirag::{RagError, Result};

/// Hashed bag-of-words vectors; texts sharing words are close
pub struct HashEmbedder;

pub const DIM: usize = 64;

impl Embedder for HashEmbedder {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut v = vec![0.001f32; DIM];
                for word in text
                    .to_lowercase()
                    .split(|c: char| !c.is_alphanumeric())
                    .filter(|w| w.len() > 2)
                {
                    let slot = word.bytes().fold(7usize, |h, b| h.wrapping_mul(31).wrapping_add(b as usize));
                    v[slot % DIM] += 1.0;
                }
                v
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        DIM
    }
}

/// Chat model that records prompts and replies with a fixed answer
pub struct ScriptedModel {
    pub reply: std::result::Result<String, fn() -> RagError>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn answering(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(err: fn() -> RagError) -> Self {
        Self {
            reply: Err(err),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, _system: &str, user: &str) -> Result<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(user.to_string());
        }
        match &self.reply {
            Ok(reply) => Ok(reply.clone()),
            Err(make) => Err(make()),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

pub fn settings() -> PipelineSettings {
    PipelineSettings {
        chunk_size: 200,
        chunk_overlap: 20,
        retrieve_k: 12,
        top_n: 4,
        max_context_chars: 12_000,
    }
}

pub fn pipeline(llm: Option<Arc<dyn ChatModel>>) -> RagPipeline {
    RagPipeline::new(
        Arc::new(HashEmbedder),
        Arc::new(MemoryStore::default()),
        Arc::new(LexicalReranker::new()),
        llm,
        settings(),
    )
}

/// Serve `pipeline` on an ephemeral port; returns the base URL
pub async fn spawn_server(
    pipeline: impl Into<Arc<RagPipeline>>,
    upload_dir: &Path,
) -> (String, tokio::task::JoinHandle<()>) {
    let state = AppState {
        pipeline: pipeline.into(),
        upload_dir: upload_dir.to_path_buf(),
    };
    let app = app_router(state, 1024 * 1024);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    (format!("http://{}", addr), handle)
}

/// Minimal .docx with one paragraph per entry
pub fn docx_bytes(paragraphs: &[&str]) -> Vec<u8> {
    use std::io::Write;

    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
        .collect();
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
        body
    );

    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    writer
        .start_file("word/document.xml", zip::write::SimpleFileOptions::default())
        .expect("start docx entry");
    writer.write_all(xml.as_bytes()).expect("write docx xml");
    writer.finish().expect("finish docx").into_inner()
}
