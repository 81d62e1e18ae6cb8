//! End-to-end pipeline tests with in-memory storage and fake models

mod common;

use std::sync::Arc;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

use common::{docx_bytes, pipeline, ScriptedModel};
use minirag::llm::ChatModel;
use minirag::rag::pipeline::NO_CONTEXT_ANSWER;
use minirag::RagError;

const HANDBOOK: &str = "Vacation policy. Employees receive twenty five days of paid vacation per year.\n\n\
Expense policy. Travel expenses must be submitted within thirty days with receipts.\n\n\
Remote work policy. Staff may work remotely three days per week with manager approval.\n\n\
Security policy. Laptops must use full disk encryption and a screen lock.\n\n\
Equipment policy. New hires receive a laptop, monitor and headset on their first day.";

#[tokio::test]
async fn test_ingest_and_query_with_citations() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("handbook.txt");
    std::fs::write(&path, HANDBOOK).unwrap();

    let model = Arc::new(ScriptedModel::answering("Employees get twenty five days [1]."));
    let p = pipeline(Some(model.clone() as Arc<dyn ChatModel>));

    let report = assert_ok!(p.ingest_file(&path, Some("hr")).await);
    assert!(report.chunks >= 2);
    assert_eq!(report.source, "handbook.txt");

    let response = assert_ok!(p.query("How many vacation days do employees receive?", Some("hr")).await);
    assert_eq!(response.answer, "Employees get twenty five days [1].");
    assert!(!response.citations.is_empty());
    assert!(response.citations.len() <= 4);
    assert!(response.metrics.retrieved >= response.citations.len());

    for (i, citation) in response.citations.iter().enumerate() {
        assert_eq!(citation.marker, format!("[{}]", i + 1));
        assert_eq!(citation.source, "handbook.txt");
        assert_eq!(citation.chunk_id, format!("hr:handbook.txt:{}", citation.position));
        assert!(citation.snippet.chars().count() <= 400);
    }
    assert!(response.citations[0].snippet.contains("vacation"));

    let calls = model.calls.lock().unwrap();
    assert!(calls[0].starts_with("Context:\n[1] (source: handbook.txt"));
}

#[tokio::test]
async fn test_scopes_are_isolated() {
    let dir = TempDir::new().unwrap();
    let model = Arc::new(ScriptedModel::answering("ok"));
    let p = pipeline(Some(model.clone() as Arc<dyn ChatModel>));

    assert_ok!(p.ingest_text("Apples are red fruit grown in orchards.", Some("a"), dir.path()).await);
    assert_ok!(p.ingest_text("Apples of scope b are green.", Some("b"), dir.path()).await);

    let response = assert_ok!(p.query("What colour are apples?", Some("a")).await);
    assert!(response.citations.iter().all(|c| c.chunk_id.starts_with("a:")));

    assert_ok!(p.reset_scope(Some("a")).await);
    assert_eq!(assert_ok!(p.scope_size(Some("a")).await), 0);
    assert_eq!(assert_ok!(p.scope_size(Some("b")).await), 1);

    let calls_before = model.call_count();
    let empty = assert_ok!(p.query("What colour are apples?", Some("a")).await);
    assert_eq!(empty.answer, NO_CONTEXT_ANSWER);
    assert!(empty.citations.is_empty());
    assert_eq!(model.call_count(), calls_before);
}

#[tokio::test]
async fn test_docx_ingest() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.docx");
    std::fs::write(&path, docx_bytes(&["First heading", "Body text about Rust ownership."])).unwrap();

    let p = pipeline(None);
    let report = assert_ok!(p.ingest_file(&path, None).await);
    assert_eq!(report.scope, "default");
    assert_eq!(report.message, format!("Indexed {} chunks for notes.docx in scope 'default'.", report.chunks));
}

#[tokio::test]
async fn test_unsupported_and_empty_files() {
    let dir = TempDir::new().unwrap();
    let p = pipeline(None);

    let exe = dir.path().join("tool.exe");
    std::fs::write(&exe, b"MZ").unwrap();
    let err = assert_err!(p.ingest_file(&exe, None).await);
    assert!(matches!(err, RagError::UnsupportedFile { .. }));

    let blank = dir.path().join("blank.txt");
    std::fs::write(&blank, "   \n\n  ").unwrap();
    let err = assert_err!(p.ingest_file(&blank, None).await);
    assert!(matches!(err, RagError::EmptyDocument(_)));
}

#[tokio::test]
async fn test_llm_errors_propagate() {
    let dir = TempDir::new().unwrap();
    let model = Arc::new(ScriptedModel::failing(|| RagError::LlmModelUnsupported));
    let p = pipeline(Some(model as Arc<dyn ChatModel>));
    assert_ok!(p.ingest_text("Some indexed content here.", None, dir.path()).await);

    let err = assert_err!(p.query("content?", None).await);
    assert_eq!(err.to_string(), "Groq model deprecated/unsupported. Update GROQ_MODEL_ID.");
}
