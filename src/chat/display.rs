//! Terminal output for the chat client

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::document::Citation;
use crate::rag::{IngestReport, QueryResponse};

/// Longest snippet shown under a source line
const SNIPPET_PREVIEW_CHARS: usize = 240;

pub fn show_banner(version: &str, backend: &str, scope: &str) {
    let width = 64;
    println!("\n{}", "=".repeat(width).cyan());
    println!("{}", format!("  Mini RAG {} - document Q&A", version).bold().cyan());
    println!("{}", format!("  Backend: {} | Scope: {}", backend, scope).dimmed());
    println!("{}\n", "=".repeat(width).cyan());
    println!(
        "Ask a question (or {} for commands, {} to quit)\n",
        "/help".green(),
        "/quit".green()
    );
}

pub fn show_help() {
    println!("{}", "Commands:".bold());
    let rows = [
        ("/upload <path>", "Index a .txt, .pdf or .docx file"),
        ("/text <content>", "Index pasted text"),
        ("/scope [name]", "Show or switch the active scope"),
        ("/fresh on|off", "Clear the scope before the next uploads"),
        ("/reset", "Delete everything indexed in the active scope"),
        ("/help", "Show this help"),
        ("/quit", "Leave the chat"),
    ];
    for (command, description) in rows {
        println!("  {:<18} {}", command.cyan(), description);
    }
    println!("Anything else is sent as a question.\n");
}

/// Spinner shown while the backend works
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg} {elapsed:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub fn show_ingest(report: &IngestReport) {
    println!("{} {}", "✓".green(), report.message);
}

pub fn show_answer(response: &QueryResponse) {
    println!("\n{}\n", response.answer);
    println!(
        "{}",
        format!(
            "({} ms, {} retrieved, {} reranked)",
            response.metrics.latency_ms, response.metrics.retrieved, response.metrics.reranked
        )
        .dimmed()
    );

    if response.citations.is_empty() {
        println!();
        return;
    }

    println!("{}", "Sources:".bold());
    for citation in &response.citations {
        let (header, snippet) = format_source(citation);
        println!("  {}", header.cyan());
        println!("     {}", snippet.dimmed());
    }
    println!();
}

/// Header line and snippet preview for one citation
pub fn format_source(citation: &Citation) -> (String, String) {
    let section = citation
        .section
        .map(|s| format!(", section {}", s))
        .unwrap_or_default();
    let header = format!("{} {}{}", citation.marker, citation.source, section);

    let flat = citation.snippet.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut snippet: String = flat.chars().take(SNIPPET_PREVIEW_CHARS).collect();
    if flat.chars().count() > SNIPPET_PREVIEW_CHARS {
        snippet.push_str("...");
    }
    (header, snippet)
}

pub fn show_info(message: &str) {
    println!("{}", message.cyan());
}

pub fn show_error(error: &str) {
    println!("{} {}", "Error:".red().bold(), error.red());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn citation(section: Option<u32>, snippet: &str) -> Citation {
        Citation {
            marker: "[2]".to_string(),
            source: "guide.pdf".to_string(),
            section,
            chunk_id: "default:guide.pdf:5".to_string(),
            position: 5,
            snippet: snippet.to_string(),
        }
    }

    #[test]
    fn test_format_source_with_section() {
        let (header, snippet) = format_source(&citation(Some(3), "line one\n\nline   two"));
        assert_eq!(header, "[2] guide.pdf, section 3");
        assert_eq!(snippet, "line one line two");
    }

    #[test]
    fn test_format_source_truncates() {
        let (header, snippet) = format_source(&citation(None, &"word ".repeat(100)));
        assert_eq!(header, "[2] guide.pdf");
        assert!(snippet.ends_with("..."));
        assert_eq!(snippet.chars().count(), SNIPPET_PREVIEW_CHARS + 3);
    }
}
