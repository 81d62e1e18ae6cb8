//! Terminal chat client for a running backend
//!
//! Keeps the active scope and the "fresh" toggle between turns, the way a
//! browser session would.

pub mod commands;
pub mod display;
pub mod input;

use anyhow::Result;
use std::path::PathBuf;
use tracing::debug;

use crate::client::BackendClient;
use crate::document::normalize_scope;
use crate::errors::RagError;

pub use commands::ChatCommand;
pub use input::{InputEvent, InputHandler};

/// Interactive chat loop state
pub struct ChatSession {
    client: BackendClient,
    scope: String,
    fresh: bool,
}

impl ChatSession {
    pub fn new(client: BackendClient, scope: Option<&str>) -> Self {
        Self {
            client,
            scope: normalize_scope(scope),
            fresh: false,
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn fresh(&self) -> bool {
        self.fresh
    }

    /// Run until `/quit` or Ctrl-D
    pub async fn run(&mut self, history_file: Option<PathBuf>) -> Result<()> {
        let mut input = match history_file {
            Some(path) => InputHandler::with_history(path)?,
            None => InputHandler::new()?,
        };

        display::show_banner(env!("CARGO_PKG_VERSION"), self.client.base_url(), &self.scope);
        match self.client.health().await {
            Ok(health) => display::show_info(&health.message),
            Err(e) => display::show_error(&format!("Backend not reachable: {}", e)),
        }

        loop {
            let prompt = format!("[{}]> ", self.scope);
            let event = tokio::task::block_in_place(|| input.read_line(&prompt))?;
            let line = match event {
                InputEvent::Line(line) => line,
                InputEvent::Interrupted => continue,
                InputEvent::Eof => break,
            };

            if !self.handle(ChatCommand::parse(&line)).await {
                break;
            }
        }

        input.save_history()?;
        Ok(())
    }

    /// Execute one command; returns false when the session should end
    pub async fn handle(&mut self, command: ChatCommand) -> bool {
        debug!(?command, scope = %self.scope, "chat command");
        match command {
            ChatCommand::Empty => {}
            ChatCommand::Help => display::show_help(),
            ChatCommand::Quit => {
                display::show_info("Goodbye!");
                return false;
            }
            ChatCommand::Scope { name: None } => {
                display::show_info(&format!("Active scope: {}", self.scope));
            }
            ChatCommand::Scope { name: Some(name) } => {
                self.scope = normalize_scope(Some(&name));
                display::show_info(&format!("Switched to scope '{}'.", self.scope));
            }
            ChatCommand::Fresh { enable } => {
                if let Some(enable) = enable {
                    self.fresh = enable;
                }
                let state = if self.fresh { "on" } else { "off" };
                display::show_info(&format!("Fresh uploads: {}", state));
            }
            ChatCommand::Upload { path } => {
                let pb = display::spinner("Indexing file...");
                let result = self
                    .client
                    .upload_file(&PathBuf::from(&path), &self.scope, self.fresh)
                    .await;
                pb.finish_and_clear();
                self.report(result.map(|r| display::show_ingest(&r)));
            }
            ChatCommand::Text { content } => {
                let pb = display::spinner("Indexing text...");
                let result = self.client.upload_text(&content, &self.scope, self.fresh).await;
                pb.finish_and_clear();
                self.report(result.map(|r| display::show_ingest(&r)));
            }
            ChatCommand::Reset => {
                let result = self.client.reset(&self.scope).await;
                self.report(result.map(|message| display::show_info(&message)));
            }
            ChatCommand::Ask { question } => {
                let pb = display::spinner("Thinking...");
                let result = self.client.query(&question, &self.scope).await;
                pb.finish_and_clear();
                self.report(result.map(|r| display::show_answer(&r)));
            }
            ChatCommand::Invalid { message } => {
                display::show_error(&message);
                println!("Type /help for available commands");
            }
        }
        true
    }

    fn report(&self, result: std::result::Result<(), RagError>) {
        if let Err(e) = result {
            let message = match e {
                RagError::Backend { detail, .. } => detail,
                other => other.to_string(),
            };
            display::show_error(&message);
        }
    }
}
