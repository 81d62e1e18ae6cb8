//! Line editing for the chat prompt (rustyline)

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;

/// What the user did at the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Line(String),
    /// Ctrl-C: abandon the current line
    Interrupted,
    /// Ctrl-D
    Eof,
}

/// Readline interface with optional persistent history
pub struct InputHandler {
    editor: DefaultEditor,
    history_path: Option<PathBuf>,
}

impl InputHandler {
    pub fn new() -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
            history_path: None,
        })
    }

    /// History file is loaded now and written by [`InputHandler::save_history`]
    pub fn with_history(history_file: PathBuf) -> Result<Self> {
        let mut editor = DefaultEditor::new()?;
        if history_file.exists() {
            let _ = editor.load_history(&history_file);
        }
        Ok(Self {
            editor,
            history_path: Some(history_file),
        })
    }

    pub fn read_line(&mut self, prompt: &str) -> Result<InputEvent> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    let _ = self.editor.add_history_entry(trimmed);
                }
                Ok(InputEvent::Line(trimmed.to_string()))
            }
            Err(ReadlineError::Interrupted) => Ok(InputEvent::Interrupted),
            Err(ReadlineError::Eof) => Ok(InputEvent::Eof),
            Err(err) => Err(anyhow::anyhow!("Readline error: {}", err)),
        }
    }

    pub fn save_history(&mut self) -> Result<()> {
        if let Some(ref path) = self.history_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            self.editor.save_history(path)?;
        }
        Ok(())
    }
}
