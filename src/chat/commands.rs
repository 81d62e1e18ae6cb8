//! Slash commands understood by the chat prompt

/// Parsed chat input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Help,
    Quit,
    Upload { path: String },
    Text { content: String },
    Scope { name: Option<String> },
    Fresh { enable: Option<bool> },
    Reset,
    Ask { question: String },
    Invalid { message: String },
    Empty,
}

impl ChatCommand {
    /// Anything not starting with `/` is a question
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return ChatCommand::Empty;
        }
        let Some(body) = trimmed.strip_prefix('/') else {
            return ChatCommand::Ask {
                question: trimmed.to_string(),
            };
        };

        let (name, rest) = match body.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (body, ""),
        };

        match name.to_lowercase().as_str() {
            "help" | "h" => ChatCommand::Help,
            "quit" | "exit" | "q" => ChatCommand::Quit,
            "upload" | "u" if !rest.is_empty() => ChatCommand::Upload {
                path: rest.to_string(),
            },
            "upload" | "u" => ChatCommand::Invalid {
                message: "Usage: /upload <path>".to_string(),
            },
            "text" | "paste" if !rest.is_empty() => ChatCommand::Text {
                content: rest.to_string(),
            },
            "text" | "paste" => ChatCommand::Invalid {
                message: "Usage: /text <content>".to_string(),
            },
            "scope" => ChatCommand::Scope {
                name: (!rest.is_empty()).then(|| rest.to_string()),
            },
            "fresh" => match rest.to_lowercase().as_str() {
                "" => ChatCommand::Fresh { enable: None },
                "on" | "true" | "1" => ChatCommand::Fresh { enable: Some(true) },
                "off" | "false" | "0" => ChatCommand::Fresh { enable: Some(false) },
                _ => ChatCommand::Invalid {
                    message: "Usage: /fresh on|off".to_string(),
                },
            },
            "reset" => ChatCommand::Reset,
            _ => ChatCommand::Invalid {
                message: format!("Unknown command: /{}", name),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_questions_and_empty() {
        assert_eq!(ChatCommand::parse("   "), ChatCommand::Empty);
        assert_eq!(
            ChatCommand::parse(" What is RAG? "),
            ChatCommand::Ask {
                question: "What is RAG?".to_string()
            }
        );
    }

    #[test]
    fn test_upload_keeps_spaces_in_path() {
        assert_eq!(
            ChatCommand::parse("/upload my docs/report v2.pdf"),
            ChatCommand::Upload {
                path: "my docs/report v2.pdf".to_string()
            }
        );
        assert!(matches!(ChatCommand::parse("/upload"), ChatCommand::Invalid { .. }));
    }

    #[test]
    fn test_scope_and_fresh() {
        assert_eq!(
            ChatCommand::parse("/scope team-a"),
            ChatCommand::Scope {
                name: Some("team-a".to_string())
            }
        );
        assert_eq!(ChatCommand::parse("/scope"), ChatCommand::Scope { name: None });
        assert_eq!(ChatCommand::parse("/fresh ON"), ChatCommand::Fresh { enable: Some(true) });
        assert_eq!(ChatCommand::parse("/fresh off"), ChatCommand::Fresh { enable: Some(false) });
        assert!(matches!(ChatCommand::parse("/fresh maybe"), ChatCommand::Invalid { .. }));
    }

    #[test]
    fn test_misc_commands() {
        assert_eq!(ChatCommand::parse("/HELP"), ChatCommand::Help);
        assert_eq!(ChatCommand::parse("/quit"), ChatCommand::Quit);
        assert_eq!(ChatCommand::parse("/reset"), ChatCommand::Reset);
        assert_eq!(
            ChatCommand::parse("/text hello world"),
            ChatCommand::Text {
                content: "hello world".to_string()
            }
        );
        assert!(matches!(ChatCommand::parse("/bogus"), ChatCommand::Invalid { .. }));
    }
}
