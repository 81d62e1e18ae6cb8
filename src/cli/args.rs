//! Command-line argument parsing for minirag
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::client::DEFAULT_BACKEND_URL;

/// minirag - retrieval-augmented Q&A over your own documents
#[derive(Parser, Debug)]
#[command(name = "minirag")]
#[command(author, version)]
#[command(about = "Upload documents, ask questions, get answers with citations", long_about = None)]
pub struct Args {
    /// Configuration file path (default: ~/.minirag/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (warnings and errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Start the HTTP backend
    Serve {
        /// Override the bind host
        #[arg(long)]
        host: Option<String>,

        /// Override the bind port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Index a .txt, .pdf or .docx file
    Ingest {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(short, long)]
        scope: Option<String>,

        /// Clear the scope before indexing
        #[arg(long)]
        fresh: bool,
    },

    /// Index text given on the command line
    IngestText {
        #[arg(value_name = "TEXT")]
        text: String,

        #[arg(short, long)]
        scope: Option<String>,

        /// Clear the scope before indexing
        #[arg(long)]
        fresh: bool,
    },

    /// Ask a question against the indexed documents
    Ask {
        #[arg(value_name = "QUESTION")]
        question: String,

        #[arg(short, long)]
        scope: Option<String>,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// Delete everything indexed in a scope
    Reset {
        #[arg(short, long)]
        scope: Option<String>,
    },

    /// Interactive chat against a running backend
    Chat {
        /// Backend base URL
        #[arg(long, default_value = DEFAULT_BACKEND_URL)]
        backend: String,

        #[arg(short, long)]
        scope: Option<String>,
    },

    /// Display current configuration
    Config {
        /// Write the default configuration file if none exists
        #[arg(long)]
        init: bool,
    },
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }
}

impl Verbosity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
            Verbosity::VeryVerbose => "very_verbose",
        }
    }

    /// Default tracing filter when `RUST_LOG` is unset
    pub fn log_filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "warn",
            Verbosity::Normal => "info,minirag=info",
            Verbosity::Verbose => "info,minirag=debug,tower_http=debug",
            Verbosity::VeryVerbose => "debug,minirag=trace",
        }
    }

    /// Check if should show progress spinners
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }
}
