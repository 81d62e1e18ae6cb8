//! minirag - CLI entry point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::Path;
use tracing::debug;

use minirag::chat::{display, ChatSession};
use minirag::cli::{Args, Commands, Verbosity};
use minirag::client::BackendClient;
use minirag::{server, telemetry, Config, RagPipeline};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let verbosity = args.verbosity();
    telemetry::init(verbosity);

    let mut config = Config::load(args.config.clone()).context("Failed to load configuration")?;
    debug!(verbosity = verbosity.as_str(), "configuration loaded");

    match args.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            server::serve(&config).await?;
        }
        Commands::Ingest { file, scope, fresh } => {
            let pipeline = load_pipeline(&config, verbosity).await?;
            if fresh {
                pipeline.reset_scope(scope.as_deref()).await?;
            }
            let report = pipeline
                .ingest_file(&file, scope.as_deref())
                .await
                .with_context(|| format!("Failed to ingest {}", file.display()))?;
            display::show_ingest(&report);
        }
        Commands::IngestText { text, scope, fresh } => {
            config.ensure_dirs()?;
            let pipeline = load_pipeline(&config, verbosity).await?;
            if fresh {
                pipeline.reset_scope(scope.as_deref()).await?;
            }
            let report = pipeline
                .ingest_text(&text, scope.as_deref(), &config.upload_dir())
                .await?;
            display::show_ingest(&report);
        }
        Commands::Ask { question, scope, json } => {
            let pipeline = load_pipeline(&config, verbosity).await?;
            let response = pipeline.query(&question, scope.as_deref()).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                display::show_answer(&response);
            }
        }
        Commands::Reset { scope } => {
            let pipeline = load_pipeline(&config, verbosity).await?;
            let scope = pipeline.reset_scope(scope.as_deref()).await?;
            println!("Cleared scope '{}'.", scope);
        }
        Commands::Chat { backend, scope } => {
            let client = BackendClient::new(&backend)?;
            let history = dirs::home_dir().map(|home| home.join(".minirag").join("chat_history"));
            ChatSession::new(client, scope.as_deref()).run(history).await?;
        }
        Commands::Config { init } => {
            if init {
                init_config(args.config.as_deref())?;
            } else {
                show_config(&config)?;
            }
        }
    }

    Ok(())
}

/// Load models and connect storage, with a spinner unless quiet
async fn load_pipeline(config: &Config, verbosity: Verbosity) -> Result<RagPipeline> {
    let pb = verbosity
        .show_progress()
        .then(|| display::spinner("Loading models..."));
    let result = RagPipeline::from_config(config).await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    result.context("Failed to initialise RAG pipeline")
}

fn init_config(path: Option<&Path>) -> Result<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => Config::default_path().context("Could not determine home directory")?,
    };

    if path.exists() {
        println!("{} {}", "Config already exists:".yellow(), path.display());
        return Ok(());
    }

    Config::default().save(&path)?;
    println!("{} {}", "Wrote default config to".green(), path.display());
    Ok(())
}

fn show_config(config: &Config) -> Result<()> {
    let mut shown = config.clone();
    if !shown.llm.api_key.is_empty() {
        shown.llm.api_key = "********".to_string();
    }

    println!("{}", "minirag configuration".bold().cyan());
    if let Some(path) = Config::default_path() {
        println!("{}", format!("default file: {}", path.display()).dimmed());
    }
    println!();
    println!("{}", toml::to_string_pretty(&shown)?);
    Ok(())
}
