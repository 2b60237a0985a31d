//! Project Memory - persistent memory for coding assistant sessions
//!
//! `serve` exposes the memory tools over stdio; `session-end` distills a
//! finished session's transcript into a stored summary.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use project_memory::{
    config::MemoryConfig,
    distill::{AnthropicSummarizer, Distiller},
    memory::ProjectMemory,
    server::ToolServer,
    tools::MemoryTools,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "project-memory")]
#[command(version)]
#[command(about = "Persistent per-project memory for coding assistant sessions")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "PROJECT_MEMORY_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the memory tools over stdio
    Serve {
        /// Project directory (defaults to the current directory)
        #[arg(long)]
        project_dir: Option<PathBuf>,
    },

    /// Summarize a finished session; reads the trigger payload from stdin
    SessionEnd,

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Stdout belongs to the protocol, so logs go to stderr
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("project_memory={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = MemoryConfig::load(cli.config.as_deref());

    match cli.command {
        Commands::Serve { project_dir } => {
            let config = config?;
            let project_dir = match project_dir {
                Some(dir) => dir,
                None => std::env::current_dir().context("Failed to resolve current directory")?,
            };
            run_server(config, &project_dir).await?;
        }
        Commands::SessionEnd => match config {
            Ok(config) => run_session_end(config).await,
            Err(e) => tracing::error!(error = %e, "Session distillation skipped: bad configuration"),
        },
        Commands::Config { default } => {
            let config = if default {
                MemoryConfig::default()
            } else {
                config?
            };
            show_config(&config)?;
        }
    }

    Ok(())
}

async fn run_server(config: MemoryConfig, project_dir: &Path) -> Result<()> {
    let root = config.storage.memory_root(project_dir);
    std::fs::create_dir_all(&root)
        .with_context(|| format!("Failed to create memory directory {}", root.display()))?;

    let memory = ProjectMemory::open(&root, &config)?;
    tracing::info!(root = %memory.root().display(), "Serving project memory");
    let server = ToolServer::new(MemoryTools::new(memory, config.tools.clone()));
    server.serve_stdio().await?;
    Ok(())
}

/// Never fails: every problem is logged and the process still exits 0.
async fn run_session_end(config: MemoryConfig) {
    let mut raw = String::new();
    if let Err(e) = tokio::io::stdin().read_to_string(&mut raw).await {
        tracing::error!(error = %e, "Failed to read session-end payload");
        return;
    }

    let summarizer = Arc::new(AnthropicSummarizer::from_config(&config.summarizer));
    Distiller::with_project_memory(config, summarizer)
        .run_logged(raw)
        .await;
}

fn show_config(config: &MemoryConfig) -> Result<()> {
    let toml = toml::to_string_pretty(config)?;
    println!("{}", toml);
    Ok(())
}
