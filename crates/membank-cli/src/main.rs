//! membank: command-line tool for the memory bank tag index.
//!
//! Rebuilds indexes and runs tag queries against a memory bank on disk.
//! Locations come from `MEMBANK_*` environment variables (a `.env` file is
//! honoured) or `--root`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use membank_core::{IndexScope, MemoryBankConfig, Tag};
use membank_index::{TagIndexService, UpdateIndexOptions};
use membank_store::{FileDocumentStore, LocalFileSystem};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "membank")]
#[command(author, version, about = "Tag index tools for the memory bank")]
#[command(propagate_version = true)]
struct Cli {
    /// Docs root holding branch-memory-bank/ and global-memory-bank/
    /// (overrides MEMBANK_ROOT)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild a scope's tag index from its documents
    Rebuild {
        /// Branch name (default: global memory bank)
        #[arg(short, long)]
        branch: Option<String>,
    },

    /// Find documents by tag
    Search {
        /// Comma-separated tags
        #[arg(short, long, required = true, value_delimiter = ',')]
        tags: Vec<String>,

        /// Require every tag instead of any
        #[arg(long)]
        all: bool,

        /// Branch name (default: global memory bank)
        #[arg(short, long)]
        branch: Option<String>,

        /// Print full documents as JSON
        #[arg(long)]
        json: bool,
    },

    /// List tags with document counts
    Tags {
        /// Branch name (default: global memory bank)
        #[arg(short, long)]
        branch: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let _log_guard = init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initialize tracing on stderr, or a daily rolling file.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   LOG_FILE    - path to log file (optional)
///   RUST_LOG    - standard env filter (default: "membank=info")
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "membank=info,membank_core=info,membank_store=info,membank_index=info".into()
    });
    let registry = tracing_subscriber::registry().with(env_filter);

    if let Some(ref path) = log_file {
        let file_dir = Path::new(path).parent().unwrap_or(Path::new("."));
        let file_name = Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("membank.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(non_blocking))
                .init();
        } else {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false),
                )
                .init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        } else {
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
        None
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = MemoryBankConfig::from_env().context("invalid MEMBANK_* configuration")?;
    if let Some(root) = cli.root {
        let rooted = MemoryBankConfig::with_root(root);
        config.branch_root = rooted.branch_root;
        config.global_root = rooted.global_root;
    }
    debug!(
        branch_root = %config.branch_root.display(),
        global_root = %config.global_root.display(),
        "Using memory bank"
    );

    let fs = Arc::new(LocalFileSystem::new());
    let documents = Arc::new(FileDocumentStore::new(fs.clone(), config.clone()));
    let service = TagIndexService::new(fs, documents, config);

    match cli.command {
        Commands::Rebuild { branch } => cmd_rebuild(&service, branch.as_deref()).await,
        Commands::Search {
            tags,
            all,
            branch,
            json,
        } => cmd_search(&service, &tags, all, branch.as_deref(), json).await,
        Commands::Tags { branch } => cmd_tags(&service, branch.as_deref()).await,
    }
}

async fn cmd_rebuild(service: &TagIndexService, branch: Option<&str>) -> anyhow::Result<()> {
    let scope = IndexScope::from_branch(branch)?;
    let result = service
        .update_index(&scope, UpdateIndexOptions { full_rebuild: true })
        .await
        .with_context(|| format!("failed to rebuild index for {}", scope))?;

    info!(
        scope = %scope,
        document_count = result.document_count,
        tag_count = result.tags.len(),
        "Rebuild complete"
    );
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn cmd_search(
    service: &TagIndexService,
    raw_tags: &[String],
    all: bool,
    branch: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let scope = IndexScope::from_branch(branch)?;
    let tags = Tag::parse_all(raw_tags.iter().map(|t| t.trim().trim_start_matches('#')))?;

    if json {
        let documents = service.search_documents(&scope, &tags, all).await?;
        println!("{}", serde_json::to_string_pretty(&documents)?);
    } else {
        for path in service.find_documents_by_tags(&scope, &tags, all).await? {
            println!("{}", path);
        }
    }
    Ok(())
}

async fn cmd_tags(service: &TagIndexService, branch: Option<&str>) -> anyhow::Result<()> {
    let scope = IndexScope::from_branch(branch)?;
    for summary in service.list_tags(&scope).await? {
        println!("{}\t{}", summary.tag, summary.document_count);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_search() {
        let cli = Cli::parse_from([
            "membank", "search", "--tags", "a,b", "--all", "--branch", "feature/x",
        ]);
        match cli.command {
            Commands::Search {
                tags, all, branch, json,
            } => {
                assert_eq!(tags, vec!["a", "b"]);
                assert!(all);
                assert_eq!(branch.as_deref(), Some("feature/x"));
                assert!(!json);
            }
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn test_parse_rebuild_with_root() {
        let cli = Cli::parse_from(["membank", "rebuild", "--root", "/tmp/docs"]);
        assert_eq!(cli.root, Some(PathBuf::from("/tmp/docs")));
        assert!(matches!(cli.command, Commands::Rebuild { branch: None }));
    }

    #[test]
    fn test_search_requires_tags() {
        assert!(Cli::try_parse_from(["membank", "search"]).is_err());
    }
}
