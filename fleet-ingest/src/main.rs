//! fleet-ingest - equipment import reconciliation CLI
//!
//! `plan` shows what a batch would do against the registry; `commit` writes
//! it non-interactively with the initial modes.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fleet_common::config::{load_toml_config, resolve_config_path, resolve_database_path};
use fleet_ingest::db::{init_database, SqliteRecordStore};
use fleet_ingest::models::{ExtractionBatch, ImportMode};
use fleet_ingest::{CommitExecutor, CommitOptions, ImportSession, MatchPolicy};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "fleet-ingest")]
#[command(about = "Reconcile extracted equipment records against the fleet registry")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// SQLite fleet database
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print initial modes, verdicts, backfills and fragment groups
    Plan {
        /// Extraction batch (JSON)
        batch: PathBuf,
    },
    /// Commit the batch with its initial modes
    Commit {
        /// Extraction batch (JSON)
        batch: PathBuf,

        /// Merge every suggested fragment group first
        #[arg(long)]
        merge_fragments: bool,

        /// Skip the document pass
        #[arg(long)]
        no_documents: bool,
    },
}

fn read_batch(path: &Path) -> Result<ExtractionBatch> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading batch {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing batch {}", path.display()))
}

fn print_plan(session: &ImportSession) {
    for item in session.items() {
        let verdict = &item.verdict;
        let matched = match (&verdict.matched_display_name, verdict.reason) {
            (Some(name), Some(reason)) => {
                format!(" ({:?} match on {}: {})", verdict.status, reason, name)
            }
            _ => String::new(),
        };
        let selected = if item.selected { "x" } else { " " };
        println!(
            "[{selected}] #{} {} -> {}{}",
            item.batch_index,
            item.display_name(),
            item.mode,
            matched
        );
        for diff in &verdict.backfillable_fields {
            println!("      backfill {}: {}", diff.label, diff.candidate_value);
        }
        if item.mode == ImportMode::Attachment && item.parent().is_none() {
            println!("      attachment has no parent");
        }
    }

    for (idx, group) in session.fragment_groups().iter().enumerate() {
        println!(
            "fragment group {idx}: #{} + {:?} ({})",
            group.primary_index, group.duplicate_indices, group.reason
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());
    let toml_config = load_toml_config(config_path.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| toml_config.logging.level.clone().into()),
        )
        .init();

    info!("Starting fleet-ingest v{}", env!("CARGO_PKG_VERSION"));

    let db_path = resolve_database_path(args.database.as_deref(), &toml_config);
    info!("Database path: {}", db_path.display());
    let pool = init_database(&db_path).await?;
    let store = Arc::new(SqliteRecordStore::new(pool));
    let policy = MatchPolicy::from(&toml_config.import);

    match args.command {
        Command::Plan { batch } => {
            let batch = read_batch(&batch)?;
            let session = ImportSession::load(store.as_ref(), batch, policy).await?;
            print_plan(&session);
        }
        Command::Commit {
            batch,
            merge_fragments,
            no_documents,
        } => {
            let batch = read_batch(&batch)?;
            let mut session = ImportSession::load(store.as_ref(), batch, policy).await?;

            if merge_fragments || toml_config.import.auto_merge_fragments {
                while !session.fragment_groups().is_empty() {
                    session.merge_fragment_group(0)?;
                }
            }

            let attachments: Vec<_> = session
                .items()
                .iter()
                .filter(|i| i.mode == ImportMode::Attachment)
                .map(|i| i.id)
                .collect();
            for id in attachments {
                if let Err(e) = session.refresh_attachment_verdict(id, store.as_ref()).await {
                    warn!("Attachment duplicate check failed: {}", e);
                }
            }

            let mut options = CommitOptions::from(&toml_config.import);
            if no_documents {
                options.attach_documents = false;
            }

            let summary = CommitExecutor::with_options(store.clone(), options)
                .commit(&session)
                .await?;

            println!("{}", summary.title());
            println!("{}", summary.message());
        }
    }

    Ok(())
}
