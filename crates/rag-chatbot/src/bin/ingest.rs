//! Command-line document ingestion
//!
//! Run with: cargo run -p rag-chatbot --bin rag-chatbot-ingest -- --file data/knowledge_base.txt

use anyhow::{bail, Context};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rag_chatbot::{
    config::{RagConfig, VectorBackend},
    providers::PineconeAdmin,
    server::state::build_pipeline,
    types::query::validate_source_id,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const INDEX_READY_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Parser)]
#[command(name = "rag-chatbot-ingest")]
#[command(
    version,
    about = "Ingest text documents into the chatbot's vector index",
    long_about = None
)]
struct Cli {
    /// Text files to ingest
    #[arg(short, long = "file", required = true, num_args = 1..)]
    files: Vec<PathBuf>,

    /// Source id for a single file (defaults to the file stem)
    #[arg(long)]
    source_id: Option<String>,

    /// Maximum tokens per chunk
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Tokens shared by consecutive chunks
    #[arg(long)]
    overlap: Option<usize>,

    /// Delete and recreate the index before ingesting
    #[arg(long)]
    reset: bool,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rag_chatbot=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = RagConfig::load(cli.config.as_deref())?;
    if let Some(chunk_size) = cli.chunk_size {
        config.chunking.max_tokens = chunk_size;
    }
    if let Some(overlap) = cli.overlap {
        config.chunking.overlap_tokens = overlap;
    }
    config.validate()?;

    if cli.source_id.is_some() && cli.files.len() > 1 {
        bail!("--source-id can only be used with a single --file");
    }

    let mut documents = Vec::with_capacity(cli.files.len());
    for path in &cli.files {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let source_id = match &cli.source_id {
            Some(id) => id.clone(),
            None => default_source_id(path)?,
        };
        validate_source_id(&source_id)?;
        documents.push((source_id, text));
    }

    if config.vector_store.backend == VectorBackend::Pinecone {
        let admin = PineconeAdmin::new(&config)?;
        let name = &config.vector_store.index_name;
        if cli.reset {
            tracing::info!("Resetting index '{}'...", name);
            admin.reset_index(&config, INDEX_READY_TIMEOUT).await?;
        } else {
            admin.ensure_index(&config, INDEX_READY_TIMEOUT).await?;
        }
        tracing::info!("Pinecone index '{}' is ready", name);
    } else if cli.reset {
        tracing::warn!("--reset has no effect with the in-memory backend");
    }

    let pipeline = build_pipeline(config).await?;

    let progress = ProgressBar::new_spinner();
    progress.set_style(ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")?);
    progress.enable_steady_tick(Duration::from_millis(120));
    progress.set_message(format!("Ingesting {} document(s)", documents.len()));

    let results = pipeline.ingest_many(documents).await;
    progress.finish_and_clear();

    let mut stored = 0;
    let mut failed = 0;
    for (source_id, result) in results {
        match result {
            Ok(report) => {
                stored += report.chunks_stored;
                if report.is_complete() {
                    tracing::info!("{}: {} chunks stored", source_id, report.chunks_stored);
                } else {
                    failed += 1;
                    for batch in &report.failed_batches {
                        tracing::warn!(
                            "{}: batch {} failed ({} records): {}",
                            source_id,
                            batch.batch_index,
                            batch.record_ids.len(),
                            batch.error
                        );
                    }
                }
            }
            Err(e) => {
                failed += 1;
                tracing::error!("{}: {}", source_id, e);
            }
        }
    }

    tracing::info!(
        "Ingested {} vectors into '{}'",
        stored,
        pipeline.config().vector_store.index_name
    );
    if failed > 0 {
        bail!("{} document(s) were not fully ingested", failed);
    }
    Ok(())
}

fn default_source_id(path: &Path) -> anyhow::Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| {
            s.replace(
                |c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')),
                "_",
            )
        })
        .filter(|s| !s.is_empty())
        .with_context(|| format!("cannot derive a source id from {}", path.display()))
}
