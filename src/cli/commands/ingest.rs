//! Ingest command implementation, plus the document loading shared by `ask` and `chat`.

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use std::path::{Path, PathBuf};

use crate::cli::output::get_formatter;
use crate::cli::progress::ProgressBarSink;
use crate::error::{DocumentError, IndexError, QuotaDiagnostics};
use crate::models::{ChunkingConfig, Config, Document, OutputFormat};
use crate::services::{
    DocumentSession, EmbeddingProvider, GeminiEmbeddingClient, IngestOptions, IngestSummary,
    ProgressSink, TextChunker, batch_count,
};
use crate::utils::{has_extractable_text, read_document};

/// Per-invocation overrides for the `[ingest]` and `[chunking]` config sections.
#[derive(Debug, Clone, Default, Args)]
pub struct IngestTuning {
    #[arg(long, help = "Chunks per embedding call")]
    pub batch_size: Option<usize>,

    #[arg(long, help = "Pause between embedding calls in milliseconds")]
    pub delay_ms: Option<u64>,

    #[arg(long, help = "Maximum chunk size in characters")]
    pub chunk_size: Option<usize>,
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    #[arg(required = true, help = "Text document to ingest")]
    pub file: PathBuf,

    #[command(flatten)]
    pub tuning: IngestTuning,

    #[arg(long, help = "Chunk the document and report embedding calls without calling the provider")]
    pub dry_run: bool,
}

/// A loaded document with the chunker and options it will be ingested with.
pub(super) struct Prepared {
    pub document: Document,
    pub chunker: TextChunker,
    pub options: IngestOptions,
}

pub(super) fn prepare(path: &Path, tuning: &IngestTuning, config: &Config) -> Result<Prepared> {
    let mut options = IngestOptions::from(&config.ingest);
    if let Some(batch_size) = tuning.batch_size {
        if batch_size == 0 {
            anyhow::bail!("batch size must be at least 1");
        }
        options = options.with_batch_size(batch_size);
    }
    if let Some(delay_ms) = tuning.delay_ms {
        options = options.with_inter_batch_delay(std::time::Duration::from_millis(delay_ms));
    }

    let chunking = match tuning.chunk_size {
        Some(0) => anyhow::bail!("chunk size must be at least 1"),
        Some(chunk_size) => ChunkingConfig {
            chunk_size,
            ..config.chunking.clone()
        },
        None => config.chunking.clone(),
    };

    let document = load_document(path, chunking.max_file_size)?;

    Ok(Prepared {
        document,
        chunker: TextChunker::new(&chunking),
        options,
    })
}

fn load_document(path: &Path, max_file_size: u64) -> Result<Document> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    let content = read_document(path, max_file_size)
        .with_context(|| format!("failed to load {}", path.display()))?;

    if !has_extractable_text(&content) {
        return Err(DocumentError::EmptyExtraction(name).into());
    }

    Ok(Document::new(name, content))
}

/// Ingest a prepared document behind a progress bar.
pub(super) async fn build_session(
    prepared: &Prepared,
    provider: &dyn EmbeddingProvider,
    verbose: bool,
) -> Result<DocumentSession> {
    if verbose {
        eprintln!("Document: {}", prepared.document.name);
        eprintln!("  Text length: {} chars", prepared.document.text_length());
        eprintln!(
            "  Chunk size: {} (overlap {})",
            prepared.chunker.chunk_size(),
            prepared.chunker.overlap()
        );
        eprintln!("  Batch size: {}", prepared.options.batch_size);
        eprintln!("  Model: {}", provider.model());
    }

    let sink = ProgressBarSink::new(false);
    let result = DocumentSession::ingest(
        &prepared.document,
        &prepared.chunker,
        provider,
        &prepared.options,
        Some(&sink as &dyn ProgressSink),
    )
    .await;
    sink.finish();

    match result {
        Ok(session) => Ok(session),
        Err(IndexError::QuotaExceeded(diagnostics)) => {
            report_quota_exhausted(
                &diagnostics,
                &prepared.options,
                prepared.chunker.chunk_size(),
            );
            Err(IndexError::QuotaExceeded(diagnostics).into())
        }
        Err(e) => Err(e).context("failed to process document"),
    }
}

fn report_quota_exhausted(diagnostics: &QuotaDiagnostics, options: &IngestOptions, chunk_size: usize) {
    eprintln!("{}", style("Embedding quota exhausted").red().bold());
    eprintln!("  {}", diagnostics);
    eprintln!();
    eprintln!("{}", style("What you can do:").yellow());
    for hint in quota_hints(diagnostics, options, chunk_size) {
        eprintln!("  - {hint}");
    }
}

/// Remediation steps for a quota failure, most useful first.
fn quota_hints(
    diagnostics: &QuotaDiagnostics,
    options: &IngestOptions,
    chunk_size: usize,
) -> Vec<String> {
    let wait = match diagnostics.retry_after {
        Some(wait) => format!(
            "Wait about {}s for the quota to reset, then run the command again",
            wait.as_secs()
        ),
        None => "Wait a minute for the quota to reset, then run the command again".to_string(),
    };

    vec![
        wait,
        format!(
            "Use a larger --chunk-size (currently {chunk_size}) so the document needs fewer chunks"
        ),
        format!(
            "Use a larger --batch-size (currently {}) to make fewer embedding calls",
            options.batch_size
        ),
        format!(
            "Use a longer --delay-ms (currently {}) to spread requests out",
            options.inter_batch_delay.as_millis()
        ),
        "Check your plan and billing limits for the embedding API".to_string(),
    ]
}

pub async fn handle_ingest(args: IngestArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);
    let prepared = prepare(&args.file, &args.tuning, &config)?;

    if args.dry_run {
        let chunks = prepared.chunker.chunk(&prepared.document);
        let summary = IngestSummary {
            document: prepared.document.name.clone(),
            text_length: prepared.document.text_length(),
            chunk_count: chunks.len(),
            chunk_size: prepared.chunker.chunk_size(),
            chunk_overlap: prepared.chunker.overlap(),
            batch_count: batch_count(chunks.len(), prepared.options.batch_size),
            duration_ms: 0,
        };
        print!("{}", formatter.format_dry_run(&summary));
        return Ok(());
    }

    let provider = GeminiEmbeddingClient::new(&config.embedding)?;
    let session = build_session(&prepared, &provider, verbose).await?;

    print!("{}", formatter.format_ingest_summary(session.summary()));

    Ok(())
}
