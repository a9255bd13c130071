use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::time::Instant;

use super::ingest::{IngestTuning, build_session, prepare};
use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat, SearchResults};
use crate::services::{GeminiEmbeddingClient, context_for};

#[derive(Debug, Args)]
pub struct AskArgs {
    #[arg(required = true, help = "Text document to search")]
    pub file: PathBuf,

    #[arg(required = true, help = "Question to retrieve context for")]
    pub question: String,

    #[arg(long, short = 'k', help = "Number of chunks to retrieve")]
    pub k: Option<usize>,

    #[arg(long, help = "Print the retrieved chunks as a single context block")]
    pub context: bool,

    #[command(flatten)]
    pub tuning: IngestTuning,
}

pub async fn handle_ask(args: AskArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let question = args.question.trim();
    if question.is_empty() {
        anyhow::bail!("question cannot be empty");
    }

    let config = Config::load()?;
    let formatter = get_formatter(format);

    let k = args.k.unwrap_or(config.search.default_k);
    if k == 0 {
        anyhow::bail!("k must be at least 1");
    }

    let prepared = prepare(&args.file, &args.tuning, &config)?;
    let provider = GeminiEmbeddingClient::new(&config.embedding)?;
    let session = build_session(&prepared, &provider, verbose).await?;

    let start_time = Instant::now();
    let hits = session
        .search_text(&provider, question, k, &prepared.options.retry)
        .await
        .context("search failed")?;
    let duration_ms = start_time.elapsed().as_millis() as u64;

    if verbose {
        eprintln!("Search: {duration_ms}ms for k={k}");
        eprintln!();
    }

    if args.context {
        println!("{}", context_for(&hits));
        return Ok(());
    }

    let results = SearchResults::new(question.to_string(), hits, k, duration_ms);
    print!("{}", formatter.format_search_results(&results));

    Ok(())
}
