use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::ingest::{IngestTuning, build_session, prepare};
use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat, SearchResults};
use crate::services::GeminiEmbeddingClient;

#[derive(Debug, Args)]
pub struct ChatArgs {
    #[arg(required = true, help = "Text document to search")]
    pub file: PathBuf,

    #[arg(long, short = 'k', help = "Number of chunks to retrieve per question")]
    pub k: Option<usize>,

    #[command(flatten)]
    pub tuning: IngestTuning,
}

/// Whether a line asks to leave the chat.
fn is_exit(line: &str) -> bool {
    matches!(line, "exit" | "quit" | ":q")
}

pub async fn handle_chat(args: ChatArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);

    let k = args.k.unwrap_or(config.search.default_k);
    if k == 0 {
        anyhow::bail!("k must be at least 1");
    }

    let prepared = prepare(&args.file, &args.tuning, &config)?;
    let provider = GeminiEmbeddingClient::new(&config.embedding)?;
    let session = build_session(&prepared, &provider, verbose).await?;

    eprintln!(
        "Loaded {} ({} chunks). Ask a question, or type 'exit' to quit.",
        session.summary().document,
        session.summary().chunk_count
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("> ");
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if is_exit(question) {
            break;
        }

        let start_time = Instant::now();
        match session
            .search_text(&provider, question, k, &prepared.options.retry)
            .await
        {
            Ok(hits) => {
                let duration_ms = start_time.elapsed().as_millis() as u64;
                let results = SearchResults::new(question.to_string(), hits, k, duration_ms);
                print!("{}", formatter.format_search_results(&results));
            }
            Err(e) => eprint!("{}", formatter.format_error(&e.to_string())),
        }
    }

    Ok(())
}
