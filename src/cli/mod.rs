//! CLI module for the sift document assistant.

pub mod commands;
pub mod output;
pub mod progress;

use clap::{Parser, Subcommand};

use crate::models::OutputFormat;

/// Ask questions about a document using embedding-based retrieval.
#[derive(Debug, Parser)]
#[command(name = "sift")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(
        long,
        short = 'f',
        global = true,
        help = "Output format: text, json, or markdown"
    )]
    pub format: Option<OutputFormat>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Chunk and embed a document, then report what was built
    Ingest(commands::IngestArgs),

    /// Retrieve the chunks of a document closest to a question
    Ask(commands::AskArgs),

    /// Ingest a document once, then answer questions read from stdin
    Chat(commands::ChatArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}
