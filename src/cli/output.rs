use std::fmt::Write as FmtWrite;

use crate::models::{OutputFormat, SearchResults};
use crate::services::IngestSummary;

pub trait Formatter {
    fn format_search_results(&self, results: &SearchResults) -> String;
    fn format_ingest_summary(&self, summary: &IngestSummary) -> String;
    fn format_dry_run(&self, summary: &IngestSummary) -> String;
    fn format_message(&self, message: &str) -> String;
    fn format_error(&self, error: &str) -> String;
}

fn chunk_label(hit: &crate::models::SearchHit) -> String {
    match hit.chunk.metadata.get("chunk_index") {
        Some(index) => format!("chunk {index}"),
        None => format!("entry {}", hit.id),
    }
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_search_results(&self, results: &SearchResults) -> String {
        if results.is_empty() {
            return format!("No results found for: {}\n", results.query);
        }

        let mut output = String::new();
        writeln!(output, "Results for: \"{}\"", results.query).unwrap();
        writeln!(
            output,
            "Found {} of {} requested in {}ms\n",
            results.len(),
            results.k,
            results.duration_ms
        )
        .unwrap();

        for (i, hit) in results.hits.iter().enumerate() {
            writeln!(output, "{}. [Distance: {:.4}]", i + 1, hit.distance).unwrap();
            writeln!(output, "   Location: {}", chunk_label(hit)).unwrap();
            writeln!(output, "   ---").unwrap();

            let preview: String = hit.chunk.text.chars().take(200).collect();
            let preview = if hit.chunk.text.chars().count() > 200 {
                format!("{}...", preview)
            } else {
                preview
            };
            for line in preview.lines() {
                writeln!(output, "   {}", line).unwrap();
            }
            writeln!(output).unwrap();
        }

        output
    }

    fn format_ingest_summary(&self, summary: &IngestSummary) -> String {
        let mut output = String::new();
        writeln!(output, "Processing Complete").unwrap();
        writeln!(output, "-------------------").unwrap();
        write_summary_lines(&mut output, summary);
        writeln!(output, "Duration:      {}ms", summary.duration_ms).unwrap();
        output
    }

    fn format_dry_run(&self, summary: &IngestSummary) -> String {
        let mut output = String::new();
        writeln!(output, "Dry Run").unwrap();
        writeln!(output, "-------").unwrap();
        write_summary_lines(&mut output, summary);
        writeln!(
            output,
            "Would make {} embedding calls",
            summary.batch_count
        )
        .unwrap();
        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {}\n", error)
    }
}

fn write_summary_lines(output: &mut String, summary: &IngestSummary) {
    writeln!(output, "File:          {}", summary.document).unwrap();
    writeln!(output, "Text length:   {} chars", summary.text_length).unwrap();
    writeln!(output, "Chunks:        {}", summary.chunk_count).unwrap();
    writeln!(
        output,
        "Chunk size:    {} (overlap {})",
        summary.chunk_size, summary.chunk_overlap
    )
    .unwrap();
    writeln!(output, "Batches:       {}", summary.batch_count).unwrap();
}

pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render<T: serde::Serialize>(&self, value: &T) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
    }
}

impl Formatter for JsonFormatter {
    fn format_search_results(&self, results: &SearchResults) -> String {
        self.render(results)
    }

    fn format_ingest_summary(&self, summary: &IngestSummary) -> String {
        self.render(summary)
    }

    fn format_dry_run(&self, summary: &IngestSummary) -> String {
        self.render(&serde_json::json!({
            "dry_run": true,
            "document": summary.document,
            "text_length": summary.text_length,
            "chunk_count": summary.chunk_count,
            "chunk_size": summary.chunk_size,
            "chunk_overlap": summary.chunk_overlap,
            "embedding_calls": summary.batch_count,
        }))
    }

    fn format_message(&self, message: &str) -> String {
        serde_json::json!({"message": message}).to_string()
    }

    fn format_error(&self, error: &str) -> String {
        serde_json::json!({"error": error}).to_string()
    }
}

pub struct MarkdownFormatter;

impl Formatter for MarkdownFormatter {
    fn format_search_results(&self, results: &SearchResults) -> String {
        if results.is_empty() {
            return format!("## No results found\n\nQuery: `{}`\n", results.query);
        }

        let mut output = String::new();
        writeln!(output, "## Results\n").unwrap();
        writeln!(output, "**Query:** `{}`\n", results.query).unwrap();
        writeln!(
            output,
            "Found {} of {} requested in {}ms\n",
            results.len(),
            results.k,
            results.duration_ms
        )
        .unwrap();

        for (i, hit) in results.hits.iter().enumerate() {
            writeln!(output, "### {}. Distance: {:.4}\n", i + 1, hit.distance).unwrap();
            writeln!(output, "**Location:** {}\n", chunk_label(hit)).unwrap();
            writeln!(output, "```").unwrap();
            writeln!(output, "{}", hit.chunk.text).unwrap();
            writeln!(output, "```\n").unwrap();
        }

        output
    }

    fn format_ingest_summary(&self, summary: &IngestSummary) -> String {
        let mut output = String::new();
        writeln!(output, "## Processing Complete\n").unwrap();
        write_summary_table(&mut output, summary);
        writeln!(output, "| Duration | {}ms |", summary.duration_ms).unwrap();
        output
    }

    fn format_dry_run(&self, summary: &IngestSummary) -> String {
        let mut output = String::new();
        writeln!(output, "## Dry Run\n").unwrap();
        write_summary_table(&mut output, summary);
        writeln!(output, "| Embedding calls | {} |", summary.batch_count).unwrap();
        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("> {}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("> ⚠️ **Error:** {}\n", error)
    }
}

fn write_summary_table(output: &mut String, summary: &IngestSummary) {
    writeln!(output, "| Metric | Value |").unwrap();
    writeln!(output, "|--------|-------|").unwrap();
    writeln!(output, "| File | `{}` |", summary.document).unwrap();
    writeln!(output, "| Text length | {} chars |", summary.text_length).unwrap();
    writeln!(output, "| Chunks | {} |", summary.chunk_count).unwrap();
    writeln!(output, "| Chunk size | {} |", summary.chunk_size).unwrap();
    writeln!(output, "| Chunk overlap | {} |", summary.chunk_overlap).unwrap();
    writeln!(output, "| Batches | {} |", summary.batch_count).unwrap();
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
        OutputFormat::Markdown => Box::new(MarkdownFormatter),
    }
}
