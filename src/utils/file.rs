//! Document loading helpers.

use sha2::{Digest, Sha256};
use std::fs;
use std::io::Read;
use std::path::Path;

use crate::error::DocumentError;

/// Calculate SHA-256 checksum of content.
pub fn calculate_checksum(content: &str) -> String {
    let hash = Sha256::digest(content.as_bytes());
    hex::encode(hash)
}

/// Check if a file is likely a text file.
pub fn is_text_file(path: &Path) -> bool {
    if let Some(ext) = path.extension() {
        let ext = ext.to_string_lossy().to_lowercase();
        if is_binary_extension(&ext) {
            return false;
        }
        if is_text_extension(&ext) {
            return true;
        }
    }

    // Sniff the first bytes for NULs
    if let Ok(file) = fs::File::open(path) {
        let mut buffer = [0u8; 512];
        let mut reader = std::io::BufReader::new(file);
        if let Ok(n) = reader.read(&mut buffer) {
            return !buffer[..n].contains(&0);
        }
    }

    false
}

/// Read a document's text, enforcing the size limit and rejecting binary files.
///
/// Returns the raw text; callers decide whether an empty result is an error.
pub fn read_document(path: &Path, max_size: u64) -> Result<String, DocumentError> {
    let metadata = fs::metadata(path)?;

    if metadata.len() > max_size {
        return Err(DocumentError::TooLarge {
            size: metadata.len(),
            max: max_size,
        });
    }

    if !is_text_file(path) {
        return Err(DocumentError::UnsupportedFile(path.display().to_string()));
    }

    Ok(fs::read_to_string(path)?)
}

/// Check if extension indicates a binary file.
fn is_binary_extension(ext: &str) -> bool {
    matches!(
        ext,
        "exe"
            | "dll"
            | "so"
            | "dylib"
            | "png"
            | "jpg"
            | "jpeg"
            | "gif"
            | "webp"
            | "mp3"
            | "mp4"
            | "wav"
            | "zip"
            | "tar"
            | "gz"
            | "7z"
            | "pdf"
            | "doc"
            | "docx"
            | "xls"
            | "xlsx"
            | "ppt"
            | "pptx"
            | "epub"
            | "db"
            | "sqlite"
            | "bin"
    )
}

/// Check if extension indicates a text file.
fn is_text_extension(ext: &str) -> bool {
    matches!(
        ext,
        "txt" | "md" | "markdown" | "rst" | "adoc" | "org" | "tex"
            | "html" | "htm" | "xml" | "json" | "yaml" | "yml" | "toml"
            | "csv" | "tsv" | "log"
    )
}
