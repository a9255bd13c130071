use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::search::OutputFormat;
use crate::error::ConfigError;
use crate::utils::RetryConfig;

pub const DEFAULT_EMBEDDING_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub search: SearchConfig,
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("sift").join("config.toml"))
    }

    /// Load the user config, falling back to defaults when no file exists.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::config_path().ok_or_else(|| {
            ConfigError::PathError("could not determine config directory".to_string())
        })?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Write a default config file, refusing to clobber one unless `force`.
    pub fn init(force: bool) -> Result<PathBuf, ConfigError> {
        let path = Self::config_path().ok_or_else(|| {
            ConfigError::PathError("could not determine config directory".to_string())
        })?;
        Self::init_at(&path, force)?;
        Ok(path)
    }

    pub fn init_at(path: &Path, force: bool) -> Result<(), ConfigError> {
        if path.exists() && !force {
            return Err(ConfigError::PathError(format!(
                "config already exists at {} (use --force to overwrite)",
                path.display()
            )));
        }
        Self::default().save_to(path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::ValidationError(msg.to_string()));

        if self.ingest.batch_size == 0 {
            return invalid("ingest.batch_size must be greater than 0");
        }
        if self.ingest.progress_start >= self.ingest.progress_end
            || self.ingest.progress_end > 100
        {
            return invalid("ingest.progress_start must be below progress_end, and progress_end at most 100");
        }
        if self.chunking.chunk_size == 0 {
            return invalid("chunking.chunk_size must be greater than 0");
        }
        if self.chunking.overlap() >= self.chunking.chunk_size {
            return invalid("chunking.chunk_overlap must be smaller than chunk_size");
        }
        if self.search.default_k == 0 {
            return invalid("search.default_k must be greater than 0");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_url")]
    pub url: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Requested output dimensionality; provider default when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<u32>,
}

impl EmbeddingConfig {
    /// `GOOGLE_API_KEY` wins over the file value.
    pub fn resolve_api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.api_key.clone().filter(|k| !k.trim().is_empty()))
    }
}

fn default_embedding_url() -> String {
    DEFAULT_EMBEDDING_URL.to_string()
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_timeout() -> u64 {
    120
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: default_embedding_url(),
            model: default_embedding_model(),
            timeout_secs: default_timeout(),
            api_key: None,
            dimension: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_inter_batch_delay_ms")]
    pub inter_batch_delay_ms: u64,

    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    #[serde(default)]
    pub progress_start: u8,

    #[serde(default = "default_progress_end")]
    pub progress_end: u8,
}

impl IngestConfig {
    pub fn inter_batch_delay(&self) -> Duration {
        Duration::from_millis(self.inter_batch_delay_ms)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::default().with_initial_delay(Duration::from_millis(self.retry_base_delay_ms))
    }
}

fn default_batch_size() -> usize {
    100
}

fn default_inter_batch_delay_ms() -> u64 {
    1000
}

fn default_retry_base_delay_ms() -> u64 {
    5000
}

fn default_progress_end() -> u8 {
    90
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            inter_batch_delay_ms: default_inter_batch_delay_ms(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            progress_start: 0,
            progress_end: default_progress_end(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_overlap: Option<usize>,

    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl ChunkingConfig {
    /// Explicit overlap, or 20% of the chunk size capped at 200.
    pub fn overlap(&self) -> usize {
        self.chunk_overlap
            .unwrap_or_else(|| (self.chunk_size / 5).min(200))
    }
}

fn default_chunk_size() -> usize {
    1000
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: None,
            max_file_size: default_max_file_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_k")]
    pub default_k: usize,

    #[serde(default)]
    pub default_format: OutputFormat,
}

fn default_k() -> usize {
    5
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_k: default_k(),
            default_format: OutputFormat::Text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.embedding.url, DEFAULT_EMBEDDING_URL);
        assert_eq!(config.embedding.model, DEFAULT_EMBEDDING_MODEL);
        assert_eq!(config.ingest.batch_size, 100);
        assert_eq!(config.ingest.inter_batch_delay(), Duration::from_secs(1));
        assert_eq!(config.search.default_k, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_path() {
        let path = Config::config_path();
        assert!(path.is_some());
    }

    #[test]
    fn test_retry_config_from_ingest() {
        let retry = IngestConfig::default().retry_config();
        assert_eq!(retry.max_retries, 3);
        assert_eq!(retry.initial_delay, Duration::from_secs(5));
    }

    #[test]
    fn test_chunk_overlap_default() {
        let mut chunking = ChunkingConfig::default();
        assert_eq!(chunking.overlap(), 200);

        chunking.chunk_size = 500;
        assert_eq!(chunking.overlap(), 100);

        chunking.chunk_overlap = Some(10);
        assert_eq!(chunking.overlap(), 10);
    }

    #[test]
    fn test_validate_rejects_zero_batch_size() {
        let mut config = Config::default();
        config.ingest.batch_size = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validate_rejects_inverted_progress_range() {
        let mut config = Config::default();
        config.ingest.progress_start = 90;
        config.ingest.progress_end = 60;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.ingest.batch_size = 25;
        config.chunking.chunk_size = 1500;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.ingest.batch_size, 25);
        assert_eq!(loaded.chunking.chunk_size, 1500);
        assert_eq!(loaded.embedding.model, DEFAULT_EMBEDDING_MODEL);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[ingest]\nbatch_size = 10\n").unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.ingest.batch_size, 10);
        assert_eq!(loaded.ingest.inter_batch_delay_ms, 1000);
        assert_eq!(loaded.ingest.progress_end, 90);
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        Config::init_at(&path, false).unwrap();
        assert!(path.exists());
        assert!(matches!(
            Config::init_at(&path, false),
            Err(ConfigError::PathError(_))
        ));
        Config::init_at(&path, true).unwrap();
    }
}
