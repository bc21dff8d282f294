//! TOML configuration.
//!
//! Every section is optional and falls back to its defaults, so an empty
//! file is a valid configuration (OCR via the `tesseract` binary,
//! embeddings and generation disabled). [`load_config`] validates the
//! result before returning it.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use folio_core::correct::{default_substitutions, Substitution};
use folio_core::preprocess::PreprocessConfig;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub preprocess: PreprocessConfig,
    #[serde(default)]
    pub correction: CorrectionConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorrectionConfig {
    /// Word list with one `word [count]` entry per line. No dictionary
    /// means only substitutions are applied.
    #[serde(default)]
    pub dictionary: Option<PathBuf>,
    #[serde(default = "default_substitutions")]
    pub substitutions: Vec<Substitution>,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            dictionary: None,
            substitutions: default_substitutions(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OcrConfig {
    #[serde(default = "default_ocr_provider")]
    pub provider: String,
    #[serde(default = "default_tesseract_binary")]
    pub binary: String,
    #[serde(default = "default_languages")]
    pub languages: String,
    /// Extra vocabulary handed to the engine (`--user-words`).
    #[serde(default)]
    pub user_words: Option<PathBuf>,
    #[serde(default = "default_ocr_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            provider: default_ocr_provider(),
            binary: default_tesseract_binary(),
            languages: default_languages(),
            user_words: None,
            timeout_secs: default_ocr_timeout_secs(),
        }
    }
}

impl OcrConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_ocr_provider() -> String {
    "tesseract".to_string()
}
fn default_tesseract_binary() -> String {
    "tesseract".to_string()
}
fn default_languages() -> String {
    "eng+mal".to_string()
}
fn default_ocr_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            batch_size: 64,
            max_retries: 5,
            timeout_secs: 30,
            url: None,
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,
    #[serde(default = "default_generation_retries")]
    pub max_retries: u32,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            max_new_tokens: default_max_new_tokens(),
            max_retries: default_generation_retries(),
            timeout_secs: default_generation_timeout_secs(),
            url: None,
        }
    }
}

impl GenerationConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_max_new_tokens() -> u32 {
    256
}
fn default_generation_retries() -> u32 {
    3
}
fn default_generation_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_max_words")]
    pub max_words: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_words: default_max_words(),
        }
    }
}

fn default_top_k() -> usize {
    5
}
fn default_max_words() -> usize {
    folio_core::assemble::DEFAULT_MAX_WORDS
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ChunkingConfig {
    /// Passage size in characters; `0` keeps one record per document.
    #[serde(default)]
    pub max_chars: usize,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.preprocess.validate()?;

        // Validate retrieval
        if self.retrieval.top_k < 1 {
            bail!("retrieval.top_k must be >= 1");
        }
        if self.retrieval.max_words < 1 {
            bail!("retrieval.max_words must be >= 1");
        }

        match self.ocr.provider.as_str() {
            "disabled" | "tesseract" => {}
            other => bail!(
                "Unknown OCR provider: '{}'. Must be disabled or tesseract.",
                other
            ),
        }

        // Validate embedding
        match self.embedding.provider.as_str() {
            "disabled" | "openai" | "ollama" | "local" => {}
            other => bail!(
                "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or local.",
                other
            ),
        }
        if self.embedding.is_enabled() && self.embedding.provider != "local" {
            if self.embedding.dims.is_none() || self.embedding.dims == Some(0) {
                bail!(
                    "embedding.dims must be > 0 when provider is '{}'",
                    self.embedding.provider
                );
            }
            if self.embedding.model.is_none() {
                bail!(
                    "embedding.model must be specified when provider is '{}'",
                    self.embedding.provider
                );
            }
        }
        if self.embedding.dims == Some(0) {
            bail!("embedding.dims must be > 0");
        }
        if self.embedding.batch_size == 0 {
            bail!("embedding.batch_size must be > 0");
        }

        // Validate generation
        match self.generation.provider.as_str() {
            "disabled" | "openai" | "ollama" => {}
            other => bail!(
                "Unknown generation provider: '{}'. Must be disabled, openai, or ollama.",
                other
            ),
        }
        if self.generation.is_enabled() && self.generation.model.is_none() {
            bail!(
                "generation.model must be specified when provider is '{}'",
                self.generation.provider
            );
        }
        if self.generation.max_new_tokens == 0 {
            bail!("generation.max_new_tokens must be > 0");
        }

        Ok(())
    }
}
