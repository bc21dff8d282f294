//! Embedding backend trait.
//!
//! Defines the [`Embedder`] trait that every embedding backend implements.
//! Concrete providers (OpenAI, Ollama, fastembed) live in the `folio` app
//! crate; tests use in-process fakes.

use anyhow::{bail, Result};
use async_trait::async_trait;

/// Maps text to fixed-dimension vectors.
///
/// The same model must be used for ingestion and querying of one index, so
/// an [`Engine`](crate::engine::Engine) owns exactly one embedder.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;

    /// Returns the embedding vector dimensionality (e.g. `384`).
    fn dims(&self) -> usize;

    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embed a single text.
pub async fn embed_one(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>> {
    let mut vectors = embedder.embed(&[text.to_string()]).await?;
    if vectors.len() != 1 {
        bail!(
            "Embedder {} returned {} vectors for 1 input",
            embedder.model_name(),
            vectors.len()
        );
    }
    Ok(vectors.remove(0))
}
