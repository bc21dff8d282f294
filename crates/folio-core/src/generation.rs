//! Answer generation backend trait.

use anyhow::Result;
use async_trait::async_trait;

/// Produces an answer for a fully rendered prompt.
#[async_trait]
pub trait Generator: Send + Sync {
    fn model_name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String>;
}
