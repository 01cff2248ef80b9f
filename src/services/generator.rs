use std::sync::Arc;

use crate::prompts::{STRICT_TRANSPARENCY_DIRECTIVE, TRANSPARENCY_DIRECTIVE};
use crate::services::provider::{ImageBackend, ImageSize, ProviderError};
use crate::utils::image_processor;

/// Text-to-image with the packshot boilerplate and one bounded retry when
/// the first attempt comes back without transparency.
#[derive(Clone)]
pub struct ImageGenerator {
    backend: Arc<dyn ImageBackend>,
    require_transparency: bool,
}

impl ImageGenerator {
    pub fn new(backend: Arc<dyn ImageBackend>, require_transparency: bool) -> Self {
        Self {
            backend,
            require_transparency,
        }
    }

    pub fn backend(&self) -> &Arc<dyn ImageBackend> {
        &self.backend
    }

    pub async fn generate(&self, prompt: &str, size: ImageSize) -> Result<Vec<u8>, ProviderError> {
        let enhanced = format!("{}\n\n{}", prompt, TRANSPARENCY_DIRECTIVE);
        let first = self.backend.generate(&enhanced, size).await?;

        if !self.require_transparency || is_transparent(&first).await {
            return Ok(first);
        }

        tracing::warn!(
            provider = self.backend.name(),
            "generated image has no transparency, retrying with stricter prompt"
        );
        let strict = format!("{}\n\n{}", enhanced, STRICT_TRANSPARENCY_DIRECTIVE);
        let second = self.backend.generate(&strict, size).await?;
        if !is_transparent(&second).await {
            tracing::warn!(
                provider = self.backend.name(),
                "retry still opaque, keeping second attempt"
            );
        }
        Ok(second)
    }
}

// Undecodable payloads are left for the persistence step to reject.
async fn is_transparent(bytes: &[u8]) -> bool {
    let bytes = bytes.to_vec();
    tokio::task::spawn_blocking(move || match image_processor::decode(&bytes) {
        Ok(img) => image_processor::has_transparency(&img),
        Err(_) => true,
    })
    .await
    .unwrap_or(true)
}
