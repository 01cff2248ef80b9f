//! Provider seam for the generative APIs.
//!
//! Every external provider normalizes its own response shape into raw image
//! bytes (or raw text) before anything else in the crate sees it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{provider} request failed: {source}")]
    Http {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider} returned {status}: {message}")]
    Status {
        provider: &'static str,
        status: u16,
        message: String,
    },
    #[error("{provider} returned no image data")]
    EmptyPayload { provider: &'static str },
    #[error("{provider} returned an unexpected payload: {detail}")]
    Malformed {
        provider: &'static str,
        detail: String,
    },
    #[error("{0} timed out")]
    Timeout(String),
}

/// Aspect ratios the generation endpoints accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub enum ImageSize {
    #[default]
    #[serde(rename = "1024x1024")]
    Square,
    #[serde(rename = "1792x1024")]
    Landscape,
    #[serde(rename = "1024x1792")]
    Portrait,
}

impl ImageSize {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageSize::Square => "1024x1024",
            ImageSize::Landscape => "1792x1024",
            ImageSize::Portrait => "1024x1792",
        }
    }

    pub fn dimensions(self) -> (u32, u32) {
        match self {
            ImageSize::Square => (1024, 1024),
            ImageSize::Landscape => (1792, 1024),
            ImageSize::Portrait => (1024, 1792),
        }
    }
}

#[async_trait]
pub trait ImageBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Text-to-image. Returns encoded image bytes.
    async fn generate(&self, prompt: &str, size: ImageSize) -> Result<Vec<u8>, ProviderError>;

    /// Masked edit. `mask` is an RGBA PNG whose transparent pixels mark the
    /// editable region.
    async fn edit(
        &self,
        image_png: &[u8],
        mask_png: Option<&[u8]>,
        prompt: &str,
    ) -> Result<Vec<u8>, ProviderError>;
}

#[async_trait]
pub trait TextBackend: Send + Sync {
    /// Chat completion constrained to a JSON reply. Returns the raw content.
    async fn complete_json(&self, system: &str, user: &str) -> Result<String, ProviderError>;
}
