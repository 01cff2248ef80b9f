use async_trait::async_trait;

use crate::error::AppError;

/// Downloads remote images (logos, product references).
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, AppError>;
}

#[derive(Clone)]
pub struct HttpFetcher {
    http: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, AppError> {
        let response = self.http.get(url).send().await.map_err(|e| {
            AppError::InternalServerError(format!("Failed to download {}: {}", url, e))
        })?;

        if !response.status().is_success() {
            return Err(AppError::InternalServerError(format!(
                "Failed to download {}: HTTP {}",
                url,
                response.status()
            )));
        }

        let bytes = response.bytes().await.map_err(|e| {
            AppError::InternalServerError(format!("Failed to read {}: {}", url, e))
        })?;
        Ok(bytes.to_vec())
    }
}
