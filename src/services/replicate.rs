use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use image::{DynamicImage, GrayImage, Luma};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::ProviderConfig;
use crate::services::provider::{ImageBackend, ImageSize, ProviderError};
use crate::utils::image_processor;

const PROVIDER: &str = "replicate";
const API_BASE: &str = "https://api.replicate.com/v1";
const MAX_POLLS: u32 = 180;

/// Stable Diffusion generation and inpainting through Replicate predictions.
#[derive(Clone)]
pub struct ReplicateClient {
    http: reqwest::Client,
    token: String,
    model: String,
    inpaint_model: String,
    poll_interval: Duration,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    status: String,
    #[serde(default)]
    output: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    urls: Option<PredictionUrls>,
}

#[derive(Debug, Deserialize)]
struct PredictionUrls {
    get: Option<String>,
}

/// Replicate models return a bare URL, a list of URLs, or an object carrying a
/// `url`; all of them collapse to the first image URL.
pub fn normalize_output(output: &Value) -> Result<String, ProviderError> {
    let url = match output {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(|item| normalize_output(item).ok()),
        Value::Object(map) => map.get("url").and_then(Value::as_str).map(str::to_string),
        _ => None,
    };

    match url {
        Some(u) if u.starts_with("http://") || u.starts_with("https://") => Ok(u),
        Some(u) => Err(ProviderError::Malformed {
            provider: PROVIDER,
            detail: format!("output is not an http url: {}", u),
        }),
        None => Err(ProviderError::EmptyPayload { provider: PROVIDER }),
    }
}

/// Converts an alpha-hole mask (transparent = editable) into the black/white
/// convention SDXL inpainting expects (white = repaint).
pub fn inpaint_mask(mask: &DynamicImage) -> DynamicImage {
    let rgba = mask.to_rgba8();
    let (w, h) = rgba.dimensions();
    let gray = GrayImage::from_fn(w, h, |x, y| Luma([255 - rgba.get_pixel(x, y).0[3]]));
    DynamicImage::ImageLuma8(gray)
}

/// Decodes an alpha-hole PNG mask and re-encodes it in the black/white form.
fn inpaint_mask_png(mask: &[u8]) -> Result<Vec<u8>, ProviderError> {
    let decoded = image_processor::decode(mask).map_err(|e| ProviderError::Malformed {
        provider: PROVIDER,
        detail: format!("mask is not an image: {}", e),
    })?;
    image_processor::encode_png(&inpaint_mask(&decoded)).map_err(|e| ProviderError::Malformed {
        provider: PROVIDER,
        detail: format!("failed to encode mask: {}", e),
    })
}

fn data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", general_purpose::STANDARD.encode(png))
}

impl ReplicateClient {
    pub fn new(http: reqwest::Client, token: String, config: &ProviderConfig) -> Self {
        Self {
            http,
            token,
            model: config.replicate_model.clone(),
            inpaint_model: config.replicate_inpaint_model.clone(),
            poll_interval: Duration::from_secs(1),
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ProviderError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|source| ProviderError::Http {
                provider: PROVIDER,
                source,
            })?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(ProviderError::Status {
            provider: PROVIDER,
            status: status.as_u16(),
            message,
        })
    }

    async fn prediction(response: reqwest::Response) -> Result<Prediction, ProviderError> {
        response.json().await.map_err(|source| ProviderError::Http {
            provider: PROVIDER,
            source,
        })
    }

    /// Runs a prediction to completion and returns the output image URL.
    async fn run(&self, model: &str, input: Value) -> Result<String, ProviderError> {
        // "owner/name:version" goes through the versioned endpoint.
        let (url, body) = match model.split_once(':') {
            Some((_, version)) => (
                format!("{}/predictions", API_BASE),
                json!({ "version": version, "input": input }),
            ),
            None => (
                format!("{}/models/{}/predictions", API_BASE, model),
                json!({ "input": input }),
            ),
        };

        let response = self
            .send(self.http.post(url).header("Prefer", "wait").json(&body))
            .await?;
        let mut prediction = Self::prediction(response).await?;

        for _ in 0..MAX_POLLS {
            match prediction.status.as_str() {
                "succeeded" => {
                    let output = prediction
                        .output
                        .as_ref()
                        .ok_or(ProviderError::EmptyPayload { provider: PROVIDER })?;
                    return normalize_output(output);
                }
                "failed" | "canceled" => {
                    return Err(ProviderError::Status {
                        provider: PROVIDER,
                        status: 500,
                        message: prediction
                            .error
                            .map(|e| e.to_string())
                            .unwrap_or_else(|| prediction.status.clone()),
                    })
                }
                _ => {}
            }

            let poll_url = prediction
                .urls
                .as_ref()
                .and_then(|u| u.get.clone())
                .ok_or(ProviderError::Malformed {
                    provider: PROVIDER,
                    detail: "pending prediction without a poll url".to_string(),
                })?;
            tokio::time::sleep(self.poll_interval).await;
            let response = self.send(self.http.get(poll_url)).await?;
            prediction = Self::prediction(response).await?;
        }

        Err(ProviderError::Timeout(format!("{} prediction", PROVIDER)))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| ProviderError::Http {
                provider: PROVIDER,
                source,
            })?;
        if !response.status().is_success() {
            return Err(ProviderError::Status {
                provider: PROVIDER,
                status: response.status().as_u16(),
                message: format!("failed to fetch generated image {}", url),
            });
        }
        let bytes = response.bytes().await.map_err(|source| ProviderError::Http {
            provider: PROVIDER,
            source,
        })?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ImageBackend for ReplicateClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn generate(&self, prompt: &str, size: ImageSize) -> Result<Vec<u8>, ProviderError> {
        let (width, height) = size.dimensions();
        tracing::debug!(model = %self.model, %prompt, "replicate generate");
        let url = self
            .run(
                &self.model,
                json!({
                    "prompt": prompt,
                    "width": width,
                    "height": height,
                    "num_inference_steps": 30,
                    "guidance_scale": 7.5,
                    "num_outputs": 1,
                }),
            )
            .await?;
        self.download(&url).await
    }

    async fn edit(
        &self,
        image_png: &[u8],
        mask_png: Option<&[u8]>,
        prompt: &str,
    ) -> Result<Vec<u8>, ProviderError> {
        let mut input = json!({
            "prompt": prompt,
            "image": data_url(image_png),
            "num_inference_steps": 30,
            "guidance_scale": 7.5,
            "strength": 0.8,
            "num_outputs": 1,
        });

        if let Some(mask) = mask_png {
            let mask = mask.to_vec();
            let bw = tokio::task::spawn_blocking(move || inpaint_mask_png(&mask))
                .await
                .map_err(|e| ProviderError::Malformed {
                    provider: PROVIDER,
                    detail: format!("mask task failed: {}", e),
                })??;
            input["mask"] = json!(data_url(&bw));
        }

        tracing::debug!(model = %self.inpaint_model, "replicate inpaint");
        let url = self.run(&self.inpaint_model, input).await?;
        self.download(&url).await
    }
}
