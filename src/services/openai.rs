use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;

use crate::config::ProviderConfig;
use crate::services::provider::{ImageBackend, ImageSize, ProviderError, TextBackend};

const PROVIDER: &str = "openai";

/// Images and chat completions against the OpenAI REST API.
#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    image_model: String,
    text_model: String,
}

#[derive(Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Deserialize)]
struct ImageDatum {
    b64_json: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(http: reqwest::Client, api_key: String, config: &ProviderConfig) -> Self {
        Self {
            http,
            api_key,
            api_base: config.openai_api_base.trim_end_matches('/').to_string(),
            image_model: config.openai_image_model.clone(),
            text_model: config.openai_text_model.clone(),
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ProviderError> {
        let response = request
            .bearer_auth(&self.api_key)
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

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
            .unwrap_or(body);
        Err(ProviderError::Status {
            provider: PROVIDER,
            status: status.as_u16(),
            message,
        })
    }

    async fn first_image(response: reqwest::Response) -> Result<Vec<u8>, ProviderError> {
        let payload: ImagesResponse = response.json().await.map_err(|source| ProviderError::Http {
            provider: PROVIDER,
            source,
        })?;
        let b64 = payload
            .data
            .into_iter()
            .find_map(|d| d.b64_json)
            .ok_or(ProviderError::EmptyPayload { provider: PROVIDER })?;
        general_purpose::STANDARD
            .decode(b64.as_bytes())
            .map_err(|e| ProviderError::Malformed {
                provider: PROVIDER,
                detail: format!("invalid base64 image: {}", e),
            })
    }

    fn png_part(bytes: &[u8], file_name: &'static str) -> Result<Part, ProviderError> {
        Part::bytes(bytes.to_vec())
            .file_name(file_name)
            .mime_str("image/png")
            .map_err(|source| ProviderError::Http {
                provider: PROVIDER,
                source,
            })
    }
}

#[async_trait]
impl ImageBackend for OpenAiClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn generate(&self, prompt: &str, size: ImageSize) -> Result<Vec<u8>, ProviderError> {
        let mut body = json!({
            "model": self.image_model,
            "prompt": prompt,
            "size": size.as_str(),
            "n": 1,
        });
        // dall-e models only return base64 when asked; gpt-image models always do.
        if self.image_model.starts_with("dall-e") {
            body["response_format"] = json!("b64_json");
        } else {
            body["output_format"] = json!("png");
        }

        let url = format!("{}/images/generations", self.api_base);
        let response = self.send(self.http.post(url).json(&body)).await?;
        Self::first_image(response).await
    }

    async fn edit(
        &self,
        image_png: &[u8],
        mask_png: Option<&[u8]>,
        prompt: &str,
    ) -> Result<Vec<u8>, ProviderError> {
        let mut form = Form::new()
            .text("model", self.image_model.clone())
            .text("prompt", prompt.to_string())
            .text("n", "1")
            .part("image", Self::png_part(image_png, "image.png")?);
        if let Some(mask) = mask_png {
            form = form.part("mask", Self::png_part(mask, "mask.png")?);
        }
        if self.image_model.starts_with("dall-e") {
            form = form.text("response_format", "b64_json");
        } else {
            form = form.text("output_format", "png");
        }

        let url = format!("{}/images/edits", self.api_base);
        let response = self.send(self.http.post(url).multipart(form)).await?;
        Self::first_image(response).await
    }
}

#[async_trait]
impl TextBackend for OpenAiClient {
    async fn complete_json(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        let body = json!({
            "model": self.text_model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "response_format": { "type": "json_object" },
        });

        let url = format!("{}/chat/completions", self.api_base);
        let response = self.send(self.http.post(url).json(&body)).await?;
        let payload: ChatResponse = response.json().await.map_err(|source| ProviderError::Http {
            provider: PROVIDER,
            source,
        })?;

        payload
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(ProviderError::Malformed {
                provider: PROVIDER,
                detail: "chat completion had no content".to_string(),
            })
    }
}
