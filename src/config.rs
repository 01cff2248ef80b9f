use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::pipeline::StrategyKind;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageProvider {
    OpenAi,
    Replicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdeaSourceKind {
    Curated,
    Model,
}

#[derive(Debug, Clone)]
pub struct Buckets {
    pub uploads: String,
    pub renders: String,
    pub thumbs: String,
}

impl Default for Buckets {
    fn default() -> Self {
        Self {
            uploads: "uploads".to_string(),
            renders: "renders".to_string(),
            thumbs: "thumbs".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_region: String,
    pub s3_endpoint: Option<String>,
    pub public_url: Option<String>,
    pub buckets: Buckets,
}

impl StorageConfig {
    /// Public URLs are deterministic from bucket and key.
    pub fn public_url(&self, bucket: &str, key: &str) -> String {
        if let Some(base) = self.public_url.as_deref().or(self.s3_endpoint.as_deref()) {
            format!("{}/{}/{}", base.trim_end_matches('/'), bucket, key)
        } else {
            format!("https://{}.s3.{}.amazonaws.com/{}", bucket, self.aws_region, key)
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub image_provider: ImageProvider,
    pub openai_api_key: Option<String>,
    pub openai_api_base: String,
    pub openai_image_model: String,
    pub openai_text_model: String,
    pub replicate_api_token: Option<String>,
    pub replicate_model: String,
    pub replicate_inpaint_model: String,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub strategy: StrategyKind,
    pub fallbacks: Option<Vec<StrategyKind>>,
    pub idea_source: IdeaSourceKind,
    pub require_transparency: bool,
    pub normalize_uploads: bool,
}

#[derive(Debug, Clone)]
pub struct LimitsConfig {
    pub rate_limit_max: u32,
    pub rate_limit_window: Duration,
    pub http_timeout: Duration,
    pub strategy_timeout: Duration,
    pub render_timeout: Duration,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            rate_limit_max: 10,
            rate_limit_window: Duration::from_secs(60),
            http_timeout: Duration::from_secs(120),
            strategy_timeout: Duration::from_secs(150),
            render_timeout: Duration::from_secs(420),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub storage: StorageConfig,
    pub providers: ProviderConfig,
    pub pipeline: PipelineConfig,
    pub limits: LimitsConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = required("DATABASE_URL")?;

        let storage = StorageConfig {
            aws_access_key_id: optional("AWS_ACCESS_KEY_ID"),
            aws_secret_access_key: optional("AWS_SECRET_ACCESS_KEY"),
            aws_region: optional("AWS_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            s3_endpoint: optional("S3_ENDPOINT"),
            public_url: optional("S3_PUBLIC_URL"),
            buckets: Buckets {
                uploads: optional("BUCKET_UPLOADS").unwrap_or_else(|| "uploads".to_string()),
                renders: optional("BUCKET_RENDERS").unwrap_or_else(|| "renders".to_string()),
                thumbs: optional("BUCKET_THUMBS").unwrap_or_else(|| "thumbs".to_string()),
            },
        };

        let image_provider = match optional("IMAGE_PROVIDER").as_deref() {
            None | Some("openai") => ImageProvider::OpenAi,
            Some("replicate") => ImageProvider::Replicate,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "IMAGE_PROVIDER",
                    value: other.to_string(),
                })
            }
        };

        let idea_source = match optional("IDEA_SOURCE").as_deref() {
            None | Some("curated") => IdeaSourceKind::Curated,
            Some("model") => IdeaSourceKind::Model,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "IDEA_SOURCE",
                    value: other.to_string(),
                })
            }
        };

        let providers = ProviderConfig {
            image_provider,
            openai_api_key: optional("OPENAI_API_KEY"),
            openai_api_base: optional("OPENAI_API_BASE")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            openai_image_model: optional("OPENAI_IMAGE_MODEL")
                .unwrap_or_else(|| "gpt-image-1".to_string()),
            openai_text_model: optional("OPENAI_TEXT_MODEL")
                .unwrap_or_else(|| "gpt-4o-mini".to_string()),
            replicate_api_token: optional("REPLICATE_API_TOKEN"),
            replicate_model: optional("REPLICATE_MODEL")
                .unwrap_or_else(|| "stability-ai/sdxl".to_string()),
            replicate_inpaint_model: optional("REPLICATE_INPAINT_MODEL")
                .unwrap_or_else(|| "stability-ai/sdxl-inpainting".to_string()),
        };

        let needs_openai = image_provider == ImageProvider::OpenAi
            || idea_source == IdeaSourceKind::Model;
        if needs_openai && providers.openai_api_key.is_none() {
            return Err(ConfigError::Missing("OPENAI_API_KEY"));
        }
        if image_provider == ImageProvider::Replicate && providers.replicate_api_token.is_none() {
            return Err(ConfigError::Missing("REPLICATE_API_TOKEN"));
        }

        let fallbacks = match optional("LOGO_FALLBACKS") {
            Some(raw) => Some(
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| parse_var("LOGO_FALLBACKS", s))
                    .collect::<Result<Vec<StrategyKind>, _>>()?,
            ),
            None => None,
        };

        let pipeline = PipelineConfig {
            strategy: match optional("LOGO_STRATEGY") {
                Some(s) => parse_var("LOGO_STRATEGY", &s)?,
                None => StrategyKind::MaskedGuideEdit,
            },
            fallbacks,
            idea_source,
            require_transparency: flag("REQUIRE_TRANSPARENCY", true)?,
            normalize_uploads: flag("UPLOAD_NORMALIZE_PNG", false)?,
        };

        let defaults = LimitsConfig::default();
        let limits = LimitsConfig {
            rate_limit_max: number("RATE_LIMIT_MAX", defaults.rate_limit_max as u64)? as u32,
            rate_limit_window: secs("RATE_LIMIT_WINDOW_SECS", defaults.rate_limit_window)?,
            http_timeout: secs("HTTP_TIMEOUT_SECS", defaults.http_timeout)?,
            strategy_timeout: secs("STRATEGY_TIMEOUT_SECS", defaults.strategy_timeout)?,
            render_timeout: secs("RENDER_TIMEOUT_SECS", defaults.render_timeout)?,
        };

        Ok(Self {
            database_url,
            storage,
            providers,
            pipeline,
            limits,
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Invalid {
        name,
        value: raw.to_string(),
    })
}

fn flag(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match optional(name).as_deref() {
        None => Ok(default),
        Some("1") | Some("true") | Some("yes") => Ok(true),
        Some("0") | Some("false") | Some("no") => Ok(false),
        Some(other) => Err(ConfigError::Invalid {
            name,
            value: other.to_string(),
        }),
    }
}

fn number(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match optional(name) {
        Some(raw) => parse_var(name, &raw),
        None => Ok(default),
    }
}

fn secs(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    number(name, default.as_secs()).map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(public_url: Option<&str>, endpoint: Option<&str>) -> StorageConfig {
        StorageConfig {
            aws_access_key_id: None,
            aws_secret_access_key: None,
            aws_region: "eu-west-1".to_string(),
            s3_endpoint: endpoint.map(str::to_string),
            public_url: public_url.map(str::to_string),
            buckets: Buckets::default(),
        }
    }

    #[test]
    fn public_url_prefers_explicit_base() {
        let cfg = storage(Some("https://cdn.example.com/"), Some("http://minio:9000"));
        assert_eq!(
            cfg.public_url("renders", "2025-03-01/a.png"),
            "https://cdn.example.com/renders/2025-03-01/a.png"
        );
    }

    #[test]
    fn public_url_uses_endpoint_path_style() {
        let cfg = storage(None, Some("http://minio:9000"));
        assert_eq!(
            cfg.public_url("uploads", "k.png"),
            "http://minio:9000/uploads/k.png"
        );
    }

    #[test]
    fn public_url_falls_back_to_aws_virtual_host() {
        let cfg = storage(None, None);
        assert_eq!(
            cfg.public_url("thumbs", "k_512.png"),
            "https://thumbs.s3.eu-west-1.amazonaws.com/k_512.png"
        );
    }
}
