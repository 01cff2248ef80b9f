//! Shared harness for the HTTP-level tests: the real router on top of an
//! in-memory SQLite database, an in-memory object store and a scripted image
//! provider.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header::CONTENT_TYPE, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, Schema};
use tower::ServiceExt;

use dumb_goodies::config::{
    Buckets, Config, IdeaSourceKind, ImageProvider, LimitsConfig, PipelineConfig, ProviderConfig,
    StorageConfig,
};
use dumb_goodies::entities::{concept, project, render};
use dumb_goodies::error::AppError;
use dumb_goodies::pipeline::{LogoPipeline, StrategyKind};
use dumb_goodies::routes::create_routes;
use dumb_goodies::services::fetcher::ImageFetcher;
use dumb_goodies::services::generator::ImageGenerator;
use dumb_goodies::services::ideas::CuratedIdeas;
use dumb_goodies::services::provider::{ImageBackend, ImageSize, ProviderError};
use dumb_goodies::services::rate_limiter::FixedWindowLimiter;
use dumb_goodies::services::storage::ObjectStore;
use dumb_goodies::state::AppState;

pub const STORAGE_BASE: &str = "http://storage.test";

// ---------------------------------------------------------------------------
// Object store + fetcher
// ---------------------------------------------------------------------------

/// Objects keyed by their public URL. Doubles as the image fetcher so that
/// anything uploaded can be downloaded again.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
}

impl MemoryStore {
    pub fn seed(&self, url: &str, data: Vec<u8>, content_type: &str) {
        self.objects
            .lock()
            .unwrap()
            .insert(url.to_string(), (data, content_type.to_string()));
    }

    pub fn get(&self, url: &str) -> Option<(Vec<u8>, String)> {
        self.objects.lock().unwrap().get(url).cloned()
    }

    pub fn urls(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, AppError> {
        let url = self.public_url(bucket, key);
        self.seed(&url, data, content_type);
        Ok(url)
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/{}/{}", STORAGE_BASE, bucket, key)
    }
}

#[async_trait]
impl ImageFetcher for MemoryStore {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, AppError> {
        self.get(url)
            .map(|(data, _)| data)
            .ok_or_else(|| AppError::NotFound(format!("no object at {}", url)))
    }
}

// ---------------------------------------------------------------------------
// Image provider
// ---------------------------------------------------------------------------

/// Returns small PNGs with a transparent border. Generation and editing can
/// be switched off independently.
#[derive(Default)]
pub struct FakeImages {
    pub fail_generate: AtomicBool,
    pub fail_edit: AtomicBool,
    pub generate_calls: AtomicUsize,
    pub edit_calls: AtomicUsize,
}

impl FakeImages {
    pub fn generates(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn edits(&self) -> usize {
        self.edit_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageBackend for FakeImages {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn generate(&self, _prompt: &str, _size: ImageSize) -> Result<Vec<u8>, ProviderError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_generate.load(Ordering::SeqCst) {
            return Err(ProviderError::EmptyPayload { provider: "fake" });
        }
        Ok(product_png(Rgba([200, 40, 40, 255])))
    }

    async fn edit(
        &self,
        _image_png: &[u8],
        _mask_png: Option<&[u8]>,
        _prompt: &str,
    ) -> Result<Vec<u8>, ProviderError> {
        self.edit_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_edit.load(Ordering::SeqCst) {
            return Err(ProviderError::Status {
                provider: "fake",
                status: 500,
                message: "edit unavailable".into(),
            });
        }
        Ok(product_png(Rgba([40, 40, 200, 255])))
    }
}

/// 64x64 product shot: solid colour in the middle, transparent border.
pub fn product_png(fill: Rgba<u8>) -> Vec<u8> {
    let img = RgbaImage::from_fn(64, 64, |x, y| {
        if (8..56).contains(&x) && (8..56).contains(&y) {
            fill
        } else {
            Rgba([0, 0, 0, 0])
        }
    });
    encode(DynamicImage::ImageRgba8(img))
}

pub fn logo_png() -> Vec<u8> {
    encode(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        40,
        20,
        Rgba([255, 255, 255, 255]),
    )))
}

fn encode(img: DynamicImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        storage: StorageConfig {
            aws_access_key_id: None,
            aws_secret_access_key: None,
            aws_region: "us-east-1".to_string(),
            s3_endpoint: None,
            public_url: Some(STORAGE_BASE.to_string()),
            buckets: Buckets::default(),
        },
        providers: ProviderConfig {
            image_provider: ImageProvider::OpenAi,
            openai_api_key: Some("test".to_string()),
            openai_api_base: "http://openai.test/v1".to_string(),
            openai_image_model: "gpt-image-1".to_string(),
            openai_text_model: "gpt-4o-mini".to_string(),
            replicate_api_token: None,
            replicate_model: "stability-ai/sdxl".to_string(),
            replicate_inpaint_model: "stability-ai/sdxl-inpainting".to_string(),
        },
        pipeline: PipelineConfig {
            strategy: StrategyKind::MaskedGuideEdit,
            fallbacks: None,
            idea_source: IdeaSourceKind::Curated,
            require_transparency: true,
            normalize_uploads: true,
        },
        limits: LimitsConfig {
            rate_limit_max: 10,
            rate_limit_window: Duration::from_secs(60),
            http_timeout: Duration::from_secs(5),
            strategy_timeout: Duration::from_secs(10),
            render_timeout: Duration::from_secs(20),
        },
    }
}

pub async fn test_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();

    let schema = Schema::new(DbBackend::Sqlite);
    let backend = db.get_database_backend();
    for stmt in [
        schema.create_table_from_entity(project::Entity),
        schema.create_table_from_entity(concept::Entity),
        schema.create_table_from_entity(render::Entity),
    ] {
        db.execute(backend.build(&stmt)).await.unwrap();
    }
    db
}

pub struct TestApp {
    pub router: Router,
    pub db: DatabaseConnection,
    pub store: Arc<MemoryStore>,
    pub images: Arc<FakeImages>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let db = test_db().await;
        let store = Arc::new(MemoryStore::default());
        let images = Arc::new(FakeImages::default());

        let generator = Arc::new(ImageGenerator::new(
            images.clone(),
            config.pipeline.require_transparency,
        ));
        let pipeline = LogoPipeline::standard(
            generator.clone(),
            &config.pipeline,
            config.limits.strategy_timeout,
        );
        let limiter = FixedWindowLimiter::new(
            config.limits.rate_limit_max,
            config.limits.rate_limit_window,
        );

        let state = AppState {
            db: db.clone(),
            config: Arc::new(config),
            storage: store.clone(),
            fetcher: store.clone(),
            generator,
            pipeline: Arc::new(pipeline),
            ideas: Arc::new(CuratedIdeas),
            limiter: Arc::new(limiter),
        };

        Self {
            router: create_routes(state),
            db,
            store,
            images,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> Response<Body> {
        self.send(
            Request::post(uri)
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Puts a logo where the render endpoints can fetch it.
    pub fn seed_logo(&self) -> String {
        let url = format!("{}/uploads/test/logo.png", STORAGE_BASE);
        self.store.seed(&url, logo_png(), "image/png");
        url
    }
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub const BOUNDARY: &str = "dumbgoodiesboundary";

/// One-part multipart body. `filename: None` sends a plain text field.
pub fn multipart_body(field: &str, filename: Option<&str>, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    match filename {
        Some(name) => body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                field, name, content_type
            )
            .as_bytes(),
        ),
        None => body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", field).as_bytes(),
        ),
    }
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_request(body: Vec<u8>) -> Request<Body> {
    Request::post("/api/upload")
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}
