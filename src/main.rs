use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use migration::{Migrator, MigratorTrait};
use sea_orm::Database;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;

use dumb_goodies::config::{Config, IdeaSourceKind, ImageProvider};
use dumb_goodies::pipeline::LogoPipeline;
use dumb_goodies::routes::create_routes;
use dumb_goodies::services::fetcher::HttpFetcher;
use dumb_goodies::services::generator::ImageGenerator;
use dumb_goodies::services::ideas::{CuratedIdeas, IdeaSource, ModelIdeas};
use dumb_goodies::services::openai::OpenAiClient;
use dumb_goodies::services::provider::ImageBackend;
use dumb_goodies::services::rate_limiter::FixedWindowLimiter;
use dumb_goodies::services::replicate::ReplicateClient;
use dumb_goodies::services::storage::S3Service;
use dumb_goodies::state::AppState;

#[derive(Parser)]
#[command(name = "dumb-goodies", about = "Logo to novelty merch render service")]
struct Cli {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:3000")]
    bind: SocketAddr,
    /// Do not run pending database migrations on startup
    #[arg(long)]
    skip_migrations: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("dumb_goodies=debug,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Arc::new(Config::from_env()?);

    let db = Database::connect(&config.database_url).await?;
    if cli.skip_migrations {
        tracing::info!("skipping migrations");
    } else {
        Migrator::up(&db, None).await?;
        tracing::info!("migrations applied");
    }

    let http = reqwest::Client::builder()
        .timeout(config.limits.http_timeout)
        .build()?;

    let providers = &config.providers;
    let openai = providers
        .openai_api_key
        .clone()
        .map(|key| Arc::new(OpenAiClient::new(http.clone(), key, providers)));

    let image_backend: Arc<dyn ImageBackend> = match (providers.image_provider, &openai) {
        (ImageProvider::OpenAi, Some(client)) => client.clone(),
        (ImageProvider::Replicate, _) => {
            let token = providers
                .replicate_api_token
                .clone()
                .ok_or("REPLICATE_API_TOKEN must be set")?;
            Arc::new(ReplicateClient::new(http.clone(), token, providers))
        }
        (ImageProvider::OpenAi, None) => return Err("OPENAI_API_KEY must be set".into()),
    };

    let ideas: Arc<dyn IdeaSource> = match (config.pipeline.idea_source, &openai) {
        (IdeaSourceKind::Model, Some(client)) => Arc::new(ModelIdeas::new(client.clone())),
        (IdeaSourceKind::Model, None) => return Err("OPENAI_API_KEY must be set".into()),
        (IdeaSourceKind::Curated, _) => Arc::new(CuratedIdeas),
    };

    let storage = S3Service::new(config.storage.clone()).await;
    if let Err(e) = storage.ensure_buckets().await {
        tracing::warn!(error = %e, "could not verify storage buckets");
    }

    let generator = Arc::new(ImageGenerator::new(
        image_backend,
        config.pipeline.require_transparency,
    ));
    let pipeline = LogoPipeline::standard(
        generator.clone(),
        &config.pipeline,
        config.limits.strategy_timeout,
    );
    tracing::info!(
        provider = ?providers.image_provider,
        chain = ?pipeline.chain(),
        "logo pipeline ready"
    );

    let state = AppState {
        db,
        storage: Arc::new(storage),
        fetcher: Arc::new(HttpFetcher::new(http)),
        generator,
        pipeline: Arc::new(pipeline),
        ideas,
        limiter: Arc::new(FixedWindowLimiter::new(
            config.limits.rate_limit_max,
            config.limits.rate_limit_window,
        )),
        config: config.clone(),
    };

    // Longest legitimate request is a render waiting on every branch.
    let request_timeout = config.limits.render_timeout + config.limits.http_timeout;
    let app = create_routes(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers(Any),
        );

    let listener = tokio::net::TcpListener::bind(cli.bind).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
