pub mod gallery;
pub mod home;
pub mod propose;
pub mod render;
pub mod save;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::middleware::rate_limit::rate_limit;
use crate::state::AppState;

/// Phone photos of products routinely exceed axum's 2 MB default.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        home::root,
        upload::upload_status,
        upload::upload_file,
        propose::propose,
        render::render_products,
        render::render_more,
        save::save_render,
        gallery::list_gallery,
    ),
    components(
        schemas(
            upload::UploadResponse,
            upload::UploadStatusResponse,
            propose::ProposeRequest,
            propose::ProposeResponse,
            propose::ConceptResponse,
            crate::models::render::RenderRequest,
            crate::models::render::RenderMoreRequest,
            crate::models::render::RenderResponse,
            crate::models::render::RenderMoreResponse,
            crate::models::render::RenderItem,
            crate::services::persist::RenderImage,
            crate::pipeline::StrategyKind,
            crate::error::BranchFailure,
            save::SaveRequest,
            save::SaveResponse,
            gallery::GalleryItem,
        )
    ),
    tags(
        (name = "General", description = "Landing page"),
        (name = "Upload", description = "Logo and product photo uploads"),
        (name = "Concepts", description = "Product idea proposals for a brand"),
        (name = "Render", description = "Branded product image generation"),
        (name = "Gallery", description = "Publishing and browsing renders")
    ),
    info(
        title = "Dumb Goodies API",
        version = "0.1.0",
        description = "Turns a logo into AI-rendered novelty merchandise",
    )
)]
pub struct ApiDoc;

pub fn create_routes(state: AppState) -> Router {
    let swagger_router: Router = SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into();

    // Every /api route shares the per-client request budget.
    let api_routes = Router::new()
        .route("/upload", get(upload::upload_status).post(upload::upload_file))
        .route("/propose", post(propose::propose))
        .route("/render", post(render::render_products))
        .route("/render-more", post(render::render_more))
        .route("/save", post(save::save_render))
        .route("/gallery", get(gallery::list_gallery))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES));

    let app_routes = Router::new()
        .route("/", get(home::root))
        .nest("/api", api_routes)
        .with_state(state);

    Router::new().merge(swagger_router).merge(app_routes)
}
