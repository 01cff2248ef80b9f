use axum::{extract::State, response::Json};
use sea_orm::EntityTrait;

use crate::entities::concept::Entity as Concept;
use crate::entities::project::Entity as Project;
use crate::error::AppError;
use crate::extractors::AppJson;
use crate::models::render::{
    RenderMoreRequest, RenderMoreResponse, RenderRequest, RenderResponse,
};
use crate::services::brand::clean_brand;
use crate::services::ideas::sample_curated;
use crate::services::render::{render, RenderPlan, RenderTarget};
use crate::state::AppState;

fn required_brand(brand: Option<&str>) -> Result<String, AppError> {
    match brand {
        Some(raw) if !raw.is_empty() => clean_brand(raw),
        _ => Err(AppError::BadRequest("brand_required".to_string())),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Resolves what to render: a stored concept, an explicit product, the
/// uploaded reference photo, or two curated ideas. The flag marks the
/// curated fallback.
async fn targets(
    state: &AppState,
    payload: &RenderRequest,
) -> Result<(Vec<RenderTarget>, bool), AppError> {
    let prompt_base = non_empty(payload.prompt_base.as_deref());

    if let (Some(project_id), Some(concept_id)) = (payload.project_id, payload.concept_id) {
        Project::find_by_id(project_id)
            .one(&state.db)
            .await?
            .ok_or(AppError::NotFound("Project not found".to_string()))?;
        let concept = Concept::find_by_id(concept_id)
            .one(&state.db)
            .await?
            .filter(|c| c.project_id == project_id)
            .ok_or(AppError::NotFound("Concept not found".to_string()))?;

        let target = RenderTarget {
            product: concept.label,
            prompt_base: prompt_base.unwrap_or(concept.prompt_base),
            project_id: Some(project_id),
            concept_id: Some(concept_id),
        };
        return Ok((vec![target], false));
    }

    if let Some(prompt_base) = prompt_base {
        let target = RenderTarget {
            product: prompt_base.clone(),
            prompt_base,
            project_id: None,
            concept_id: None,
        };
        return Ok((vec![target], false));
    }

    if payload.product_ref_url.is_some() && payload.logo_url.is_some() {
        let target = RenderTarget {
            product: "Custom Product".to_string(),
            prompt_base: "custom product".to_string(),
            project_id: None,
            concept_id: None,
        };
        return Ok((vec![target], false));
    }

    let curated = sample_curated(2)
        .into_iter()
        .map(|idea| RenderTarget {
            product: idea.label,
            prompt_base: idea.prompt_base,
            project_id: None,
            concept_id: None,
        })
        .collect();
    Ok((curated, true))
}

#[utoipa::path(
    post,
    path = "/api/render",
    tag = "Render",
    request_body = RenderRequest,
    responses(
        (status = 200, description = "Rendered images grouped by product", body = RenderResponse),
        (status = 400, description = "Missing or invalid brand"),
        (status = 404, description = "Unknown project or concept"),
        (status = 429, description = "Rate limited"),
        (status = 500, description = "Every render branch failed")
    )
)]
pub async fn render_products(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RenderRequest>,
) -> Result<Json<RenderResponse>, AppError> {
    let brand = required_brand(payload.brand.as_deref())?;
    let (targets, curated) = targets(&state, &payload).await?;
    let variants = if curated { 1 } else { payload.variant_count() };

    let plan = RenderPlan {
        brand,
        targets,
        variants,
        strategies: payload.strategies.clone().filter(|s| !s.is_empty()),
        logo_url: non_empty(payload.logo_url.as_deref()),
        product_ref_url: non_empty(payload.product_ref_url.as_deref()),
    };

    let items = render(&state, &plan).await?;
    let images: usize = items.iter().map(|i| i.images.len()).sum();
    tracing::info!(
        brand = %plan.brand,
        products = items.len(),
        images,
        "Render | POST /api/render | res=200"
    );
    Ok(Json(RenderResponse { items }))
}

#[utoipa::path(
    post,
    path = "/api/render-more",
    tag = "Render",
    request_body = RenderMoreRequest,
    responses(
        (status = 200, description = "One more image of the product", body = RenderMoreResponse),
        (status = 400, description = "Missing brand or product"),
        (status = 429, description = "Rate limited"),
        (status = 500, description = "Render failed")
    )
)]
pub async fn render_more(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RenderMoreRequest>,
) -> Result<Json<RenderMoreResponse>, AppError> {
    let brand = required_brand(payload.brand.as_deref())?;
    let product = non_empty(payload.product.as_deref())
        .ok_or(AppError::BadRequest("product_required".to_string()))?;

    let plan = RenderPlan {
        brand,
        targets: vec![RenderTarget {
            product: product.clone(),
            prompt_base: product.clone(),
            project_id: None,
            concept_id: None,
        }],
        variants: 1,
        strategies: None,
        logo_url: non_empty(payload.logo_url.as_deref()),
        product_ref_url: None,
    };

    let image = render(&state, &plan)
        .await?
        .into_iter()
        .flat_map(|item| item.images)
        .next()
        .ok_or(AppError::InternalServerError("render_error".to_string()))?;

    tracing::info!(brand = %plan.brand, %product, model = %image.model, "Render | POST /api/render-more | res=200");
    Ok(Json(RenderMoreResponse { product, image }))
}
