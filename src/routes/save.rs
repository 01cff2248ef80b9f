use axum::{extract::State, response::Json};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::concept::Entity as Concept;
use crate::entities::project::Entity as Project;
use crate::entities::render;
use crate::error::AppError;
use crate::extractors::AppJson;
use crate::state::AppState;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub project_id: Option<Uuid>,
    pub concept_id: Option<Uuid>,
    pub brand: Option<String>,
    pub product: Option<String>,
    pub model: String,
    pub image_url: String,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveResponse {
    pub ok: bool,
    pub render_id: Uuid,
}

/// Who the render belongs to: a stored concept or a free brand/product pair.
#[derive(Debug, PartialEq)]
enum Owner {
    Concept { project_id: Uuid, concept_id: Uuid },
    Loose { brand: String, product: String },
}

fn validate(payload: &SaveRequest) -> Result<Owner, AppError> {
    url::Url::parse(&payload.image_url)
        .map_err(|_| AppError::BadRequest("imageUrl must be a valid URL".to_string()))?;
    if let Some(thumb) = &payload.thumbnail_url {
        url::Url::parse(thumb)
            .map_err(|_| AppError::BadRequest("thumbnailUrl must be a valid URL".to_string()))?;
    }

    if let (Some(project_id), Some(concept_id)) = (payload.project_id, payload.concept_id) {
        return Ok(Owner::Concept {
            project_id,
            concept_id,
        });
    }

    let field = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
    match (field(&payload.brand), field(&payload.product)) {
        (Some(brand), Some(product)) => Ok(Owner::Loose { brand, product }),
        _ => Err(AppError::BadRequest(
            "projectId and conceptId, or brand and product, are required".to_string(),
        )),
    }
}

#[utoipa::path(
    post,
    path = "/api/save",
    tag = "Gallery",
    request_body = SaveRequest,
    responses(
        (status = 200, description = "Render published to the gallery", body = SaveResponse),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Unknown project or concept"),
        (status = 429, description = "Rate limited")
    )
)]
pub async fn save_render(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SaveRequest>,
) -> Result<Json<SaveResponse>, AppError> {
    let owner = validate(&payload)?;

    let (project_id, concept_id, brand, product) = match owner {
        Owner::Concept {
            project_id,
            concept_id,
        } => {
            let project = Project::find_by_id(project_id)
                .one(&state.db)
                .await?
                .ok_or(AppError::NotFound("Project not found".to_string()))?;
            let concept = Concept::find_by_id(concept_id)
                .one(&state.db)
                .await?
                .filter(|c| c.project_id == project_id)
                .ok_or(AppError::NotFound("Concept not found".to_string()))?;
            (Some(project_id), Some(concept_id), project.brand, concept.label)
        }
        Owner::Loose { brand, product } => (None, None, brand, product),
    };

    let saved = render::ActiveModel {
        id: Set(Uuid::new_v4()),
        project_id: Set(project_id),
        concept_id: Set(concept_id),
        brand: Set(Some(brand)),
        product: Set(Some(product)),
        model: Set(payload.model),
        image_url: Set(payload.image_url),
        thumbnail_url: Set(payload.thumbnail_url),
        public: Set(true),
        created_at: Set(chrono::Utc::now().naive_utc()),
    }
    .insert(&state.db)
    .await?;

    tracing::info!(render = %saved.id, model = %saved.model, "Save | POST /api/save | res=200");
    Ok(Json(SaveResponse {
        ok: true,
        render_id: saved.id,
    }))
}
