use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue},
    response::Json,
};
use sea_orm::{ActiveModelTrait, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{concept, project};
use crate::error::AppError;
use crate::extractors::AppJson;
use crate::services::brand::is_blocked_brand;
use crate::services::ideas::Idea;
use crate::state::AppState;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ProposeRequest {
    pub brand: String,
    #[serde(rename = "logoUrl")]
    pub logo_url: Option<String>,
    pub product_hint: Option<String>,
    pub product_ref_url: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ConceptResponse {
    pub id: Uuid,
    pub label: String,
    pub prompt_base: String,
}

impl From<concept::Model> for ConceptResponse {
    fn from(concept: concept::Model) -> Self {
        ConceptResponse {
            id: concept.id,
            label: concept.label,
            prompt_base: concept.prompt_base,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ProposeResponse {
    #[serde(rename = "projectId")]
    pub project_id: Uuid,
    pub concepts: Vec<ConceptResponse>,
}

fn validate_url(field: &str, value: Option<&str>) -> Result<(), AppError> {
    match value {
        Some(raw) => url::Url::parse(raw)
            .map(|_| ())
            .map_err(|_| AppError::BadRequest(format!("{} must be a valid URL", field))),
        None => Ok(()),
    }
}

#[utoipa::path(
    post,
    path = "/api/propose",
    tag = "Concepts",
    request_body = ProposeRequest,
    responses(
        (status = 200, description = "Project created with one or two concepts", body = ProposeResponse,
            headers(("x-project-id" = String, description = "Id of the created project"))),
        (status = 400, description = "Invalid input or blocked brand"),
        (status = 429, description = "Rate limited"),
        (status = 500, description = "Idea generation failed")
    )
)]
pub async fn propose(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ProposeRequest>,
) -> Result<(HeaderMap, Json<ProposeResponse>), AppError> {
    let brand = payload.brand.trim().to_string();
    if brand.is_empty() {
        return Err(AppError::BadRequest("brand is required".to_string()));
    }
    if is_blocked_brand(&brand) {
        tracing::info!("Propose | POST /api/propose | res=400 | blocked brand");
        return Err(AppError::BadRequest("Brand not allowed".to_string()));
    }
    validate_url("logoUrl", payload.logo_url.as_deref())?;
    validate_url("product_ref_url", payload.product_ref_url.as_deref())?;

    let now = chrono::Utc::now().naive_utc();
    let project = project::ActiveModel {
        id: Set(Uuid::new_v4()),
        brand: Set(brand.clone()),
        logo_url: Set(payload.logo_url.clone()),
        created_at: Set(now),
    }
    .insert(&state.db)
    .await?;

    let hint = payload
        .product_hint
        .as_deref()
        .map(str::trim)
        .filter(|h| !h.is_empty());

    let ideas = match (hint, payload.product_ref_url.as_deref()) {
        (Some(hint), _) => vec![Idea {
            label: hint.to_string(),
            prompt_base: hint.to_string(),
        }],
        (None, Some(_)) => vec![Idea {
            label: "Custom Product".to_string(),
            prompt_base: "custom product".to_string(),
        }],
        (None, None) => state.ideas.propose(&brand).await?,
    };

    let mut concepts = Vec::with_capacity(ideas.len());
    for idea in ideas {
        let concept = concept::ActiveModel {
            id: Set(Uuid::new_v4()),
            project_id: Set(project.id),
            label: Set(idea.label),
            prompt_base: Set(idea.prompt_base),
            status: Set(concept::Status::Idea),
            created_at: Set(chrono::Utc::now().naive_utc()),
        }
        .insert(&state.db)
        .await?;
        concepts.push(ConceptResponse::from(concept));
    }

    let mut headers = HeaderMap::new();
    let project_header = HeaderValue::from_str(&project.id.to_string())
        .map_err(|e| AppError::InternalServerError(format!("Invalid project id header: {}", e)))?;
    headers.insert("x-project-id", project_header);

    tracing::info!(
        project = %project.id,
        brand = %project.brand,
        concepts = concepts.len(),
        "Propose | POST /api/propose | res=200"
    );
    Ok((
        headers,
        Json(ProposeResponse {
            project_id: project.id,
            concepts,
        }),
    ))
}
