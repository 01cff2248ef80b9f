use axum::{
    extract::{Query, State},
    response::Json,
};
use chrono::NaiveDateTime;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::render::{self, Entity as Render};
use crate::error::AppError;
use crate::pagination::{PaginatedResponse, Pagination};
use crate::state::AppState;

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GalleryItem {
    pub id: Uuid,
    pub brand: Option<String>,
    pub product: Option<String>,
    pub model: String,
    pub image_url: String,
    pub thumbnail_url: Option<String>,
    pub created_at: NaiveDateTime,
}

impl From<render::Model> for GalleryItem {
    fn from(r: render::Model) -> Self {
        GalleryItem {
            id: r.id,
            brand: r.brand,
            product: r.product,
            model: r.model,
            image_url: r.image_url,
            thumbnail_url: r.thumbnail_url,
            created_at: r.created_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/gallery",
    tag = "Gallery",
    params(Pagination),
    responses(
        (status = 200, description = "Public renders, newest first", body = PaginatedResponse<GalleryItem>),
        (status = 429, description = "Rate limited")
    )
)]
pub async fn list_gallery(
    State(state): State<AppState>,
    Query(query): Query<Pagination>,
) -> Result<Json<PaginatedResponse<GalleryItem>>, AppError> {
    let page = query.page();
    let limit = query.limit();

    let paginator = Render::find()
        .filter(render::Column::Public.eq(true))
        .order_by_desc(render::Column::CreatedAt)
        .order_by_desc(render::Column::Id)
        .paginate(&state.db, limit);

    let total_items = paginator.num_items().await?;
    let data = paginator
        .fetch_page(page - 1)
        .await?
        .into_iter()
        .map(GalleryItem::from)
        .collect::<Vec<_>>();

    tracing::debug!(page, limit, returned = data.len(), "Gallery | GET /api/gallery | res=200");
    Ok(Json(PaginatedResponse::new(data, total_items, page, limit)))
}
