use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::pipeline::StrategyKind;
use crate::services::persist::RenderImage;

pub const DEFAULT_VARIANTS: u32 = 2;
pub const MAX_VARIANTS: u32 = 4;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    pub project_id: Option<Uuid>,
    pub concept_id: Option<Uuid>,
    pub brand: Option<String>,
    /// Product description; `product` is accepted as an alias.
    #[serde(alias = "product")]
    pub prompt_base: Option<String>,
    pub logo_url: Option<String>,
    pub product_ref_url: Option<String>,
    pub variants: Option<i64>,
    /// Runs each listed strategy once, side by side, with no fallback.
    pub strategies: Option<Vec<StrategyKind>>,
}

impl RenderRequest {
    pub fn variant_count(&self) -> u32 {
        clamp_variants(self.variants)
    }
}

pub fn clamp_variants(requested: Option<i64>) -> u32 {
    requested
        .unwrap_or(DEFAULT_VARIANTS as i64)
        .clamp(1, MAX_VARIANTS as i64) as u32
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderMoreRequest {
    pub brand: Option<String>,
    pub product: Option<String>,
    pub logo_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderItem {
    pub product: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concept_id: Option<Uuid>,
    pub images: Vec<RenderImage>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RenderResponse {
    pub items: Vec<RenderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RenderMoreResponse {
    pub product: String,
    pub image: RenderImage,
}
