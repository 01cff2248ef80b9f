use serde::Serialize;
use uuid::Uuid;

use crate::config::Buckets;
use crate::error::AppError;
use crate::services::storage::ObjectStore;
use crate::utils::image_processor::{self, THUMBNAIL_MAX};
use crate::utils::{date_prefix, short_id, slugify};

/// A stored render: full PNG plus its thumbnail.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderImage {
    pub model: String,
    pub image_url: String,
    pub thumbnail_url: String,
}

/// Where a render lives in the buckets, without the extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPath {
    stem: String,
}

impl RenderPath {
    /// `{date}/{projectId}/{conceptId}/{tag}-{variant}`
    pub fn for_concept(project_id: Uuid, concept_id: Uuid, tag: &str) -> Self {
        Self {
            stem: format!(
                "{}/{}/{}/{}-{}",
                date_prefix(),
                project_id,
                concept_id,
                tag,
                short_id()
            ),
        }
    }

    /// `{date}/loose/{product-slug}/{tag}-{variant}`, for renders with no
    /// project behind them.
    pub fn loose(product: &str, tag: &str) -> Self {
        Self {
            stem: format!("{}/loose/{}/{}-{}", date_prefix(), slugify(product), tag, short_id()),
        }
    }

    pub fn image_key(&self) -> String {
        format!("{}.png", self.stem)
    }

    pub fn thumbnail_key(&self) -> String {
        format!("{}_512.png", self.stem)
    }
}

/// Normalizes to PNG, builds the 512px thumbnail and uploads both. Nothing is
/// written to the database here.
pub async fn persist_render(
    storage: &dyn ObjectStore,
    buckets: &Buckets,
    path: &RenderPath,
    tag: &str,
    raw: Vec<u8>,
) -> Result<RenderImage, AppError> {
    let (png, thumb) = tokio::task::spawn_blocking(move || {
        let png = image_processor::normalize_to_png(&raw)?;
        let thumb = image_processor::create_thumbnail(&png.bytes, THUMBNAIL_MAX)?;
        Ok::<_, image::ImageError>((png, thumb))
    })
    .await??;

    let image_url = storage
        .put_object(&buckets.renders, &path.image_key(), png.bytes, "image/png")
        .await?;
    let thumbnail_url = storage
        .put_object(&buckets.thumbs, &path.thumbnail_key(), thumb.bytes, "image/png")
        .await?;

    Ok(RenderImage {
        model: tag.to_string(),
        image_url,
        thumbnail_url,
    })
}
