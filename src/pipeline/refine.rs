use std::sync::Arc;

use async_trait::async_trait;
use image::{DynamicImage, GenericImageView, RgbaImage};

use super::geometry::{draw_over, feathered_mask, resize_logo, RelRect};
use super::{
    IntegrationError, IntegrationJob, Integrated, LogoIntegrationStrategy, StrategyKind,
    TAG_COMPOSITE_RAW, TAG_COMPOSITE_REFINE,
};
use crate::prompts::refine_instruction;
use crate::services::provider::ImageBackend;
use crate::utils::image_processor;

const MAX_LOGO_WIDTH: f32 = 0.4;
const LOGO_TOP: f32 = 0.4;
const LOGO_OPACITY: f32 = 0.8;
const EDIT_REGION: RelRect = RelRect::new(0.25, 0.375, 0.5, 0.25);
const FEATHER: f32 = 0.01;

/// Pastes the logo onto the product, then asks an edit model to make it look
/// printed. A failed edit still yields the raw composite.
pub struct CompositeRefine {
    backend: Arc<dyn ImageBackend>,
}

impl CompositeRefine {
    pub fn new(backend: Arc<dyn ImageBackend>) -> Self {
        Self { backend }
    }
}

/// Logo at most 40% of the base width, horizontally centered, top edge at 40%
/// of the base height, drawn at 80% opacity.
pub fn paste_logo(base: &DynamicImage, logo: &DynamicImage) -> RgbaImage {
    let (bw, bh) = base.dimensions();
    let (lw, lh) = logo.dimensions();
    let width = (lw as f32).min(bw as f32 * MAX_LOGO_WIDTH).max(1.0);
    let height = (lh as f32 / lw.max(1) as f32 * width).max(1.0);
    let size = (width.round() as u32, height.round() as u32);

    let mut canvas = base.to_rgba8();
    let x = ((bw as f32 - width) / 2.0).round() as i64;
    let y = (bh as f32 * LOGO_TOP).round() as i64;
    draw_over(&mut canvas, &resize_logo(logo, size), x, y, LOGO_OPACITY);
    canvas
}

pub fn edit_mask(width: u32, height: u32) -> RgbaImage {
    let feather = width.min(height) as f32 * FEATHER;
    feathered_mask(width, height, EDIT_REGION.to_pixels(width, height), feather)
}

#[async_trait]
impl LogoIntegrationStrategy for CompositeRefine {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CompositeRefine
    }

    async fn integrate(&self, job: &IntegrationJob) -> Result<Integrated, IntegrationError> {
        let base = job.base.clone();
        let logo = job.logo()?.clone();

        let (composite, composite_png, mask_png) = tokio::task::spawn_blocking(move || {
            let composite = DynamicImage::ImageRgba8(paste_logo(&base, &logo));
            let (w, h) = composite.dimensions();
            let mask = DynamicImage::ImageRgba8(edit_mask(w, h));
            let composite_png = image_processor::encode_png(&composite)?;
            let mask_png = image_processor::encode_png(&mask)?;
            Ok::<_, image::ImageError>((composite, composite_png, mask_png))
        })
        .await??;

        let prompt = refine_instruction(&job.product_label);
        let refined = match self
            .backend
            .edit(&composite_png, Some(&mask_png), &prompt)
            .await
        {
            Ok(bytes) => image_processor::decode(&bytes).map_err(IntegrationError::from),
            Err(e) => Err(e.into()),
        };

        match refined {
            Ok(image) => Ok(Integrated {
                tag: TAG_COMPOSITE_REFINE,
                image,
            }),
            Err(e) => {
                tracing::warn!(error = %e, provider = self.backend.name(), "refine edit failed, keeping raw composite");
                Ok(Integrated {
                    tag: TAG_COMPOSITE_RAW,
                    image: composite,
                })
            }
        }
    }
}
