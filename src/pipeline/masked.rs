use std::sync::Arc;

use async_trait::async_trait;
use image::{DynamicImage, GenericImageView, RgbaImage};

use super::geometry::{center_in, draw_over, feathered_mask, fit_inside, resize_logo, RelRect};
use super::{
    IntegrationError, IntegrationJob, Integrated, LogoIntegrationStrategy, StrategyKind,
    TAG_MASKED_GUIDE,
};
use crate::prompts::masked_guide_instruction;
use crate::services::provider::ImageBackend;
use crate::utils::image_processor;

/// Where the logo goes on a centered packshot.
pub const ROI: RelRect = RelRect::new(0.29, 0.38, 0.42, 0.22);
const FEATHER_SIGMA: f32 = 0.015;

/// Places the real logo as a guide inside the region of interest and lets the
/// edit model integrate only that artwork, only inside a feathered hole.
pub struct MaskedGuideEdit {
    backend: Arc<dyn ImageBackend>,
}

impl MaskedGuideEdit {
    pub fn new(backend: Arc<dyn ImageBackend>) -> Self {
        Self { backend }
    }
}

pub fn guide_image(base: &DynamicImage, logo: &DynamicImage) -> RgbaImage {
    let (bw, bh) = base.dimensions();
    let roi = ROI.to_pixels(bw, bh);
    let size = fit_inside(logo.dimensions(), (roi.width, roi.height), true);
    let (x, y) = center_in(size, roi);

    let mut canvas = base.to_rgba8();
    draw_over(&mut canvas, &resize_logo(logo, size), x, y, 1.0);
    canvas
}

pub fn roi_mask(width: u32, height: u32) -> RgbaImage {
    // Two sigma either side of the edge.
    let feather = width.min(height) as f32 * FEATHER_SIGMA * 2.0;
    feathered_mask(width, height, ROI.to_pixels(width, height), feather)
}

#[async_trait]
impl LogoIntegrationStrategy for MaskedGuideEdit {
    fn kind(&self) -> StrategyKind {
        StrategyKind::MaskedGuideEdit
    }

    async fn integrate(&self, job: &IntegrationJob) -> Result<Integrated, IntegrationError> {
        let base = job.base.clone();
        let logo = job.logo()?.clone();

        let (guide_png, mask_png) = tokio::task::spawn_blocking(move || {
            let guide = DynamicImage::ImageRgba8(guide_image(&base, &logo));
            let (w, h) = guide.dimensions();
            let mask = DynamicImage::ImageRgba8(roi_mask(w, h));
            Ok::<_, image::ImageError>((
                image_processor::encode_png(&guide)?,
                image_processor::encode_png(&mask)?,
            ))
        })
        .await??;

        let prompt = masked_guide_instruction(&job.product_label);
        let bytes = self
            .backend
            .edit(&guide_png, Some(&mask_png), &prompt)
            .await?;
        let image = image_processor::decode(&bytes)?;

        Ok(Integrated {
            tag: TAG_MASKED_GUIDE,
            image,
        })
    }
}
