use async_trait::async_trait;
use image::{DynamicImage, GenericImageView, RgbaImage};

use super::geometry::{blend_onto, fit_inside, multiply, overlay, resize_logo, tone_down};
use super::{
    IntegrationError, IntegrationJob, Integrated, LogoIntegrationStrategy, StrategyKind,
    TAG_PURE_COMPOSITE,
};

const MAX_WIDTH: f32 = 0.15;
const MAX_HEIGHT: f32 = 0.08;
const BRIGHTNESS: f32 = 0.85;
const SATURATION: f32 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    #[default]
    LowerCenter,
    RightCenter,
    Center,
    UpperCenter,
}

impl Placement {
    /// Top-left corner for a logo of `logo` size on a base of `base` size.
    pub fn position(self, base: (u32, u32), logo: (u32, u32)) -> (i64, i64) {
        let (bw, bh) = (base.0 as f64, base.1 as f64);
        let (lw, lh) = (logo.0 as f64, logo.1 as f64);
        let centered_x = (bw - lw) / 2.0;
        let centered_y = (bh - lh) / 2.0;
        let (x, y) = match self {
            Placement::LowerCenter => (centered_x, bh * 0.75 - lh / 2.0),
            Placement::RightCenter => (bw * 0.7 - lw / 2.0, centered_y),
            Placement::Center => (centered_x, centered_y),
            Placement::UpperCenter => (centered_x, bh * 0.25 - lh / 2.0),
        };
        (x.round() as i64, y.round() as i64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    #[default]
    Overlay,
    Multiply,
}

/// Deterministic compositing with no model call. Small, toned-down logo
/// blended into the product surface.
#[derive(Debug, Clone, Copy, Default)]
pub struct PureComposite {
    pub placement: Placement,
    pub blend: BlendMode,
}

impl PureComposite {
    pub fn new(placement: Placement, blend: BlendMode) -> Self {
        Self { placement, blend }
    }

    pub fn compose(&self, base: &DynamicImage, logo: &DynamicImage) -> RgbaImage {
        let (bw, bh) = base.dimensions();
        let max = (
            ((bw as f32 * MAX_WIDTH).round() as u32).max(1),
            ((bh as f32 * MAX_HEIGHT).round() as u32).max(1),
        );
        let size = fit_inside(logo.dimensions(), max, false);

        let mut mark = resize_logo(logo, size);
        tone_down(&mut mark, BRIGHTNESS, SATURATION);

        let (x, y) = self.placement.position((bw, bh), size);
        let mut canvas = base.to_rgba8();
        match self.blend {
            BlendMode::Overlay => blend_onto(&mut canvas, &mark, x, y, 1.0, overlay),
            BlendMode::Multiply => blend_onto(&mut canvas, &mark, x, y, 1.0, multiply),
        }
        canvas
    }
}

#[async_trait]
impl LogoIntegrationStrategy for PureComposite {
    fn kind(&self) -> StrategyKind {
        StrategyKind::PureComposite
    }

    async fn integrate(&self, job: &IntegrationJob) -> Result<Integrated, IntegrationError> {
        let base = job.base.clone();
        let logo = job.logo()?.clone();
        let this = *self;
        let image = tokio::task::spawn_blocking(move || {
            DynamicImage::ImageRgba8(this.compose(&base, &logo))
        })
        .await?;

        Ok(Integrated {
            tag: TAG_PURE_COMPOSITE,
            image,
        })
    }
}
