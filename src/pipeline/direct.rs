use std::sync::Arc;

use async_trait::async_trait;
use image::DynamicImage;

use super::{IntegrationError, IntegrationJob, Integrated, LogoIntegrationStrategy, StrategyKind, TAG_DIRECT};
use crate::prompts::product_prompt;
use crate::services::generator::ImageGenerator;
use crate::services::provider::ImageSize;
use crate::utils::image_processor;

/// Asks the image model to draw the brand itself. Ignores the base image and
/// the uploaded logo.
pub struct DirectGeneration {
    generator: Arc<ImageGenerator>,
}

impl DirectGeneration {
    pub fn new(generator: Arc<ImageGenerator>) -> Self {
        Self { generator }
    }
}

/// Text-branded product image.
pub async fn generate_branded(
    generator: &ImageGenerator,
    brand: &str,
    prompt_base: &str,
) -> Result<DynamicImage, IntegrationError> {
    let prompt = product_prompt(Some(brand), prompt_base);
    let bytes = generator.generate(&prompt, ImageSize::Square).await?;
    Ok(image_processor::decode(&bytes)?)
}

#[async_trait]
impl LogoIntegrationStrategy for DirectGeneration {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Direct
    }

    async fn integrate(&self, job: &IntegrationJob) -> Result<Integrated, IntegrationError> {
        let image = generate_branded(&self.generator, &job.brand, &job.prompt_base).await?;
        Ok(Integrated {
            tag: TAG_DIRECT,
            image,
        })
    }
}
