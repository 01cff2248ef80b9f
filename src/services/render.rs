//! Render orchestration: one concurrent branch per (product, variant) or per
//! (product, strategy) in comparison mode.

use std::time::Duration;

use futures::future::join_all;
use image::{DynamicImage, RgbaImage};
use uuid::Uuid;

use crate::error::{AppError, BranchFailure};
use crate::models::render::RenderItem;
use crate::pipeline::{Integrated, IntegrationJob, StrategyKind, TAG_DIRECT};
use crate::prompts::product_prompt;
use crate::services::persist::{persist_render, RenderImage, RenderPath};
use crate::services::provider::ImageSize;
use crate::state::AppState;
use crate::utils::{image_processor, slugify};

/// One product to render.
#[derive(Debug, Clone)]
pub struct RenderTarget {
    pub product: String,
    pub prompt_base: String,
    pub project_id: Option<Uuid>,
    pub concept_id: Option<Uuid>,
}

impl RenderTarget {
    fn path(&self, tag: &str) -> RenderPath {
        match (self.project_id, self.concept_id) {
            (Some(project_id), Some(concept_id)) => RenderPath::for_concept(project_id, concept_id, tag),
            _ => RenderPath::loose(&self.product, tag),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderPlan {
    pub brand: String,
    pub targets: Vec<RenderTarget>,
    pub variants: u32,
    pub strategies: Option<Vec<StrategyKind>>,
    pub logo_url: Option<String>,
    pub product_ref_url: Option<String>,
}

struct Branch<'a> {
    target_index: usize,
    target: &'a RenderTarget,
    label: String,
    strategy: Option<StrategyKind>,
}

/// Decoded inputs shared by every branch of one request.
struct Assets {
    logo: Option<DynamicImage>,
    product_ref: Option<DynamicImage>,
}

pub async fn render(state: &AppState, plan: &RenderPlan) -> Result<Vec<RenderItem>, AppError> {
    let assets = Assets {
        logo: load_image(state, plan.logo_url.as_deref(), "logo").await,
        product_ref: load_image(state, plan.product_ref_url.as_deref(), "product reference").await,
    };
    if plan.logo_url.is_some() && assets.logo.is_none() && plan.strategies.is_none() {
        tracing::warn!(brand = %plan.brand, "logo unusable, falling back to text-branded generation");
    }

    let branches = plan_branches(plan);
    let timeout = state.config.limits.render_timeout;

    let outcomes = join_all(branches.iter().map(|branch| {
        let assets = &assets;
        async move {
            let outcome = run_with_timeout(timeout, render_branch(state, plan, assets, branch)).await;
            (branch, outcome)
        }
    }))
    .await;

    let mut items: Vec<RenderItem> = plan
        .targets
        .iter()
        .map(|target| RenderItem {
            product: target.product.clone(),
            concept_id: target.concept_id,
            images: Vec::new(),
        })
        .collect();
    let mut failures = Vec::new();

    for (branch, outcome) in outcomes {
        match outcome {
            Ok(image) => items[branch.target_index].images.push(image),
            Err(e) => {
                tracing::warn!(branch = %branch.label, error = %e, "render branch failed");
                failures.push(BranchFailure {
                    branch: branch.label.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    items.retain(|item| !item.images.is_empty());
    if items.is_empty() {
        return Err(AppError::RenderFailed(failures));
    }
    Ok(items)
}

fn plan_branches(plan: &RenderPlan) -> Vec<Branch<'_>> {
    let mut branches = Vec::new();
    for (target_index, target) in plan.targets.iter().enumerate() {
        let slug = slugify(&target.product);
        match &plan.strategies {
            Some(kinds) => {
                for kind in kinds {
                    branches.push(Branch {
                        target_index,
                        target,
                        label: format!("{}:{}", slug, kind),
                        strategy: Some(*kind),
                    });
                }
            }
            None => {
                for variant in 0..plan.variants {
                    branches.push(Branch {
                        target_index,
                        target,
                        label: format!("{}#{}", slug, variant),
                        strategy: None,
                    });
                }
            }
        }
    }
    branches
}

async fn run_with_timeout<F>(timeout: Duration, branch: F) -> Result<RenderImage, AppError>
where
    F: std::future::Future<Output = Result<RenderImage, AppError>>,
{
    tokio::time::timeout(timeout, branch).await.map_err(|_| {
        AppError::InternalServerError(format!("render timed out after {}s", timeout.as_secs()))
    })?
}

async fn render_branch(
    state: &AppState,
    plan: &RenderPlan,
    assets: &Assets,
    branch: &Branch<'_>,
) -> Result<RenderImage, AppError> {
    let target = branch.target;

    let (tag, bytes) = match (branch.strategy, &assets.logo) {
        (Some(kind), _) => {
            let job = build_job(state, plan, assets, target, kind != StrategyKind::Direct).await?;
            let integrated = state.pipeline.attempt(kind, &job).await?;
            (integrated.tag, encode(integrated.image).await?)
        }
        (None, Some(_)) => {
            let integrated = integrate_logo(state, plan, assets, target).await?;
            (integrated.tag, encode(integrated.image).await?)
        }
        (None, None) => {
            let prompt = product_prompt(Some(&plan.brand), &target.prompt_base);
            let bytes = state.generator.generate(&prompt, ImageSize::Square).await?;
            (TAG_DIRECT, bytes)
        }
    };

    persist_render(
        state.storage.as_ref(),
        &state.config.storage.buckets,
        &target.path(tag),
        tag,
        bytes,
    )
    .await
}

/// Runs the configured chain. A leading `direct` step draws the brand itself,
/// so the unbranded base is only generated once that step has failed.
async fn integrate_logo(
    state: &AppState,
    plan: &RenderPlan,
    assets: &Assets,
    target: &RenderTarget,
) -> Result<Integrated, AppError> {
    let chain = state.pipeline.chain();
    let rest = match chain.split_first() {
        Some((StrategyKind::Direct, rest)) => {
            let job = build_job(state, plan, assets, target, false).await?;
            match state.pipeline.attempt(StrategyKind::Direct, &job).await {
                Ok(integrated) => {
                    tracing::info!(strategy = %StrategyKind::Direct, tag = integrated.tag, product = %job.product_label, "logo integrated");
                    return Ok(integrated);
                }
                Err(e) => {
                    tracing::warn!(strategy = %StrategyKind::Direct, error = %e, "logo strategy failed, trying next");
                    rest
                }
            }
        }
        _ => chain,
    };

    let job = build_job(state, plan, assets, target, true).await?;
    Ok(state.pipeline.integrate_with(rest, &job).await)
}

/// The base is the uploaded product photo when there is one, otherwise a
/// freshly generated unbranded product.
async fn build_job(
    state: &AppState,
    plan: &RenderPlan,
    assets: &Assets,
    target: &RenderTarget,
    needs_base: bool,
) -> Result<IntegrationJob, AppError> {
    let base = match (&assets.product_ref, needs_base) {
        (Some(reference), _) => reference.clone(),
        (None, true) => {
            let prompt = product_prompt(None, &target.prompt_base);
            let bytes = state.generator.generate(&prompt, ImageSize::Square).await?;
            tokio::task::spawn_blocking(move || image_processor::decode(&bytes)).await??
        }
        (None, false) => DynamicImage::ImageRgba8(RgbaImage::new(1, 1)),
    };

    Ok(IntegrationJob {
        brand: plan.brand.clone(),
        product_label: target.product.clone(),
        prompt_base: target.prompt_base.clone(),
        base,
        logo: assets.logo.clone(),
    })
}

async fn encode(image: DynamicImage) -> Result<Vec<u8>, AppError> {
    Ok(tokio::task::spawn_blocking(move || image_processor::encode_png(&image)).await??)
}

/// Downloads and decodes an optional image. Failures are logged and treated
/// as absent: SVG logos, for instance, cannot be rasterized here.
async fn load_image(state: &AppState, url: Option<&str>, what: &'static str) -> Option<DynamicImage> {
    let url = url?;
    let bytes = match state.fetcher.fetch(url).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(what, %url, error = %e, "could not download image");
            return None;
        }
    };
    match tokio::task::spawn_blocking(move || image_processor::decode(&bytes)).await {
        Ok(Ok(image)) => Some(image),
        Ok(Err(e)) => {
            tracing::warn!(what, %url, error = %e, "could not decode image");
            None
        }
        Err(e) => {
            tracing::warn!(what, %url, error = %e, "decode task failed");
            None
        }
    }
}
