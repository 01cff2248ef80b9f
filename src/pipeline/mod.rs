//! Logo integration: a set of interchangeable strategies run as an ordered
//! fallback chain. The chain always produces an image; when every strategy
//! fails the base image is returned untouched.

pub mod composite;
pub mod direct;
pub mod geometry;
pub mod masked;
pub mod refine;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::services::generator::ImageGenerator;
use crate::services::provider::ProviderError;

pub use composite::{BlendMode, Placement, PureComposite};
pub use direct::DirectGeneration;
pub use masked::MaskedGuideEdit;
pub use refine::CompositeRefine;

pub const TAG_DIRECT: &str = "direct-prompt";
pub const TAG_COMPOSITE_REFINE: &str = "composite-refine";
pub const TAG_COMPOSITE_RAW: &str = "composite-raw";
pub const TAG_MASKED_GUIDE: &str = "masked-guide-edit";
pub const TAG_PURE_COMPOSITE: &str = "pure-composite";
pub const TAG_BASE_ONLY: &str = "base-only";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
pub enum StrategyKind {
    #[serde(rename = "direct")]
    Direct,
    #[serde(rename = "composite_refine")]
    CompositeRefine,
    #[serde(rename = "masked_guide")]
    MaskedGuideEdit,
    #[serde(rename = "pure_composite")]
    PureComposite,
}

impl StrategyKind {
    /// Canonical fallback order.
    pub const ORDER: [StrategyKind; 4] = [
        StrategyKind::Direct,
        StrategyKind::CompositeRefine,
        StrategyKind::MaskedGuideEdit,
        StrategyKind::PureComposite,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::Direct => "direct",
            StrategyKind::CompositeRefine => "composite_refine",
            StrategyKind::MaskedGuideEdit => "masked_guide",
            StrategyKind::PureComposite => "pure_composite",
        }
    }

    /// The primary strategy followed by every strategy after it.
    pub fn default_chain(self) -> Vec<StrategyKind> {
        Self::ORDER.into_iter().skip_while(|k| *k != self).collect()
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ORDER
            .into_iter()
            .find(|k| k.as_str() == s.trim())
            .ok_or_else(|| format!("unknown logo strategy: {}", s))
    }
}

/// Everything a strategy may need to place a logo on a product.
#[derive(Debug, Clone)]
pub struct IntegrationJob {
    pub brand: String,
    pub product_label: String,
    pub prompt_base: String,
    pub base: DynamicImage,
    pub logo: Option<DynamicImage>,
}

impl IntegrationJob {
    pub fn logo(&self) -> Result<&DynamicImage, IntegrationError> {
        self.logo.as_ref().ok_or(IntegrationError::MissingLogo)
    }
}

#[derive(Debug, Clone)]
pub struct Integrated {
    pub tag: &'static str,
    pub image: DynamicImage,
}

#[derive(Debug, thiserror::Error)]
pub enum IntegrationError {
    #[error("no decodable logo")]
    MissingLogo,
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("{0} timed out")]
    Timeout(StrategyKind),
    #[error("strategy {0} is not registered")]
    Unavailable(StrategyKind),
    #[error("worker task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[async_trait]
pub trait LogoIntegrationStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    async fn integrate(&self, job: &IntegrationJob) -> Result<Integrated, IntegrationError>;
}

pub struct LogoPipeline {
    strategies: Vec<Arc<dyn LogoIntegrationStrategy>>,
    chain: Vec<StrategyKind>,
    attempt_timeout: Duration,
}

impl LogoPipeline {
    pub fn new(
        strategies: Vec<Arc<dyn LogoIntegrationStrategy>>,
        chain: Vec<StrategyKind>,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            strategies,
            chain,
            attempt_timeout,
        }
    }

    /// All four strategies, chained as configured.
    pub fn standard(
        generator: Arc<ImageGenerator>,
        config: &PipelineConfig,
        attempt_timeout: Duration,
    ) -> Self {
        let backend = generator.backend().clone();
        let strategies: Vec<Arc<dyn LogoIntegrationStrategy>> = vec![
            Arc::new(DirectGeneration::new(generator)),
            Arc::new(CompositeRefine::new(backend.clone())),
            Arc::new(MaskedGuideEdit::new(backend)),
            Arc::new(PureComposite::default()),
        ];
        let chain = config
            .fallbacks
            .clone()
            .unwrap_or_else(|| config.strategy.default_chain());
        Self::new(strategies, chain, attempt_timeout)
    }

    pub fn chain(&self) -> &[StrategyKind] {
        &self.chain
    }

    /// Runs the chain in order. Never fails: the last resort is the base image
    /// tagged `base-only`.
    pub async fn integrate(&self, job: &IntegrationJob) -> Integrated {
        self.integrate_with(&self.chain, job).await
    }

    /// Same as [`LogoPipeline::integrate`] over an explicit slice of the chain.
    pub async fn integrate_with(&self, chain: &[StrategyKind], job: &IntegrationJob) -> Integrated {
        for kind in chain {
            match self.attempt(*kind, job).await {
                Ok(result) => {
                    tracing::info!(strategy = %kind, tag = result.tag, product = %job.product_label, "logo integrated");
                    return result;
                }
                Err(e) => {
                    tracing::warn!(strategy = %kind, error = %e, "logo strategy failed, trying next");
                }
            }
        }

        tracing::warn!(product = %job.product_label, "every logo strategy failed, keeping base image");
        Integrated {
            tag: TAG_BASE_ONLY,
            image: job.base.clone(),
        }
    }

    /// One strategy, no fallback. Used for side-by-side comparisons.
    pub async fn attempt(
        &self,
        kind: StrategyKind,
        job: &IntegrationJob,
    ) -> Result<Integrated, IntegrationError> {
        let strategy = self
            .strategies
            .iter()
            .find(|s| s.kind() == kind)
            .ok_or(IntegrationError::Unavailable(kind))?;

        tokio::time::timeout(self.attempt_timeout, strategy.integrate(job))
            .await
            .map_err(|_| IntegrationError::Timeout(kind))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeStrategy {
        kind: StrategyKind,
        succeed: bool,
        delay: Option<Duration>,
        calls: AtomicUsize,
    }

    impl FakeStrategy {
        fn new(kind: StrategyKind, succeed: bool) -> Arc<Self> {
            Arc::new(Self {
                kind,
                succeed,
                delay: None,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl LogoIntegrationStrategy for FakeStrategy {
        fn kind(&self) -> StrategyKind {
            self.kind
        }

        async fn integrate(&self, job: &IntegrationJob) -> Result<Integrated, IntegrationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.succeed {
                Ok(Integrated {
                    tag: TAG_PURE_COMPOSITE,
                    image: job.base.clone(),
                })
            } else {
                Err(IntegrationError::MissingLogo)
            }
        }
    }

    fn job() -> IntegrationJob {
        IntegrationJob {
            brand: "Acme".into(),
            product_label: "Mug".into(),
            prompt_base: "ceramic mug".into(),
            base: DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 255]))),
            logo: None,
        }
    }

    #[test]
    fn strategy_names_parse() {
        assert_eq!("masked_guide".parse::<StrategyKind>().unwrap(), StrategyKind::MaskedGuideEdit);
        assert_eq!(" direct ".parse::<StrategyKind>().unwrap(), StrategyKind::Direct);
        assert!("sharpie".parse::<StrategyKind>().is_err());
        assert_eq!(
            serde_json::to_string(&StrategyKind::PureComposite).unwrap(),
            "\"pure_composite\""
        );
    }

    #[test]
    fn default_chain_follows_canonical_order() {
        assert_eq!(
            StrategyKind::CompositeRefine.default_chain(),
            vec![
                StrategyKind::CompositeRefine,
                StrategyKind::MaskedGuideEdit,
                StrategyKind::PureComposite
            ]
        );
        assert_eq!(StrategyKind::PureComposite.default_chain(), vec![StrategyKind::PureComposite]);
    }

    #[tokio::test]
    async fn falls_through_to_first_success() {
        let failing = FakeStrategy::new(StrategyKind::MaskedGuideEdit, false);
        let working = FakeStrategy::new(StrategyKind::PureComposite, true);
        let strategies: Vec<Arc<dyn LogoIntegrationStrategy>> = vec![failing.clone(), working.clone()];
        let pipeline = LogoPipeline::new(
            strategies,
            vec![StrategyKind::MaskedGuideEdit, StrategyKind::PureComposite],
            Duration::from_secs(5),
        );

        let result = pipeline.integrate(&job()).await;
        assert_eq!(result.tag, TAG_PURE_COMPOSITE);
        assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
        assert_eq!(working.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn all_failures_return_base_only() {
        let strategies: Vec<Arc<dyn LogoIntegrationStrategy>> = vec![
            FakeStrategy::new(StrategyKind::CompositeRefine, false),
            FakeStrategy::new(StrategyKind::MaskedGuideEdit, false),
        ];
        let pipeline = LogoPipeline::new(
            strategies,
            vec![
                StrategyKind::CompositeRefine,
                StrategyKind::MaskedGuideEdit,
                // Not registered: skipped like any other failure.
                StrategyKind::PureComposite,
            ],
            Duration::from_secs(5),
        );

        let job = job();
        let result = pipeline.integrate(&job).await;
        assert_eq!(result.tag, TAG_BASE_ONLY);
        assert_eq!(result.image.to_rgba8(), job.base.to_rgba8());
    }

    #[tokio::test]
    async fn slow_strategy_times_out_and_falls_back() {
        let slow = Arc::new(FakeStrategy {
            kind: StrategyKind::CompositeRefine,
            succeed: true,
            delay: Some(Duration::from_secs(30)),
            calls: AtomicUsize::new(0),
        });
        let strategies: Vec<Arc<dyn LogoIntegrationStrategy>> =
            vec![slow, FakeStrategy::new(StrategyKind::PureComposite, true)];
        let pipeline = LogoPipeline::new(
            strategies,
            vec![StrategyKind::CompositeRefine, StrategyKind::PureComposite],
            Duration::from_millis(20),
        );

        let err = pipeline
            .attempt(StrategyKind::CompositeRefine, &job())
            .await
            .unwrap_err();
        assert!(matches!(err, IntegrationError::Timeout(StrategyKind::CompositeRefine)));
        assert_eq!(pipeline.integrate(&job()).await.tag, TAG_PURE_COMPOSITE);
    }
}
