use std::sync::Arc;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;
use crate::prompts::{ideas_user, IDEAS_SYSTEM};
use crate::services::provider::TextBackend;

/// A product concept before it is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Idea {
    pub label: String,
    pub prompt_base: String,
}

impl Idea {
    fn new(label: &str, prompt_base: &str) -> Self {
        Self {
            label: label.to_string(),
            prompt_base: prompt_base.to_string(),
        }
    }
}

#[async_trait]
pub trait IdeaSource: Send + Sync {
    /// Exactly two ideas for the brand.
    async fn propose(&self, brand: &str) -> Result<Vec<Idea>, AppError>;
}

const DUMB_PRODUCTS: &[(&str, &str)] = &[
    ("AI Flip-Flops", "foam flip-flops with colorful straps, beach setting, sand and water background, summer vibes"),
    ("Crypto Hot Sauce", "small glass hot sauce bottle with red chili pepper sauce, kitchen counter setting"),
    ("Tech Bro Coffee Mug", "ceramic coffee mug with steam rising from hot coffee, office desk setting"),
    ("Influencer Tote Bag", "canvas tote bag hanging on a hook, minimalist background"),
    ("Startup T-Shirt", "cotton t-shirt laid flat on clean surface, casual wear style"),
    ("Gamer Energy Drink", "aluminum energy drink can with vibrant colors, gaming setup background"),
    ("Metaverse Sunglasses", "trendy sunglasses with reflective lenses, outdoor sunny setting"),
    ("Blockchain Water Bottle", "stainless steel water bottle with modern design, gym or office setting"),
    ("NFT Phone Case", "smartphone case with artistic design, tech desk background"),
    ("Cloud Storage USB", "sleek USB flash drive on modern desk, tech accessories around"),
    ("Social Media Stickers", "collection of vinyl stickers on laptop or water bottle surface"),
    ("Digital Nomad Backpack", "modern backpack with multiple compartments, travel setting"),
    ("Podcast Microphone Stress Ball", "microphone-shaped stress ball on desk, office environment"),
    ("Meme Mousepad", "computer mousepad with funny design, gaming desk setup"),
    ("Viral Video Cap", "baseball cap with trendy design, urban street background"),
    ("Influencer Ring Light Keychain", "miniature ring light keychain, keys and accessories background"),
    ("Crypto Mining Socks", "colorful patterned socks laid out flat, cozy home setting"),
    ("AI Assistant Rubber Duck", "yellow rubber duck with tech twist, bathroom or desk setting"),
    ("Startup Ping Pong Balls", "white ping pong balls on table tennis table, office recreation area"),
    ("Tech Conference Lanyard", "colorful conference lanyard with badge holder, professional setting"),
];

/// Product terms a generated idea must not contain.
const BLOCKED_TERMS: &[&str] = &[
    "knife", "blade", "weapon", "gun", "pill", "drug", "cigarette", "alcohol", "beer", "wine",
    "vodka", "prescription", "medicine", "syringe", "needle",
];

const MODEL_ATTEMPTS: usize = 3;

pub fn curated_ideas() -> Vec<Idea> {
    DUMB_PRODUCTS
        .iter()
        .map(|(label, prompt_base)| Idea::new(label, prompt_base))
        .collect()
}

/// Samples `count` distinct entries from the curated list.
pub fn sample_curated(count: usize) -> Vec<Idea> {
    let mut rng = rand::thread_rng();
    DUMB_PRODUCTS
        .choose_multiple(&mut rng, count)
        .map(|(label, prompt_base)| Idea::new(label, prompt_base))
        .collect()
}

/// Picks two ideas from the pre-written list. Never fails.
#[derive(Debug, Default, Clone)]
pub struct CuratedIdeas;

#[async_trait]
impl IdeaSource for CuratedIdeas {
    async fn propose(&self, _brand: &str) -> Result<Vec<Idea>, AppError> {
        Ok(sample_curated(2))
    }
}

/// Asks a text model for two ideas as JSON.
pub struct ModelIdeas {
    backend: Arc<dyn TextBackend>,
}

impl ModelIdeas {
    pub fn new(backend: Arc<dyn TextBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl IdeaSource for ModelIdeas {
    async fn propose(&self, brand: &str) -> Result<Vec<Idea>, AppError> {
        let user = ideas_user(brand);
        for attempt in 1..=MODEL_ATTEMPTS {
            let raw = match self.backend.complete_json(IDEAS_SYSTEM, &user).await {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "ideas request failed");
                    continue;
                }
            };
            match parse_ideas(&raw) {
                Some(ideas) => return Ok(ideas),
                None => tracing::warn!(attempt, %raw, "ideas response rejected"),
            }
        }
        Err(AppError::InternalServerError("Bad ideas response".to_string()))
    }
}

/// Accepts a bare array or an object wrapping one under `ideas`, `concepts`
/// or `products`. Only exactly two valid, unblocked ideas are returned.
pub fn parse_ideas(raw: &str) -> Option<Vec<Idea>> {
    let value: Value = serde_json::from_str(raw.trim()).ok()?;
    let list = match &value {
        Value::Array(items) => items.clone(),
        Value::Object(map) => ["ideas", "concepts", "products"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array).cloned())?,
        _ => return None,
    };

    let ideas: Vec<Idea> = list
        .into_iter()
        .filter_map(|item| serde_json::from_value::<Idea>(item).ok())
        .map(|idea| Idea {
            label: idea.label.trim().to_string(),
            prompt_base: idea.prompt_base.trim().to_string(),
        })
        .filter(|idea| !idea.label.is_empty() && !idea.prompt_base.is_empty())
        .filter(|idea| !is_blocked(idea))
        .collect();

    (ideas.len() == 2).then_some(ideas)
}

fn is_blocked(idea: &Idea) -> bool {
    let text = format!("{} {}", idea.label, idea.prompt_base).to_lowercase();
    BLOCKED_TERMS.iter().any(|term| text.contains(term))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::provider::ProviderError;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[test]
    fn curated_list_has_twenty_entries() {
        assert_eq!(curated_ideas().len(), 20);
    }

    #[test]
    fn curated_sample_is_distinct() {
        for _ in 0..20 {
            let picked = sample_curated(2);
            assert_eq!(picked.len(), 2);
            let labels: HashSet<_> = picked.iter().map(|i| i.label.clone()).collect();
            assert_eq!(labels.len(), 2);
        }
    }

    #[test]
    fn parses_bare_array() {
        let raw = r#"[{"label":"A","prompt_base":"a mug"},{"label":"B","prompt_base":"a cap"}]"#;
        let ideas = parse_ideas(raw).unwrap();
        assert_eq!(ideas[1].label, "B");
    }

    #[test]
    fn parses_wrapped_object() {
        for key in ["ideas", "concepts", "products"] {
            let raw = format!(
                r#"{{"{key}":[{{"label":"A","prompt_base":"a mug"}},{{"label":"B","prompt_base":"a cap"}}]}}"#
            );
            assert!(parse_ideas(&raw).is_some(), "key {key}");
        }
    }

    #[test]
    fn rejects_wrong_count_and_empty_fields() {
        assert!(parse_ideas(r#"[{"label":"A","prompt_base":"a mug"}]"#).is_none());
        assert!(parse_ideas(r#"[{"label":"A","prompt_base":""},{"label":"B","prompt_base":"x"}]"#).is_none());
        assert!(parse_ideas("not json").is_none());
    }

    #[test]
    fn blocked_products_are_filtered() {
        let raw = r#"{"ideas":[{"label":"Craft Beer","prompt_base":"a beer can"},{"label":"B","prompt_base":"a cap"}]}"#;
        assert!(parse_ideas(raw).is_none());
    }

    struct ScriptedText {
        replies: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TextBackend for ScriptedText {
        async fn complete_json(&self, _: &str, _: &str) -> Result<String, ProviderError> {
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                return Err(ProviderError::EmptyPayload { provider: "scripted" });
            }
            Ok(replies.remove(0))
        }
    }

    #[tokio::test]
    async fn model_ideas_retry_until_valid() {
        let backend = Arc::new(ScriptedText {
            replies: Mutex::new(vec![
                "{}".to_string(),
                r#"{"ideas":[{"label":"A","prompt_base":"a mug"},{"label":"B","prompt_base":"a cap"}]}"#
                    .to_string(),
            ]),
        });
        let ideas = ModelIdeas::new(backend).propose("Acme").await.unwrap();
        assert_eq!(ideas.len(), 2);
    }

    #[tokio::test]
    async fn model_ideas_give_up_after_three_attempts() {
        let backend = Arc::new(ScriptedText {
            replies: Mutex::new(vec!["[]".into(), "[]".into(), "[]".into()]),
        });
        let err = ModelIdeas::new(backend).propose("Acme").await.unwrap_err();
        assert_eq!(err.to_string(), "Bad ideas response");
    }
}
