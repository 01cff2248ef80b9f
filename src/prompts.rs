//! Prompt text sent to the generative providers.

/// Words that describe scenery rather than the product itself.
const SCENE_WORDS: &[&str] = &[
    "background",
    "setting",
    "environment",
    "vibes",
    "beach",
    "home",
    "gym",
    "office",
];

/// Clauses that introduce a location ("on a desk", "in a kitchen").
const SCENE_CLAUSES: &[&str] = &[" on a ", " with a ", " in a ", " at a "];

const NEGATIVES: &str = "No environment, no platform, no ground plane, no reflections, \
no duplicate objects, no hands/people, no extra text, no patterns, no watermarks. Product only.";

pub const TRANSPARENCY_DIRECTIVE: &str = "CRITICAL: Generate with transparent background \
(alpha channel). Product must be isolated on transparent background with NO environment, \
platform, or ground plane.";

pub const STRICT_TRANSPARENCY_DIRECTIVE: &str = "MANDATORY: The previous attempt had an opaque \
background. Every pixel outside the product MUST be fully transparent (alpha = 0). Do not draw \
any backdrop, floor, shadow plane, gradient, vignette or studio sweep.";

pub const IDEAS_SYSTEM: &str = "You invent meme-friendly FAKE merch items. Keep them easily \
photographable as single products. Avoid weapons, drugs, alcohol, medical items, or anything unsafe.";

/// Strips scenery from a concept prompt base so the packshot prompt describes
/// only the object.
pub fn clean_prompt_base(prompt_base: &str) -> String {
    let parts: Vec<String> = prompt_base
        .split(',')
        .map(|part| {
            let part = part.trim();
            let padded = format!(" {} ", part.to_ascii_lowercase());
            let cut = SCENE_CLAUSES
                .iter()
                .filter_map(|clause| padded.find(clause))
                .min();
            match cut {
                // The padded copy is one byte ahead of `part`.
                Some(idx) if idx > 0 => part[..idx - 1].to_string(),
                _ => part.to_string(),
            }
        })
        .map(|part| part.trim().to_string())
        .filter(|part| {
            let lower = part.to_ascii_lowercase();
            !part.is_empty() && !SCENE_WORDS.iter().any(|w| lower.contains(w))
        })
        .collect();

    if parts.is_empty() {
        prompt_base.trim().to_string()
    } else {
        parts.join(", ")
    }
}

/// Studio packshot prompt. With a brand the model is asked to render the
/// brand mark itself; without one the product comes out clean so a real logo
/// can be integrated afterwards.
pub fn product_prompt(brand: Option<&str>, prompt_base: &str) -> String {
    let subject = clean_prompt_base(prompt_base);
    match brand {
        Some(brand) => format!(
            "Single, isolated {subject}. Photorealistic studio packshot, centered. Apply the \
\"{brand}\" logo once, following surface curvature and perspective; preserve aspect ratio and \
legibility; realistic material/lighting. Transparent background (alpha). {NEGATIVES}"
        ),
        None => format!(
            "Single, isolated {subject}. Photorealistic studio packshot, centered. Plain \
unbranded surfaces with no logos or lettering. Transparent background (alpha). {NEGATIVES}"
        ),
    }
}

/// Instruction for refining a pasted logo composite.
pub fn refine_instruction(product: &str) -> String {
    format!(
        "Refine and improve the logo integration on this {product}. Make the logo look more \
realistic and naturally applied to the product surface. Enhance perspective, lighting, and \
material response. Keep the existing logo artwork exactly as it is and do not invent new \
graphics, text or decorations. Maintain transparent background. Product only."
    )
}

/// Instruction for the guide + mask edit: only the artwork already visible in
/// the masked region may be integrated.
pub fn masked_guide_instruction(product: &str) -> String {
    format!(
        "Integrate ONLY the exact logo artwork already visible inside the editable region onto \
the surface of this {product}, as if printed or embossed. Match perspective, curvature, lighting \
and material. Do not add, invent or alter any logo, text, icon, pattern, sticker or decorative \
element. Do not change anything outside the editable region. Transparent background. Product only."
    )
}

pub fn ideas_user(brand: &str) -> String {
    format!(
        "Invent exactly TWO absurd but visually clear FAKE merch products for the brand \
\"{brand}\". Each must be a single, photographable object (e.g. flip-flops, hot sauce bottle, \
mug). Avoid real trademarks and text-heavy labels. Return JSON only, no prose: \
{{\"ideas\": [{{\"label\": \"AI Flip-Flops\", \"prompt_base\": \"foam flip-flops, soft shadows, \
product centered\"}}, {{\"label\": \"Crypto Hot Sauce\", \"prompt_base\": \"small glass bottle \
of hot sauce with greenish hue\"}}]}}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenery_parts_are_dropped() {
        assert_eq!(
            clean_prompt_base("foam flip-flops with colorful straps, beach setting, sand and water background, summer vibes"),
            "foam flip-flops with colorful straps"
        );
    }

    #[test]
    fn location_clauses_are_cut() {
        assert_eq!(
            clean_prompt_base("canvas tote bag hanging on a hook, minimalist background"),
            "canvas tote bag hanging"
        );
        assert_eq!(
            clean_prompt_base("ceramic coffee mug with steam rising from hot coffee, office desk setting"),
            "ceramic coffee mug with steam rising from hot coffee"
        );
    }

    #[test]
    fn all_scenery_keeps_original_text() {
        assert_eq!(clean_prompt_base("beach vibes"), "beach vibes");
    }

    #[test]
    fn branded_prompt_names_brand_and_negatives() {
        let prompt = product_prompt(Some("Acme"), "stainless steel water bottle");
        assert!(prompt.contains("\"Acme\""));
        assert!(prompt.contains("stainless steel water bottle"));
        assert!(prompt.contains("no duplicate objects"));
        assert!(prompt.contains("Transparent background"));
    }

    #[test]
    fn clean_prompt_never_mentions_a_brand() {
        let prompt = product_prompt(None, "baseball cap with trendy design, urban street background");
        assert!(prompt.contains("baseball cap with trendy design"));
        assert!(!prompt.contains("street"));
        assert!(prompt.contains("unbranded"));
    }

    #[test]
    fn masked_instruction_forbids_invention() {
        let text = masked_guide_instruction("mug");
        assert!(text.contains("ONLY the exact logo artwork"));
        assert!(text.contains("Do not add, invent"));
    }
}
