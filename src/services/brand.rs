use crate::error::AppError;

const MAX_BRAND_LEN: usize = 24;
const BLOCKED_WORDS: &[&str] = &["nazi", "hitler", "rape", "slur"];

/// Normalizes a brand for prompts: control whitespace becomes spaces, anything
/// but word characters, whitespace, `-` and `.` is dropped, then trimmed and
/// capped at 24 characters.
pub fn clean_brand(raw: &str) -> Result<String, AppError> {
    let trimmed = raw.trim_start();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return Err(AppError::BadRequest("Brand cannot be a URL".to_string()));
    }

    let cleaned: String = raw
        .chars()
        .map(|c| if matches!(c, '\n' | '\r' | '\t') { ' ' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || c.is_whitespace() || *c == '-' || *c == '.')
        .collect();
    let cleaned: String = cleaned.trim().chars().take(MAX_BRAND_LEN).collect();
    let cleaned = cleaned.trim_end().to_string();

    if cleaned.is_empty() {
        return Err(AppError::BadRequest("Invalid brand name".to_string()));
    }
    Ok(cleaned)
}

pub fn is_blocked_brand(brand: &str) -> bool {
    let lower = brand.to_lowercase();
    BLOCKED_WORDS.iter().any(|w| lower.contains(w))
}
