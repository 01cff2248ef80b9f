pub mod image_processor;

use uuid::Uuid;

/// `YYYY-MM-DD` prefix used by every storage path.
pub fn date_prefix() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

// Helper to get file extension
pub fn get_extension(filename: &str) -> Option<String> {
    std::path::Path::new(filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .map(|ext| ext.to_lowercase())
}

/// Lowercase, dash separated, safe for object keys.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() {
        "product".to_string()
    } else {
        slug
    }
}

pub fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Crypto   Hot Sauce! "), "crypto-hot-sauce");
        assert_eq!(slugify("AI Flip-Flops"), "ai-flip-flops");
        assert_eq!(slugify("???"), "product");
    }

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(get_extension("Logo.PNG").as_deref(), Some("png"));
        assert_eq!(get_extension("no_extension"), None);
    }

    #[test]
    fn date_prefix_is_iso_date() {
        let prefix = date_prefix();
        assert_eq!(prefix.len(), 10);
        assert!(chrono::NaiveDate::parse_from_str(&prefix, "%Y-%m-%d").is_ok());
    }

    #[test]
    fn short_id_is_twelve_hex_chars() {
        let id = short_id();
        assert_eq!(id.len(), 12);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
