//! Value normalizers for price text and category tags.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::CATEGORY_KEYWORDS;

static FREE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(free|gratuit|gratuite)\b").expect("free pattern"));
static AMOUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\s?(\d{1,3}(?:,\d{3})*|\d+)(?:\.(\d{2}))?").expect("amount pattern"));

const MAX_PRICE_TEXT: usize = 100;

/// Truncates to at most `max` characters.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].trim_end().to_string(),
        None => text.to_string(),
    }
}

/// Canonical price text: `Free`, `$a`, `$lo - $hi`, or the trimmed raw text.
pub fn normalize_price(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let amounts: Vec<(f64, String)> = AMOUNT_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(1)?.as_str().replace(',', "");
            let display = match caps.get(2) {
                Some(cents) => format!("${}.{}", whole, cents.as_str()),
                None => format!("${}", whole),
            };
            let value = display[1..].parse::<f64>().ok()?;
            Some((value, display))
        })
        .collect();

    if FREE_RE.is_match(text) && amounts.iter().all(|(value, _)| *value == 0.0) {
        return Some("Free".to_string());
    }

    let min = amounts.iter().min_by(|a, b| a.0.total_cmp(&b.0));
    let max = amounts.iter().max_by(|a, b| a.0.total_cmp(&b.0));
    match (min, max) {
        (Some(min), Some(max)) if min.0 == max.0 => Some(min.1.clone()),
        (Some(min), Some(max)) => Some(format!("{} - {}", min.1, max.1)),
        _ => Some(truncate_chars(text, MAX_PRICE_TEXT)),
    }
}

/// Categories suggested by keywords in the text, in table order.
pub fn infer_categories(text: &str) -> Vec<String> {
    let lowered = format!("{} ", text.to_lowercase());
    let mut categories: Vec<String> = Vec::new();
    for (keyword, category) in CATEGORY_KEYWORDS {
        if lowered.contains(keyword) && !categories.iter().any(|c| c == category) {
            categories.push(category.to_string());
        }
    }
    categories
}

/// Static venue tags first, then inferred ones not already present.
pub fn merge_categories(fixed: &[String], inferred: Vec<String>) -> Vec<String> {
    let mut merged = fixed.to_vec();
    for category in inferred {
        if !merged.iter().any(|c| c.eq_ignore_ascii_case(&category)) {
            merged.push(category);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_normalization() {
        assert_eq!(normalize_price("FREE admission").as_deref(), Some("Free"));
        assert_eq!(normalize_price("Entrée gratuite").as_deref(), Some("Free"));
        assert_eq!(normalize_price("Tickets $25").as_deref(), Some("$25"));
        assert_eq!(
            normalize_price("$45.50 adv / $30 door / $1,200 VIP").as_deref(),
            Some("$30 - $1200")
        );
        assert_eq!(
            normalize_price("Pay what you can").as_deref(),
            Some("Pay what you can")
        );
        assert_eq!(normalize_price("   "), None);
    }

    #[test]
    fn test_category_inference_and_merge() {
        let inferred = infer_categories("Summer Jazz Festival Concert Series");
        assert_eq!(inferred, vec!["Music".to_string(), "Festival".to_string()]);

        let merged = merge_categories(&["music".to_string(), "Outdoor".to_string()], inferred);
        assert_eq!(merged, vec!["music", "Outdoor", "Festival"]);

        assert!(infer_categories("Annual General Meeting").is_empty());
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("Théâtre", 3), "Thé");
        assert_eq!(truncate_chars("short", 10), "short");
    }
}
