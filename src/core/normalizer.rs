//! Query normalization shared by cache keys and fuzzy matching.

const LEADING_ARTICLES: &[&str] = &["the "];
const TRAILING_NOISE: &[&str] = &[" city", " airport"];

/// Lowercase, trim, collapse whitespace, then strip a leading article and
/// one trailing noise word.
pub fn normalize_query(input: &str) -> String {
    let collapsed = input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    let mut text = collapsed.as_str();

    for article in LEADING_ARTICLES {
        if let Some(rest) = text.strip_prefix(article) {
            text = rest;
            break;
        }
    }

    for suffix in TRAILING_NOISE {
        if let Some(rest) = text.strip_suffix(suffix) {
            text = rest;
            break;
        }
    }

    text.trim().to_string()
}

/// Memory cache key: the metro preference is part of the key.
pub fn get_cache_key(normalized: &str, prefer_metro: bool) -> String {
    let tag = if prefer_metro { "metro" } else { "airport" };
    format!("{}:{}", normalized, tag)
}

/// Uppercased IATA code when the normalized query is exactly 3 letters.
pub fn as_iata_code(normalized: &str) -> Option<String> {
    if normalized.len() == 3 && normalized.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(normalized.to_ascii_uppercase())
    } else {
        None
    }
}
