//! Interest tag normalization and overlap scoring.
//!
//! Interest tags are free-form strings from the client. Without a canonical
//! form, "Sci-Fi" and "sci-fi" silently never match, so tags are normalized
//! once at queue ingestion: trimmed, lowercased, empties dropped, duplicates
//! removed (first occurrence wins, order preserved).

/// Normalize a list of raw interest tags into the canonical form.
pub fn normalize(raw: &[String]) -> Vec<String> {
    let mut seen = Vec::new();
    for tag in raw {
        let normalized = tag.trim().to_lowercase();
        if !normalized.is_empty() && !seen.contains(&normalized) {
            seen.push(normalized);
        }
    }
    seen
}

/// Count shared interests between two already-normalized tag lists.
pub fn overlap(a: &[String], b: &[String]) -> usize {
    a.iter().filter(|tag| b.contains(tag)).count()
}
