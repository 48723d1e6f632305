//! # Slug Detection
//!
//! Reverse lookup from free text to a translation key. Users often type a
//! button label instead of pressing it; this module recognises such text as
//! the key behind the label.
//!
//! Matching runs in two passes:
//! 1. exact, case-insensitive comparison against every label;
//! 2. fuzzy scoring with [`similarity`], keeping the best candidate that
//!    reaches the threshold. Ties keep the earlier candidate.

/// Default minimum similarity for a fuzzy match
pub const DEFAULT_THRESHOLD: f64 = 0.8;

/// Similarity assigned when one text contains the other
pub const CONTAINMENT_SCORE: f64 = 0.9;

/// A recognised label
#[derive(Debug, Clone, PartialEq)]
pub struct SlugMatch {
    /// Translation key (or city slug) the label belongs to
    pub key: String,
    /// Score in `[0.0, 1.0]`
    pub similarity: f64,
}

/// Similarity between two texts in `[0.0, 1.0]`.
///
/// Identical (ignoring case and surrounding whitespace) scores 1.0,
/// containment scores 0.9, anything else is the Jaccard index of the
/// whitespace-separated word sets.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    if a == b {
        return 1.0;
    }

    if a.contains(&b) || b.contains(&a) {
        return CONTAINMENT_SCORE;
    }

    let words_a: std::collections::HashSet<&str> = a.split_whitespace().collect();
    let words_b: std::collections::HashSet<&str> = b.split_whitespace().collect();

    let union = words_a.union(&words_b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = words_a.intersection(&words_b).count();

    intersection as f64 / union as f64
}

/// Find the key whose label best matches `text`.
///
/// `candidates` yields `(label, key)` pairs; several labels may share a key.
pub fn detect_slug<'a, I>(text: &str, candidates: I, threshold: f64) -> Option<SlugMatch>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
    I::IntoIter: Clone,
{
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let candidates = candidates.into_iter();
    let lowered = text.to_lowercase();

    if let Some((_, key)) = candidates
        .clone()
        .find(|(label, _)| label.trim().to_lowercase() == lowered)
    {
        return Some(SlugMatch {
            key: key.to_string(),
            similarity: 1.0,
        });
    }

    let mut best: Option<SlugMatch> = None;
    for (label, key) in candidates {
        let score = similarity(text, label);
        if score < threshold {
            continue;
        }
        if best.as_ref().is_none_or(|b| score > b.similarity) {
            best = Some(SlugMatch {
                key: key.to_string(),
                similarity: score,
            });
        }
    }

    if let Some(found) = &best {
        tracing::debug!(
            text = %text,
            key = %found.key,
            similarity = found.similarity,
            "Detected slug from free text"
        );
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<(&'static str, &'static str)> {
        vec![
            ("⬅️ Back", "btn-back"),
            ("❌ Cancel", "btn-cancel"),
            ("Skip", "btn-skip"),
            ("Order a taxi now", "btn-now"),
        ]
    }

    #[test]
    fn test_similarity_scores() {
        assert_eq!(similarity("Tashkent", "tashkent "), 1.0);
        assert_eq!(similarity("back", "⬅️ Back"), CONTAINMENT_SCORE);
        assert_eq!(similarity("order taxi", "taxi order please"), 2.0 / 3.0);
        assert_eq!(similarity("", "anything"), 0.0);
    }

    #[test]
    fn test_exact_match_has_full_similarity() {
        let found = detect_slug("skip", labels(), DEFAULT_THRESHOLD).unwrap();
        assert_eq!(found.key, "btn-skip");
        assert_eq!(found.similarity, 1.0);
    }

    #[test]
    fn test_substring_matches_label() {
        let found = detect_slug("Cancel", labels(), DEFAULT_THRESHOLD).unwrap();
        assert_eq!(found.key, "btn-cancel");
        assert_eq!(found.similarity, CONTAINMENT_SCORE);
    }

    #[test]
    fn test_no_shared_words_is_no_match() {
        assert_eq!(detect_slug("hello world", labels(), DEFAULT_THRESHOLD), None);
        assert_eq!(detect_slug("   ", labels(), DEFAULT_THRESHOLD), None);
    }

    #[test]
    fn test_threshold_rejects_partial_overlap() {
        // 2 of 5 words shared
        assert_eq!(detect_slug("order a pizza", labels(), DEFAULT_THRESHOLD), None);
        assert!(detect_slug("order a pizza", labels(), 0.3).is_some());
    }
}
