//! Query cleanup applied before search.
//!
//! Strips ASCII punctuation and one-letter words. Callers opt in through
//! `QuoteFinder::search_raw`; `QuoteFinder::search` takes text as-is.

/// Clean a raw query. `None` when there is no usable input at all.
///
/// The result may still be empty, e.g. for `"?!"` or `"я"`.
pub fn prepare_query(raw: &str) -> Option<String> {
    if raw.trim().is_empty() {
        return None;
    }

    let stripped: String = raw.chars().filter(|c| !c.is_ascii_punctuation()).collect();
    let cleaned = stripped
        .split_whitespace()
        .filter(|w| w.chars().count() > 1)
        .collect::<Vec<_>>()
        .join(" ");

    if cleaned != raw {
        tracing::debug!(raw, cleaned = %cleaned, "stripped query");
    }
    Some(cleaned)
}

/// Token string stored alongside a quote: cleaned and lower-cased
pub fn tokenize_phrase(phrase: &str) -> String {
    prepare_query(phrase)
        .map(|cleaned| cleaned.to_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_query_blank_is_none() {
        assert_eq!(prepare_query(""), None);
        assert_eq!(prepare_query("   \t"), None);
    }

    #[test]
    fn test_prepare_query_strips_punctuation() {
        assert_eq!(
            prepare_query("Шо мовчите, скуштували?").as_deref(),
            Some("Шо мовчите скуштували")
        );
    }

    #[test]
    fn test_prepare_query_drops_single_letter_words() {
        assert_eq!(
            prepare_query("А ти в бєлки видів?").as_deref(),
            Some("ти бєлки видів")
        );
    }

    #[test]
    fn test_prepare_query_keeps_non_ascii_punctuation() {
        // Only ASCII punctuation is removed; the typographic apostrophe survives
        assert_eq!(prepare_query("п’яних!").as_deref(), Some("п’яних"));
    }

    #[test]
    fn test_prepare_query_can_clean_to_empty() {
        assert_eq!(prepare_query("?! я").as_deref(), Some(""));
    }

    #[test]
    fn test_prepare_query_collapses_whitespace() {
        assert_eq!(prepare_query("  чого   вам  ").as_deref(), Some("чого вам"));
    }

    #[test]
    fn test_tokenize_phrase_lowercases() {
        assert_eq!(
            tokenize_phrase("Так би усє кишки у тєбя і шваркнули!"),
            "так би усє кишки тєбя шваркнули"
        );
        assert_eq!(tokenize_phrase(""), "");
    }
}
