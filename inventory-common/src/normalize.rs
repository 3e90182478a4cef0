//! Canonical comparison keys for identity-bearing text
//!
//! Organizations are matched on their full name, persons on their name and
//! products on (manufacturer, part number). These functions turn the raw
//! free text into the keys stored in the `*_key` columns, so two spellings
//! that differ only in spacing, case or dash style land on the same row.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Any run of whitespace, hyphens and underscores that contains at least
/// one hyphen or underscore
static PART_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s_-]*[-_][\s_-]*").expect("static separator pattern"));

/// Canonical key for a name
///
/// Trims, turns non-breaking spaces into plain spaces, collapses internal
/// whitespace runs to one space, applies NFC and optionally lower-cases.
/// Returns `None` when nothing is left.
pub fn canonical_key(text: &str, fold_case: bool) -> Option<String> {
    let spaced = text.replace('\u{00A0}', " ");
    let collapsed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }

    let composed: String = collapsed.nfc().collect();
    if fold_case {
        // lower-casing can decompose a few characters, so recompose
        Some(composed.to_lowercase().nfc().collect())
    } else {
        Some(composed)
    }
}

/// [`canonical_key`] over optional input
pub fn canonical_key_opt(text: Option<&str>, fold_case: bool) -> Option<String> {
    text.and_then(|t| canonical_key(t, fold_case))
}

/// Canonical key for a part number
///
/// `"AB–100"`, `"ab - 100"` and `"AB_100"` all become `"AB-100"`.
pub fn canonical_part_number(text: &str) -> Option<String> {
    let key = canonical_key(text, false)?;
    let dashed = key.replace(['\u{2013}', '\u{2014}'], "-");
    let joined = PART_SEPARATOR.replace_all(&dashed, "-");
    Some(joined.to_uppercase())
}

/// Case-folded form of free text for substring search
///
/// SQLite's `lower()` and `LIKE` only fold ASCII, so searchable columns store
/// this form and search terms go through it too.
pub fn search_text(text: &str) -> String {
    let composed: String = text.nfc().collect();
    composed.to_lowercase().nfc().collect()
}

/// [`search_text`] over optional input
pub fn search_text_opt(text: Option<&str>) -> Option<String> {
    text.map(search_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_key_collapses_whitespace() {
        assert_eq!(
            canonical_key("  Acme \t  Corp\n", false).as_deref(),
            Some("Acme Corp")
        );
    }

    #[test]
    fn test_canonical_key_folds_case() {
        assert_eq!(canonical_key("  acme   corp  ", true), canonical_key("Acme Corp", true));
    }

    #[test]
    fn test_canonical_key_replaces_nbsp() {
        assert_eq!(canonical_key("Acme\u{00A0}Corp", true).as_deref(), Some("acme corp"));
    }

    #[test]
    fn test_canonical_key_composes_unicode() {
        // "e" + combining acute vs precomposed "é"
        let decomposed = "Cafe\u{0301} Ltd";
        let composed = "Caf\u{00E9} Ltd";
        assert_eq!(canonical_key(decomposed, false), canonical_key(composed, false));
    }

    #[test]
    fn test_canonical_key_empty_is_none() {
        assert_eq!(canonical_key("", true), None);
        assert_eq!(canonical_key(" \u{00A0}\t ", false), None);
        assert_eq!(canonical_key_opt(None, true), None);
    }

    #[test]
    fn test_part_number_dash_variants() {
        let expected = Some("AB-100".to_string());
        assert_eq!(canonical_part_number("AB–100"), expected);
        assert_eq!(canonical_part_number("ab - 100"), expected);
        assert_eq!(canonical_part_number("AB_100"), expected);
        assert_eq!(canonical_part_number("ab—100"), expected);
        assert_eq!(canonical_part_number("ab -_- 100"), expected);
    }

    #[test]
    fn test_part_number_keeps_plain_spaces() {
        assert_eq!(canonical_part_number("ab  100").as_deref(), Some("AB 100"));
    }

    #[test]
    fn test_part_number_empty_is_none() {
        assert_eq!(canonical_part_number("   "), None);
    }

    #[test]
    fn test_search_text_folds_non_ascii() {
        assert_eq!(search_text("Москва Завод"), "москва завод");
        assert_eq!(search_text("ÄRGER"), search_text("ärger"));
        assert_eq!(search_text("Cafe\u{0301}"), "café");
    }
}
