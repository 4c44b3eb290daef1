//! # Fuzzy String Similarity
//!
//! Approximate string scoring used to resolve OCR-mangled unit phrases.
//! All scores are integers on a 0–100 scale, higher meaning more similar.
//!
//! The building block is the normalized Indel similarity from `rapidfuzz`
//! (`2 * LCS / total length`), so a one-letter suffix costs little. On top of
//! it sit the usual composite measures:
//!
//! - `partial_ratio`: best alignment of the shorter string inside the longer
//! - `token_sort_ratio`: order-insensitive comparison of whitespace tokens
//! - `token_set_ratio`: comparison that ignores duplicated/extra tokens
//! - `weighted_ratio`: picks the most appropriate of the above based on the
//!   relative lengths of the inputs
//!
//! Every function is deterministic and allocation-light; none of them panic
//! on empty input.

use std::collections::BTreeSet;
use rapidfuzz::distance::indel;

/// Length ratio above which partial comparisons are considered
const PARTIAL_LENGTH_RATIO: f64 = 1.5;
/// Length ratio above which partial comparisons are heavily discounted
const LONG_PARTIAL_LENGTH_RATIO: f64 = 8.0;
const UNBASE_SCALE: f64 = 0.95;
const PARTIAL_SCALE: f64 = 0.90;
const LONG_PARTIAL_SCALE: f64 = 0.60;
/// Inputs shorter than this are only compared whole
const MIN_PARTIAL_LENGTH: f64 = 2.0;

/// Lowercase, replace non-alphanumerics with spaces, and collapse whitespace
pub fn preprocess(text: &str) -> String {
    let replaced: String = text
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .to_lowercase();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn to_score(similarity: f64) -> u8 {
    (similarity * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Indel similarity of the two strings as given
///
/// Only insertions and deletions count: `ratio("kilograms", "kilogram")` is 94.
pub fn ratio(a: &str, b: &str) -> u8 {
    if a.is_empty() && b.is_empty() {
        return 100;
    }
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    to_score(indel::normalized_similarity(a.chars(), b.chars()))
}

/// Best `ratio` of the shorter string against every same-length window of the longer
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let (shorter, longer) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };

    let short_len = shorter.chars().count();
    let long_chars: Vec<char> = longer.chars().collect();

    if short_len == 0 {
        return if long_chars.is_empty() { 100 } else { 0 };
    }
    if short_len == long_chars.len() {
        return ratio(shorter, longer);
    }

    let mut best = 0;
    for window in long_chars.windows(short_len) {
        let candidate: String = window.iter().collect();
        let score = ratio(shorter, &candidate);
        if score > best {
            best = score;
            if best == 100 {
                break;
            }
        }
    }
    best
}

fn sorted_tokens(text: &str) -> String {
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// `ratio` after sorting whitespace tokens alphabetically
pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
    ratio(&sorted_tokens(a), &sorted_tokens(b))
}

/// `partial_ratio` after sorting whitespace tokens alphabetically
pub fn partial_token_sort_ratio(a: &str, b: &str) -> u8 {
    partial_ratio(&sorted_tokens(a), &sorted_tokens(b))
}

fn token_set_score(a: &str, b: &str, scorer: fn(&str, &str) -> u8) -> u8 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();

    let join = |tokens: Vec<&str>| tokens.join(" ");
    let intersection = join(tokens_a.intersection(&tokens_b).copied().collect());
    let only_a = join(tokens_a.difference(&tokens_b).copied().collect());
    let only_b = join(tokens_b.difference(&tokens_a).copied().collect());

    let combined_a = format!("{} {}", intersection, only_a).trim().to_string();
    let combined_b = format!("{} {}", intersection, only_b).trim().to_string();

    [
        scorer(&intersection, &combined_a),
        scorer(&intersection, &combined_b),
        scorer(&combined_a, &combined_b),
    ]
    .into_iter()
    .max()
    .unwrap_or(0)
}

/// Compare the shared tokens against each side's full token set
pub fn token_set_ratio(a: &str, b: &str) -> u8 {
    token_set_score(a, b, ratio)
}

/// `token_set_ratio` using partial alignment
pub fn partial_token_set_ratio(a: &str, b: &str) -> u8 {
    token_set_score(a, b, partial_ratio)
}

/// Composite similarity score used for unit resolution
///
/// Both inputs are preprocessed first; if either becomes empty the score
/// is 0. Similar-length inputs are compared whole and by token order/set.
/// When one input is at least 1.5x longer than the other, the shorter one
/// is instead aligned inside the longer one (scaled by 0.9, or by 0.6 past
/// an 8x length ratio), so a unit followed by trailing OCR noise still
/// scores well against its canonical name. A single-character input is
/// never aligned; it would otherwise score 90 inside every unit containing
/// that letter.
pub fn weighted_ratio(a: &str, b: &str) -> u8 {
    let a = preprocess(a);
    let b = preprocess(b);
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let len_a = a.chars().count() as f64;
    let len_b = b.chars().count() as f64;
    let length_ratio = len_a.max(len_b) / len_a.min(len_b);

    let base = ratio(&a, &b) as f64;

    let best = if len_a.min(len_b) < MIN_PARTIAL_LENGTH {
        base
    } else if length_ratio < PARTIAL_LENGTH_RATIO {
        let token_sort = token_sort_ratio(&a, &b) as f64 * UNBASE_SCALE;
        let token_set = token_set_ratio(&a, &b) as f64 * UNBASE_SCALE;
        base.max(token_sort).max(token_set)
    } else {
        let partial_scale = if length_ratio > LONG_PARTIAL_LENGTH_RATIO {
            LONG_PARTIAL_SCALE
        } else {
            PARTIAL_SCALE
        };
        let partial = partial_ratio(&a, &b) as f64 * partial_scale;
        let partial_sort =
            partial_token_sort_ratio(&a, &b) as f64 * UNBASE_SCALE * partial_scale;
        let partial_set = partial_token_set_ratio(&a, &b) as f64 * UNBASE_SCALE * partial_scale;
        base.max(partial).max(partial_sort).max(partial_set)
    };

    best.round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preprocess() {
        assert_eq!(preprocess("  Kilo-Gram!! "), "kilo gram");
        assert_eq!(preprocess("***"), "");
    }

    #[test]
    fn test_ratio_bounds() {
        assert_eq!(ratio("volt", "volt"), 100);
        assert_eq!(ratio("", ""), 100);
        assert_eq!(ratio("volt", ""), 0);
        assert_eq!(ratio("centimetres", "centimetre"), 95);
        assert_eq!(ratio("kilograms", "kilogram"), 94);
    }

    #[test]
    fn test_partial_ratio_finds_embedded_match() {
        assert_eq!(partial_ratio("gram", "kilogram approx"), 100);
        assert_eq!(partial_ratio("kilogram approx", "gram"), 100);
        assert!(partial_ratio("cup", "xyzzy") < 50);
    }

    #[test]
    fn test_token_sort_ignores_order() {
        assert_eq!(token_sort_ratio("ounce fluid", "fluid ounce"), 100);
    }

    #[test]
    fn test_token_set_ignores_extra_tokens() {
        assert_eq!(token_set_ratio("fluid ounce fluid", "fluid ounce"), 100);
    }

    #[test]
    fn test_weighted_ratio_close_spelling() {
        assert!(weighted_ratio("centimetres", "centimetre") > 90);
        assert_eq!(weighted_ratio("KILOGRAM", "kilogram"), 100);
    }

    #[test]
    fn test_weighted_ratio_plural_beats_embedded_base_unit() {
        for (plural, prefixed, base) in [
            ("kilograms", "kilogram", "gram"),
            ("kilowatts", "kilowatt", "watt"),
            ("kilovolts", "kilovolt", "volt"),
        ] {
            assert_eq!(weighted_ratio(plural, prefixed), 94);
            assert_eq!(weighted_ratio(plural, base), 90);
        }
    }

    #[test]
    fn test_weighted_ratio_single_letter_is_not_aligned() {
        assert_eq!(partial_ratio("g", "kilogram"), 100);
        assert_eq!(weighted_ratio("g", "kilogram"), 22);
        assert_eq!(weighted_ratio("V", "volt"), 40);
        assert_eq!(weighted_ratio("m", "m"), 100);
    }

    #[test]
    fn test_weighted_ratio_trailing_noise() {
        assert_eq!(weighted_ratio("kilogram approx", "kilogram"), 90);
    }

    #[test]
    fn test_weighted_ratio_empty_inputs() {
        assert_eq!(weighted_ratio("", "gram"), 0);
        assert_eq!(weighted_ratio("   ", "gram"), 0);
        assert_eq!(weighted_ratio("gram", "..."), 0);
    }

    #[test]
    fn test_weighted_ratio_unrelated() {
        for unit in ["cup", "yard", "volt", "gram", "pint"] {
            assert!(weighted_ratio("xyzzy", unit) <= 70, "{}", unit);
        }
    }
}
