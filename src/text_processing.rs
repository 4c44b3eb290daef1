//! # Text Processing Module
//!
//! The three text stages that run before unit resolution:
//!
//! - **Cleaning**: strip OCR noise characters and normalize whitespace
//! - **Standardization**: rewrite unit abbreviations (`cm`, `fl oz`) to
//!   their canonical names via whole-word, case-insensitive substitution
//! - **Location**: find `(number, unit phrase)` pairs with a lenient pattern
//!
//! All stages are pure functions of their input and never fail; empty or
//! garbage input simply produces empty output.

use crate::vocabulary::AbbreviationEntry;
use lazy_static::lazy_static;
use regex::{NoExpand, Regex};
use std::borrow::Cow;
use std::fmt;
use tracing::{debug, trace};

lazy_static! {
    static ref WHITESPACE_REGEX: Regex =
        Regex::new(r"\s+").expect("Whitespace pattern should be valid");

    /// Digits with an optional decimal part, optional spacing, then the
    /// longest run of ASCII letters and whitespace (possibly empty)
    static ref QUANTITY_REGEX: Regex = Regex::new(r"(?P<number>\d+\.?\d*)\s*(?P<unit>[a-zA-Z\s]*)")
        .expect("Quantity pattern should be valid");
}

/// Remove noise characters and collapse whitespace
///
/// Keeps alphanumerics, whitespace, `.`, `,` and `-`; every other character
/// is dropped. Whitespace runs become a single space and the result is
/// trimmed. Applying it twice gives the same result as applying it once.
///
/// # Examples
///
/// ```rust
/// use measurement_extractor::text_processing::clean_text;
///
/// assert_eq!(clean_text("Weight:  5 kg (approx)"), "Weight 5 kg approx");
/// ```
pub fn clean_text(text: &str) -> String {
    let filtered: String = text
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || matches!(c, '.' | ',' | '-'))
        .collect();

    let cleaned = WHITESPACE_REGEX
        .replace_all(&filtered, " ")
        .trim()
        .to_string();

    trace!(
        input_len = text.len(),
        output_len = cleaned.len(),
        "Cleaned recognized text"
    );
    cleaned
}

struct AbbreviationRule {
    pattern: Regex,
    /// Same abbreviation anchored at the start of a unit phrase
    leading: Regex,
    replacement: String,
}

/// Rewrites unit abbreviations to canonical unit names
///
/// Rules are applied in table order, each pass operating on the output of
/// the previous one. Matching is case-insensitive and bounded by word
/// boundaries on both sides, so `cm` never fires inside `scm`.
pub struct UnitStandardizer {
    rules: Vec<AbbreviationRule>,
}

impl UnitStandardizer {
    /// Compile one whole-word pattern per abbreviation entry
    pub fn new(abbreviations: &[AbbreviationEntry]) -> Result<Self, regex::Error> {
        let rules = abbreviations
            .iter()
            .map(|entry| {
                let short = regex::escape(&entry.short);
                Ok(AbbreviationRule {
                    pattern: Regex::new(&format!(r"(?i)\b{}\b", short))?,
                    leading: Regex::new(&format!(r"(?i)^{}\b", short))?,
                    replacement: entry.full.clone(),
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        debug!("Compiled {} abbreviation rules", rules.len());
        Ok(Self { rules })
    }

    /// Apply every abbreviation rule, in order, to `text`
    pub fn standardize(&self, text: &str) -> String {
        let mut current = text.to_string();
        for rule in &self.rules {
            if rule.pattern.is_match(&current) {
                trace!(
                    pattern = %rule.pattern.as_str(),
                    replacement = %rule.replacement,
                    "Expanding abbreviation"
                );
                current = rule
                    .pattern
                    .replace_all(&current, NoExpand(&rule.replacement))
                    .into_owned();
            }
        }
        current
    }

    /// Expand an abbreviation glued to its number
    ///
    /// `500g` and `12V` have no word boundary before the unit, so
    /// [`standardize`](Self::standardize) leaves them alone and the locator
    /// yields the bare abbreviation as the unit phrase. The first rule, in
    /// table order, that matches at the start of `phrase` is applied once.
    pub fn expand_leading<'p>(&self, phrase: &'p str) -> Cow<'p, str> {
        for rule in &self.rules {
            if let Some(found) = rule.leading.find(phrase) {
                trace!(
                    phrase,
                    replacement = %rule.replacement,
                    "Expanding glued abbreviation"
                );
                return Cow::Owned(format!("{}{}", rule.replacement, &phrase[found.end()..]));
            }
        }
        Cow::Borrowed(phrase)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

/// A number and the free-text unit phrase that follows it
///
/// Both fields borrow from the scanned text; the number is kept verbatim so
/// no precision is lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawToken<'a> {
    pub number: &'a str,
    pub unit_phrase: &'a str,
}

impl<'a> RawToken<'a> {
    pub fn new(number: &'a str, unit_phrase: &'a str) -> Self {
        Self {
            number,
            unit_phrase,
        }
    }
}

impl fmt::Display for RawToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:?}, {:?})", self.number, self.unit_phrase)
    }
}

/// Lazily scan `text` for number/unit-phrase pairs
///
/// Matches are leftmost, non-overlapping, and produced left to right. The
/// unit phrase is the maximal run of letters and whitespace after the
/// number and may be empty. Calling the function again restarts the scan.
///
/// # Examples
///
/// ```rust
/// use measurement_extractor::text_processing::{locate_quantities, RawToken};
///
/// let pairs: Vec<RawToken> = locate_quantities("3kg").collect();
/// assert_eq!(pairs, vec![RawToken::new("3", "kg")]);
/// ```
pub fn locate_quantities(text: &str) -> impl Iterator<Item = RawToken<'_>> + '_ {
    QUANTITY_REGEX.captures_iter(text).filter_map(|capture| {
        let number = capture.name("number")?.as_str();
        let unit_phrase = capture.name("unit").map(|m| m.as_str()).unwrap_or("");
        let token = RawToken::new(number, unit_phrase);
        trace!(token = %token, "Located quantity");
        Some(token)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standardizer(entries: &[(&str, &str)]) -> UnitStandardizer {
        let table: Vec<AbbreviationEntry> = entries
            .iter()
            .map(|(short, full)| AbbreviationEntry::new(short, full))
            .collect();
        UnitStandardizer::new(&table).unwrap()
    }

    #[test]
    fn test_clean_text_strips_noise() {
        assert_eq!(clean_text("Weight: 5 kg approx"), "Weight 5 kg approx");
        assert_eq!(clean_text("  12,5\t\tcm  "), "12,5 cm");
        assert_eq!(clean_text("~!@#$%^&*()"), "");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn test_clean_text_keeps_separators() {
        assert_eq!(clean_text("1.5-2.0 l, 3 ml"), "1.5-2.0 l, 3 ml");
    }

    #[test]
    fn test_standardize_whole_word_only() {
        let s = standardizer(&[("cm", "centimetre")]);
        assert_eq!(s.standardize("scm 5"), "scm 5");
        assert_eq!(s.standardize("5 CM"), "5 centimetre");
        assert_eq!(s.standardize("5cm"), "5cm");
    }

    #[test]
    fn test_standardize_replacement_is_literal() {
        let s = standardizer(&[("usd", "$1 dollar")]);
        assert_eq!(s.standardize("3 usd"), "3 $1 dollar");
    }

    #[test]
    fn test_expand_leading_abbreviation() {
        let s = standardizer(&[("m", "metre"), ("mm", "millimetre"), ("g", "gram")]);
        assert_eq!(s.expand_leading("g"), "gram");
        assert_eq!(s.expand_leading("G approx"), "gram approx");
        assert_eq!(s.expand_leading("mm"), "millimetre");
        assert!(matches!(s.expand_leading("gram"), Cow::Borrowed("gram")));
        assert!(matches!(s.expand_leading("box g"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_locate_empty_unit_phrase() {
        let pairs: Vec<RawToken> = locate_quantities("42").collect();
        assert_eq!(pairs, vec![RawToken::new("42", "")]);
    }

    #[test]
    fn test_locate_is_restartable() {
        let text = "5 kilogram and 7 litre";
        let first: Vec<RawToken> = locate_quantities(text).collect();
        let second: Vec<RawToken> = locate_quantities(text).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_raw_token_display() {
        assert_eq!(RawToken::new("3", "kg").to_string(), r#"("3", "kg")"#);
    }
}
