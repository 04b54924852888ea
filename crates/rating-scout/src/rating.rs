//! The `Rating` value type and the free-text rating parser.
//!
//! Ratings are star scores on a 0–5 scale. Anything parsed outside that
//! range is noise (a price, a review count, a year) and is dropped rather
//! than reported.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

/// Lowest valid star rating.
pub const MIN_RATING: f64 = 0.0;
/// Highest valid star rating.
pub const MAX_RATING: f64 = 5.0;

/// A star rating, guaranteed to lie within `[0.0, 5.0]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Rating(f64);

impl Rating {
    /// Wrap a raw value, returning `None` when it is outside `[0.0, 5.0]` or NaN.
    pub fn new(value: f64) -> Option<Self> {
        (MIN_RATING..=MAX_RATING).contains(&value).then_some(Self(value))
    }

    /// Parse a numeral that may use a decimal comma (`"4,5"`).
    pub fn from_numeral(numeral: &str) -> Option<Self> {
        numeral
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .ok()
            .and_then(Self::new)
    }

    /// The raw star value.
    pub fn value(self) -> f64 {
        self.0
    }

    /// Whether this rating lies within `[threshold, 5.0]`.
    pub fn meets(self, threshold: f64) -> bool {
        self.0 >= threshold
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn numeral_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d+(?:[.,]\d+)?\b").expect("numeral regex is valid"))
}

/// Extract a rating from arbitrary text.
///
/// Takes the first numeral in the string (digits with an optional `.` or `,`
/// decimal part), normalizes the comma and accepts it only when it falls in
/// `[0.0, 5.0]`. There is no unit awareness, so `"$3.99"` reads as 3.99.
///
/// A `-` immediately before the numeral counts as a sign unless it follows a
/// word character (`"Top-3"` is not negative).
pub fn parse_rating_text(text: &str) -> Option<Rating> {
    let m = numeral_re().find(text)?;
    let negative = {
        let before = &text[..m.start()];
        let mut rev = before.chars().rev();
        rev.next() == Some('-') && !rev.next().is_some_and(|c| c.is_alphanumeric())
    };
    if negative {
        return None;
    }
    Rating::from_numeral(m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bounds() {
        assert_eq!(Rating::new(0.0).map(Rating::value), Some(0.0));
        assert_eq!(Rating::new(5.0).map(Rating::value), Some(5.0));
        assert!(Rating::new(5.1).is_none());
        assert!(Rating::new(-0.1).is_none());
        assert!(Rating::new(f64::NAN).is_none());
    }

    #[test]
    fn test_parse_english_and_spanish_labels() {
        assert_eq!(parse_rating_text("4.5 out of 5").map(Rating::value), Some(4.5));
        assert_eq!(parse_rating_text("4,5 de 5").map(Rating::value), Some(4.5));
        assert_eq!(
            parse_rating_text("Rated 4.7 out of 5 stars").map(Rating::value),
            Some(4.7)
        );
        assert_eq!(parse_rating_text("3 estrellas").map(Rating::value), Some(3.0));
    }

    #[test]
    fn test_parse_rejects_out_of_range_and_missing() {
        assert!(parse_rating_text("12,431 reviews").is_none());
        assert!(parse_rating_text("5.1").is_none());
        assert!(parse_rating_text("-0.1").is_none());
        assert!(parse_rating_text("no rating yet").is_none());
        assert!(parse_rating_text("").is_none());
    }

    #[test]
    fn test_parse_boundaries() {
        assert_eq!(parse_rating_text("5.0").map(Rating::value), Some(5.0));
        assert_eq!(parse_rating_text("0.0").map(Rating::value), Some(0.0));
        assert_eq!(parse_rating_text("5").map(Rating::value), Some(5.0));
    }

    #[test]
    fn test_only_first_numeral_counts() {
        // 120 comes first and is out of range; the 4.8 after it is not consulted.
        assert!(parse_rating_text("120 ratings, 4.8 average").is_none());
        assert_eq!(parse_rating_text("4.8 (120)").map(Rating::value), Some(4.8));
    }

    #[test]
    fn test_hyphen_inside_word_is_not_a_sign() {
        assert_eq!(parse_rating_text("Top-3 pick").map(Rating::value), Some(3.0));
        assert!(parse_rating_text("score: -2").is_none());
    }

    #[test]
    fn test_price_is_misread_when_in_range() {
        assert_eq!(parse_rating_text("$3.99").map(Rating::value), Some(3.99));
    }

    #[test]
    fn test_meets_threshold() {
        let r = Rating::new(4.0).unwrap();
        assert!(r.meets(4.0));
        assert!(!r.meets(4.1));
    }
}
