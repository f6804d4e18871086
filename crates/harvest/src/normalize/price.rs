// ABOUTME: Price normalization from storefront display text to a floating-point amount.
// ABOUTME: Defaults to the '.' thousands / ',' decimal convention; other conventions are opt-in per source.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Leading numeric prefix, the same portion a lenient float parser would consume.
static NUMERIC_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?(?:\d+(?:\.\d*)?|\.\d+)").unwrap());

/// Separator convention used to read a price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceFormat {
    pub thousands: char,
    pub decimal: char,
}

impl Default for PriceFormat {
    fn default() -> Self {
        Self {
            thousands: '.',
            decimal: ',',
        }
    }
}

/// Parses price text with the given separator convention.
///
/// Every character other than digits, the two separators and `-` is dropped,
/// thousands separators are removed, the first decimal separator becomes `.`,
/// and the leading numeric prefix is parsed. Returns `None` when nothing numeric
/// remains.
pub fn parse_price(text: &str, format: &PriceFormat) -> Option<f64> {
    let mut cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == format.thousands || *c == format.decimal || *c == '-')
        .filter(|c| *c != format.thousands)
        .collect();

    if let Some(idx) = cleaned.find(format.decimal) {
        cleaned.replace_range(idx..idx + format.decimal.len_utf8(), ".");
    }

    let prefix = NUMERIC_PREFIX_RE.find(&cleaned)?.as_str();
    prefix.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Normalizes price text using the default convention; unparsable input yields 0.
pub fn normalize_price(text: &str) -> f64 {
    parse_price(text, &PriceFormat::default()).unwrap_or(0.0)
}
