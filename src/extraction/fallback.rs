//! Regex search for the amount due, used for operator diagnostics only.

use regex::Regex;
use std::sync::OnceLock;

/// Tried in order; the first pattern yielding a number wins
const TOTAL_PATTERNS: [&str; 4] = [
    r"(?im)TOTAL\s*DUE[:\s]*\$?([\d,]+\.?\d*)",
    r"(?im)AMOUNT\s*DUE[:\s]*\$?([\d,]+\.?\d*)",
    r"(?im)Total[:\s]*\$?([\d,]+\.?\d*)",
    r"(?im)\$\s*([\d,]+\.\d{2})\s*$",
];

fn total_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        TOTAL_PATTERNS
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect()
    })
}

/// Best-effort total amount from raw bill text, commas stripped
pub fn extract_total_fallback(bill_text: &str) -> Option<f64> {
    total_patterns().iter().find_map(|pattern| {
        pattern
            .captures_iter(bill_text)
            .next()
            .and_then(|captures| captures.get(1))
            .and_then(|amount| amount.as_str().replace(',', "").parse::<f64>().ok())
    })
}
