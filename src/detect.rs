//! Content-based dialect detection.

use once_cell::sync::Lazy;
use regex::Regex;

pub use crate::model::Dialect;
use crate::error::FormatError;

/// Signatures in priority order; the first match wins.
///
/// StepMania must be tried before UltraStar since both open with `#KEY:` lines.
pub const SIGNATURES: &[(Dialect, &str)] = &[
    (Dialect::Xml, r"<MELODY[\s>]"),
    (Dialect::Ass, r"(?s)\[Script Info\].*\[Events\]"),
    (Dialect::Sm, r"(?m)^\s*#NOTES\s*:"),
    (Dialect::Txt, r"\A\s*#[A-Z]"),
    (Dialect::Ini, r"(?im)^\s*\[song\]"),
];

static COMPILED: Lazy<Vec<(Dialect, Regex)>> = Lazy::new(|| {
    SIGNATURES
        .iter()
        .filter_map(|&(dialect, pattern)| Regex::new(pattern).ok().map(|re| (dialect, re)))
        .collect()
});

/// Classifies decoded chart text.
///
/// # Errors
///
/// [`FormatError::Unrecognized`] when no signature matches.
pub fn detect(text: &str) -> Result<Dialect, FormatError> {
    COMPILED
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|&(dialect, _)| dialect)
        .ok_or(FormatError::Unrecognized)
}
