//! Turning raw chart bytes into clean UTF-8 text.

use std::borrow::Cow;

use thiserror::Error;

use crate::{config::ParseConfig, error::FormatError};

/// Something about the encoding that was fixed up.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum EncodingWarning {
    /// A UTF-8 byte order mark was removed.
    #[error("UTF-8 BOM ignored; please avoid editors that use BOM")]
    BomIgnored,
    /// The text was not UTF-8 and was read as Windows-1252.
    #[error("invalid UTF-8, assumed CP1252; please convert the file to UTF-8")]
    NotUtf8,
}

/// Decoded chart text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText<'a> {
    /// UTF-8 text without a byte order mark.
    pub text: Cow<'a, str>,
    /// Fix-ups applied while decoding.
    pub warnings: Vec<EncodingWarning>,
}

/// Decodes chart bytes into UTF-8, after checking the size.
///
/// # Errors
///
/// - [`FormatError::WrongSize`] if the file is outside the configured size range.
/// - [`FormatError::Binary`] if the decoded text contains control characters.
pub fn decode<'a>(bytes: &'a [u8], config: &ParseConfig) -> Result<DecodedText<'a>, FormatError> {
    if !config.accepts_size(bytes.len()) {
        return Err(FormatError::WrongSize {
            size: bytes.len(),
            min: config.min_file_size,
            max: config.max_file_size,
        });
    }
    let decoded = to_utf8(bytes);
    if !is_text(&decoded.text) {
        return Err(FormatError::Binary);
    }
    Ok(decoded)
}

/// Converts bytes to UTF-8 text without any sanity checks.
#[must_use]
pub fn to_utf8(bytes: &[u8]) -> DecodedText<'_> {
    let mut warnings = Vec::new();
    let text = match std::str::from_utf8(bytes) {
        Ok(text) => match text.strip_prefix('\u{feff}') {
            Some(rest) => {
                warnings.push(EncodingWarning::BomIgnored);
                Cow::Borrowed(rest)
            }
            None => Cow::Borrowed(text),
        },
        Err(_) => {
            warnings.push(EncodingWarning::NotUtf8);
            let (text, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes);
            text
        }
    };
    DecodedText { text, warnings }
}

/// Whether `text` is free of control characters other than tab, line feed and carriage return.
#[must_use]
pub fn is_text(text: &str) -> bool {
    !text
        .chars()
        .any(|c| c.is_ascii_control() && !matches!(c, '\t' | '\n' | '\r' | '\u{0c}'))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn strips_bom() {
        let decoded = to_utf8(b"\xEF\xBB\xBF#TITLE:Hey");
        assert_eq!(decoded.text, "#TITLE:Hey");
        assert_eq!(decoded.warnings, vec![EncodingWarning::BomIgnored]);
    }

    #[test]
    fn falls_back_to_cp1252() {
        let decoded = to_utf8(b"#ARTIST:Beyonc\xE9");
        assert_eq!(decoded.text, "#ARTIST:Beyoncé");
        assert_eq!(decoded.warnings, vec![EncodingWarning::NotUtf8]);
    }

    #[test]
    fn rejects_sizes_and_binary() {
        let config = ParseConfig::default();
        assert_eq!(
            decode(b"#A:b", &config),
            Err(FormatError::WrongSize {
                size: 4,
                min: 10,
                max: 100_000
            })
        );
        assert_eq!(decode(b"MThd\0\0\0\x06\0\x01", &config), Err(FormatError::Binary));
        assert!(decode(b"#TITLE:Ok\r\n\tx", &config).is_ok());
    }
}
