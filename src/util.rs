//! Small helpers shared by the dialect parsers.

use crate::error::FormatError;

/// A header or note field that decodes from chart text.
///
/// Chart files in the wild use `,` as a decimal separator and `yes`/`no` for flags, so
/// these conversions are more lenient than [`std::str::FromStr`].
pub trait FieldValue: Sized {
    /// Decodes `value`, naming `field` in the error.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::InvalidValue`] when `value` is not a valid representation.
    fn parse_field(field: &str, value: &str) -> Result<Self, FormatError>;
}

macro_rules! int_field {
    ($($ty:ty),*) => {$(
        impl FieldValue for $ty {
            fn parse_field(field: &str, value: &str) -> Result<Self, FormatError> {
                value
                    .trim()
                    .parse()
                    .map_err(|_| FormatError::invalid_value(field, value))
            }
        }
    )*};
}

int_field!(i32, i64, u32);

impl FieldValue for f64 {
    fn parse_field(field: &str, value: &str) -> Result<Self, FormatError> {
        value
            .trim()
            .replace(',', ".")
            .parse::<Self>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| FormatError::invalid_value(field, value))
    }
}

impl FieldValue for bool {
    fn parse_field(field: &str, value: &str) -> Result<Self, FormatError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "yes" | "1" | "true" => Ok(true),
            "no" | "0" | "false" => Ok(false),
            _ => Err(FormatError::invalid_value(field, value)),
        }
    }
}

/// Shorthand for [`FieldValue::parse_field`].
pub(crate) fn parse_field<T: FieldValue>(field: &str, value: &str) -> Result<T, FormatError> {
    T::parse_field(field, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comma_decimal_separator() {
        assert_eq!(parse_field::<f64>("BPM", "272,5"), Ok(272.5));
        assert_eq!(parse_field::<f64>("BPM", " 120 "), Ok(120.0));
        assert!(parse_field::<f64>("BPM", "fast").is_err());
        assert!(parse_field::<f64>("BPM", "inf").is_err());
    }

    #[test]
    fn lenient_bools() {
        assert_eq!(parse_field::<bool>("RELATIVE", "YES"), Ok(true));
        assert_eq!(parse_field::<bool>("RELATIVE", "0"), Ok(false));
        assert_eq!(
            parse_field::<bool>("RELATIVE", "maybe"),
            Err(FormatError::InvalidValue {
                field: "RELATIVE".into(),
                value: "maybe".into()
            })
        );
    }

    #[test]
    fn integers() {
        assert_eq!(parse_field::<u32>("YEAR", "1999"), Ok(1999));
        assert!(parse_field::<u32>("YEAR", "-1").is_err());
        assert_eq!(parse_field::<i32>("ts", "-4"), Ok(-4));
    }
}
