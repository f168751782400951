//! Normalized phone numbers.
//!
//! Phones are the identity key for users and customers. The same customer
//! shows up as `010 1234 5678`, `+20 10 1234 5678` and `00201012345678`
//! across orders; all of them normalize to `201012345678`.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Country calling code substituted for a leading local trunk `0`.
pub const DEFAULT_COUNTRY_CODE: &str = "2";

/// Errors that can occur when parsing a [`Phone`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// No digits in the input.
    #[error("phone number cannot be empty")]
    Empty,
    /// Too few digits to be a real number.
    #[error("phone number must have at least {min} digits")]
    TooShort {
        /// Minimum digit count after normalization.
        min: usize,
    },
    /// Too many digits (E.164 caps at 15).
    #[error("phone number must have at most {max} digits")]
    TooLong {
        /// Maximum digit count after normalization.
        max: usize,
    },
}

/// Normalize a raw phone string to its digit-only international form.
///
/// - non-digits are dropped
/// - leading `00` international prefixes are removed
/// - a remaining trunk `0` is prefixed with [`DEFAULT_COUNTRY_CODE`]
///
/// The result never starts with `0`, so normalizing it again returns it
/// unchanged.
#[must_use]
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let mut rest = digits.as_str();
    while let Some(stripped) = rest.strip_prefix("00") {
        rest = stripped;
    }
    if rest.starts_with('0') {
        format!("{DEFAULT_COUNTRY_CODE}{rest}")
    } else {
        rest.to_owned()
    }
}

/// A normalized phone number.
///
/// ```
/// use souq_core::Phone;
///
/// let a = Phone::parse("010 1234 5678").unwrap();
/// let b = Phone::parse("+20 10 1234 5678").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "201012345678");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct Phone(String);

impl Phone {
    /// Minimum digits after normalization.
    pub const MIN_DIGITS: usize = 8;
    /// Maximum digits after normalization.
    pub const MAX_DIGITS: usize = 15;

    /// Parse and normalize a phone number.
    ///
    /// # Errors
    ///
    /// Returns an error if the normalized number is empty, shorter than
    /// [`Self::MIN_DIGITS`] or longer than [`Self::MAX_DIGITS`].
    pub fn parse(raw: &str) -> Result<Self, PhoneError> {
        let normalized = normalize_phone(raw);
        if normalized.is_empty() {
            return Err(PhoneError::Empty);
        }
        if normalized.len() < Self::MIN_DIGITS {
            return Err(PhoneError::TooShort {
                min: Self::MIN_DIGITS,
            });
        }
        if normalized.len() > Self::MAX_DIGITS {
            return Err(PhoneError::TooLong {
                max: Self::MAX_DIGITS,
            });
        }
        Ok(Self(normalized))
    }

    /// Digits-only international form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Phone {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Phone {
    type Error = PhoneError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Phone> for String {
    fn from(phone: Phone) -> Self {
        phone.0
    }
}

impl AsRef<str> for Phone {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_local_trunk_zero_gets_country_code() {
        assert_eq!(normalize_phone("01012345678"), "201012345678");
    }

    #[test]
    fn test_international_forms_agree() {
        for raw in ["+201012345678", "00201012345678", "20 101 234 5678", "0101-234-5678"] {
            assert_eq!(normalize_phone(raw), "201012345678", "input {raw}");
        }
    }

    #[test]
    fn test_normalization_is_idempotent() {
        for raw in [
            "01012345678",
            "+44 7700 900123",
            "00966501234567",
            "(012) 222-3333",
            "0001012345678",
            "000001012345678",
        ] {
            let once = normalize_phone(raw);
            assert_eq!(normalize_phone(&once), once, "input {raw}");
        }
    }

    #[test]
    fn test_parse_bounds() {
        assert_eq!(Phone::parse("ext."), Err(PhoneError::Empty));
        assert!(matches!(Phone::parse("12345"), Err(PhoneError::TooShort { .. })));
        assert!(matches!(
            Phone::parse("1234567890123456"),
            Err(PhoneError::TooLong { .. })
        ));
    }

    #[test]
    fn test_international_prefix_before_trunk_zero() {
        assert_eq!(normalize_phone("0001012345678"), "201012345678");
    }

    #[test]
    fn test_stored_phone_survives_json_round_trip() {
        let phone = Phone::parse("0001012345678").unwrap();
        let json = serde_json::to_string(&phone).unwrap();
        let back: Phone = serde_json::from_str(&json).unwrap();
        assert_eq!(back, phone);
    }

    #[test]
    fn test_deserialize_normalizes() {
        let phone: Phone = serde_json::from_str("\"0101 234 5678\"").unwrap();
        assert_eq!(phone.as_str(), "201012345678");
    }
}
