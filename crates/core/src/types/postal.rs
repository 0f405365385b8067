//! US postal code (ZIP) type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`PostalCode`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum PostalCodeError {
    /// The input string is empty.
    #[error("postal code cannot be empty")]
    Empty,
    /// Not a 5-digit or 5+4-digit ZIP.
    #[error("postal code must be 5 digits or ZIP+4 (e.g., 12345 or 12345-6789)")]
    InvalidFormat,
}

/// A US ZIP code: five digits, optionally followed by a dash and four more.
///
/// ## Examples
///
/// ```
/// use driftwood_core::PostalCode;
///
/// assert!(PostalCode::parse("12345").is_ok());
/// assert!(PostalCode::parse("12345-6789").is_ok());
/// assert!(PostalCode::parse("1234").is_err());
/// assert!(PostalCode::parse("12345-678").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PostalCode(String);

impl PostalCode {
    /// Length of the base ZIP.
    pub const ZIP5_LEN: usize = 5;

    /// Parse a `PostalCode` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty or does not match the
    /// `NNNNN` or `NNNNN-NNNN` pattern.
    pub fn parse(s: &str) -> Result<Self, PostalCodeError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PostalCodeError::Empty);
        }

        let valid = match trimmed.len() {
            5 => trimmed.bytes().all(|b| b.is_ascii_digit()),
            10 => {
                let (zip5, rest) = trimmed.split_at(5);
                zip5.bytes().all(|b| b.is_ascii_digit())
                    && rest.starts_with('-')
                    && rest[1..].bytes().all(|b| b.is_ascii_digit())
            }
            _ => false,
        };

        if valid {
            Ok(Self(trimmed.to_owned()))
        } else {
            Err(PostalCodeError::InvalidFormat)
        }
    }

    /// Returns the postal code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the five-digit base ZIP.
    #[must_use]
    pub fn zip5(&self) -> &str {
        self.0.get(..Self::ZIP5_LEN).unwrap_or(&self.0)
    }

    /// Returns the +4 extension, if present.
    #[must_use]
    pub fn plus4(&self) -> Option<&str> {
        self.0.get(Self::ZIP5_LEN + 1..)
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PostalCode {
    type Err = PostalCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for PostalCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_zip5() {
        let zip = PostalCode::parse("12345").unwrap();
        assert_eq!(zip.zip5(), "12345");
        assert_eq!(zip.plus4(), None);
    }

    #[test]
    fn test_parse_zip_plus4() {
        let zip = PostalCode::parse("12345-6789").unwrap();
        assert_eq!(zip.zip5(), "12345");
        assert_eq!(zip.plus4(), Some("6789"));
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let zip = PostalCode::parse(" 12345 ").unwrap();
        assert_eq!(zip.as_str(), "12345");
    }

    #[test]
    fn test_parse_empty() {
        assert!(matches!(PostalCode::parse(""), Err(PostalCodeError::Empty)));
        assert!(matches!(
            PostalCode::parse("  "),
            Err(PostalCodeError::Empty)
        ));
    }

    #[test]
    fn test_parse_invalid() {
        for input in ["1234", "123456", "abcde", "12345-678", "12345_6789", "12345-67890"] {
            assert!(
                matches!(PostalCode::parse(input), Err(PostalCodeError::InvalidFormat)),
                "expected {input:?} to be rejected"
            );
        }
    }

    #[test]
    fn test_display() {
        let zip = PostalCode::parse("12345-6789").unwrap();
        assert_eq!(zip.to_string(), "12345-6789");
    }
}
