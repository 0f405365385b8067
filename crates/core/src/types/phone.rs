//! Phone number type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`PhoneNumber`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum PhoneNumberError {
    /// The input string is empty.
    #[error("phone number cannot be empty")]
    Empty,
    /// The input contains a character outside the allowed set.
    #[error("phone number contains an invalid character: {0:?}")]
    InvalidCharacter(char),
    /// Fewer digits than any dialable number.
    #[error("phone number must have at least {min} digits")]
    TooFewDigits {
        /// Minimum digit count.
        min: usize,
    },
    /// More digits than E.164 allows.
    #[error("phone number must have at most {max} digits")]
    TooManyDigits {
        /// Maximum digit count.
        max: usize,
    },
}

/// A loosely validated international phone number.
///
/// Accepts an optional leading `+` followed by digits with common
/// separators (spaces, dashes, dots, parentheses). The original input is
/// preserved for display; [`PhoneNumber::digits`] yields the bare digit
/// string for wire formats that want one.
///
/// ## Examples
///
/// ```
/// use driftwood_core::PhoneNumber;
///
/// assert!(PhoneNumber::parse("+1 (555) 867-5309").is_ok());
/// assert!(PhoneNumber::parse("555.867.5309").is_ok());
/// assert!(PhoneNumber::parse("call me maybe").is_err());
/// assert!(PhoneNumber::parse("123").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Minimum number of digits.
    pub const MIN_DIGITS: usize = 7;
    /// Maximum number of digits (E.164).
    pub const MAX_DIGITS: usize = 15;

    /// Parse a `PhoneNumber` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, contains characters outside
    /// `+ 0-9 ( ) . -` and spaces, or has a digit count outside 7-15.
    pub fn parse(s: &str) -> Result<Self, PhoneNumberError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PhoneNumberError::Empty);
        }

        let mut digits = 0usize;
        for (i, c) in trimmed.chars().enumerate() {
            match c {
                '0'..='9' => digits += 1,
                '+' if i == 0 => {}
                ' ' | '-' | '.' | '(' | ')' => {}
                other => return Err(PhoneNumberError::InvalidCharacter(other)),
            }
        }

        if digits < Self::MIN_DIGITS {
            return Err(PhoneNumberError::TooFewDigits {
                min: Self::MIN_DIGITS,
            });
        }
        if digits > Self::MAX_DIGITS {
            return Err(PhoneNumberError::TooManyDigits {
                max: Self::MAX_DIGITS,
            });
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the phone number as entered (trimmed).
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns only the digits, with `+` preserved if present.
    #[must_use]
    pub fn digits(&self) -> String {
        self.0
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '+')
            .collect()
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PhoneNumber {
    type Err = PhoneNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
