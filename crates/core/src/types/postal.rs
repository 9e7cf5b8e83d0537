//! Indian postal (PIN) codes.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`PostalCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PostalCodeError {
    /// Nothing was entered.
    #[error("postal code is required")]
    Empty,
    /// The input contains something other than digits.
    #[error("postal code must contain only digits")]
    NonNumeric,
    /// The input is numeric but not a complete six-digit PIN code.
    #[error("postal code must be 6 digits")]
    Incomplete,
    /// PIN codes never start with zero.
    #[error("postal code cannot start with 0")]
    LeadingZero,
}

/// A six-digit PIN code.
///
/// ```
/// use clubhouse_core::{PostalCode, PostalCodeError};
///
/// assert!(PostalCode::parse("560001").is_ok());
/// assert_eq!(PostalCode::parse("5600"), Err(PostalCodeError::Incomplete));
/// assert_eq!(PostalCode::parse("56a001"), Err(PostalCodeError::NonNumeric));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PostalCode(String);

impl PostalCode {
    /// Number of digits in a PIN code.
    pub const LENGTH: usize = 6;

    /// Parse a PIN code, ignoring surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error when the input is empty, non-numeric, not exactly
    /// six digits, or starts with zero.
    pub fn parse(s: &str) -> Result<Self, PostalCodeError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PostalCodeError::Empty);
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PostalCodeError::NonNumeric);
        }
        if s.len() != Self::LENGTH {
            return Err(PostalCodeError::Incomplete);
        }
        if s.starts_with('0') {
            return Err(PostalCodeError::LeadingZero);
        }
        Ok(Self(s.to_owned()))
    }

    /// The code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for PostalCode {
    type Err = PostalCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PostalCode {
    type Error = PostalCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PostalCode> for String {
    fn from(code: PostalCode) -> Self {
        code.0
    }
}
