use serde::{Deserialize, Serialize};
use std::fmt;

use crate::pii::Masked;

/// A validated Indian mobile number: ten digits, leading digit 6-9.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhoneError {
    #[error("Mobile number is required")]
    Missing,

    #[error("Please enter a valid 10-digit mobile number")]
    InvalidLength,

    #[error("Please enter a valid Indian mobile number")]
    InvalidPrefix,
}

impl PhoneNumber {
    /// Sanitize and validate user input.
    ///
    /// Non-digits are stripped and a `91` country code is removed from
    /// 12-digit input before the length and prefix checks.
    pub fn parse(input: &str) -> Result<Self, PhoneError> {
        let mut digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return Err(PhoneError::Missing);
        }

        if digits.len() == 12 && digits.starts_with("91") {
            digits.drain(..2);
        }

        if digits.len() != 10 {
            return Err(PhoneError::InvalidLength);
        }

        match digits.as_bytes()[0] {
            b'6'..=b'9' => Ok(Self(digits)),
            _ => Err(PhoneError::InvalidPrefix),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// E.164-style digits without the plus sign, as SMS gateways expect.
    pub fn with_country_code(&self) -> String {
        format!("91{}", self.0)
    }

    pub fn masked(&self) -> Masked<&str> {
        Masked(self.0.as_str())
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = PhoneError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PhoneNumber> for String {
    fn from(phone: PhoneNumber) -> Self {
        phone.0
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
