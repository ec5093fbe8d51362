use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wraps sensitive values (phone numbers, OTP codes, gateway secrets) so that
/// `Debug`/`Display` in log macros never print them.
///
/// Serialization passes the real value through: API responses still need it.
#[derive(Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: AsRef<str>> Masked<T> {
    /// Last four characters, for correlating log lines with a user report.
    pub fn hint(&self) -> String {
        let value = self.0.as_ref();
        let visible: String = value
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("******{}", visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_and_display_are_masked() {
        let secret = Masked::new("rzp_secret_value".to_string());
        assert_eq!(format!("{:?}", secret), "********");
        assert_eq!(format!("{}", secret), "********");
    }

    #[test]
    fn test_serialize_passes_value_through() {
        let phone = Masked::new("9876543210".to_string());
        let json = serde_json::to_string(&phone).unwrap();
        assert_eq!(json, "\"9876543210\"");
    }

    #[test]
    fn test_hint_keeps_last_four() {
        let phone = Masked::new("9876543210");
        assert_eq!(phone.hint(), "******3210");
    }
}
