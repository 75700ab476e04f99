//! Secret redaction for recovery phrases in logs and serialized output.
//!
//! [`Redacted`] formats and serializes as `"<redacted>"` whatever it wraps.
//! Config structs and request types holding a credential wrap it here so a
//! stray `{:?}` or `tracing` field can never print the phrase.

use std::fmt::{self, Debug, Display};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Redacted<T>(pub T);

impl<T> Redacted<T> {
    /// Access the wrapped secret. Keep the result out of log fields.
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl<T> Debug for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl<T> Display for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl<T> Serialize for Redacted<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        "<redacted>".serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Redacted<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Redacted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_and_display_hide_value() {
        let secret = Redacted("abandon abandon about".to_string());
        assert_eq!(format!("{:?}", secret), "<redacted>");
        assert_eq!(format!("{}", secret), "<redacted>");
        assert_eq!(secret.expose(), "abandon abandon about");
    }

    #[test]
    fn test_serialize_hides_value_deserialize_keeps_it() {
        let parsed: Redacted<String> = serde_json::from_str("\"phrase\"").unwrap();
        assert_eq!(parsed.expose(), "phrase");
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"<redacted>\"");
    }
}
