//! Serde adapters for the CometBFT JSON-RPC encoding, where integers travel as
//! JSON strings.

/// Serialize a number as a string.
pub mod number_as_string {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Writes `number` as a JSON string.
    /// # Errors
    /// Returns an error if the serializer rejects the string.
    pub fn serialize<T, S>(number: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: ToString,
        S: Serializer,
    {
        serializer.serialize_str(&number.to_string())
    }

    /// Reads a number from a JSON string.
    /// # Errors
    /// Returns an error if the string does not parse as `T`.
    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Serialize an optional number as an optional string.
///
/// Pair with `#[serde(default, skip_serializing_if = "Option::is_none")]` so
/// that an absent value is omitted from request params.
pub mod option_number_as_string {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Writes `Some(n)` as a JSON string and `None` as `null`.
    /// # Errors
    /// Returns an error if the serializer rejects the value.
    pub fn serialize<T, S>(number: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: ToString,
        S: Serializer,
    {
        match number {
            Some(n) => serializer.serialize_some(&n.to_string()),
            None => serializer.serialize_none(),
        }
    }

    /// Reads an optional number from an optional JSON string.
    /// # Errors
    /// Returns an error if a present string does not parse as `T`.
    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|s| s.parse().map_err(serde::de::Error::custom))
            .transpose()
    }
}
