//! Natural keys arrive from the store as either JSON strings or numbers
//! depending on the column type; both are normalised to trimmed strings.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

fn value_to_key<E: serde::de::Error>(value: Value) -> Result<Option<String>, E> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.trim().to_string())),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(E::custom(format!("expected a string or number key, got {}", other))),
    }
}

pub fn deserialize_key<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    value_to_key(value)?.ok_or_else(|| serde::de::Error::custom("key must not be null"))
}

pub fn deserialize_opt_key<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    value_to_key(value)
}
