//! Per-field lenient deserializers
//!
//! Inbound payload fields use these through `#[serde(deserialize_with)]`. A
//! field holding the wrong JSON type falls back to its default on its own,
//! so the rest of the payload still gets through.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserialize a field, using `T::default()` if its value has the wrong shape
pub(crate) fn field<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(from_value_or_default(value))
}

/// Like [`field`] for doubly optional fields: present `null` is `Some(None)`
///
/// Only called when the field is present; absence is handled by
/// `#[serde(default)]`.
pub(crate) fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(Some(None));
    }

    match T::deserialize(value) {
        Ok(v) => Ok(Some(Some(v))),
        Err(e) => {
            tracing::warn!(
                field_type = std::any::type_name::<T>(),
                error = %e,
                "Malformed field ignored"
            );
            Ok(None)
        }
    }
}

fn from_value_or_default<T>(value: Value) -> T
where
    T: DeserializeOwned + Default,
{
    T::deserialize(value).unwrap_or_else(|e| {
        tracing::warn!(
            field_type = std::any::type_name::<T>(),
            error = %e,
            "Malformed field, using default"
        );
        T::default()
    })
}
