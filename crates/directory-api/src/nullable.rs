//! Serde helpers for PATCH-style bodies.
//!
//! A field that is absent leaves the stored value alone; `null` or an empty
//! string clears it. Use with
//! `#[serde(default, deserialize_with = "crate::nullable::deserialize")]`.

use directory_core::validation::non_empty;
use serde::{Deserialize, Deserializer};

/// Deserializes a present field into `Some(value)`, `null` into `Some(None)`.
pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Collapses a blank text change into a clear.
#[must_use]
pub fn text(change: Option<Option<String>>) -> Option<Option<String>> {
    change.map(|value| non_empty(value.as_deref()))
}
