//! JSON envelopes of the API.
//!
//! Single resources arrive as `{"data": {"id": .., "attributes": {..}}}`,
//! lists as `{"data": [..], "pagination": {"next": <url-or-null>}}`.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// One resource: server identity plus typed attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource<T> {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub attributes: T,
}

/// Single-resource response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: Resource<T>,
}

/// Pagination links of a list response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub first: Option<String>,
    #[serde(default)]
    pub last: Option<String>,
    #[serde(default)]
    pub prev: Option<String>,
    #[serde(default)]
    pub next: Option<String>,
}

/// List response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListEnvelope<T> {
    pub data: Vec<Resource<T>>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

impl<T> ListEnvelope<T> {
    /// Link to the next page; `None` on the terminal page.
    pub fn next(&self) -> Option<&str> {
        self.pagination
            .as_ref()
            .and_then(|p| p.next.as_deref())
            .filter(|n| !n.is_empty())
    }
}

/// Identities are opaque strings, but some endpoints send them as numbers.
fn deserialize_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) if !s.is_empty() => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("invalid resource id: {other}"))),
    }
}
