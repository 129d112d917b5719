//! Dynamic attribute values.

use crate::tree::Tree;
use serde_json::Number;

/// A single attribute value in a desired-state tree.
///
/// `Unknown` means the front-end cannot tell the value yet (it will be
/// computed later); `Null` means the user left the attribute unset. Neither
/// is *present*. Everything else, including `false`, `0`, `""` and an empty
/// list, is a present value the user configured explicitly.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Unknown,
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<Value>),
    Map(Tree),
}

impl Value {
    /// Returns true unless the value is `Unknown`.
    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, Value::Unknown)
    }

    /// Returns true if the value is `Null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true if the value is known and not null.
    #[must_use]
    pub fn is_present(&self) -> bool {
        !matches!(self, Value::Unknown | Value::Null)
    }

    /// Returns true for present values that carry no content: `""` and `[]`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Value::String(s) => s.is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Map(tree) => tree.is_empty(),
            _ => false,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Tree> {
        match self {
            Value::Map(tree) => Some(tree),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Unknown => "unknown",
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    /// Converts to JSON. `Unknown` has no JSON form and maps to `None`;
    /// unknown entries inside lists and maps are dropped.
    #[must_use]
    pub fn to_json(&self) -> Option<serde_json::Value> {
        match self {
            Value::Unknown => None,
            Value::Null => Some(serde_json::Value::Null),
            Value::Bool(b) => Some(serde_json::Value::Bool(*b)),
            Value::Number(n) => Some(serde_json::Value::Number(n.clone())),
            Value::String(s) => Some(serde_json::Value::String(s.clone())),
            Value::List(items) => Some(serde_json::Value::Array(
                items.iter().filter_map(Value::to_json).collect(),
            )),
            Value::Map(tree) => Some(tree.to_json()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl From<f64> for Value {
    /// Non-finite floats have no JSON representation and become `Null`.
    fn from(n: f64) -> Self {
        Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Tree> for Value {
    fn from(tree: Tree) -> Self {
        Value::Map(tree)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Map(Tree::from_json_object(map)),
        }
    }
}
