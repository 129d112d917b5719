//! The desired-state tree.

use crate::value::Value;
use crate::TreeError;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Attribute holding the resource identity in every top-level tree.
pub const ID_KEY: &str = "id";

static UNKNOWN: Value = Value::Unknown;

/// The declared kind of a tree attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrKind {
    Bool,
    Int,
    Float,
    String,
    List(Box<AttrKind>),
    /// A list of nested blocks, each validated against the inner schema.
    Blocks(Arc<TreeSchema>),
}

impl AttrKind {
    /// Returns true if `value` may be stored under this kind.
    /// Unknown and null are accepted by every kind.
    fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Unknown | Value::Null) => true,
            (AttrKind::Bool, Value::Bool(_)) => true,
            (AttrKind::Int, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (AttrKind::Float, Value::Number(_)) => true,
            (AttrKind::String, Value::String(_)) => true,
            (AttrKind::List(inner), Value::List(items)) => items.iter().all(|v| inner.accepts(v)),
            (AttrKind::Blocks(schema), Value::List(items)) => items.iter().all(|v| match v {
                Value::Map(tree) => schema.admits(tree),
                other => !other.is_present(),
            }),
            _ => false,
        }
    }
}

impl fmt::Display for AttrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrKind::Bool => write!(f, "bool"),
            AttrKind::Int => write!(f, "int"),
            AttrKind::Float => write!(f, "float"),
            AttrKind::String => write!(f, "string"),
            AttrKind::List(inner) => write!(f, "list({inner})"),
            AttrKind::Blocks(_) => write!(f, "blocks"),
        }
    }
}

/// Attribute declarations for one resource type (or one nested block type).
///
/// Built once by the schema front-end and shared between trees.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreeSchema {
    attrs: BTreeMap<String, AttrKind>,
}

impl TreeSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an attribute.
    #[must_use]
    pub fn attr(mut self, key: &str, kind: AttrKind) -> Self {
        self.attrs.insert(key.to_string(), kind);
        self
    }

    pub fn kind_of(&self, key: &str) -> Option<&AttrKind> {
        self.attrs.get(key)
    }

    fn check(&self, key: &str, value: &Value) -> Result<(), TreeError> {
        if key == ID_KEY && self.attrs.get(key).is_none() {
            return match value {
                Value::String(_) | Value::Unknown | Value::Null => Ok(()),
                other => Err(TreeError::KindMismatch {
                    key: key.to_string(),
                    expected: AttrKind::String.to_string(),
                    found: other.kind_name(),
                }),
            };
        }
        let kind = self.attrs.get(key).ok_or_else(|| TreeError::Undeclared {
            key: key.to_string(),
        })?;
        if kind.accepts(value) {
            Ok(())
        } else {
            Err(TreeError::KindMismatch {
                key: key.to_string(),
                expected: kind.to_string(),
                found: value.kind_name(),
            })
        }
    }

    fn admits(&self, tree: &Tree) -> bool {
        tree.attrs.iter().all(|(k, v)| self.check(k, v).is_ok())
    }
}

/// A nested, ordered mapping from attribute name to [`Value`].
///
/// Missing keys read as [`Value::Unknown`]. A tree built with
/// [`Tree::with_schema`] rejects writes that do not match the schema.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    attrs: BTreeMap<String, Value>,
    schema: Option<Arc<TreeSchema>>,
}

impl Tree {
    /// Creates an empty, schemaless tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty tree that enforces `schema` on every write.
    pub fn with_schema(schema: Arc<TreeSchema>) -> Self {
        Self {
            attrs: BTreeMap::new(),
            schema: Some(schema),
        }
    }

    pub fn schema(&self) -> Option<&Arc<TreeSchema>> {
        self.schema.as_ref()
    }

    /// Builds a schemaless tree from a JSON object.
    ///
    /// Numeric `id` values become strings: identities are opaque, but some
    /// endpoints send them as numbers.
    pub fn from_json_object(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            attrs: map
                .into_iter()
                .map(|(k, v)| {
                    let value = match v {
                        serde_json::Value::Number(n) if k == ID_KEY => Value::String(n.to_string()),
                        other => Value::from(other),
                    };
                    (k, value)
                })
                .collect(),
            schema: None,
        }
    }

    /// Parses a schemaless tree from a JSON object literal.
    pub fn from_json_str(s: &str) -> crate::Result<Self> {
        let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(s)?;
        Ok(Self::from_json_object(map))
    }

    /// Converts to a JSON object, dropping unknown attributes.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.attrs
                .iter()
                .filter_map(|(k, v)| v.to_json().map(|json| (k.clone(), json)))
                .collect(),
        )
    }

    /// Returns the value for `key`, or `Unknown` if the key was never set.
    pub fn get(&self, key: &str) -> &Value {
        self.attrs.get(key).unwrap_or(&UNKNOWN)
    }

    /// Returns the value for `key` only if it is present (known and not null).
    pub fn get_present(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key).filter(|v| v.is_present())
    }

    /// Writes `value` under `key`, subject to the schema.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<(), TreeError> {
        let value = value.into();
        if let Some(schema) = &self.schema {
            schema.check(key, &value)?;
        }
        self.attrs.insert(key.to_string(), value);
        Ok(())
    }

    /// Builder-style [`Tree::set`] for schemaless construction in tests and
    /// front-ends that have already validated their input.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    /// Removes `key`, returning its previous value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.attrs.remove(key)
    }

    /// Returns the resource identity, if assigned.
    pub fn id(&self) -> Option<&str> {
        self.get(ID_KEY).as_str().filter(|s| !s.is_empty())
    }

    /// Sets or clears the resource identity.
    pub fn set_id(&mut self, id: Option<&str>) {
        match id {
            Some(id) => {
                self.attrs.insert(ID_KEY.to_string(), Value::String(id.to_string()));
            }
            None => {
                self.attrs.remove(ID_KEY);
            }
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.attrs.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }
}

/// Trees compare by content; the schema is not part of equality.
impl PartialEq for Tree {
    fn eq(&self, other: &Self) -> bool {
        self.attrs == other.attrs
    }
}
