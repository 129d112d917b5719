use crate::FieldError;
use statekeep_types::Value;

/// A typed field shape that can be read from and written to a tree value.
pub trait FieldValue: Clone + Send + Sync + 'static {
    /// Name of the expected tree kind, used in error messages.
    const EXPECTED: &'static str;

    /// Converts a present tree value. `key` is only used for errors.
    fn from_value(key: &str, value: &Value) -> Result<Self, FieldError>;

    fn to_value(&self) -> Value;

    /// Present but carrying no content (`""`, `[]`).
    fn is_blank(&self) -> bool {
        false
    }
}

/// Marker for single-valued shapes that may also appear as list elements.
pub trait Scalar: FieldValue {}

fn mismatch<T: FieldValue>(key: &str, value: &Value) -> FieldError {
    FieldError::Kind {
        key: key.to_string(),
        expected: T::EXPECTED,
        found: value.kind_name(),
    }
}

impl FieldValue for bool {
    const EXPECTED: &'static str = "bool";

    fn from_value(key: &str, value: &Value) -> Result<Self, FieldError> {
        value.as_bool().ok_or_else(|| mismatch::<Self>(key, value))
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl FieldValue for i64 {
    const EXPECTED: &'static str = "integer";

    fn from_value(key: &str, value: &Value) -> Result<Self, FieldError> {
        value.as_i64().ok_or_else(|| mismatch::<Self>(key, value))
    }

    fn to_value(&self) -> Value {
        Value::from(*self)
    }
}

impl FieldValue for f64 {
    const EXPECTED: &'static str = "number";

    fn from_value(key: &str, value: &Value) -> Result<Self, FieldError> {
        value.as_f64().ok_or_else(|| mismatch::<Self>(key, value))
    }

    fn to_value(&self) -> Value {
        Value::from(*self)
    }
}

impl FieldValue for String {
    const EXPECTED: &'static str = "string";

    fn from_value(key: &str, value: &Value) -> Result<Self, FieldError> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| mismatch::<Self>(key, value))
    }

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl Scalar for bool {}
impl Scalar for i64 {}
impl Scalar for f64 {}
impl Scalar for String {}

impl<T: Scalar> FieldValue for Vec<T> {
    const EXPECTED: &'static str = "list";

    /// Every element must convert; a null or unknown element is a
    /// [`FieldError::Kind`] for `key` rather than being dropped.
    fn from_value(key: &str, value: &Value) -> Result<Self, FieldError> {
        let items = value.as_list().ok_or_else(|| mismatch::<Self>(key, value))?;
        items.iter().map(|v| T::from_value(key, v)).collect()
    }

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(FieldValue::to_value).collect())
    }

    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}
