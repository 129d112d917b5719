//! Field bindings: one key plus typed accessors per record field.

use crate::field::FieldValue;
use crate::record::{from_tree, to_tree, Record};
use crate::FieldError;
use statekeep_types::Value;
use std::fmt;

type ReadFn<R> = Box<dyn Fn(&R) -> Option<Value> + Send + Sync>;
type WriteFn<R> = Box<dyn Fn(&mut R, &Value) -> Result<(), FieldError> + Send + Sync>;
type BlankFn<R> = Box<dyn Fn(&R) -> bool + Send + Sync>;
type InheritFn<R> = Box<dyn Fn(&mut R, &R) + Send + Sync>;

/// Binds a tree key to one `Option<_>` field of record `R`.
///
/// Both directions go through the same binding, so a field can never be
/// loadable without also being copyable.
pub struct FieldBinding<R> {
    key: &'static str,
    sensitive: bool,
    read: ReadFn<R>,
    write: WriteFn<R>,
    blank: BlankFn<R>,
    inherit: InheritFn<R>,
}

impl<R: 'static> FieldBinding<R> {
    /// Binds a scalar or list-of-scalar field.
    pub fn new<T: FieldValue>(
        key: &'static str,
        get: fn(&R) -> &Option<T>,
        get_mut: fn(&mut R) -> &mut Option<T>,
    ) -> Self {
        Self {
            key,
            sensitive: false,
            read: Box::new(move |r| get(r).as_ref().map(FieldValue::to_value)),
            write: Box::new(move |r, value| {
                *get_mut(r) = Some(T::from_value(key, value)?);
                Ok(())
            }),
            blank: Box::new(move |r| get(r).as_ref().is_none_or(FieldValue::is_blank)),
            inherit: Box::new(move |dst, src| *get_mut(dst) = get(src).clone()),
        }
    }

    /// Binds a list of nested records (blocks).
    pub fn blocks<N: Record>(
        key: &'static str,
        get: fn(&R) -> &Option<Vec<N>>,
        get_mut: fn(&mut R) -> &mut Option<Vec<N>>,
    ) -> Self {
        Self {
            key,
            sensitive: false,
            read: Box::new(move |r| {
                get(r)
                    .as_ref()
                    .map(|items| Value::List(items.iter().map(|n| Value::Map(to_tree(n))).collect()))
            }),
            write: Box::new(move |r, value| {
                let items = value.as_list().ok_or_else(|| FieldError::Kind {
                    key: key.to_string(),
                    expected: "list of blocks",
                    found: value.kind_name(),
                })?;
                let mut blocks = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    let tree = item.as_map().ok_or_else(|| FieldError::Kind {
                        key: key.to_string(),
                        expected: "block",
                        found: item.kind_name(),
                    })?;
                    let block = from_tree::<N>(tree).map_err(|e| FieldError::Nested {
                        key: key.to_string(),
                        index,
                        source: Box::new(e),
                    })?;
                    blocks.push(block);
                }
                *get_mut(r) = Some(blocks);
                Ok(())
            }),
            blank: Box::new(move |r| get(r).as_ref().is_none_or(Vec::is_empty)),
            inherit: Box::new(move |dst, src| *get_mut(dst) = get(src).clone()),
        }
    }

    /// Marks the field as a secret the server never echoes back.
    #[must_use]
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn is_sensitive(&self) -> bool {
        self.sensitive
    }

    /// Current field value as a tree value, `None` if absent.
    pub fn read(&self, record: &R) -> Option<Value> {
        (self.read)(record)
    }

    /// Stores a present tree value into the field.
    pub fn write(&self, record: &mut R, value: &Value) -> Result<(), FieldError> {
        (self.write)(record, value)
    }

    /// True if the field is absent or present-but-empty.
    pub fn is_blank(&self, record: &R) -> bool {
        (self.blank)(record)
    }

    /// Copies this field from `src` into `dst`.
    pub fn inherit(&self, dst: &mut R, src: &R) {
        (self.inherit)(dst, src)
    }
}

impl<R> fmt::Debug for FieldBinding<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldBinding")
            .field("key", &self.key)
            .field("sensitive", &self.sensitive)
            .finish_non_exhaustive()
    }
}

/// Builder for a record's ordered binding list.
///
/// ```
/// use statekeep_model::{Bindings, FieldBinding};
///
/// #[derive(Default, Clone)]
/// struct Heartbeat {
///     name: Option<String>,
///     period: Option<i64>,
/// }
///
/// let bindings: Vec<FieldBinding<Heartbeat>> = Bindings::<Heartbeat>::new()
///     .field("name", |r| &r.name, |r| &mut r.name)
///     .field("period", |r| &r.period, |r| &mut r.period)
///     .build();
/// assert_eq!(bindings[1].key(), "period");
/// ```
pub struct Bindings<R> {
    fields: Vec<FieldBinding<R>>,
}

impl<R: 'static> Bindings<R> {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    #[must_use]
    pub fn field<T: FieldValue>(
        mut self,
        key: &'static str,
        get: fn(&R) -> &Option<T>,
        get_mut: fn(&mut R) -> &mut Option<T>,
    ) -> Self {
        self.fields.push(FieldBinding::new(key, get, get_mut));
        self
    }

    /// Adds a field the server accepts but never returns.
    #[must_use]
    pub fn secret<T: FieldValue>(
        mut self,
        key: &'static str,
        get: fn(&R) -> &Option<T>,
        get_mut: fn(&mut R) -> &mut Option<T>,
    ) -> Self {
        self.fields.push(FieldBinding::new(key, get, get_mut).sensitive());
        self
    }

    #[must_use]
    pub fn blocks<N: Record>(
        mut self,
        key: &'static str,
        get: fn(&R) -> &Option<Vec<N>>,
        get_mut: fn(&mut R) -> &mut Option<Vec<N>>,
    ) -> Self {
        self.fields.push(FieldBinding::blocks(key, get, get_mut));
        self
    }

    pub fn build(self) -> Vec<FieldBinding<R>> {
        self.fields
    }
}

impl<R: 'static> Default for Bindings<R> {
    fn default() -> Self {
        Self::new()
    }
}
