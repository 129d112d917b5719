//! Typed record model for statekeep.
//!
//! Defines the contract between resource declarations and the
//! reconciliation core:
//! - [`Record`] — a typed API record whose fields are all `Option<_>`
//! - [`FieldBinding`] — key + accessors for one record field; the ordered
//!   list returned by [`Record::bindings`] drives both load and copy
//! - [`FieldValue`] — conversion between typed fields and tree values
//! - [`CollectionItem`] — nested records carrying a server identity
//!
//! Resource declarations implement these traits; the core never looks at
//! field semantics beyond what the bindings expose.

mod binding;
mod field;
mod record;

pub use binding::{Bindings, FieldBinding};
pub use field::{FieldValue, Scalar};
pub use record::{from_tree, inherit_sensitive, to_tree, CollectionItem, Record};

use statekeep_types::TreeError;

/// Errors converting between a tree value and a typed field.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FieldError {
    #[error("attribute {key:?}: expected {expected}, got {found}")]
    Kind {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("attribute {key:?}: {source}")]
    Write {
        key: String,
        #[source]
        source: TreeError,
    },

    #[error("attribute {key:?} item {index}: {source}")]
    Nested {
        key: String,
        index: usize,
        #[source]
        source: Box<FieldError>,
    },
}

impl FieldError {
    /// The top-level attribute the error belongs to.
    pub fn key(&self) -> &str {
        match self {
            FieldError::Kind { key, .. }
            | FieldError::Write { key, .. }
            | FieldError::Nested { key, .. } => key,
        }
    }
}
