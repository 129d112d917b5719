//! Core type definitions for statekeep.
//!
//! This crate defines the resource-agnostic types the reconciliation core
//! passes around:
//! - [`Value`] and [`Tree`] — the desired-state tree handed over by the
//!   schema front-end, with an explicit unknown/null/present distinction
//! - [`TreeSchema`] — optional attribute-kind declarations a tree enforces
//!   on writes
//! - [`Identity`] and [`CompositeId`] — server-assigned resource keys
//!
//! Field catalogues of individual resources belong to the code that
//! declares them, not here.

mod ids;
mod tree;
mod value;

pub use ids::{CompositeId, Identity};
pub use tree::{AttrKind, Tree, TreeSchema, ID_KEY};
pub use value::Value;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Identity(#[from] IdentityError),
}

/// A write into a [`Tree`] was rejected by its schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("attribute {key:?} is not declared in the schema")]
    Undeclared { key: String },

    #[error("attribute {key:?} expects {expected}, got {found}")]
    KindMismatch {
        key: String,
        expected: String,
        found: &'static str,
    },
}

/// An identity string could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("identity is empty")]
    Empty,

    #[error("invalid composite identity {value:?}: expected \"<parent>/<child>\", found {parts} part(s)")]
    Malformed { value: String, parts: usize },
}
