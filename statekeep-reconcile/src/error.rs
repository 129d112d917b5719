//! Error types for the reconciliation layer.

use crate::resource::LifecycleState;
use statekeep_model::FieldError;
use statekeep_transport::TransportError;
use statekeep_types::IdentityError;
use thiserror::Error;

/// Result type for synchronizer operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Result type for resource lifecycle operations.
pub type ResourceResult<T> = Result<T, ResourceError>;

/// Errors moving values between a tree and a typed record.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    /// A tree value could not be converted into its record field.
    #[error("failed to load record: {0}")]
    Load(#[from] FieldError),

    /// Some record fields could not be written back into the tree.
    #[error("{} attribute(s) could not be written: {}", .0.len(), join(.0))]
    PartialWrite(Vec<FieldError>),
}

/// A planned change the policy layer refuses before any request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error(
        "attribute {field:?} cannot be changed from {from} to {to} after creation; \
         recreate the resource instead"
    )]
    Immutable {
        field: String,
        from: String,
        to: String,
    },

    #[error("attribute {field:?} cannot be removed once set")]
    RemovalForbidden { field: String },
}

impl ValidationError {
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Immutable { field, .. }
            | ValidationError::RemovalForbidden { field } => field,
        }
    }
}

/// Errors of a pagination walk.
#[derive(Debug, Error)]
pub enum LookupError<E> {
    /// A page fetch failed; the walk stopped there.
    #[error("page fetch failed: {0}")]
    Fetch(#[source] E),

    /// A name lookup matched more than one resource.
    #[error("multiple matches for {key:?}, use identity lookup instead: {}", .ids.join(", "))]
    Ambiguous { key: String, ids: Vec<String> },

    /// The server kept returning next-page links.
    #[error("pagination did not terminate after {0} pages")]
    TooManyPages(u32),
}

/// Errors of a resource lifecycle operation.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{resource}: {source}")]
    Sync {
        resource: &'static str,
        #[source]
        source: SyncError,
    },

    #[error("{resource} lookup failed: {source}")]
    Lookup {
        resource: &'static str,
        #[source]
        source: Box<LookupError<ResourceError>>,
    },

    #[error("{resource} {id:?} does not exist")]
    NotFound { resource: &'static str, id: String },

    #[error("{resource} has no identity yet")]
    MissingId { resource: &'static str },

    #[error("{resource} needs attribute {key:?} to address its parent")]
    MissingParent {
        resource: &'static str,
        key: &'static str,
    },

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("cannot {operation} {resource} while it is {state}")]
    InvalidState {
        resource: &'static str,
        operation: &'static str,
        state: LifecycleState,
    },
}

impl ResourceError {
    /// The transport failure behind this error, if any.
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            ResourceError::Transport(e) => Some(e),
            _ => None,
        }
    }

    /// Field errors collected by a copy that otherwise succeeded.
    pub fn partial_write(&self) -> Option<&[FieldError]> {
        match self {
            ResourceError::Sync {
                source: SyncError::PartialWrite(errors),
                ..
            } => Some(errors),
            _ => None,
        }
    }
}

fn join(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
