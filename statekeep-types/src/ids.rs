//! Identifier types used throughout the statekeep core.
//!
//! Identities are assigned by the server and are opaque to the client.

use crate::IdentityError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Server-assigned key of a resource or of a nested collection item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Wraps a non-empty identity string.
    pub fn new(id: impl Into<String>) -> Result<Self, IdentityError> {
        let id = id.into();
        if id.is_empty() {
            return Err(IdentityError::Empty);
        }
        Ok(Self(id))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Identity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Identity of a sub-resource scoped under a parent, encoded as
/// `"<parent>/<child>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeId {
    parent: Identity,
    child: Identity,
}

impl CompositeId {
    #[must_use]
    pub fn new(parent: Identity, child: Identity) -> Self {
        Self { parent, child }
    }

    /// Parses `"<parent>/<child>"`. Anything other than exactly two
    /// non-empty slash-delimited parts is rejected.
    pub fn parse(s: &str) -> Result<Self, IdentityError> {
        let parts: Vec<&str> = s.split('/').collect();
        match parts.as_slice() {
            [parent, child] if !parent.is_empty() && !child.is_empty() => Ok(Self {
                parent: Identity::new(*parent)?,
                child: Identity::new(*child)?,
            }),
            _ => Err(IdentityError::Malformed {
                value: s.to_string(),
                parts: parts.len(),
            }),
        }
    }

    #[must_use]
    pub fn parent(&self) -> &Identity {
        &self.parent
    }

    #[must_use]
    pub fn child(&self) -> &Identity {
        &self.child
    }
}

impl fmt::Display for CompositeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.parent, self.child)
    }
}

impl FromStr for CompositeId {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
