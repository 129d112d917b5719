//! Moves attribute values between a desired-state tree and a typed record.
//!
//! Both directions walk the same ordered binding list, so every field that
//! can be loaded can also be copied back.

use crate::error::SyncResult;
use crate::policy::ResourcePolicy;
use statekeep_model::{from_tree, FieldError, Record};
use statekeep_types::Tree;
use tracing::trace;

/// Builds a record from every present value of `tree`.
///
/// Unknown and null values leave their field `None`; explicit zero values
/// (`false`, `0`, `""`, `[]`) are loaded as such.
pub fn load<R: Record>(tree: &Tree) -> SyncResult<R> {
    Ok(from_tree(tree)?)
}

/// Writes every `Some` field of `record` into `tree`, unless `policy`
/// suppresses it.
///
/// A field that cannot be written does not stop the copy; all failures are
/// returned together. Copying the same record twice leaves the tree as the
/// first copy did.
pub fn copy<R: Record>(
    tree: &mut Tree,
    record: &R,
    policy: &ResourcePolicy<R>,
) -> Vec<FieldError> {
    let mut errors = Vec::new();
    for binding in R::bindings() {
        let Some(value) = binding.read(record) else {
            continue;
        };
        if let Some(reason) = policy.suppression(binding.key(), &value, record, tree) {
            trace!(key = binding.key(), ?reason, "copy suppressed");
            continue;
        }
        if let Err(source) = tree.set(binding.key(), value) {
            errors.push(FieldError::Write {
                key: binding.key().to_string(),
                source,
            });
        }
    }
    errors
}
