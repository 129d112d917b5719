use crate::binding::FieldBinding;
use crate::FieldError;
use statekeep_types::{Tree, ID_KEY};

/// A typed API record.
///
/// Every field is optional: `None` means "don't send" outbound and
/// "don't overwrite" inbound, which is different from a zero value.
pub trait Record: Default + Clone + Send + Sync + 'static {
    /// Ordered field bindings. The same list drives load and copy.
    fn bindings() -> Vec<FieldBinding<Self>>;

    /// Called before an update is sent, with the record loaded from the
    /// prior state. Records holding server-owned nested collections
    /// compute their delta here.
    fn reconcile(&mut self, prior: &Self) {
        let _ = prior;
    }

    /// Called on a record decoded from a server response, with the record
    /// last sent or stored. Secrets the server does not echo are carried
    /// over from `prior`.
    fn restore(&mut self, prior: &Self) {
        inherit_sensitive(self, prior);
    }
}

/// Copies every sensitive field that is blank on `dst` from `src`.
pub fn inherit_sensitive<R: Record>(dst: &mut R, src: &R) {
    for binding in R::bindings() {
        if binding.is_sensitive() && binding.is_blank(dst) && !binding.is_blank(src) {
            binding.inherit(dst, src);
        }
    }
}

/// A nested record addressed by a server-assigned identity.
///
/// The identity is assigned on first creation and round-tripped by the
/// client; the remove marker asks the server to delete exactly that item.
pub trait CollectionItem: Record {
    fn identity(&self) -> Option<&str>;

    fn set_identity(&mut self, id: Option<String>);

    fn mark_removed(&mut self);

    fn is_removed(&self) -> bool;

    /// A stand-alone removal entry carrying only `id` and the marker.
    fn removal(id: String) -> Self {
        let mut item = Self::default();
        item.set_identity(Some(id));
        item.mark_removed();
        item
    }
}

/// Builds a schemaless tree holding every present field of `record`.
///
/// Used for nested blocks; top-level copies go through the synchronizer,
/// which also applies policy.
pub fn to_tree<R: Record>(record: &R) -> Tree {
    R::bindings()
        .iter()
        .fold(Tree::new(), |tree, binding| match binding.read(record) {
            Some(value) => tree.with(binding.key(), value),
            None => tree,
        })
}

/// Loads every present tree value into a fresh record.
///
/// Absent (unknown or null) values leave the field `None`. The first
/// conversion failure aborts the load.
pub fn from_tree<R: Record>(tree: &Tree) -> Result<R, FieldError> {
    let mut record = R::default();
    for binding in R::bindings() {
        if binding.key() == ID_KEY && tree.id().is_none() {
            continue;
        }
        if let Some(value) = tree.get_present(binding.key()) {
            binding.write(&mut record, value)?;
        }
    }
    Ok(record)
}
