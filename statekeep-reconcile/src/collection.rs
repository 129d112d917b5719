//! Nested collection reconciliation.
//!
//! Nested items carry a server-assigned identity which the user never
//! writes. When the configured list is re-planned, identities are
//! re-attached by position so the server updates items in place, and
//! every identity that disappeared is sent back as a removal entry.
//!
//! Matching is positional: reordering items in configuration reassigns
//! identities and so updates items in place rather than moving them.

use statekeep_model::{inherit_sensitive, CollectionItem, Record};
use std::collections::HashSet;

/// Computes the list to send for a nested collection.
///
/// Returns the `new` items, in order, with identities and secrets
/// re-attached, followed by one removal entry per `old` identity that is
/// not carried forward.
pub fn delta<T: CollectionItem>(old: &[T], new: &[T]) -> Vec<T> {
    let claimed: HashSet<&str> = new.iter().filter_map(CollectionItem::identity).collect();
    let mut kept: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(new.len() + old.len());

    for (index, item) in new.iter().enumerate() {
        let mut next = item.clone();
        let positional = old.get(index);
        if next.identity().is_none() {
            let inherited = positional
                .and_then(CollectionItem::identity)
                .filter(|id| !claimed.contains(id) && !kept.contains(*id));
            if let Some(id) = inherited {
                next.set_identity(Some(id.to_string()));
            }
        }

        if let Some(source) = secret_source(old, &next, positional) {
            inherit_sensitive(&mut next, source);
        }
        if let Some(id) = next.identity() {
            kept.insert(id.to_string());
        }
        out.push(next);
    }

    for id in old.iter().filter_map(CollectionItem::identity) {
        if kept.insert(id.to_string()) {
            out.push(T::removal(id.to_string()));
        }
    }
    out
}

/// Re-attaches secrets to items decoded from a server response.
///
/// Items are matched to `prior` by identity, falling back to position.
pub fn restore<T: CollectionItem>(prior: &[T], inbound: &mut [T]) {
    for (index, item) in inbound.iter_mut().enumerate() {
        let positional = prior.get(index);
        if let Some(source) = secret_source(prior, item, positional) {
            inherit_sensitive(item, source);
        }
    }
}

/// The old item whose secrets `item` may inherit: the one sharing its
/// identity, else the positional one if that has no identity of its own.
fn secret_source<'a, T: CollectionItem>(
    old: &'a [T],
    item: &T,
    positional: Option<&'a T>,
) -> Option<&'a T> {
    match item.identity() {
        Some(id) => old
            .iter()
            .find(|o| o.identity() == Some(id))
            .or_else(|| positional.filter(|o| o.identity().is_none())),
        None => positional.filter(|o| o.identity().is_none()),
    }
}

/// Replaces the collection field of `record` with its delta against the
/// same field of `prior`. For use in [`Record::reconcile`]:
///
/// ```
/// # use statekeep_model::{Bindings, CollectionItem, FieldBinding, Record};
/// # use statekeep_reconcile::collection::reconcile_field;
/// # #[derive(Debug, Clone, Default)]
/// # struct Header { id: Option<String>, name: Option<String>, destroy: Option<bool> }
/// # impl Record for Header {
/// #     fn bindings() -> Vec<FieldBinding<Self>> {
/// #         Bindings::<Self>::new().field("id", |r| &r.id, |r| &mut r.id).build()
/// #     }
/// # }
/// # impl CollectionItem for Header {
/// #     fn identity(&self) -> Option<&str> { self.id.as_deref() }
/// #     fn set_identity(&mut self, id: Option<String>) { self.id = id; }
/// #     fn mark_removed(&mut self) { self.destroy = Some(true); }
/// #     fn is_removed(&self) -> bool { self.destroy == Some(true) }
/// # }
/// #[derive(Debug, Clone, Default)]
/// struct Monitor {
///     request_headers: Option<Vec<Header>>,
/// }
///
/// impl Record for Monitor {
///     fn bindings() -> Vec<FieldBinding<Self>> {
///         Bindings::<Self>::new()
///             .blocks("request_headers", |r| &r.request_headers, |r| &mut r.request_headers)
///             .build()
///     }
///
///     fn reconcile(&mut self, prior: &Self) {
///         reconcile_field(self, prior, |r| &r.request_headers, |r| &mut r.request_headers);
///     }
/// }
///
/// let prior = Monitor {
///     request_headers: Some(vec![Header { id: Some("7".into()), ..Header::default() }]),
/// };
/// let mut planned = Monitor { request_headers: Some(vec![]) };
/// planned.reconcile(&prior);
/// assert!(planned.request_headers.unwrap()[0].is_removed());
/// ```
pub fn reconcile_field<R, T>(
    record: &mut R,
    prior: &R,
    get: fn(&R) -> &Option<Vec<T>>,
    get_mut: fn(&mut R) -> &mut Option<Vec<T>>,
) where
    R: Record,
    T: CollectionItem,
{
    let old = get(prior).as_deref().unwrap_or_default();
    let slot = get_mut(record);
    let new = slot.as_deref().unwrap_or_default();
    if old.is_empty() && new.is_empty() {
        return;
    }
    *slot = Some(delta(old, new));
}

/// Restores secrets of the collection field of `record` from the same
/// field of `prior`. For use in [`Record::restore`] next to
/// [`inherit_sensitive`].
pub fn restore_field<R, T>(
    record: &mut R,
    prior: &R,
    get: fn(&R) -> &Option<Vec<T>>,
    get_mut: fn(&mut R) -> &mut Option<Vec<T>>,
) where
    R: Record,
    T: CollectionItem,
{
    let old = get(prior).as_deref().unwrap_or_default();
    if let Some(items) = get_mut(record) {
        restore(old, items);
    }
}
