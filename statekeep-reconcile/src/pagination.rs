//! Sequential walks over paginated list endpoints.
//!
//! Pages are numbered from 1 and fetched strictly one after another. A page
//! whose `next` link is empty or absent ends the walk.

use crate::error::LookupError;
use serde::de::DeserializeOwned;
use statekeep_transport::{
    ListEnvelope, Method, RequestContext, Resource, Transport, TransportResult,
};
use std::future::Future;
use tracing::{debug, warn};

/// Upper bound on pages fetched by one walk.
pub const MAX_PAGES: u32 = 10_000;

/// One page of results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
}

impl<T> Page<T> {
    /// A page with no successor.
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }

    pub fn is_last(&self) -> bool {
        self.next.as_deref().is_none_or(str::is_empty)
    }
}

impl<T> From<ListEnvelope<T>> for Page<Resource<T>> {
    fn from(envelope: ListEnvelope<T>) -> Self {
        let next = envelope.next().map(str::to_string);
        Page {
            items: envelope.data,
            next,
        }
    }
}

/// Returns the first item matching `predicate`, fetching no page past the
/// one that holds it.
pub async fn find_first<T, E, F, Fut, P>(
    mut fetch: F,
    mut predicate: P,
) -> Result<Option<T>, LookupError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
    P: FnMut(&T) -> bool,
{
    for number in 1..=MAX_PAGES {
        let page = fetch(number).await.map_err(LookupError::Fetch)?;
        let last = page.is_last();
        if let Some(found) = page.items.into_iter().find(|item| predicate(item)) {
            debug!(page = number, "lookup matched");
            return Ok(Some(found));
        }
        if last {
            debug!(pages = number, "lookup found no match");
            return Ok(None);
        }
    }
    warn!(max_pages = MAX_PAGES, "pagination did not terminate");
    Err(LookupError::TooManyPages(MAX_PAGES))
}

/// Returns every item matching `predicate`, scanning all pages.
pub async fn collect_matches<T, E, F, Fut, P>(
    mut fetch: F,
    mut predicate: P,
) -> Result<Vec<T>, LookupError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
    P: FnMut(&T) -> bool,
{
    let mut matches = Vec::new();
    for number in 1..=MAX_PAGES {
        let page = fetch(number).await.map_err(LookupError::Fetch)?;
        let last = page.is_last();
        matches.extend(page.items.into_iter().filter(|item| predicate(item)));
        if last {
            debug!(pages = number, matches = matches.len(), "scan complete");
            return Ok(matches);
        }
    }
    warn!(max_pages = MAX_PAGES, "pagination did not terminate");
    Err(LookupError::TooManyPages(MAX_PAGES))
}

/// Looks up the single item matching `predicate`.
///
/// More than one match is an error listing every matching identity, so
/// that the caller can switch to an identity lookup.
pub async fn find_unique<T, E, F, Fut, P, I>(
    fetch: F,
    predicate: P,
    key: &str,
    id_of: I,
) -> Result<Option<T>, LookupError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
    P: FnMut(&T) -> bool,
    I: Fn(&T) -> String,
{
    let mut matches = collect_matches(fetch, predicate).await?;
    if matches.len() > 1 {
        return Err(LookupError::Ambiguous {
            key: key.to_string(),
            ids: matches.iter().map(id_of).collect(),
        });
    }
    Ok(matches.pop())
}

/// `path` with the page number appended to its query string.
pub fn page_path(path: &str, page: u32) -> String {
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{path}{separator}page={page}")
}

/// Fetches page `page` of a list endpoint.
pub async fn fetch_page<T, X>(
    transport: &X,
    ctx: &RequestContext,
    base: &str,
    path: &str,
    page: u32,
) -> TransportResult<Page<Resource<T>>>
where
    T: DeserializeOwned,
    X: Transport + ?Sized,
{
    let response = transport
        .send(ctx, Method::GET, base, &page_path(path, page), None)
        .await?
        .error_for_status()?;
    Ok(response.list::<T>()?.into())
}
