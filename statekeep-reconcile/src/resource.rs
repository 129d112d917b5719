//! Resource lifecycle driver.
//!
//! A [`ResourceDriver`] runs create, read, update and delete for one
//! resource type against its endpoint. Each call moves a
//! [`ResourceInstance`] through the lifecycle:
//!
//! ```text
//! Absent -> Creating -> Present <-> Reading / Updating -> Deleting -> Absent
//! ```
//!
//! Records go out as `{"<field>": ..}` bodies built from their bindings, and
//! come back through the same bindings from the response envelope.

use crate::error::{LookupError, ResourceError, ResourceResult, SyncError};
use crate::pagination::{self, Page};
use crate::policy::ResourcePolicy;
use crate::synchronizer;
use statekeep_model::{to_tree, Record};
use statekeep_transport::{ApiResponse, Method, RequestContext, Resource, Transport};
use statekeep_types::{CompositeId, Identity, Tree, Value};
use std::fmt;
use tracing::{debug, info, warn};

type Attributes = serde_json::Map<String, serde_json::Value>;

/// Where a resource type lives on the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEndpoint {
    name: &'static str,
    base: String,
    path: String,
    parent_key: Option<&'static str>,
}

impl ResourceEndpoint {
    /// A top-level collection at `path` (e.g. `/api/v2/monitors`) on API
    /// base `base`.
    pub fn new(name: &'static str, base: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name,
            base: base.into(),
            path: path.into(),
            parent_key: None,
        }
    }

    /// A collection nested under a parent resource. `path` contains a
    /// `{parent}` placeholder; the parent identity is read from attribute
    /// `parent_key`, and identities take the form `"<parent>/<child>"`.
    pub fn nested(
        name: &'static str,
        base: impl Into<String>,
        path: impl Into<String>,
        parent_key: &'static str,
    ) -> Self {
        Self {
            name,
            base: base.into(),
            path: path.into(),
            parent_key: Some(parent_key),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Collection path for the resource described by `tree`.
    pub fn collection_path(&self, tree: &Tree) -> ResourceResult<String> {
        match self.parent_key {
            None => Ok(self.path.clone()),
            Some(key) => {
                let parent = self.parent_of(tree, key)?;
                Ok(self.path.replace("{parent}", &urlencoding::encode(&parent)))
            }
        }
    }

    /// Path of the item with identity `id`. Identity segments are
    /// percent-encoded, so `/`, `?` and `#` never change the route.
    pub fn item_path(&self, id: &str) -> ResourceResult<String> {
        match self.parent_key {
            None => Ok(format!("{}/{}", self.path, urlencoding::encode(id))),
            Some(_) => {
                let id = CompositeId::parse(id)?;
                Ok(format!(
                    "{}/{}",
                    self.path
                        .replace("{parent}", &urlencoding::encode(id.parent().as_str())),
                    urlencoding::encode(id.child().as_str())
                ))
            }
        }
    }

    /// Identity to store for a resource the server calls `server_id`.
    pub fn identity(&self, tree: &Tree, server_id: &str) -> ResourceResult<String> {
        match self.parent_key {
            None => Ok(server_id.to_string()),
            Some(key) => {
                let parent = Identity::new(self.parent_of(tree, key)?)?;
                Ok(CompositeId::new(parent, Identity::new(server_id)?).to_string())
            }
        }
    }

    fn parent_of(&self, tree: &Tree, key: &'static str) -> ResourceResult<String> {
        match tree.get(key) {
            Value::String(s) if !s.is_empty() => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            _ => Err(ResourceError::MissingParent {
                resource: self.name,
                key,
            }),
        }
    }
}

/// Where an instance is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Absent,
    Creating,
    Present,
    Reading,
    Updating,
    Deleting,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Absent => "absent",
            LifecycleState::Creating => "being created",
            LifecycleState::Present => "present",
            LifecycleState::Reading => "being read",
            LifecycleState::Updating => "being updated",
            LifecycleState::Deleting => "being deleted",
        };
        f.write_str(s)
    }
}

/// A resource's state tree plus its lifecycle position.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceInstance {
    tree: Tree,
    state: LifecycleState,
}

impl ResourceInstance {
    /// Wraps `tree`; a tree carrying an identity is taken to exist remotely.
    pub fn new(tree: Tree) -> Self {
        let state = if tree.id().is_some() {
            LifecycleState::Present
        } else {
            LifecycleState::Absent
        };
        Self { tree, state }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Mutable access for planning the next update.
    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    pub fn into_tree(self) -> Tree {
        self.tree
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn id(&self) -> Option<&str> {
        self.tree.id()
    }

    fn begin(
        &mut self,
        resource: &'static str,
        operation: &'static str,
        next: LifecycleState,
    ) -> ResourceResult<()> {
        let expected = match next {
            LifecycleState::Creating => LifecycleState::Absent,
            _ => LifecycleState::Present,
        };
        if self.state != expected {
            return Err(ResourceError::InvalidState {
                resource,
                operation,
                state: self.state,
            });
        }
        self.state = next;
        Ok(())
    }
}

/// Result of a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The resource exists and the tree was refreshed.
    Present,
    /// The server no longer knows the resource; its identity was cleared.
    Gone,
}

/// Runs the lifecycle of resource type `R` over transport `X`.
#[derive(Debug)]
pub struct ResourceDriver<R, X> {
    transport: X,
    endpoint: ResourceEndpoint,
    policy: ResourcePolicy<R>,
}

impl<R: Record, X: Transport> ResourceDriver<R, X> {
    pub fn new(transport: X, endpoint: ResourceEndpoint, policy: ResourcePolicy<R>) -> Self {
        Self {
            transport,
            endpoint,
            policy,
        }
    }

    pub fn endpoint(&self) -> &ResourceEndpoint {
        &self.endpoint
    }

    pub fn policy(&self) -> &ResourcePolicy<R> {
        &self.policy
    }

    /// Creates the resource described by the instance's tree.
    ///
    /// On success the tree holds the new identity and the server's view of
    /// every attribute. On failure the identity stays unset, except when
    /// only the final copy failed: the resource then exists and the
    /// instance is left `Present`.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        instance: &mut ResourceInstance,
    ) -> ResourceResult<()> {
        instance.begin(self.name(), "create", LifecycleState::Creating)?;
        info!(resource = self.name(), "creating resource");

        match self.create_remote(ctx, &mut instance.tree).await {
            Ok(()) => {
                instance.state = LifecycleState::Present;
                info!(resource = self.name(), id = instance.id(), "resource created");
                Ok(())
            }
            Err(e) if e.partial_write().is_some() => {
                instance.state = LifecycleState::Present;
                warn!(
                    resource = self.name(),
                    id = instance.id(),
                    error = %e,
                    "resource created with unwritable attributes"
                );
                Err(e)
            }
            Err(e) => {
                instance.tree.set_id(None);
                instance.state = LifecycleState::Absent;
                warn!(resource = self.name(), error = %e, "create failed");
                Err(e)
            }
        }
    }

    /// Refreshes the tree from the server.
    ///
    /// A 404 is not an error: the identity is cleared so the resource will
    /// be planned for re-creation.
    pub async fn read(
        &self,
        ctx: &RequestContext,
        instance: &mut ResourceInstance,
    ) -> ResourceResult<ReadOutcome> {
        let id = self.require_id(instance)?;
        instance.begin(self.name(), "read", LifecycleState::Reading)?;
        debug!(resource = self.name(), %id, "reading resource");

        let result = self.read_remote(ctx, &mut instance.tree, &id).await;
        if let Ok(ReadOutcome::Gone) = result {
            info!(resource = self.name(), %id, "resource is gone");
            instance.tree.set_id(None);
            instance.state = LifecycleState::Absent;
        } else {
            instance.state = LifecycleState::Present;
        }
        result
    }

    /// Sends the planned tree of `instance` as an update over `prior`.
    ///
    /// Policy checks run first; a rejected change sends no request.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        instance: &mut ResourceInstance,
        prior: &Tree,
    ) -> ResourceResult<()> {
        self.policy.validate_update(prior, &instance.tree)?;
        let id = self.require_id(instance)?;
        instance.begin(self.name(), "update", LifecycleState::Updating)?;
        info!(resource = self.name(), %id, "updating resource");

        let result = self.update_remote(ctx, &mut instance.tree, prior, &id).await;
        instance.state = LifecycleState::Present;
        if let Err(e) = &result {
            warn!(resource = self.name(), %id, error = %e, "update failed");
        }
        result
    }

    /// Deletes the resource. A 404 means it is already gone.
    pub async fn delete(
        &self,
        ctx: &RequestContext,
        instance: &mut ResourceInstance,
    ) -> ResourceResult<()> {
        let id = self.require_id(instance)?;
        instance.begin(self.name(), "delete", LifecycleState::Deleting)?;
        info!(resource = self.name(), %id, "deleting resource");

        match self.delete_remote(ctx, &id).await {
            Ok(()) => {
                instance.tree.set_id(None);
                instance.state = LifecycleState::Absent;
                Ok(())
            }
            Err(e) => {
                instance.state = LifecycleState::Present;
                warn!(resource = self.name(), %id, error = %e, "delete failed");
                Err(e)
            }
        }
    }

    /// Adopts an existing resource by identity. Nested resources take
    /// `"<parent>/<child>"`; the parent attribute comes back from the read.
    pub async fn import(&self, ctx: &RequestContext, id: &str) -> ResourceResult<ResourceInstance> {
        let mut tree = Tree::new();
        tree.set_id(Some(id));

        let mut instance = ResourceInstance::new(tree);
        match self.read(ctx, &mut instance).await? {
            ReadOutcome::Present => Ok(instance),
            ReadOutcome::Gone => Err(ResourceError::NotFound {
                resource: self.name(),
                id: id.to_string(),
            }),
        }
    }

    /// Walks the list endpoint and returns the first resource matching
    /// `predicate`. `scope` supplies the parent of nested resources.
    pub async fn lookup<P>(
        &self,
        ctx: &RequestContext,
        scope: &Tree,
        predicate: P,
    ) -> ResourceResult<Option<Resource<R>>>
    where
        P: FnMut(&Resource<R>) -> bool,
    {
        let path = self.endpoint.collection_path(scope)?;
        let path = path.as_str();
        pagination::find_first(move |page| self.fetch_records(ctx, path, page), predicate)
            .await
            .map_err(|e| self.lookup_error(e))
    }

    /// Like [`ResourceDriver::lookup`], but fails when more than one
    /// resource matches. `key` names the searched value in the error.
    pub async fn lookup_unique<P>(
        &self,
        ctx: &RequestContext,
        scope: &Tree,
        key: &str,
        predicate: P,
    ) -> ResourceResult<Option<Resource<R>>>
    where
        P: FnMut(&Resource<R>) -> bool,
    {
        let path = self.endpoint.collection_path(scope)?;
        let path = path.as_str();
        pagination::find_unique(
            move |page| self.fetch_records(ctx, path, page),
            predicate,
            key,
            |found: &Resource<R>| found.id.clone(),
        )
        .await
        .map_err(|e| self.lookup_error(e))
    }

    /// Copies a looked-up resource into `tree` and records its identity.
    pub fn adopt(&self, tree: &mut Tree, found: Resource<R>) -> ResourceResult<()> {
        let id = self.endpoint.identity(tree, &found.id)?;
        tree.set_id(Some(&id));
        self.copy(tree, &found.attributes)
    }

    fn name(&self) -> &'static str {
        self.endpoint.name
    }

    fn require_id(&self, instance: &ResourceInstance) -> ResourceResult<String> {
        instance
            .id()
            .map(str::to_string)
            .ok_or(ResourceError::MissingId {
                resource: self.name(),
            })
    }

    async fn create_remote(&self, ctx: &RequestContext, tree: &mut Tree) -> ResourceResult<()> {
        let record: R = self.load(tree)?;
        let path = self.endpoint.collection_path(tree)?;
        let response = self.send(ctx, Method::POST, &path, Some(&record)).await?;
        let (server_id, mut inbound) = self.decode(&response)?;

        let id = self.endpoint.identity(tree, &server_id)?;
        tree.set_id(Some(&id));
        inbound.restore(&record);
        self.copy(tree, &inbound)
    }

    async fn read_remote(
        &self,
        ctx: &RequestContext,
        tree: &mut Tree,
        id: &str,
    ) -> ResourceResult<ReadOutcome> {
        let path = self.endpoint.item_path(id)?;
        let response = self
            .transport
            .send(ctx, Method::GET, &self.endpoint.base, &path, None)
            .await?;
        if response.is_not_found() {
            return Ok(ReadOutcome::Gone);
        }
        let (_, mut inbound) = self.decode(&response.error_for_status()?)?;

        let stored: R = self.load(tree)?;
        inbound.restore(&stored);
        self.copy(tree, &inbound)?;
        Ok(ReadOutcome::Present)
    }

    async fn update_remote(
        &self,
        ctx: &RequestContext,
        tree: &mut Tree,
        prior: &Tree,
        id: &str,
    ) -> ResourceResult<()> {
        let mut planned: R = self.load(tree)?;
        let previous: R = self.load(prior)?;
        planned.reconcile(&previous);

        let path = self.endpoint.item_path(id)?;
        let response = self.send(ctx, Method::PATCH, &path, Some(&planned)).await?;
        let (_, mut inbound) = self.decode(&response)?;
        inbound.restore(&planned);
        self.copy(tree, &inbound)
    }

    async fn delete_remote(&self, ctx: &RequestContext, id: &str) -> ResourceResult<()> {
        let path = self.endpoint.item_path(id)?;
        let response = self
            .transport
            .send(ctx, Method::DELETE, &self.endpoint.base, &path, None)
            .await?;
        if response.is_not_found() {
            debug!(resource = self.name(), %id, "already deleted");
            return Ok(());
        }
        response.error_for_status()?;
        Ok(())
    }

    async fn fetch_records(
        &self,
        ctx: &RequestContext,
        path: &str,
        page: u32,
    ) -> ResourceResult<Page<Resource<R>>> {
        let raw: Page<Resource<Attributes>> =
            pagination::fetch_page(&self.transport, ctx, &self.endpoint.base, path, page).await?;
        let items = raw
            .items
            .into_iter()
            .map(|item| {
                Ok(Resource {
                    attributes: self.load(&Tree::from_json_object(item.attributes))?,
                    id: item.id,
                })
            })
            .collect::<ResourceResult<Vec<_>>>()?;
        Ok(Page {
            items,
            next: raw.next,
        })
    }

    async fn send(
        &self,
        ctx: &RequestContext,
        method: Method,
        path: &str,
        record: Option<&R>,
    ) -> ResourceResult<ApiResponse> {
        let body = record.map(|r| to_tree(r).to_json());
        Ok(self
            .transport
            .send(ctx, method, &self.endpoint.base, path, body)
            .await?
            .error_for_status()?)
    }

    fn decode(&self, response: &ApiResponse) -> ResourceResult<(String, R)> {
        let envelope = response.resource::<Attributes>()?;
        let record = self.load(&Tree::from_json_object(envelope.data.attributes))?;
        Ok((envelope.data.id, record))
    }

    fn load(&self, tree: &Tree) -> ResourceResult<R> {
        synchronizer::load(tree).map_err(|source| ResourceError::Sync {
            resource: self.name(),
            source,
        })
    }

    fn copy(&self, tree: &mut Tree, record: &R) -> ResourceResult<()> {
        let errors = synchronizer::copy(tree, record, &self.policy);
        if errors.is_empty() {
            return Ok(());
        }
        Err(ResourceError::Sync {
            resource: self.name(),
            source: SyncError::PartialWrite(errors),
        })
    }

    fn lookup_error(&self, error: LookupError<ResourceError>) -> ResourceError {
        match error {
            LookupError::Fetch(e) => e,
            other => ResourceError::Lookup {
                resource: self.name(),
                source: Box::new(other),
            },
        }
    }
}
