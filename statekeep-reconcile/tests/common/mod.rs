//! Shared fixtures for reconcile tests: an uptime monitor with nested
//! request headers.

#![allow(dead_code)]

use statekeep_model::{inherit_sensitive, Bindings, CollectionItem, FieldBinding, Record};
use statekeep_reconcile::collection::{reconcile_field, restore_field};
use statekeep_reconcile::{FieldRule, ResourcePolicy};
use statekeep_transport::{RetryConfig, TransportConfig};
use statekeep_types::{AttrKind, Tree, TreeSchema};
use std::sync::Arc;
use wiremock::MockServer;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestHeader {
    pub id: Option<String>,
    pub name: Option<String>,
    pub value: Option<String>,
    pub destroy: Option<bool>,
}

impl RequestHeader {
    pub fn new(id: Option<&str>, name: &str, value: Option<&str>) -> Self {
        Self {
            id: id.map(str::to_string),
            name: Some(name.to_string()),
            value: value.map(str::to_string),
            destroy: None,
        }
    }
}

impl Record for RequestHeader {
    fn bindings() -> Vec<FieldBinding<Self>> {
        Bindings::<Self>::new()
            .field("id", |r| &r.id, |r| &mut r.id)
            .field("name", |r| &r.name, |r| &mut r.name)
            .secret("value", |r| &r.value, |r| &mut r.value)
            .field("_destroy", |r| &r.destroy, |r| &mut r.destroy)
            .build()
    }
}

impl CollectionItem for RequestHeader {
    fn identity(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_identity(&mut self, id: Option<String>) {
        self.id = id;
    }

    fn mark_removed(&mut self) {
        self.destroy = Some(true);
    }

    fn is_removed(&self) -> bool {
        self.destroy == Some(true)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Monitor {
    pub url: Option<String>,
    pub pronounceable_name: Option<String>,
    pub paused: Option<bool>,
    pub check_frequency: Option<i64>,
    pub regions: Option<Vec<String>>,
    pub data_region: Option<String>,
    pub auth_password: Option<String>,
    pub transformation: Option<String>,
    pub maintenance_from: Option<String>,
    pub request_headers: Option<Vec<RequestHeader>>,
}

impl Record for Monitor {
    fn bindings() -> Vec<FieldBinding<Self>> {
        Bindings::<Self>::new()
            .field("url", |r| &r.url, |r| &mut r.url)
            .field("pronounceable_name", |r| &r.pronounceable_name, |r| &mut r.pronounceable_name)
            .field("paused", |r| &r.paused, |r| &mut r.paused)
            .field("check_frequency", |r| &r.check_frequency, |r| &mut r.check_frequency)
            .field("regions", |r| &r.regions, |r| &mut r.regions)
            .field("data_region", |r| &r.data_region, |r| &mut r.data_region)
            .secret("auth_password", |r| &r.auth_password, |r| &mut r.auth_password)
            .field("transformation", |r| &r.transformation, |r| &mut r.transformation)
            .field("maintenance_from", |r| &r.maintenance_from, |r| &mut r.maintenance_from)
            .blocks("request_headers", |r| &r.request_headers, |r| &mut r.request_headers)
            .build()
    }

    fn reconcile(&mut self, prior: &Self) {
        reconcile_field(self, prior, |r| &r.request_headers, |r| &mut r.request_headers);
    }

    fn restore(&mut self, prior: &Self) {
        inherit_sensitive(self, prior);
        restore_field(self, prior, |r| &r.request_headers, |r| &mut r.request_headers);
    }
}

pub fn monitor_policy() -> ResourcePolicy<Monitor> {
    ResourcePolicy::new()
        .rule("data_region", FieldRule::Immutable)
        .rule("data_region", FieldRule::ServerDerived)
        .rule("auth_password", FieldRule::WriteOnly)
        .rule("transformation", FieldRule::Script)
        .rule("maintenance_from", FieldRule::NoRemoval)
}

pub fn header_schema() -> Arc<TreeSchema> {
    Arc::new(
        TreeSchema::new()
            .attr("id", AttrKind::String)
            .attr("name", AttrKind::String)
            .attr("value", AttrKind::String)
            .attr("_destroy", AttrKind::Bool),
    )
}

pub fn monitor_schema() -> Arc<TreeSchema> {
    Arc::new(
        TreeSchema::new()
            .attr("url", AttrKind::String)
            .attr("pronounceable_name", AttrKind::String)
            .attr("paused", AttrKind::Bool)
            .attr("check_frequency", AttrKind::Int)
            .attr("regions", AttrKind::List(Box::new(AttrKind::String)))
            .attr("data_region", AttrKind::String)
            .attr("auth_password", AttrKind::String)
            .attr("transformation", AttrKind::String)
            .attr("maintenance_from", AttrKind::String)
            .attr("request_headers", AttrKind::Blocks(header_schema())),
    )
}

/// A schema-checked tree describing a monitor as configured by a user.
pub fn monitor_tree() -> Tree {
    let mut tree = Tree::with_schema(monitor_schema());
    tree.set("url", "https://example.com/health").unwrap();
    tree.set("pronounceable_name", "Example health").unwrap();
    tree.set("check_frequency", 30_i64).unwrap();
    tree.set("data_region", "eu-hel-1").unwrap();
    tree.set("auth_password", "hunter2").unwrap();
    tree
}

pub fn mock_config(server: &MockServer) -> TransportConfig {
    TransportConfig {
        token: "test_token".to_string(),
        base_url: server.uri(),
        retry: RetryConfig {
            max_attempts: 2,
            min_wait_ms: 10,
            max_wait_ms: 50,
        },
        timeout_secs: 10,
        ..Default::default()
    }
}

/// Installs a test-writer subscriber once; `RUST_LOG` controls output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
