//! Reconciliation core for statekeep.
//!
//! Converges remote API resources toward a desired-state tree:
//! - [`synchronizer`]: load a typed record from a tree, copy one back
//! - [`collection`]: identity-preserving deltas for nested collections
//! - [`policy`]: immutable, write-only, server-derived, script and
//!   no-removal rules per attribute
//! - [`pagination`]: first-match and unique lookups over list endpoints
//! - [`ResourceDriver`]: create / read / update / delete over a
//!   [`statekeep_transport::Transport`]
//!
//! # Example
//!
//! ```no_run
//! use statekeep_model::{Bindings, FieldBinding, Record};
//! use statekeep_reconcile::{
//!     FieldRule, ResourceDriver, ResourceEndpoint, ResourceInstance, ResourcePolicy,
//! };
//! use statekeep_transport::{HttpTransport, RequestContext, TransportConfig, PRIMARY_BASE};
//! use statekeep_types::Tree;
//!
//! #[derive(Debug, Clone, Default)]
//! struct Heartbeat {
//!     name: Option<String>,
//!     period: Option<i64>,
//!     team_name: Option<String>,
//! }
//!
//! impl Record for Heartbeat {
//!     fn bindings() -> Vec<FieldBinding<Self>> {
//!         Bindings::<Self>::new()
//!             .field("name", |r| &r.name, |r| &mut r.name)
//!             .field("period", |r| &r.period, |r| &mut r.period)
//!             .field("team_name", |r| &r.team_name, |r| &mut r.team_name)
//!             .build()
//!     }
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = HttpTransport::new(TransportConfig {
//!     token: "secret".to_string(),
//!     base_url: "https://api.example.com".to_string(),
//!     ..Default::default()
//! })?;
//! let driver = ResourceDriver::new(
//!     transport,
//!     ResourceEndpoint::new("heartbeat", PRIMARY_BASE, "/api/v2/heartbeats"),
//!     ResourcePolicy::<Heartbeat>::new().rule("team_name", FieldRule::Immutable),
//! );
//!
//! let mut instance = ResourceInstance::new(Tree::new().with("name", "nightly").with("period", 3600_i64));
//! driver.create(&RequestContext::background(), &mut instance).await?;
//! println!("created {:?}", instance.id());
//! # Ok(())
//! # }
//! ```

pub mod collection;
mod error;
pub mod pagination;
pub mod policy;
mod resource;
pub mod synchronizer;

pub use error::{
    LookupError, ResourceError, ResourceResult, SyncError, SyncResult, ValidationError,
};
pub use pagination::{Page, MAX_PAGES};
pub use policy::{FieldRule, ResourcePolicy, Suppression};
pub use resource::{
    LifecycleState, ReadOutcome, ResourceDriver, ResourceEndpoint, ResourceInstance,
};
