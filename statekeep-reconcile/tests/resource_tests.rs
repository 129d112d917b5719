use pretty_assertions::assert_eq;
use serde_json::json;
use statekeep_model::{Bindings, FieldBinding, Record};
use statekeep_reconcile::{
    LifecycleState, ReadOutcome, ResourceDriver, ResourceEndpoint, ResourceError,
    ResourceInstance, ResourcePolicy, ValidationError,
};
use statekeep_transport::{
    ApiResponse, HttpTransport, Method, RequestContext, StatusCode, Transport, TransportError,
    TransportResult, PRIMARY_BASE,
};
use statekeep_types::{Tree, Value};
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;

use common::{init_tracing, mock_config, monitor_policy, monitor_tree, Monitor};

fn monitor_driver(server: &MockServer) -> ResourceDriver<Monitor, HttpTransport> {
    init_tracing();
    ResourceDriver::new(
        HttpTransport::new(mock_config(server)).unwrap(),
        ResourceEndpoint::new("monitor", PRIMARY_BASE, "/api/v2/monitors"),
        monitor_policy(),
    )
}

fn ctx() -> RequestContext {
    RequestContext::background()
}

fn monitor_body(id: &str, attributes: serde_json::Value) -> serde_json::Value {
    json!({"data": {"id": id, "type": "monitor", "attributes": attributes}})
}

/// A created monitor as stored after a successful create.
fn stored_monitor() -> Tree {
    let mut tree = monitor_tree();
    tree.set_id(Some("123"));
    tree.set(
        "request_headers",
        vec![
            Value::from(
                Tree::new()
                    .with("id", "1")
                    .with("name", "X-A")
                    .with("value", "a"),
            ),
            Value::from(
                Tree::new()
                    .with("id", "2")
                    .with("name", "X-B")
                    .with("value", "b"),
            ),
        ],
    )
    .unwrap();
    tree
}

// ── Create ────────────────────────────────────────────────────────

#[tokio::test]
async fn create_stores_identity_and_server_view() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/monitors"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({
            "url": "https://example.com/health",
            "check_frequency": 30,
            "data_region": "eu-hel-1",
            "auth_password": "hunter2"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(monitor_body(
            "123",
            json!({
                "url": "https://example.com/health",
                "pronounceable_name": "Example health",
                "check_frequency": 30,
                "paused": false,
                "data_region": "eu-helsinki",
                "regions": ["us", "eu"]
            }),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let driver = monitor_driver(&server);
    let mut instance = ResourceInstance::new(monitor_tree());
    assert_eq!(instance.state(), LifecycleState::Absent);

    driver.create(&ctx(), &mut instance).await.unwrap();

    assert_eq!(instance.state(), LifecycleState::Present);
    assert_eq!(instance.id(), Some("123"));
    let tree = instance.tree();
    assert_eq!(tree.get("paused").as_bool(), Some(false));
    assert_eq!(
        tree.get("regions"),
        &Value::from(vec![Value::from("us"), Value::from("eu")])
    );
    // Configured rendering wins over the server's, secrets survive.
    assert_eq!(tree.get("data_region").as_str(), Some("eu-hel-1"));
    assert_eq!(tree.get("auth_password").as_str(), Some("hunter2"));
}

#[tokio::test]
async fn create_failure_leaves_identity_unset() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/monitors"))
        .respond_with(
            ResponseTemplate::new(422).set_body_string(r#"{"errors":"url is invalid"}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let driver = monitor_driver(&server);
    let mut instance = ResourceInstance::new(monitor_tree());
    let err = driver.create(&ctx(), &mut instance).await.unwrap_err();

    match err {
        ResourceError::Transport(TransportError::Status { status, body, .. }) => {
            assert_eq!(status.as_u16(), 422);
            assert!(body.contains("url is invalid"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
    assert_eq!(instance.id(), None);
    assert_eq!(instance.state(), LifecycleState::Absent);
}

#[tokio::test]
async fn create_with_malformed_response_leaves_identity_unset() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/monitors"))
        .respond_with(ResponseTemplate::new(201).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let driver = monitor_driver(&server);
    let mut instance = ResourceInstance::new(monitor_tree());
    let err = driver.create(&ctx(), &mut instance).await.unwrap_err();

    assert!(matches!(
        err,
        ResourceError::Transport(TransportError::Decode { .. })
    ));
    assert_eq!(instance.id(), None);
}

#[tokio::test]
async fn create_with_unwritable_attribute_keeps_identity() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/monitors"))
        .respond_with(ResponseTemplate::new(201).set_body_json(monitor_body(
            "123",
            json!({"url": "https://example.com/health", "check_frequency": "thirty"}),
        )))
        .mount(&server)
        .await;

    let driver = monitor_driver(&server);
    let mut instance = ResourceInstance::new(monitor_tree());
    let err = driver.create(&ctx(), &mut instance).await.unwrap_err();

    // "thirty" cannot even be decoded into the record.
    assert!(matches!(err, ResourceError::Sync { .. }));
    assert_eq!(instance.id(), None);

    // A decodable value the tree schema refuses is a partial write instead.
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/monitors"))
        .respond_with(ResponseTemplate::new(201).set_body_json(monitor_body(
            "124",
            json!({"url": "https://example.com/health", "regions": [1, 2]}),
        )))
        .mount(&server)
        .await;
    let driver = ResourceDriver::new(
        HttpTransport::new(mock_config(&server)).unwrap(),
        ResourceEndpoint::new("monitor", PRIMARY_BASE, "/api/v2/monitors"),
        ResourcePolicy::<Loose>::new(),
    );
    let mut instance = ResourceInstance::new(monitor_tree());
    let err = driver.create(&ctx(), &mut instance).await.unwrap_err();

    let failed: Vec<&str> = err
        .partial_write()
        .expect("partial write")
        .iter()
        .map(|e| e.key())
        .collect();
    assert_eq!(failed, vec!["regions"]);
    assert_eq!(instance.id(), Some("124"));
    assert_eq!(instance.state(), LifecycleState::Present);
}

/// A record whose `regions` are numbers, which the monitor schema refuses.
#[derive(Debug, Clone, Default)]
struct Loose {
    url: Option<String>,
    regions: Option<Vec<i64>>,
}

impl Record for Loose {
    fn bindings() -> Vec<FieldBinding<Self>> {
        Bindings::<Self>::new()
            .field("url", |r| &r.url, |r| &mut r.url)
            .field("regions", |r| &r.regions, |r| &mut r.regions)
            .build()
    }
}

#[tokio::test]
async fn create_twice_is_rejected_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let driver = monitor_driver(&server);
    let mut instance = ResourceInstance::new(stored_monitor());
    let err = driver.create(&ctx(), &mut instance).await.unwrap_err();

    assert!(matches!(
        err,
        ResourceError::InvalidState {
            operation: "create",
            state: LifecycleState::Present,
            ..
        }
    ));
    assert_eq!(instance.id(), Some("123"));
}

#[tokio::test]
async fn cancelled_create_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let driver = monitor_driver(&server);
    let (ctx, cancel) = RequestContext::cancellable();
    cancel.cancel();
    let mut instance = ResourceInstance::new(monitor_tree());
    let err = driver.create(&ctx, &mut instance).await.unwrap_err();

    assert!(matches!(err, ResourceError::Transport(TransportError::Cancelled)));
    assert_eq!(instance.state(), LifecycleState::Absent);
}

// ── Read ──────────────────────────────────────────────────────────

#[tokio::test]
async fn read_refreshes_tree_and_keeps_secrets() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/monitors/123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(monitor_body(
            "123",
            json!({
                "url": "https://example.com/health",
                "paused": true,
                "check_frequency": 60,
                "request_headers": [
                    {"id": 1, "name": "X-A"},
                    {"id": 2, "name": "X-B-renamed"}
                ]
            }),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let driver = monitor_driver(&server);
    let mut instance = ResourceInstance::new(stored_monitor());
    let outcome = driver.read(&ctx(), &mut instance).await.unwrap();

    assert_eq!(outcome, ReadOutcome::Present);
    assert_eq!(instance.state(), LifecycleState::Present);
    let tree = instance.tree();
    assert_eq!(tree.get("paused").as_bool(), Some(true));
    assert_eq!(tree.get("check_frequency").as_i64(), Some(60));
    assert_eq!(tree.get("auth_password").as_str(), Some("hunter2"));
    assert_eq!(
        tree.get("request_headers").to_json(),
        Some(json!([
            {"id": "1", "name": "X-A", "value": "a"},
            {"id": "2", "name": "X-B-renamed", "value": "b"}
        ]))
    );
}

#[tokio::test]
async fn read_of_deleted_resource_clears_identity() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/monitors/123"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .expect(1)
        .mount(&server)
        .await;

    let driver = monitor_driver(&server);
    let mut instance = ResourceInstance::new(stored_monitor());
    let outcome = driver.read(&ctx(), &mut instance).await.unwrap();

    assert_eq!(outcome, ReadOutcome::Gone);
    assert_eq!(instance.id(), None);
    assert_eq!(instance.state(), LifecycleState::Absent);
}

#[tokio::test]
async fn read_server_error_keeps_identity() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/monitors/123"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let driver = monitor_driver(&server);
    let mut instance = ResourceInstance::new(stored_monitor());
    let err = driver.read(&ctx(), &mut instance).await.unwrap_err();

    assert!(matches!(
        err,
        ResourceError::Transport(TransportError::Status { .. })
    ));
    assert_eq!(instance.id(), Some("123"));
    assert_eq!(instance.state(), LifecycleState::Present);
}

#[tokio::test]
async fn read_without_identity_is_rejected() {
    let server = MockServer::start().await;
    let driver = monitor_driver(&server);
    let mut instance = ResourceInstance::new(monitor_tree());
    let err = driver.read(&ctx(), &mut instance).await.unwrap_err();
    assert!(matches!(err, ResourceError::MissingId { resource: "monitor" }));
}

// ── Update ────────────────────────────────────────────────────────

#[tokio::test]
async fn immutable_change_is_rejected_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let driver = monitor_driver(&server);
    let prior = stored_monitor();
    let mut instance = ResourceInstance::new(prior.clone());
    instance.tree_mut().set("data_region", "us-east").unwrap();

    let err = driver.update(&ctx(), &mut instance, &prior).await.unwrap_err();
    match err {
        ResourceError::Validation(ValidationError::Immutable { field, from, to }) => {
            assert_eq!(field, "data_region");
            assert_eq!(from, "\"eu-hel-1\"");
            assert_eq!(to, "\"us-east\"");
        }
        other => panic!("expected immutability error, got {other:?}"),
    }
    assert_eq!(instance.state(), LifecycleState::Present);
}

#[tokio::test]
async fn update_sends_collection_delta_and_restores_secrets() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/v2/monitors/123"))
        .and(body_json(json!({
            "url": "https://example.com/health",
            "pronounceable_name": "Example health",
            "check_frequency": 30,
            "data_region": "eu-hel-1",
            "auth_password": "hunter2",
            "request_headers": [
                {"id": "1", "name": "X-A2", "value": "a"},
                {"id": "2", "_destroy": true}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(monitor_body(
            "123",
            json!({
                "url": "https://example.com/health",
                "check_frequency": 30,
                "request_headers": [{"id": "1", "name": "X-A2"}]
            }),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let driver = monitor_driver(&server);
    let prior = stored_monitor();
    let mut instance = ResourceInstance::new(prior.clone());
    instance
        .tree_mut()
        .set(
            "request_headers",
            vec![Value::from(Tree::new().with("name", "X-A2"))],
        )
        .unwrap();

    driver.update(&ctx(), &mut instance, &prior).await.unwrap();

    assert_eq!(instance.state(), LifecycleState::Present);
    assert_eq!(
        instance.tree().get("request_headers").to_json(),
        Some(json!([{"id": "1", "name": "X-A2", "value": "a"}]))
    );
}

#[tokio::test]
async fn update_failure_returns_to_present() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/v2/monitors/123"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad frequency"))
        .expect(1)
        .mount(&server)
        .await;

    let driver = monitor_driver(&server);
    let prior = stored_monitor();
    let mut instance = ResourceInstance::new(prior.clone());
    instance.tree_mut().set("check_frequency", 1_i64).unwrap();

    let err = driver.update(&ctx(), &mut instance, &prior).await.unwrap_err();
    assert!(err.to_string().contains("bad frequency"), "{err}");
    assert_eq!(instance.state(), LifecycleState::Present);
    assert_eq!(instance.id(), Some("123"));
}

// ── Delete ────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_clears_identity() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v2/monitors/123"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let driver = monitor_driver(&server);
    let mut instance = ResourceInstance::new(stored_monitor());
    driver.delete(&ctx(), &mut instance).await.unwrap();

    assert_eq!(instance.id(), None);
    assert_eq!(instance.state(), LifecycleState::Absent);
}

#[tokio::test]
async fn delete_of_missing_resource_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v2/monitors/123"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let driver = monitor_driver(&server);
    let mut instance = ResourceInstance::new(stored_monitor());
    driver.delete(&ctx(), &mut instance).await.unwrap();
    assert_eq!(instance.state(), LifecycleState::Absent);
}

#[tokio::test]
async fn delete_failure_keeps_identity() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v2/monitors/123"))
        .respond_with(ResponseTemplate::new(409).set_body_string("in use"))
        .expect(1)
        .mount(&server)
        .await;

    let driver = monitor_driver(&server);
    let mut instance = ResourceInstance::new(stored_monitor());
    assert!(driver.delete(&ctx(), &mut instance).await.is_err());
    assert_eq!(instance.id(), Some("123"));
    assert_eq!(instance.state(), LifecycleState::Present);
}

// ── Lookup ────────────────────────────────────────────────────────

async fn mount_monitor_pages(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v2/monitors"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "234", "attributes": {"pronounceable_name": "Duplicate A", "url": "https://a.example"}},
                {"id": "100", "attributes": {"pronounceable_name": "Other", "url": "https://o.example"}}
            ],
            "pagination": {"next": format!("{}/api/v2/monitors?page=2", server.uri())}
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/monitors"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": 345, "attributes": {"pronounceable_name": "Duplicate A", "url": "https://b.example"}}
            ],
            "pagination": {"next": null}
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn lookup_stops_at_first_match() {
    let server = MockServer::start().await;
    mount_monitor_pages(&server).await;

    let driver = monitor_driver(&server);
    let found = driver
        .lookup(&ctx(), &Tree::new(), |m| {
            m.attributes.pronounceable_name.as_deref() == Some("Other")
        })
        .await
        .unwrap()
        .expect("match");
    assert_eq!(found.id, "100");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn unique_lookup_reports_duplicates() {
    let server = MockServer::start().await;
    mount_monitor_pages(&server).await;

    let driver = monitor_driver(&server);
    let err = driver
        .lookup_unique(&ctx(), &Tree::new(), "Duplicate A", |m| {
            m.attributes.pronounceable_name.as_deref() == Some("Duplicate A")
        })
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "monitor lookup failed: multiple matches for \"Duplicate A\", \
         use identity lookup instead: 234, 345"
    );
}

#[tokio::test]
async fn unique_lookup_adopts_single_match() {
    let server = MockServer::start().await;
    mount_monitor_pages(&server).await;

    let driver = monitor_driver(&server);
    let found = driver
        .lookup_unique(&ctx(), &Tree::new(), "https://o.example", |m| {
            m.attributes.url.as_deref() == Some("https://o.example")
        })
        .await
        .unwrap()
        .expect("match");

    let mut tree = Tree::new();
    driver.adopt(&mut tree, found).unwrap();
    assert_eq!(tree.id(), Some("100"));
    assert_eq!(tree.get("pronounceable_name").as_str(), Some("Other"));
}

// ── Nested resources ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
struct StatusPageResource {
    status_page_id: Option<i64>,
    public_name: Option<String>,
}

impl Record for StatusPageResource {
    fn bindings() -> Vec<FieldBinding<Self>> {
        Bindings::<Self>::new()
            .field("status_page_id", |r| &r.status_page_id, |r| &mut r.status_page_id)
            .field("public_name", |r| &r.public_name, |r| &mut r.public_name)
            .build()
    }
}

fn status_page_resource_driver(
    server: &MockServer,
) -> ResourceDriver<StatusPageResource, HttpTransport> {
    ResourceDriver::new(
        HttpTransport::new(mock_config(server)).unwrap(),
        ResourceEndpoint::nested(
            "status page resource",
            PRIMARY_BASE,
            "/api/v2/status-pages/{parent}/resources",
            "status_page_id",
        ),
        ResourcePolicy::new(),
    )
}

#[tokio::test]
async fn nested_create_uses_composite_identity() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/status-pages/9/resources"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": {"id": "44", "attributes": {"status_page_id": 9, "public_name": "API"}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let driver = status_page_resource_driver(&server);
    let mut instance = ResourceInstance::new(
        Tree::new()
            .with("status_page_id", 9_i64)
            .with("public_name", "API"),
    );
    driver.create(&ctx(), &mut instance).await.unwrap();
    assert_eq!(instance.id(), Some("9/44"));
}

#[tokio::test]
async fn nested_import_splits_composite_identity() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/status-pages/9/resources/44"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"id": "44", "attributes": {"status_page_id": 9, "public_name": "API"}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let driver = status_page_resource_driver(&server);
    let instance = driver.import(&ctx(), "9/44").await.unwrap();

    assert_eq!(instance.id(), Some("9/44"));
    assert_eq!(instance.tree().get("public_name").as_str(), Some("API"));
    assert_eq!(instance.tree().get("status_page_id").as_i64(), Some(9));
}

#[tokio::test]
async fn nested_import_rejects_malformed_identity() {
    let server = MockServer::start().await;
    let driver = status_page_resource_driver(&server);
    let err = driver.import(&ctx(), "44").await.unwrap_err();
    assert!(matches!(err, ResourceError::Identity(_)));
}

#[tokio::test]
async fn import_of_missing_resource_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/monitors/999"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let driver = monitor_driver(&server);
    let err = driver.import(&ctx(), "999").await.unwrap_err();
    assert_eq!(err.to_string(), "monitor \"999\" does not exist");
}

#[tokio::test]
async fn identities_are_escaped_in_request_paths() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/monitors/12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(monitor_body("12", json!({}))))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/monitors/12%23other"))
        .respond_with(ResponseTemplate::new(200).set_body_json(monitor_body(
            "12#other",
            json!({"url": "https://example.com/health", "paused": false}),
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v2/monitors/12%3Fforce%3Dtrue"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let driver = monitor_driver(&server);
    let instance = driver.import(&ctx(), "12#other").await.unwrap();
    assert_eq!(instance.id(), Some("12#other"));
    assert_eq!(
        instance.tree().get("url").as_str(),
        Some("https://example.com/health")
    );

    let mut doomed = ResourceInstance::new(stored_monitor());
    doomed.tree_mut().set_id(Some("12?force=true"));
    driver.delete(&ctx(), &mut doomed).await.unwrap();
    assert_eq!(doomed.id(), None);
}

#[test]
fn nested_paths_escape_both_segments() {
    let endpoint = ResourceEndpoint::nested(
        "status page resource",
        PRIMARY_BASE,
        "/api/v2/status-pages/{parent}/resources",
        "status_page_id",
    );
    assert_eq!(
        endpoint.item_path("page#1/4?4").unwrap(),
        "/api/v2/status-pages/page%231/resources/4%3F4"
    );
    assert_eq!(
        endpoint
            .collection_path(&Tree::new().with("status_page_id", "a b"))
            .unwrap(),
        "/api/v2/status-pages/a%20b/resources"
    );
}

#[tokio::test]
async fn nested_create_without_parent_is_rejected() {
    let server = MockServer::start().await;
    let driver = status_page_resource_driver(&server);
    let mut instance = ResourceInstance::new(Tree::new().with("public_name", "API"));
    let err = driver.create(&ctx(), &mut instance).await.unwrap_err();
    assert!(matches!(
        err,
        ResourceError::MissingParent {
            key: "status_page_id",
            ..
        }
    ));
    assert_eq!(instance.state(), LifecycleState::Absent);
}

// ── Custom transports ─────────────────────────────────────────────

/// Answers every request with one canned response.
struct CannedTransport {
    status: u16,
    body: serde_json::Value,
}

impl CannedTransport {
    fn new(status: u16, body: serde_json::Value) -> Self {
        Self { status, body }
    }
}

#[async_trait::async_trait]
impl Transport for CannedTransport {
    async fn send(
        &self,
        ctx: &RequestContext,
        method: Method,
        _base: &str,
        path: &str,
        _body: Option<serde_json::Value>,
    ) -> TransportResult<ApiResponse> {
        ctx.check()?;
        Ok(ApiResponse {
            method,
            path: path.to_string(),
            status: StatusCode::from_u16(self.status).unwrap(),
            body: serde_json::to_vec(&self.body).unwrap(),
        })
    }
}

#[tokio::test]
async fn driver_runs_over_any_transport() {
    let transport = CannedTransport::new(
        200,
        monitor_body("123", json!({"url": "https://example.com/health", "paused": true})),
    );
    let driver = ResourceDriver::new(
        transport,
        ResourceEndpoint::new("monitor", PRIMARY_BASE, "/api/v2/monitors"),
        monitor_policy(),
    );

    let mut instance = ResourceInstance::new(stored_monitor());
    assert_eq!(
        driver.read(&ctx(), &mut instance).await.unwrap(),
        ReadOutcome::Present
    );
    assert_eq!(instance.tree().get("paused").as_bool(), Some(true));
}

#[tokio::test]
async fn lookup_fetch_failure_surfaces_the_transport_error() {
    let transport = CannedTransport::new(500, json!({"errors": "boom"}));
    let driver = ResourceDriver::new(
        transport,
        ResourceEndpoint::new("monitor", PRIMARY_BASE, "/api/v2/monitors"),
        monitor_policy(),
    );

    let err = driver
        .lookup(&ctx(), &Tree::new(), |_| true)
        .await
        .unwrap_err();
    assert_eq!(
        err.transport().and_then(TransportError::status),
        Some(StatusCode::INTERNAL_SERVER_ERROR)
    );
}
