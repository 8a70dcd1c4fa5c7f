use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use reqwest::StatusCode;
use serde_json::{Value, json};

use conduit_api::app;
use conduit_api::{HttpAuthnClient, HttpThingsClient};
use conduit_authn::{AuthnClient, AuthnService, HmacTokenizer, InMemoryKeyRepository, KeyPolicy, KeyType};
use conduit_core::{Error, UuidIdProvider};
use conduit_http::AdapterService;
use conduit_messaging::{InMemoryBus, Subscriber};
use conduit_things::{InMemoryRegistry, ThingsClient, ThingsService};

const RPC_TIMEOUT: Duration = Duration::from_secs(2);

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(app: Router) -> Self {
        // Same routers as prod, bound to an ephemeral port.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Identity service, registry and HTTP adapter wired to each other over HTTP.
/// Identity and registry each get a public and an internal RPC listener.
struct Stack {
    authn: TestServer,
    authn_rpc: TestServer,
    things: TestServer,
    things_rpc: TestServer,
    adapter: TestServer,
    bus: Arc<InMemoryBus>,
    client: reqwest::Client,
}

async fn stack() -> Stack {
    let authn_svc = AuthnService::new(
        Arc::new(InMemoryKeyRepository::new()),
        Arc::new(UuidIdProvider::new()),
        Arc::new(HmacTokenizer::new(b"black-box".to_vec())),
        KeyPolicy::default(),
    );
    let authn_svc = Arc::new(authn_svc);
    let authn = TestServer::spawn(app::authn_app(authn_svc.clone())).await;
    let authn_rpc = TestServer::spawn(app::authn_rpc_app(authn_svc)).await;

    let registry = Arc::new(InMemoryRegistry::new());
    let things_svc = ThingsService::new(
        Arc::new(HttpAuthnClient::new(&authn_rpc.base_url, RPC_TIMEOUT).unwrap()),
        registry.clone(),
        registry,
        Arc::new(UuidIdProvider::new()),
    );
    let things_svc = Arc::new(things_svc);
    let things = TestServer::spawn(app::things_app(things_svc.clone())).await;
    let things_rpc = TestServer::spawn(app::things_rpc_app(things_svc)).await;

    let bus = Arc::new(InMemoryBus::new());
    let adapter_svc = AdapterService::new(
        bus.clone(),
        Arc::new(HttpThingsClient::new(&things_rpc.base_url, RPC_TIMEOUT).unwrap()),
    );
    let adapter = TestServer::spawn(app::adapter_app(Arc::new(adapter_svc))).await;

    Stack {
        authn,
        authn_rpc,
        things,
        things_rpc,
        adapter,
        bus,
        client: reqwest::Client::new(),
    }
}

impl Stack {
    /// User key token, as the login flow would obtain it.
    async fn login(&self, email: &str) -> String {
        HttpAuthnClient::new(&self.authn_rpc.base_url, RPC_TIMEOUT)
            .unwrap()
            .issue(email, KeyType::User)
            .await
            .unwrap()
    }

    async fn create_thing(&self, token: &str, name: &str, key: &str) -> String {
        let res = self
            .client
            .post(self.things.url("/things"))
            .bearer_auth(token)
            .json(&json!([{ "name": name, "key": key }]))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = res.json().await.unwrap();
        body["things"][0]["id"].as_str().unwrap().to_string()
    }

    async fn create_project(&self, token: &str, name: &str) -> String {
        let res = self
            .client
            .post(self.things.url("/projects"))
            .bearer_auth(token)
            .json(&json!([{ "name": name }]))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = res.json().await.unwrap();
        body["projects"][0]["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn every_service_reports_health_and_version() {
    let s = stack().await;

    for (srv, name) in [
        (&s.authn, "conduit-authn"),
        (&s.things, "conduit-things"),
        (&s.adapter, "conduit-http"),
    ] {
        let res = s.client.get(srv.url("/health")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body: Value = s.client.get(srv.url("/version")).send().await.unwrap().json().await.unwrap();
        assert_eq!(body["service"], name);
        assert!(body["version"].as_str().is_some());
    }
}

#[tokio::test]
async fn api_key_lifecycle_issue_retrieve_revoke() {
    let s = stack().await;
    let token = s.login("alice@example.com").await;
    let authn = HttpAuthnClient::new(&s.authn_rpc.base_url, RPC_TIMEOUT).unwrap();

    // No credential at all.
    let res = s
        .client
        .post(s.authn.url("/keys"))
        .json(&json!({ "type": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // User keys are not issued on the public route.
    let res = s
        .client
        .post(s.authn.url("/keys"))
        .bearer_auth(&token)
        .json(&json!({ "type": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = s
        .client
        .post(s.authn.url("/keys"))
        .bearer_auth(&token)
        .json(&json!({ "type": 2, "duration": 3600 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let key: Value = res.json().await.unwrap();
    let id = key["id"].as_str().unwrap().to_string();
    let secret = key["secret"].as_str().unwrap().to_string();
    assert_eq!(key["issuer"], "alice@example.com");

    assert_eq!(authn.identify(&secret).await.unwrap(), "alice@example.com");

    let res = s
        .client
        .get(s.authn.url(&format!("/keys/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let fetched: Value = res.json().await.unwrap();
    assert_eq!(fetched["id"], id.as_str());
    assert!(fetched.get("secret").is_none());

    // Another user cannot see it.
    let bob = s.login("bob@example.com").await;
    let res = s
        .client
        .get(s.authn.url(&format!("/keys/{id}")))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = s
        .client
        .delete(s.authn.url(&format!("/keys/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    assert_eq!(authn.identify(&secret).await, Err(Error::Unauthorized));
}

#[tokio::test]
async fn registry_resources_are_scoped_to_their_owner() {
    let s = stack().await;
    let alice = s.login("alice@example.com").await;
    let bob = s.login("bob@example.com").await;

    let sensor = s.create_thing(&alice, "temp-sensor", "").await;
    s.create_thing(&alice, "door", "").await;

    let res = s
        .client
        .get(s.things.url("/things?name=TEMP&limit=5"))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let page: Value = res.json().await.unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["limit"], 5);
    assert_eq!(page["items"][0]["id"], sensor.as_str());
    assert!(!page["items"][0]["key"].as_str().unwrap().is_empty());

    let res = s
        .client
        .get(s.things.url("/things?limit=500"))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = s
        .client
        .get(s.things.url(&format!("/things/{sensor}")))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = s
        .client
        .put(s.things.url(&format!("/things/{sensor}")))
        .bearer_auth(&alice)
        .json(&json!({ "name": "lab-sensor", "metadata": { "room": "lab" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = s
        .client
        .get(s.things.url("/things?metadata=%7B%22room%22%3A%22lab%22%7D"))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    let page: Value = res.json().await.unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["name"], "lab-sensor");

    let res = s
        .client
        .delete(s.things.url(&format!("/things/{sensor}")))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = s
        .client
        .get(s.things.url(&format!("/things/{sensor}")))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Forged token.
    let res = s
        .client
        .get(s.things.url("/things"))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn connect_is_all_or_nothing() {
    let s = stack().await;
    let alice = s.login("alice@example.com").await;

    let thing = s.create_thing(&alice, "t", "").await;
    let p1 = s.create_project(&alice, "p1").await;
    let p2 = s.create_project(&alice, "p2").await;

    let res = s
        .client
        .post(s.things.url("/connect"))
        .bearer_auth(&alice)
        .json(&json!({ "project_ids": [p1, "missing"], "thing_ids": [thing] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = s
        .client
        .get(s.things.url(&format!("/things/{thing}/projects")))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    let page: Value = res.json().await.unwrap();
    assert_eq!(page["total"], 0);

    let res = s
        .client
        .post(s.things.url("/connect"))
        .bearer_auth(&alice)
        .json(&json!({ "project_ids": [p1, p2], "thing_ids": [thing] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = s
        .client
        .put(s.things.url(&format!("/projects/{p1}/things/{thing}")))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = s
        .client
        .get(s.things.url(&format!("/projects/{p2}/things")))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    let page: Value = res.json().await.unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["id"], thing.as_str());
}

#[tokio::test]
async fn messages_flow_only_over_connections() {
    let s = stack().await;
    let alice = s.login("alice@example.com").await;
    let sub = s.bus.subscribe("projects.>");

    let thing = s.create_thing(&alice, "sensor", "sensor-key").await;
    let project = s.create_project(&alice, "home").await;

    let send = |path: String, key: Option<&'static str>| {
        let mut req = s.client.post(s.adapter.url(&path)).body("23.5");
        if let Some(key) = key {
            req = req.header("Authorization", key);
        }
        req.send()
    };

    // Not connected yet.
    let res = send(format!("/projects/{project}/messages"), Some("sensor-key")).await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = s
        .client
        .put(s.things.url(&format!("/projects/{project}/things/{thing}")))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = send(format!("/projects/{project}/messages/room/1"), Some("sensor-key"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::ACCEPTED);

    let msg = sub.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(msg.protocol, "http");
    assert_eq!(msg.project, project);
    assert_eq!(msg.subtopic, "room.1");
    assert_eq!(msg.publisher, thing);
    assert_eq!(msg.payload, b"23.5");

    let res = send(format!("/projects/{project}/messages/a*b"), Some("sensor-key"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = send(format!("/projects/{project}/messages"), None).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = send(format!("/projects/{project}/messages"), Some("wrong-key")).await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    assert!(sub.try_recv().is_err());
}

#[tokio::test]
async fn access_checks_over_rpc() {
    let s = stack().await;
    let alice = s.login("alice@example.com").await;
    let registry = HttpThingsClient::new(&s.things_rpc.base_url, RPC_TIMEOUT).unwrap();

    let thing = s.create_thing(&alice, "sensor", "k-1").await;
    let project = s.create_project(&alice, "home").await;

    assert_eq!(registry.identify("k-1").await.unwrap(), thing);
    assert_eq!(registry.identify("k-2").await, Err(Error::Unauthorized));
    assert_eq!(
        registry.can_access_by_id(&project, &thing).await,
        Err(Error::Unauthorized)
    );

    let res = s
        .client
        .put(s.things.url(&format!("/projects/{project}/things/{thing}")))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    registry.can_access_by_id(&project, &thing).await.unwrap();
    assert_eq!(registry.can_access_by_key(&project, "k-1").await.unwrap(), thing);
}

#[tokio::test]
async fn unreachable_registry_is_unavailable_not_forbidden() {
    // Grab a free port and close it again.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let svc = AdapterService::new(
        Arc::new(InMemoryBus::new()),
        Arc::new(HttpThingsClient::new(&dead, Duration::from_millis(500)).unwrap()),
    );
    let adapter = TestServer::spawn(app::adapter_app(Arc::new(svc))).await;

    let res = reqwest::Client::new()
        .post(adapter.url("/projects/p1/messages"))
        .header("Authorization", "some-key")
        .body("1")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "rpc_failure");
}

#[tokio::test]
async fn internal_rpc_is_not_served_on_public_listeners() {
    let s = stack().await;
    let issue = json!({ "issuer": "victim@example.com", "type": 0 });

    let res = s
        .client
        .post(s.authn.url("/rpc/issue"))
        .json(&issue)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    for path in ["/rpc/identify", "/rpc/access/key", "/rpc/access/id"] {
        let res = s
            .client
            .post(s.things.url(path))
            .json(&json!({ "project_id": "p1", "key": "k", "thing_id": "t", "token": "x" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "{path}");
    }
    let res = s
        .client
        .post(s.authn.url("/rpc/identify"))
        .json(&json!({ "token": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // The internal listener still serves trusted callers.
    let res = s
        .client
        .post(s.authn_rpc.url("/rpc/issue"))
        .json(&issue)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // And public routes are absent from it.
    let res = s
        .client
        .get(s.things_rpc.url("/things"))
        .bearer_auth("anything")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
