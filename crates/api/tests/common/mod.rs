#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use fleet_api::config::{EngineConfig, ExecutorKind, ServerConfig};
use fleet_api::routes;
use fleet_api::state::AppState;
use fleet_core::execution::{
    OutputSink, RemoteTarget, RunError, RunOutcome, ScriptRunner, ScriptSource,
};
use fleet_core::probe::{HostProber, ProbeError};

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

/// What a [`FakeRunner`] does for a host.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Print a transcript and exit 0.
    Succeed,
    /// Print to stderr and exit with the given status.
    Exit(i32),
    /// Fail to connect.
    Refuse,
    /// Never complete.
    Hang,
}

/// Scripted [`ScriptRunner`] keyed by hostname.
pub struct FakeRunner {
    default: Behavior,
    by_host: HashMap<String, Behavior>,
    delay: Duration,
}

impl FakeRunner {
    pub fn new(default: Behavior) -> Self {
        Self {
            default,
            by_host: HashMap::new(),
            delay: Duration::from_millis(20),
        }
    }

    pub fn with_host(mut self, hostname: &str, behavior: Behavior) -> Self {
        self.by_host.insert(hostname.to_string(), behavior);
        self
    }
}

#[async_trait]
impl ScriptRunner for FakeRunner {
    async fn run(
        &self,
        target: &RemoteTarget,
        script: &ScriptSource,
        output: OutputSink,
    ) -> Result<RunOutcome, RunError> {
        let behavior = self
            .by_host
            .get(&target.hostname)
            .unwrap_or(&self.default)
            .clone();

        let _ = output.send(format!("Connected to {}\n", target.hostname));
        tokio::time::sleep(self.delay).await;

        match behavior {
            Behavior::Succeed => {
                let _ = output.send(format!("Executing: {}\n", script.name));
                let _ = output.send("Exit status: 0\n".to_string());
                Ok(RunOutcome { exit_code: 0 })
            }
            Behavior::Exit(code) => {
                let _ = output.send("[ERR] boom\n".to_string());
                let _ = output.send(format!("Exit status: {code}\n"));
                Ok(RunOutcome { exit_code: code })
            }
            Behavior::Refuse => Err(RunError::Connection("connection refused".to_string())),
            Behavior::Hang => std::future::pending().await,
        }
    }
}

/// [`HostProber`] keyed by hostname; hosts not listed are reachable.
#[derive(Default)]
pub struct FakeProber {
    unreachable: HashSet<String>,
    failing: HashSet<String>,
    hanging: HashSet<String>,
}

impl FakeProber {
    pub fn unreachable(mut self, hostname: &str) -> Self {
        self.unreachable.insert(hostname.to_string());
        self
    }

    pub fn failing(mut self, hostname: &str) -> Self {
        self.failing.insert(hostname.to_string());
        self
    }

    pub fn hanging(mut self, hostname: &str) -> Self {
        self.hanging.insert(hostname.to_string());
        self
    }
}

#[async_trait]
impl HostProber for FakeProber {
    async fn probe(&self, target: &RemoteTarget) -> Result<bool, ProbeError> {
        if self.hanging.contains(&target.hostname) {
            std::future::pending::<()>().await;
        }
        if self.failing.contains(&target.hostname) {
            return Err(ProbeError::Io(std::io::Error::other("probe exploded")));
        }
        Ok(!self.unreachable.contains(&target.hostname))
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// Engine settings scaled down for tests.
pub fn test_engine_config() -> EngineConfig {
    EngineConfig {
        executor: ExecutorKind::Mock,
        execution_timeout: Duration::from_secs(5),
        probe_timeout: Duration::from_millis(200),
        ssh_connect_timeout: Duration::from_secs(1),
        max_concurrent_executions: 16,
        max_concurrent_probes: 16,
    }
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(engine: EngineConfig) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        engine,
    }
}

/// Build application state around a fresh store and the given doubles.
pub fn test_state(engine: EngineConfig, runner: FakeRunner, prober: FakeProber) -> AppState {
    AppState::new(
        fleet_db::create_pool(),
        test_config(engine),
        Arc::new(runner),
        Arc::new(prober),
    )
}

/// Build the full application router with all middleware layers.
///
/// This mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack (CORS, request ID, timeout, tracing,
/// panic recovery) that production uses.
pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}

/// Router whose runner always succeeds and whose prober reports every host
/// reachable.
pub fn build_test_app() -> Router {
    build_app(test_state(
        test_engine_config(),
        FakeRunner::new(Behavior::Succeed),
        FakeProber::default(),
    ))
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    app.oneshot(
        Request::post(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn put_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    app.oneshot(
        Request::put(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn post_empty(app: Router, uri: &str) -> Response {
    app.oneshot(Request::post(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn delete(app: Router, uri: &str) -> Response {
    app.oneshot(Request::delete(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Source of unique test addresses.
static NEXT_ADDRESS: AtomicU32 = AtomicU32::new(1);

/// Register a server with a fresh address and return its id.
pub async fn create_server(app: &Router, hostname: &str) -> i64 {
    let n = NEXT_ADDRESS.fetch_add(1, Ordering::Relaxed);
    let response = post_json(
        app.clone(),
        "/api/v1/servers",
        serde_json::json!({
            "hostname": hostname,
            "ip_address": format!("10.0.{}.{}", n / 250, n % 250 + 1),
            "username": "deploy",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED, "create server {hostname}");
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

pub async fn create_script(app: &Router, name: &str) -> i64 {
    let response = post_json(
        app.clone(),
        "/api/v1/scripts",
        serde_json::json!({ "name": name, "content": "uptime\n" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED, "create script {name}");
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

/// Create a group containing `server_ids`.
pub async fn create_group(app: &Router, name: &str, server_ids: &[i64]) -> i64 {
    let response = post_json(
        app.clone(),
        "/api/v1/groups",
        serde_json::json!({ "name": name }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED, "create group {name}");
    let group_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    for server_id in server_ids {
        let response = post_empty(
            app.clone(),
            &format!("/api/v1/groups/{group_id}/servers/{server_id}"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    group_id
}

// ---------------------------------------------------------------------------
// Polling
// ---------------------------------------------------------------------------

/// Poll `GET /api/v1/tasks/{id}` until its status is one of `statuses`.
pub async fn wait_for_status(app: &Router, task_id: i64, statuses: &[&str]) -> serde_json::Value {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let json = body_json(get(app.clone(), &format!("/api/v1/tasks/{task_id}")).await).await;
        let task = json["data"].clone();
        if statuses.iter().any(|s| task["status"] == *s) {
            return task;
        }
        assert!(
            Instant::now() < deadline,
            "task {task_id} never reached {statuses:?}, last seen: {task}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Poll until the task is terminal.
pub async fn wait_for_terminal(app: &Router, task_id: i64) -> serde_json::Value {
    wait_for_status(app, task_id, &["succeeded", "failed", "cancelled"]).await
}
