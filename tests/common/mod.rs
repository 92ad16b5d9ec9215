//! Shared utilities for provisioning integration tests.

#![allow(dead_code)]

use axum::extract::{Path as UrlPath, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use base64::Engine;
use serde_json::{json, Value};
use std::future::Future;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use dashboard_provisioner::config::{ProvisionConfig, Secret};

pub const ADMIN_USER: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin-password";

/// A request as seen by the mock server.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub path: String,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct MockDatasource {
    pub id: i64,
    pub uid: String,
    pub name: String,
    pub body: Value,
}

#[derive(Debug, Default)]
pub struct MockState {
    pub service_accounts: Vec<(i64, String)>,
    /// (service account id, token name, key)
    pub tokens: Vec<(i64, String, String)>,
    pub datasources: Vec<MockDatasource>,
    pub dashboards: Vec<Value>,
    pub requests: Vec<RecordedRequest>,
    next_id: i64,

    /// Answer the account listing with the search envelope.
    pub search_listing: bool,
    /// Answer datasource updates with a flat `{uid}` body.
    pub flat_update_response: bool,
    /// Answer the account listing with a 500.
    pub fail_account_listing: bool,
    pub reject_account_create: bool,
    pub reject_token_mint: bool,
    /// Refuse every bearer token, as if it had been revoked.
    pub reject_bearer: bool,
    /// Status to answer the datasource by-name lookup with, instead of 200/404.
    pub datasource_lookup_status: Option<u16>,
    pub reject_datasource_writes: bool,
    pub reject_dashboard: bool,
}

impl MockState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn record(&mut self, method: &'static str, uri: &Uri, headers: &HeaderMap, body: Option<&Value>) {
        self.requests.push(RecordedRequest {
            method,
            path: uri.path().to_string(),
            authorization: headers
                .get("authorization")
                .and_then(|h| h.to_str().ok())
                .map(str::to_string),
            body: body.cloned(),
        });
    }

    fn is_admin(&self, headers: &HeaderMap) -> bool {
        let expected = format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", ADMIN_USER, ADMIN_PASSWORD))
        );
        headers.get("authorization").and_then(|h| h.to_str().ok()) == Some(expected.as_str())
    }

    fn is_bearer(&self, headers: &HeaderMap) -> bool {
        if self.reject_bearer {
            return false;
        }
        let Some(key) = headers
            .get("authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        else {
            return false;
        };
        self.tokens.iter().any(|(_, _, k)| k == key)
    }
}

type Shared = Arc<Mutex<MockState>>;

/// In-process stand-in for the dashboard server's management API.
pub struct MockGrafana {
    pub addr: SocketAddr,
    pub state: Shared,
}

impl MockGrafana {
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(MockState::default()));
        let app = Router::new()
            .route("/api/serviceaccounts", get(list_accounts).post(create_account))
            .route("/api/serviceaccounts/{id}/tokens", post(create_token))
            .route("/api/datasources", post(create_datasource))
            .route("/api/datasources/{id}", put(update_datasource))
            .route("/api/datasources/name/{name}", get(get_datasource))
            .route("/api/dashboards/db", post(install_dashboard))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn config(&self, template: &Path) -> ProvisionConfig {
        config_for(&self.url(), template)
    }

    pub fn update<F: FnOnce(&mut MockState)>(&self, f: F) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn seed_service_account(&self, name: &str) -> i64 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        state.service_accounts.push((id, name.to_string()));
        id
    }

    pub fn seed_datasource(&self, name: &str, uid: &str) -> i64 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        state.datasources.push(MockDatasource {
            id,
            uid: uid.to_string(),
            name: name.to_string(),
            body: json!({ "name": name, "type": "postgres", "url": "stale:5432" }),
        });
        id
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Number of requests with `method` whose path starts with `prefix`.
    pub fn count(&self, method: &str, prefix: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.path.starts_with(prefix))
            .count()
    }

    pub fn tokens(&self) -> Vec<(i64, String, String)> {
        self.state.lock().unwrap().tokens.clone()
    }

    pub fn datasources(&self) -> Vec<MockDatasource> {
        self.state.lock().unwrap().datasources.clone()
    }

    pub fn dashboards(&self) -> Vec<Value> {
        self.state.lock().unwrap().dashboards.clone()
    }
}

fn reply(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn unauthorized() -> Response {
    reply(StatusCode::UNAUTHORIZED, json!({ "message": "Unauthorized" }))
}

async fn list_accounts(State(state): State<Shared>, uri: Uri, headers: HeaderMap) -> Response {
    let mut state = state.lock().unwrap();
    state.record("GET", &uri, &headers, None);
    if !state.is_admin(&headers) {
        return unauthorized();
    }
    if state.fail_account_listing {
        return reply(StatusCode::INTERNAL_SERVER_ERROR, json!({ "message": "Failed to search service accounts" }));
    }

    let accounts: Vec<Value> = state
        .service_accounts
        .iter()
        .map(|(id, name)| json!({ "id": id, "name": name, "login": format!("sa-{}", name) }))
        .collect();
    if state.search_listing {
        reply(
            StatusCode::OK,
            json!({ "totalCount": accounts.len(), "serviceAccounts": accounts, "page": 1, "perPage": 1000 }),
        )
    } else {
        reply(StatusCode::OK, Value::Array(accounts))
    }
}

async fn create_account(State(state): State<Shared>, uri: Uri, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    state.record("POST", &uri, &headers, Some(&body));
    if !state.is_admin(&headers) {
        return unauthorized();
    }
    if state.reject_account_create {
        return reply(StatusCode::BAD_REQUEST, json!({ "message": "service account creation disabled" }));
    }

    let name = body["name"].as_str().unwrap_or_default().to_string();
    let id = state.next_id();
    state.service_accounts.push((id, name.clone()));
    reply(StatusCode::OK, json!({ "id": id, "name": name, "login": format!("sa-{}", name), "role": "Viewer" }))
}

async fn create_token(
    State(state): State<Shared>,
    UrlPath(id): UrlPath<i64>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock().unwrap();
    state.record("POST", &uri, &headers, Some(&body));
    if !state.is_admin(&headers) {
        return unauthorized();
    }
    if state.reject_token_mint {
        return reply(StatusCode::BAD_REQUEST, json!({ "message": "token creation disabled" }));
    }
    if !state.service_accounts.iter().any(|(sa, _)| *sa == id) {
        return reply(StatusCode::NOT_FOUND, json!({ "message": "service account not found" }));
    }

    let name = body["name"].as_str().unwrap_or_default().to_string();
    if state.tokens.iter().any(|(sa, n, _)| *sa == id && *n == name) {
        return reply(
            StatusCode::BAD_REQUEST,
            json!({ "message": "service account token with given name already exists" }),
        );
    }

    let key = format!("glsa_{}_{}", id, state.tokens.len() + 1);
    let token_id = state.next_id();
    state.tokens.push((id, name.clone(), key.clone()));
    reply(StatusCode::OK, json!({ "id": token_id, "name": name, "key": key }))
}

async fn get_datasource(
    State(state): State<Shared>,
    UrlPath(name): UrlPath<String>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let mut state = state.lock().unwrap();
    state.record("GET", &uri, &headers, None);
    if !state.is_bearer(&headers) {
        return unauthorized();
    }
    if let Some(status) = state.datasource_lookup_status {
        let status = StatusCode::from_u16(status).unwrap();
        return reply(status, json!({ "message": "Failed to query data source" }));
    }

    match state.datasources.iter().find(|ds| ds.name == name) {
        Some(ds) => reply(
            StatusCode::OK,
            json!({ "id": ds.id, "uid": ds.uid, "name": ds.name, "type": ds.body["type"] }),
        ),
        None => reply(StatusCode::NOT_FOUND, json!({ "message": "Data source not found" })),
    }
}

async fn create_datasource(State(state): State<Shared>, uri: Uri, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    state.record("POST", &uri, &headers, Some(&body));
    if !state.is_bearer(&headers) {
        return unauthorized();
    }
    if state.reject_datasource_writes {
        return reply(StatusCode::BAD_REQUEST, json!({ "message": "invalid datasource" }));
    }

    let name = body["name"].as_str().unwrap_or_default().to_string();
    if state.datasources.iter().any(|ds| ds.name == name) {
        return reply(
            StatusCode::CONFLICT,
            json!({ "message": "data source with the same name already exists" }),
        );
    }

    let id = state.next_id();
    let uid = format!("ds-{}", id);
    state.datasources.push(MockDatasource { id, uid: uid.clone(), name: name.clone(), body });
    reply(
        StatusCode::OK,
        json!({
            "datasource": { "id": id, "uid": uid, "name": name },
            "id": id,
            "message": "Datasource added",
            "name": name
        }),
    )
}

async fn update_datasource(
    State(state): State<Shared>,
    UrlPath(id): UrlPath<i64>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock().unwrap();
    state.record("PUT", &uri, &headers, Some(&body));
    if !state.is_bearer(&headers) {
        return unauthorized();
    }
    if state.reject_datasource_writes {
        return reply(StatusCode::BAD_REQUEST, json!({ "message": "invalid datasource" }));
    }

    let flat = state.flat_update_response;
    let Some(ds) = state.datasources.iter_mut().find(|ds| ds.id == id) else {
        return reply(StatusCode::NOT_FOUND, json!({ "message": "Data source not found" }));
    };
    ds.body = body;
    if let Some(name) = ds.body["name"].as_str() {
        ds.name = name.to_string();
    }

    if flat {
        reply(
            StatusCode::OK,
            json!({ "id": ds.id, "uid": ds.uid, "name": ds.name, "message": "Datasource updated" }),
        )
    } else {
        reply(
            StatusCode::OK,
            json!({
                "datasource": { "id": ds.id, "uid": ds.uid, "name": ds.name },
                "id": ds.id,
                "message": "Datasource updated",
                "name": ds.name
            }),
        )
    }
}

async fn install_dashboard(State(state): State<Shared>, uri: Uri, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    state.record("POST", &uri, &headers, Some(&body));
    if !state.is_bearer(&headers) {
        return unauthorized();
    }
    if state.reject_dashboard {
        return reply(
            StatusCode::PRECONDITION_FAILED,
            json!({ "message": "A dashboard with the same name in the folder already exists", "status": "name-exists" }),
        );
    }

    state.dashboards.push(body);
    let version = state.dashboards.len();
    reply(
        StatusCode::OK,
        json!({
            "id": 1,
            "uid": "fitness-dash",
            "url": "/d/fitness-dash/fitness-assistant",
            "status": "success",
            "version": version,
            "slug": "fitness-assistant"
        }),
    )
}

/// Baseline configuration pointing at `url`.
pub fn config_for(url: &str, template: &Path) -> ProvisionConfig {
    let mut config = ProvisionConfig::default();
    config.grafana.url = url.to_string();
    config.grafana.admin_user = ADMIN_USER.to_string();
    config.grafana.admin_password = Secret::new(ADMIN_PASSWORD);
    config.datasource.host = "postgres".to_string();
    config.datasource.database = "fitness_assistant".to_string();
    config.datasource.user = "app".to_string();
    config.datasource.password = Secret::new("db-password");
    config.dashboard.template_path = template.display().to_string();
    config.timeouts.request_secs = 5;
    config
}

/// Write a dashboard template with stale identity fields and uids.
pub fn write_template(dir: &Path) -> PathBuf {
    let path = dir.join("dashboard.json");
    let template = json!({
        "id": 7,
        "uid": "abc",
        "version": 3,
        "title": "Fitness Assistant",
        "panels": [
            {
                "id": 1,
                "type": "stat",
                "title": "Conversations",
                "datasource": { "type": "grafana-postgresql-datasource", "uid": "OLD" },
                "targets": [{ "refId": "A", "rawSql": "SELECT COUNT(*) FROM conversations" }]
            },
            {
                "id": 2,
                "type": "timeseries",
                "title": "Feedback",
                "targets": [
                    {
                        "refId": "A",
                        "datasource": { "type": "grafana-postgresql-datasource", "uid": "OLD2" },
                        "rawSql": "SELECT timestamp AS time, feedback FROM feedback"
                    }
                ]
            },
            { "id": 3, "type": "text", "title": "Notes" }
        ]
    });
    std::fs::write(&path, serde_json::to_vec_pretty(&template).unwrap()).unwrap();
    path
}

/// Start a programmable raw HTTP backend. The handler is called once per
/// connection and returns the status code and body to answer with.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                drain_request(&mut socket).await;
                let (status, body) = f().await;
                let reason = match status {
                    200 => "OK",
                    401 => "Unauthorized",
                    404 => "Not Found",
                    500 => "Internal Server Error",
                    502 => "Bad Gateway",
                    503 => "Service Unavailable",
                    _ => "Unknown",
                };
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Read one request (headers plus Content-Length body) so closing the
/// socket afterwards does not reset the connection.
async fn drain_request(socket: &mut tokio::net::TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let Ok(n) = socket.read(&mut chunk).await else { return };
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(end) = text.find("\r\n\r\n") {
            let content_length = text[..end]
                .lines()
                .find_map(|line| {
                    let (key, value) = line.split_once(':')?;
                    key.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= end + 4 + content_length {
                return;
            }
        }
    }
}

/// An address with nothing listening on it.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// A server that accepts connections and never answers.
pub async fn start_stalled_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(30)).await;
                drop(socket);
            });
        }
    });
    addr
}
