use std::{
    collections::{BTreeSet, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use axum::{
    extract::{Path, Query, State},
    http::{header::HOST, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use tokio::{net::TcpListener, sync::RwLock};

pub const DEFAULT_USER: &str = "demo";
pub const DEFAULT_KEY: &str = "demo-key";
pub const DEFAULT_ACCOUNT: &str = "SEL_1";

/// In-memory state of the emulated storage service.
pub struct MockState {
    pub user: String,
    pub key: String,
    pub account: String,
    tokens: RwLock<HashSet<String>>,
    containers: RwLock<BTreeSet<String>>,
    auth_requests: AtomicUsize,
    storage_requests: AtomicUsize,
}

impl MockState {
    pub fn new(user: &str, key: &str, account: &str) -> Self {
        Self {
            user: user.to_string(),
            key: key.to_string(),
            account: account.to_string(),
            tokens: RwLock::new(HashSet::new()),
            containers: RwLock::new(BTreeSet::new()),
            auth_requests: AtomicUsize::new(0),
            storage_requests: AtomicUsize::new(0),
        }
    }

    /// Number of requests the auth endpoint has seen, accepted or not.
    pub fn auth_requests(&self) -> usize {
        self.auth_requests.load(Ordering::SeqCst)
    }

    /// Number of requests the account and container endpoints have seen.
    pub fn storage_requests(&self) -> usize {
        self.storage_requests.load(Ordering::SeqCst)
    }

    /// Forget every issued token, as if they had all expired.
    pub async fn revoke_tokens(&self) {
        self.tokens.write().await.clear();
    }

    /// Blocking form of `revoke_tokens` for callers outside the runtime.
    pub fn revoke_tokens_blocking(&self) {
        self.tokens.blocking_write().clear();
    }

    pub async fn containers(&self) -> Vec<String> {
        self.containers.read().await.iter().cloned().collect()
    }

    /// Blocking form of `containers` for callers outside the runtime.
    pub fn containers_blocking(&self) -> Vec<String> {
        self.containers.blocking_read().iter().cloned().collect()
    }

    async fn issue_token(&self) -> String {
        let token = format!("tk-{}", self.auth_requests());
        self.tokens.write().await.insert(token.clone());
        token
    }

    async fn authorized(&self, headers: &HeaderMap) -> bool {
        match headers.get("x-auth-token").and_then(|v| v.to_str().ok()) {
            Some(token) => self.tokens.read().await.contains(token),
            None => false,
        }
    }
}

impl Default for MockState {
    fn default() -> Self {
        Self::new(DEFAULT_USER, DEFAULT_KEY, DEFAULT_ACCOUNT)
    }
}

pub type Shared = Arc<MockState>;

#[derive(Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
    pub marker: Option<String>,
}

pub fn app() -> Router {
    app_with(Arc::new(MockState::default()))
}

pub fn app_with(state: Shared) -> Router {
    Router::new()
        .route("/auth/v1.0", get(auth))
        .route("/v1/{account}", get(list_containers))
        .route(
            "/v1/{account}/{container}",
            put(create_container).delete(delete_container),
        )
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, Arc::new(MockState::default())).await
}

pub async fn run_with(listener: TcpListener, state: Shared) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(state)).await
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, "401 Unauthorized\n").into_response()
}

fn host(headers: &HeaderMap) -> &str {
    headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost")
}

async fn auth(State(state): State<Shared>, headers: HeaderMap) -> Response {
    state.auth_requests.fetch_add(1, Ordering::SeqCst);

    let user = headers.get("x-auth-user").and_then(|v| v.to_str().ok());
    let key = headers.get("x-auth-key").and_then(|v| v.to_str().ok());
    if user != Some(state.user.as_str()) || key != Some(state.key.as_str()) {
        log::info!("auth rejected for {user:?}");
        return (StatusCode::FORBIDDEN, "Forbidden\n").into_response();
    }

    let token = state.issue_token().await;
    let storage_url = format!("http://{}/v1/{}", host(&headers), state.account);
    (
        StatusCode::NO_CONTENT,
        [("x-auth-token", token), ("x-storage-url", storage_url)],
    )
        .into_response()
}

async fn list_containers(
    State(state): State<Shared>,
    Path(account): Path<String>,
    Query(params): Query<ListParams>,
    headers: HeaderMap,
) -> Response {
    state.storage_requests.fetch_add(1, Ordering::SeqCst);
    if account != state.account {
        return (StatusCode::NOT_FOUND, "Not Found\n").into_response();
    }
    if !state.authorized(&headers).await {
        return unauthorized();
    }

    let containers = state.containers.read().await;
    let count = containers.len().to_string();
    if containers.is_empty() {
        return (
            StatusCode::NO_CONTENT,
            [("x-account-container-count", count)],
        )
            .into_response();
    }

    let after: Vec<&String> = containers
        .iter()
        .filter(|name| match &params.marker {
            Some(marker) => name.as_str() > marker.as_str(),
            None => true,
        })
        .collect();
    let limit = params.limit.unwrap_or(after.len()).max(1);
    let page = &after[..limit.min(after.len())];
    let body: String = page.iter().map(|name| format!("{name}\n")).collect();

    match page.last() {
        Some(last) if after.len() > page.len() => {
            let next = format!(
                "<http://{}/v1/{}?marker={last}&limit={limit}>; rel=\"next\"",
                host(&headers),
                state.account
            );
            (
                StatusCode::OK,
                [("x-account-container-count", count), ("link", next)],
                body,
            )
                .into_response()
        }
        _ => (
            StatusCode::OK,
            [("x-account-container-count", count)],
            body,
        )
            .into_response(),
    }
}

async fn create_container(
    State(state): State<Shared>,
    Path((account, container)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    state.storage_requests.fetch_add(1, Ordering::SeqCst);
    if account != state.account {
        return (StatusCode::NOT_FOUND, "Not Found\n").into_response();
    }
    if !state.authorized(&headers).await {
        return unauthorized();
    }

    if state.containers.write().await.insert(container) {
        StatusCode::CREATED.into_response()
    } else {
        StatusCode::ACCEPTED.into_response()
    }
}

async fn delete_container(
    State(state): State<Shared>,
    Path((account, container)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    state.storage_requests.fetch_add(1, Ordering::SeqCst);
    if account != state.account {
        return (StatusCode::NOT_FOUND, "Not Found\n").into_response();
    }
    if !state.authorized(&headers).await {
        return unauthorized();
    }

    if state.containers.write().await.remove(&container) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (StatusCode::NOT_FOUND, "Not Found\n").into_response()
    }
}
