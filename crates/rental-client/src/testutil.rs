//! Shared test helpers: a mock backend with hit counters, available to all
//! `#[cfg(test)]` modules in the crate.
//!
//! The backend models the real API's behavior where the protocol cares:
//! bearer tokens are validated against the pair most recently issued, the
//! refresh endpoint rotates that pair, and failures use the standard
//! `{"success":false,"message":...}` envelope. Counters and recorded tokens
//! let tests assert exact wire traffic.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use rental_auth::{MemoryStore, Session};

use crate::client::ApiClient;

#[derive(Default)]
struct MockState {
    /// Access token the backend currently accepts
    valid_token: Mutex<String>,
    /// Refresh token the backend currently accepts
    valid_refresh: Mutex<String>,
    /// Monotonic counter behind T{n}/R{n} issuance
    rotation: AtomicU64,
    books_hits: AtomicU64,
    refresh_hits: AtomicU64,
    logout_hits: AtomicU64,
    /// When set, /books answers 401 regardless of the presented token
    reject_books: AtomicBool,
    /// Bearer tokens presented to /books, in order
    seen_bearers: Mutex<Vec<Option<String>>>,
    /// Refresh tokens presented to /refresh-token, in order
    seen_refresh_tokens: Mutex<Vec<String>>,
}

/// Handle to a running mock backend.
pub struct MockBackend {
    pub base_url: String,
    state: Arc<MockState>,
}

impl MockBackend {
    /// Invalidate the current access token while leaving refresh valid.
    pub async fn expire_access_token(&self) {
        *self.state.valid_token.lock().await = "expired".into();
    }

    /// Invalidate the current refresh token, so the next refresh fails.
    pub async fn revoke_refresh_token(&self) {
        *self.state.valid_refresh.lock().await = "revoked".into();
    }

    /// Make /books reject every request with 401.
    pub fn reject_books_unconditionally(&self) {
        self.state.reject_books.store(true, Ordering::SeqCst);
    }

    pub fn books_hits(&self) -> u64 {
        self.state.books_hits.load(Ordering::SeqCst)
    }

    pub fn refresh_hits(&self) -> u64 {
        self.state.refresh_hits.load(Ordering::SeqCst)
    }

    pub fn logout_hits(&self) -> u64 {
        self.state.logout_hits.load(Ordering::SeqCst)
    }

    pub async fn seen_bearers(&self) -> Vec<Option<String>> {
        self.state.seen_bearers.lock().await.clone()
    }

    pub async fn seen_refresh_tokens(&self) -> Vec<String> {
        self.state.seen_refresh_tokens.lock().await.clone()
    }
}

/// Start the mock backend on an ephemeral port.
pub async fn start_backend() -> MockBackend {
    let state = Arc::new(MockState::default());
    let app = axum::Router::new()
        .route("/api/v1/register", post(register))
        .route("/api/v1/login", post(login))
        .route("/api/v1/logout", post(logout))
        .route("/api/v1/refresh-token", post(refresh))
        .route("/api/v1/books", get(list_books).post(create_book))
        .route(
            "/api/v1/books/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .route("/api/v1/books/{id}/transfer", post(transfer_book))
        .route("/api/v1/users", get(list_users))
        .route(
            "/api/v1/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/api/v1/user-books/{user_id}", get(user_books))
        .route("/api/v1/slow", get(slow))
        .route("/api/v1/broken", get(broken))
        .route("/api/v1/legacy-broken", get(legacy_broken))
        .route("/api/v1/garbage", get(garbage))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockBackend {
        base_url: format!("http://{addr}/api/v1"),
        state,
    }
}

/// A client with an empty in-memory session.
pub async fn anonymous_client(backend: &MockBackend) -> (ApiClient, Arc<Session>) {
    let store = Arc::new(MemoryStore::default());
    let session = Arc::new(Session::restore(store).await.unwrap());
    let client = ApiClient::new(reqwest::Client::new(), &backend.base_url, session.clone());
    (client, session)
}

/// A client logged in as the backend's one known user (T1/R1 issued).
pub async fn logged_in_client(backend: &MockBackend) -> (ApiClient, Arc<Session>) {
    let (client, session) = anonymous_client(backend).await;
    crate::api::auth::login(&client, "ada@example.com", "pw")
        .await
        .unwrap();
    (client, session)
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn ok(data: Value) -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "success": true, "data": data })))
}

fn fail(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({ "success": false, "message": message })),
    )
}

async fn authorized(state: &MockState, headers: &HeaderMap) -> bool {
    match bearer(headers) {
        Some(token) => token == *state.valid_token.lock().await,
        None => false,
    }
}

fn sample_book(id: &str, owner: &str) -> Value {
    json!({
        "id": id,
        "title": "Dune",
        "author": "Frank Herbert",
        "isbn": "9780441013593",
        "description": "Spice and sandworms",
        "user_id": owner,
    })
}

fn sample_user(id: &str) -> Value {
    json!({
        "id": id,
        "name": "Ada",
        "email": "ada@example.com",
    })
}

async fn register(Json(body): Json<Value>) -> Response {
    let user = json!({
        "id": "u-new",
        "name": body["name"],
        "email": body["email"],
    });
    (
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": user })),
    )
        .into_response()
}

async fn login(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    if email != "ada@example.com" || password != "pw" {
        return fail(StatusCode::UNAUTHORIZED, "Invalid email or password").into_response();
    }
    let n = state.rotation.fetch_add(1, Ordering::SeqCst) + 1;
    let access = format!("T{n}");
    let refresh = format!("R{n}");
    *state.valid_token.lock().await = access.clone();
    *state.valid_refresh.lock().await = refresh.clone();
    ok(json!({
        "access_token": access,
        "refresh_token": refresh,
        "user": sample_user("u1"),
    }))
    .into_response()
}

async fn logout(State(state): State<Arc<MockState>>) -> Response {
    state.logout_hits.fetch_add(1, Ordering::SeqCst);
    ok(json!({})).into_response()
}

async fn refresh(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.refresh_hits.fetch_add(1, Ordering::SeqCst);
    let presented = body["refresh_token"].as_str().unwrap_or_default().to_string();
    state
        .seen_refresh_tokens
        .lock()
        .await
        .push(presented.clone());

    let mut valid_refresh = state.valid_refresh.lock().await;
    if presented != *valid_refresh {
        return fail(StatusCode::UNAUTHORIZED, "Invalid refresh token").into_response();
    }
    let n = state.rotation.fetch_add(1, Ordering::SeqCst) + 1;
    let access = format!("T{n}");
    let refresh = format!("R{n}");
    *state.valid_token.lock().await = access.clone();
    *valid_refresh = refresh.clone();
    ok(json!({ "access_token": access, "refresh_token": refresh })).into_response()
}

async fn list_books(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.books_hits.fetch_add(1, Ordering::SeqCst);
    let presented = bearer(&headers);
    state.seen_bearers.lock().await.push(presented.clone());

    if state.reject_books.load(Ordering::SeqCst) {
        return fail(StatusCode::UNAUTHORIZED, "Invalid or expired token").into_response();
    }
    let valid = state.valid_token.lock().await.clone();
    match presented {
        Some(token) if token == valid => ok(json!([sample_book("b1", "u1")])).into_response(),
        _ => fail(StatusCode::UNAUTHORIZED, "Invalid or expired token").into_response(),
    }
}

async fn create_book(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    if !authorized(&state, &headers).await {
        return fail(StatusCode::UNAUTHORIZED, "Invalid or expired token").into_response();
    }
    body["id"] = json!("b-new");
    body["user_id"] = json!("u1");
    (
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": body })),
    )
        .into_response()
}

async fn get_book(
    State(state): State<Arc<MockState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&state, &headers).await {
        return fail(StatusCode::UNAUTHORIZED, "Invalid or expired token").into_response();
    }
    if id != "b1" {
        return fail(StatusCode::NOT_FOUND, "Book not found").into_response();
    }
    ok(sample_book("b1", "u1")).into_response()
}

async fn update_book(
    State(state): State<Arc<MockState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(patch): Json<Value>,
) -> Response {
    if !authorized(&state, &headers).await {
        return fail(StatusCode::UNAUTHORIZED, "Invalid or expired token").into_response();
    }
    let mut book = sample_book(&id, "u1");
    if let Some(title) = patch.get("title") {
        book["title"] = title.clone();
    }
    if let Some(author) = patch.get("author") {
        book["author"] = author.clone();
    }
    ok(book).into_response()
}

async fn delete_book(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if !authorized(&state, &headers).await {
        return fail(StatusCode::UNAUTHORIZED, "Invalid or expired token").into_response();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn transfer_book(
    State(state): State<Arc<MockState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&state, &headers).await {
        return fail(StatusCode::UNAUTHORIZED, "Invalid or expired token").into_response();
    }
    let Some(to_user_id) = body["to_user_id"].as_str() else {
        return fail(StatusCode::BAD_REQUEST, "to_user_id is required").into_response();
    };
    ok(sample_book(&id, to_user_id)).into_response()
}

async fn list_users(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if !authorized(&state, &headers).await {
        return fail(StatusCode::UNAUTHORIZED, "Invalid or expired token").into_response();
    }
    ok(json!([
        sample_user("u1"),
        { "id": "u2", "name": "Grace", "email": "grace@example.com", "role": "admin" },
    ]))
    .into_response()
}

async fn get_user(
    State(state): State<Arc<MockState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&state, &headers).await {
        return fail(StatusCode::UNAUTHORIZED, "Invalid or expired token").into_response();
    }
    ok(sample_user(&id)).into_response()
}

async fn update_user(
    State(state): State<Arc<MockState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(patch): Json<Value>,
) -> Response {
    if !authorized(&state, &headers).await {
        return fail(StatusCode::UNAUTHORIZED, "Invalid or expired token").into_response();
    }
    let mut user = sample_user(&id);
    if let Some(name) = patch.get("name") {
        user["name"] = name.clone();
    }
    if let Some(email) = patch.get("email") {
        user["email"] = email.clone();
    }
    ok(user).into_response()
}

async fn delete_user(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if !authorized(&state, &headers).await {
        return fail(StatusCode::UNAUTHORIZED, "Invalid or expired token").into_response();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn user_books(
    State(state): State<Arc<MockState>>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&state, &headers).await {
        return fail(StatusCode::UNAUTHORIZED, "Invalid or expired token").into_response();
    }
    ok(json!([sample_book("b1", &user_id)])).into_response()
}

async fn slow() -> Response {
    tokio::time::sleep(std::time::Duration::from_secs(30)).await;
    ok(json!({})).into_response()
}

async fn broken() -> Response {
    fail(StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response()
}

async fn legacy_broken() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "legacy boom" })),
    )
        .into_response()
}

async fn garbage() -> Response {
    (StatusCode::OK, "definitely not json").into_response()
}
