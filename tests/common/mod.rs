#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{json, Value};

use bookstore_client::api::contracts::{LoginResponse, Page, PermissionChange, UserRecord};
use bookstore_client::api::Gateway;
use bookstore_client::session::{CredentialStore, MemoryStore, RoleChooser, StorageKey};
use bookstore_client::types::{Permission, Role, UserId};
use bookstore_client::ClientError;

/// One request as seen by the mock API
#[derive(Debug, Clone)]
pub struct Call {
    pub method: String,
    /// Path plus query string
    pub path: String,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

impl Call {
    pub fn is(&self, method: &str, path: &str) -> bool {
        self.method == method && self.path == path
    }
}

/// How POST /api/auth/refresh answers
#[derive(Debug, Clone)]
pub enum RefreshMode {
    /// Issue this access token and start accepting it
    Issue(String),
    /// 401 for any refresh token
    Reject,
    /// 200 with a body that is not JSON
    Garbage,
}

pub struct MockState {
    pub valid_tokens: HashSet<String>,
    pub refresh: RefreshMode,
    /// Every authenticated route answers 401 when set
    pub always_unauthorized: bool,
    /// (method, path) answered with 500
    pub fail_on: Option<(String, String)>,
    /// username -> (password, user id)
    pub accounts: HashMap<String, (String, UserId)>,
    pub users: BTreeMap<UserId, UserRecord>,
    pub calls: Vec<Call>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            valid_tokens: HashSet::new(),
            refresh: RefreshMode::Reject,
            always_unauthorized: false,
            fail_on: None,
            accounts: HashMap::new(),
            users: BTreeMap::new(),
            calls: Vec::new(),
        }
    }
}

type Shared = Arc<Mutex<MockState>>;

/// In-process Bookstore API bound to a free local port
pub struct MockApi {
    pub base_url: String,
    state: Shared,
}

impl MockApi {
    pub async fn start() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("failed to bind mock api on port {}", port))?;

        let state: Shared = Arc::new(Mutex::new(MockState::default()));
        let app = Router::new().fallback(dispatch).with_state(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            base_url: format!("http://127.0.0.1:{}", port),
            state,
        })
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.with(|s| s.calls.clone())
    }

    /// Calls whose path starts with `prefix`
    pub fn calls_to(&self, prefix: &str) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.path.starts_with(prefix)).collect()
    }

    pub fn reset_calls(&self) {
        self.with(|s| s.calls.clear());
    }

    pub fn accept_token(&self, token: &str) {
        self.with(|s| s.valid_tokens.insert(token.to_string()));
    }

    pub fn add_user(&self, user: UserRecord) {
        let id = user.id.unwrap_or_default();
        self.with(|s| s.users.insert(id, user));
    }

    pub fn add_account(&self, username: &str, password: &str, user_id: UserId) {
        self.with(|s| {
            s.accounts
                .insert(username.to_string(), (password.to_string(), user_id))
        });
    }

    pub fn user(&self, id: UserId) -> Option<UserRecord> {
        self.with(|s| s.users.get(&id).cloned())
    }

    pub fn gateway(&self, store: Arc<dyn CredentialStore>) -> Result<Gateway> {
        Ok(Gateway::new(&self.base_url, store)?)
    }
}

pub fn memory_store() -> Arc<dyn CredentialStore> {
    Arc::new(MemoryStore::new())
}

/// User record fixture
pub fn user(id: UserId, roles: &[Role], permissions: Vec<(Role, Vec<Permission>)>) -> UserRecord {
    UserRecord {
        id: Some(id),
        firstname: "Ada".to_string(),
        lastname: "Lovelace".to_string(),
        email: format!("user{}@example.com", id),
        created_at: "2024-01-01T00:00:00".to_string(),
        updated_at: "2024-01-01T00:00:00".to_string(),
        roles: roles.to_vec(),
        permissions: permissions.into_iter().collect(),
        enabled: true,
    }
}

/// Role chooser answering with a fixed role and remembering what it was offered
pub struct ScriptedChooser {
    answer: Role,
    offered: Mutex<Vec<Vec<Role>>>,
}

impl ScriptedChooser {
    pub fn new(answer: Role) -> Self {
        Self {
            answer,
            offered: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<Vec<Role>> {
        self.offered.lock().unwrap().clone()
    }
}

#[async_trait]
impl RoleChooser for ScriptedChooser {
    async fn present_choice(&self, options: &[Role]) -> Result<Role, ClientError> {
        self.offered.lock().unwrap().push(options.to_vec());
        Ok(self.answer)
    }
}

/// What the credential store held while a role prompt was open
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSnapshot {
    pub role: Option<String>,
    pub permissions: Option<String>,
    pub user_id: Option<String>,
}

/// Role chooser that records the store contents at prompt time
pub struct StoreWatchingChooser {
    answer: Role,
    store: Arc<dyn CredentialStore>,
    seen: Mutex<Vec<PendingSnapshot>>,
}

impl StoreWatchingChooser {
    pub fn new(answer: Role, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            answer,
            store,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn snapshots(&self) -> Vec<PendingSnapshot> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl RoleChooser for StoreWatchingChooser {
    async fn present_choice(&self, _options: &[Role]) -> Result<Role, ClientError> {
        self.seen.lock().unwrap().push(PendingSnapshot {
            role: self.store.get(StorageKey::Role),
            permissions: self.store.get(StorageKey::Permissions),
            user_id: self.store.get(StorageKey::UserId),
        });
        Ok(self.answer)
    }
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn bearer(authorization: Option<&str>) -> Option<&str> {
    authorization.and_then(|value| value.strip_prefix("Bearer "))
}

fn header_text(headers: &HeaderMap, name: axum::http::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn dispatch(
    State(state): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| path.clone());
    let authorization = header_text(&headers, AUTHORIZATION);
    let body: Option<Value> = serde_json::from_slice(&body).ok();

    let mut state = state.lock().unwrap();
    state.calls.push(Call {
        method: method.to_string(),
        path: path_and_query,
        authorization: authorization.clone(),
        body: body.clone(),
    });

    if let Some((fail_method, fail_path)) = &state.fail_on {
        if fail_method == method.as_str() && *fail_path == path {
            return error(StatusCode::INTERNAL_SERVER_ERROR, "injected failure");
        }
    }

    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    let authorized = !state.always_unauthorized
        && bearer(authorization.as_deref()).map_or(false, |t| state.valid_tokens.contains(t));

    match (method.as_str(), segments.as_slice()) {
        ("POST", ["api", "auth", "login"]) => login(&mut state, body),
        ("POST", ["api", "auth", "register"]) => register(&mut state, body),
        ("POST", ["api", "auth", "refresh"]) => refresh(&mut state),
        ("GET", ["echo"]) => Json(json!({
            "contentType": header_text(&headers, CONTENT_TYPE),
            "authorization": authorization,
            "accept": header_text(&headers, ACCEPT),
        }))
        .into_response(),
        ("GET", ["teapot"]) => (StatusCode::IM_A_TEAPOT, "short and stout").into_response(),
        _ if !authorized => error(StatusCode::UNAUTHORIZED, "token expired"),
        ("GET", ["api", "users"]) => {
            let content: Vec<UserRecord> = state.users.values().cloned().collect();
            let total = content.len() as u64;
            Json(Page {
                content,
                page_number: 0,
                page_size: 15,
                total_pages: 1,
                total_elements: total,
            })
            .into_response()
        }
        ("GET", ["api", "users", id]) => with_user(&mut state, id, |user| Json(user.clone()).into_response()),
        ("PUT", ["api", "users", id]) => with_user(&mut state, id, |user| {
            let update = body.unwrap_or_default();
            if let Some(firstname) = update["firstname"].as_str() {
                user.firstname = firstname.to_string();
            }
            if let Some(lastname) = update["lastname"].as_str() {
                user.lastname = lastname.to_string();
            }
            if let Some(enabled) = update["enabled"].as_bool() {
                user.enabled = enabled;
            }
            Json(user.clone()).into_response()
        }),
        (m, ["api", "users", id, "roles"]) if m == "POST" || m == "DELETE" => {
            let roles: Vec<Role> = match body.map(serde_json::from_value) {
                Some(Ok(roles)) => roles,
                _ => return error(StatusCode::BAD_REQUEST, "expected a role list"),
            };
            let adding = m == "POST";
            with_user(&mut state, id, |user| {
                for role in roles {
                    if adding && !user.roles.contains(&role) {
                        user.roles.push(role);
                    }
                    if !adding {
                        user.roles.retain(|r| *r != role);
                        user.permissions.remove(&role);
                    }
                }
                Json(user.clone()).into_response()
            })
        }
        (m, ["api", "users", id, "permissions"]) if m == "POST" || m == "DELETE" => {
            let change: PermissionChange = match body.map(serde_json::from_value) {
                Some(Ok(change)) => change,
                _ => return error(StatusCode::BAD_REQUEST, "expected roleName and permissionNames"),
            };
            let adding = m == "POST";
            with_user(&mut state, id, |user| {
                let held = user.permissions.entry(change.role_name).or_default();
                for permission in change.permission_names {
                    if adding && !held.contains(&permission) {
                        held.push(permission);
                    }
                    if !adding {
                        held.retain(|p| *p != permission);
                    }
                }
                Json(user.clone()).into_response()
            })
        }
        ("GET", ["api", "books"]) => Json(json!({
            "content": [
                { "id": 7, "title": "War and Peace", "isbn": "9780199232765" },
                { "id": 8, "title": "Anna Karenina", "isbn": "9780143035008" }
            ],
            "pageNumber": 0,
            "pageSize": 9,
            "totalPages": 1,
            "totalElements": 2
        }))
        .into_response(),
        ("GET", ["api", "books", "7"]) => Json(json!({
            "id": 7,
            "title": "War and Peace",
            "isbn": "9780199232765",
            "price": 12.5
        }))
        .into_response(),
        ("GET", ["api", "books", "7", "authors"]) => Json(json!([
            { "id": 3, "fullName": "Leo Tolstoy", "isOnGoodreads": true, "authorRole": "Author" }
        ]))
        .into_response(),
        ("GET", ["api", "book-instances"]) => Json(json!([
            { "id": 1, "instanceNumber": 1, "status": "AVAILABLE", "bookId": 7 },
            { "id": 2, "instanceNumber": 2, "status": "RENTED", "bookId": 7 }
        ]))
        .into_response(),
        ("GET", ["api", "genres"]) => Json(json!([
            { "id": 1, "genre": "Classics" },
            { "id": 2, "genre": "Historical Fiction" }
        ]))
        .into_response(),
        ("GET", ["api", "books", _]) => error(StatusCode::NOT_FOUND, "Book not found"),
        _ => error(StatusCode::NOT_FOUND, "no such route"),
    }
}

fn with_user(state: &mut MockState, id: &str, f: impl FnOnce(&mut UserRecord) -> Response) -> Response {
    let user = id.parse::<UserId>().ok().and_then(|id| state.users.get_mut(&id));
    match user {
        Some(user) => f(user),
        None => error(StatusCode::NOT_FOUND, "User not found"),
    }
}

fn issue_session(state: &mut MockState, username: &str, user_id: UserId) -> Response {
    let access_token = format!("access-{}", user_id);
    state.valid_tokens.insert(access_token.clone());
    Json(LoginResponse {
        access_token,
        refresh_token: format!("refresh-{}", user_id),
        username: username.to_string(),
        user_id,
    })
    .into_response()
}

fn login(state: &mut MockState, body: Option<Value>) -> Response {
    let body = body.unwrap_or_default();
    let username = body["username"].as_str().unwrap_or_default().to_string();
    let password = body["password"].as_str().unwrap_or_default();

    let user_id = match state.accounts.get(&username) {
        Some((expected, user_id)) if expected == password => *user_id,
        _ => return error(StatusCode::UNAUTHORIZED, "Bad credentials"),
    };
    issue_session(state, &username, user_id)
}

fn register(state: &mut MockState, body: Option<Value>) -> Response {
    let body = body.unwrap_or_default();
    let email = body["email"].as_str().unwrap_or_default().to_string();
    if state.accounts.contains_key(&email) {
        return error(StatusCode::CONFLICT, "Email already registered");
    }

    let user_id = state.users.keys().max().copied().unwrap_or(0) + 1;
    let mut record = user(user_id, &[Role::User], vec![(Role::User, vec![])]);
    record.firstname = body["firstname"].as_str().unwrap_or_default().to_string();
    record.lastname = body["lastname"].as_str().unwrap_or_default().to_string();
    record.email = email.clone();
    state.users.insert(user_id, record);

    let password = body["password"].as_str().unwrap_or_default().to_string();
    state.accounts.insert(email.clone(), (password, user_id));
    issue_session(state, &email, user_id)
}

fn refresh(state: &mut MockState) -> Response {
    match state.refresh.clone() {
        RefreshMode::Issue(token) => {
            state.valid_tokens.insert(token.clone());
            Json(json!({ "accessToken": token })).into_response()
        }
        RefreshMode::Reject => error(StatusCode::UNAUTHORIZED, "Invalid refresh token"),
        RefreshMode::Garbage => (StatusCode::OK, "not json").into_response(),
    }
}
