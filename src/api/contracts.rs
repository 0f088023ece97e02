// Typed request/response contracts for the Bookstore API
//
// Field names follow the API's camelCase wire format.

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::debug;

use crate::error::ClientError;
use crate::types::{Permission, Role, UserId};

// ---- auth ----

/// POST /api/auth/login
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// POST /api/auth/register
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub password: String,
}

/// Returned by both login and register
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub username: String,
    pub user_id: UserId,
}

/// POST /api/auth/refresh
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

// ---- users ----

/// GET /api/users/{id}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(default)]
    pub id: Option<UserId>,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    /// Role names this client does not know are dropped
    #[serde(default, deserialize_with = "known_roles")]
    pub roles: Vec<Role>,
    /// Unknown role or permission names are dropped
    #[serde(default, deserialize_with = "known_permissions")]
    pub permissions: BTreeMap<Role, Vec<Permission>>,
    #[serde(default)]
    pub enabled: bool,
}

impl UserRecord {
    /// Permissions the server lists for `role`, empty when absent
    pub fn permissions_for(&self, role: Role) -> &[Permission] {
        self.permissions.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn known<T: FromStr>(name: &str) -> Option<T> {
    let parsed = name.parse().ok();
    if parsed.is_none() {
        debug!(name, "ignoring unknown access name");
    }
    parsed
}

fn known_roles<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Role>, D::Error> {
    let names: Option<Vec<String>> = Option::deserialize(deserializer)?;
    Ok(names
        .unwrap_or_default()
        .iter()
        .filter_map(|name| known(name))
        .collect())
}

fn known_permissions<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<Role, Vec<Permission>>, D::Error> {
    let by_role: Option<BTreeMap<String, Vec<String>>> = Option::deserialize(deserializer)?;
    Ok(by_role
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(role, names)| {
            let role = known::<Role>(&role)?;
            Some((role, names.iter().filter_map(|name| known(name)).collect()))
        })
        .collect())
}

/// PUT /api/users/{id}
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateUserRequest {
    pub firstname: String,
    pub lastname: String,
    pub enabled: bool,
}

/// Body of POST|DELETE /api/users/{id}/permissions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionChange {
    pub role_name: Role,
    pub permission_names: Vec<Permission>,
}

// ---- catalog ----

/// Spring-style page envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub content: Vec<T>,
    #[serde(default)]
    pub page_number: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_elements: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSummary {
    pub id: i64,
    pub book_id: Option<String>,
    pub title: Option<String>,
    pub publish_date: Option<String>,
    pub first_publish_date: Option<String>,
    pub description: Option<String>,
    pub format: Option<String>,
    pub isbn: Option<String>,
    pub character_name: Option<String>,
    pub edition: Option<String>,
    pub page_number: Option<u32>,
    pub price: Option<f64>,
    pub publisher_id: Option<i64>,
    pub language_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookInstance {
    pub id: i64,
    pub instance_number: Option<u32>,
    pub is_rentable: Option<bool>,
    pub is_sellable: Option<bool>,
    pub max_rent_count: Option<u32>,
    pub price: Option<f64>,
    pub status: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub book_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: i64,
    pub full_name: String,
    #[serde(default)]
    pub is_on_goodreads: bool,
}

/// Author as credited on a specific book
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorCredit {
    pub id: i64,
    pub full_name: String,
    #[serde(default)]
    pub is_on_goodreads: bool,
    pub author_role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Language {
    pub id: i64,
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genre {
    pub id: i64,
    #[serde(alias = "genre")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: i64,
    #[serde(alias = "characterName")]
    pub name: Option<String>,
}

// ---- response handling ----

/// JSON error envelope some endpoints return; anything else is kept as text
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// Human readable message for a failed response body.
///
/// JSON bodies with `message`/`error` use that field. Other bodies are
/// returned verbatim. Empty bodies fall back to the status reason.
pub fn error_message(status: StatusCode, body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return status.canonical_reason().unwrap_or("").to_string();
    }

    match serde_json::from_str::<ErrorBody>(trimmed) {
        Ok(ErrorBody { message: Some(m), .. }) => m,
        Ok(ErrorBody { error: Some(e), .. }) => e,
        _ => trimmed.to_string(),
    }
}

/// Decode a 2xx JSON body, or turn a non-2xx into `ClientError::Http`
pub async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(ClientError::http(status.as_u16(), error_message(status, &body)));
    }

    serde_json::from_str(&body)
        .map_err(|e| ClientError::decode(format!("{} (status {})", e, status.as_u16())))
}

/// Require a 2xx status, discarding the body
pub async fn expect_success(response: Response) -> Result<(), ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    Err(ClientError::http(status.as_u16(), error_message(status, &body)))
}
