// api/users.rs - user lookup, profile updates and access mutations

use tracing::debug;

use crate::api::contracts::{
    expect_success, read_json, Page, PermissionChange, UpdateUserRequest, UserRecord,
};
use crate::api::gateway::{Gateway, RequestOptions};
use crate::api::with_query;
use crate::config::{config, CatalogConfig};
use crate::error::ClientError;
use crate::types::{Permission, Role, UserId};

/// Filters for GET /api/users
#[derive(Debug, Clone, Default)]
pub struct UserSearchParams {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub email: Option<String>,
    pub enabled: Option<bool>,
    pub role_name: Option<Role>,
    pub permission_name: Option<Permission>,
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_direction: Option<String>,
}

impl UserSearchParams {
    pub fn to_path(&self, defaults: &CatalogConfig) -> String {
        with_query(
            "/api/users",
            &[
                ("firstname", self.firstname.clone()),
                ("lastname", self.lastname.clone()),
                ("email", self.email.clone()),
                ("enabled", self.enabled.map(|v| v.to_string())),
                ("roleName", self.role_name.map(|r| r.as_str().to_string())),
                ("permissionName", self.permission_name.map(|p| p.as_str().to_string())),
                ("page", Some(self.page.unwrap_or(0).to_string())),
                ("size", Some(self.size.unwrap_or(defaults.users_page_size).to_string())),
                (
                    "sortBy",
                    Some(self.sort_by.clone().unwrap_or_else(|| defaults.users_sort_by.clone())),
                ),
                (
                    "sortDirection",
                    Some(
                        self.sort_direction
                            .clone()
                            .unwrap_or_else(|| defaults.default_sort_direction.clone()),
                    ),
                ),
            ],
        )
    }
}

fn user_path(user_id: UserId) -> String {
    format!("/api/users/{}", user_id)
}

pub async fn fetch_users(
    gateway: &Gateway,
    params: &UserSearchParams,
) -> Result<Page<UserRecord>, ClientError> {
    let path = params.to_path(&config().catalog);
    read_json(gateway.fetch(&path, RequestOptions::get()).await?).await
}

/// GET /api/users/{id}
pub async fn fetch_user(gateway: &Gateway, user_id: UserId) -> Result<UserRecord, ClientError> {
    read_json(gateway.fetch(&user_path(user_id), RequestOptions::get()).await?).await
}

/// PUT /api/users/{id} with profile fields; returns the updated record
pub async fn update_user(
    gateway: &Gateway,
    user_id: UserId,
    update: &UpdateUserRequest,
) -> Result<UserRecord, ClientError> {
    let options = RequestOptions::put().json(update)?;
    read_json(gateway.fetch(&user_path(user_id), options).await?).await
}

pub async fn add_roles(gateway: &Gateway, user_id: UserId, roles: &[Role]) -> Result<(), ClientError> {
    debug!(user_id, ?roles, "adding roles");
    let path = format!("{}/roles", user_path(user_id));
    expect_success(gateway.fetch(&path, RequestOptions::post().json(roles)?).await?).await
}

pub async fn remove_roles(gateway: &Gateway, user_id: UserId, roles: &[Role]) -> Result<(), ClientError> {
    debug!(user_id, ?roles, "removing roles");
    let path = format!("{}/roles", user_path(user_id));
    expect_success(gateway.fetch(&path, RequestOptions::delete().json(roles)?).await?).await
}

pub async fn add_permissions(
    gateway: &Gateway,
    user_id: UserId,
    role: Role,
    permissions: &[Permission],
) -> Result<(), ClientError> {
    debug!(user_id, %role, ?permissions, "granting permissions");
    let path = format!("{}/permissions", user_path(user_id));
    let body = PermissionChange {
        role_name: role,
        permission_names: permissions.to_vec(),
    };
    expect_success(gateway.fetch(&path, RequestOptions::post().json(&body)?).await?).await
}

pub async fn remove_permissions(
    gateway: &Gateway,
    user_id: UserId,
    role: Role,
    permissions: &[Permission],
) -> Result<(), ClientError> {
    debug!(user_id, %role, ?permissions, "revoking permissions");
    let path = format!("{}/permissions", user_path(user_id));
    let body = PermissionChange {
        role_name: role,
        permission_names: permissions.to_vec(),
    };
    expect_success(gateway.fetch(&path, RequestOptions::delete().json(&body)?).await?).await
}
