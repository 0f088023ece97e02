use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::api::auth;
use crate::api::contracts::{LoginRequest, LoginResponse, RegisterRequest, UserRecord};
use crate::api::gateway::Gateway;
use crate::api::users;
use crate::error::ClientError;
use crate::session::store::{CredentialStore, StorageKey};
use crate::types::{Permission, Role, UserId};

/// Interactive capability used when a user holds several roles.
///
/// Implementations must resolve to one of `options`. There is no cancel
/// path, so an implementation that cannot answer returns an error.
#[async_trait]
pub trait RoleChooser: Send + Sync {
    async fn present_choice(&self, options: &[Role]) -> Result<Role, ClientError>;
}

/// Cached subset of the authenticated user's profile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionContext {
    pub user_id: UserId,
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub created_at: String,
    pub updated_at: String,
    pub active_role: Option<Role>,
    /// Permissions of `active_role` only
    pub permissions: Vec<Permission>,
}

impl SessionContext {
    /// Rebuild the context from storage; `None` when nobody is logged in
    pub fn load(store: &dyn CredentialStore) -> Option<Self> {
        let user_id: UserId = store.get(StorageKey::UserId)?.parse().ok()?;
        let text = |key: StorageKey| store.get(key).unwrap_or_default();

        let active_role: Option<Role> = store.get(StorageKey::Role).and_then(|r| r.parse().ok());
        let permissions = match store.get(StorageKey::Permissions) {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("ignoring malformed stored permissions: {}", e);
                Vec::new()
            }),
            None => Vec::new(),
        };

        Some(Self {
            user_id,
            username: text(StorageKey::Username),
            firstname: text(StorageKey::Firstname),
            lastname: text(StorageKey::Lastname),
            email: text(StorageKey::Email),
            created_at: text(StorageKey::CreatedAt),
            updated_at: text(StorageKey::UpdatedAt),
            active_role,
            permissions,
        })
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    pub fn is_manager(&self) -> bool {
        self.active_role == Some(Role::Manager)
    }

    fn persist_profile(&self, store: &dyn CredentialStore) -> Result<(), ClientError> {
        store.set(StorageKey::Firstname, &self.firstname)?;
        store.set(StorageKey::Lastname, &self.lastname)?;
        store.set(StorageKey::Email, &self.email)?;
        store.set(StorageKey::CreatedAt, &self.created_at)?;
        store.set(StorageKey::UpdatedAt, &self.updated_at)?;
        Ok(())
    }

    fn persist_access(&self, store: &dyn CredentialStore) -> Result<(), ClientError> {
        match self.active_role {
            Some(role) => store.set(StorageKey::Role, role.as_str())?,
            None => store.remove(StorageKey::Role)?,
        }
        store.set(StorageKey::Permissions, &serde_json::to_string(&self.permissions)?)?;
        Ok(())
    }
}

/// Pick the session's active role.
///
/// Zero or one held role resolves without prompting. Two or more defer to
/// `chooser`, whose answer must be one of the held roles.
pub async fn select_active_role(
    roles: &[Role],
    chooser: &dyn RoleChooser,
) -> Result<Option<Role>, ClientError> {
    if roles.len() <= 1 {
        return Ok(roles.first().copied());
    }

    let chosen = chooser.present_choice(roles).await?;
    if !roles.contains(&chosen) {
        return Err(ClientError::invalid_selection(format!(
            "{} is not one of the held roles",
            chosen
        )));
    }
    Ok(Some(chosen))
}

/// Persist credentials, load the user record and finalize the session
/// context with a single active role.
///
/// Any previous session is dropped first. Until the role is chosen only the
/// new tokens are stored, and a failure at any step leaves the store empty.
pub async fn establish_session(
    gateway: &Gateway,
    chooser: &dyn RoleChooser,
    login: &LoginResponse,
) -> Result<SessionContext, ClientError> {
    let store = gateway.store().as_ref();
    store.clear()?;

    match complete_session(gateway, chooser, login).await {
        Ok(context) => {
            info!(
                user_id = context.user_id,
                role = ?context.active_role,
                permissions = context.permissions.len(),
                "session established"
            );
            Ok(context)
        }
        Err(e) => {
            warn!(user_id = login.user_id, error = %e, "session not established, discarding credentials");
            if let Err(clear_err) = store.clear() {
                warn!("failed to clear credential store: {}", clear_err);
            }
            Err(e)
        }
    }
}

async fn complete_session(
    gateway: &Gateway,
    chooser: &dyn RoleChooser,
    login: &LoginResponse,
) -> Result<SessionContext, ClientError> {
    let store = gateway.store().as_ref();
    // the user fetch goes through the gateway and needs the new tokens
    store.set(StorageKey::AccessToken, &login.access_token)?;
    store.set(StorageKey::RefreshToken, &login.refresh_token)?;

    let user = users::fetch_user(gateway, login.user_id).await?;
    let mut context = context_from_user(login, &user);
    context.active_role = select_active_role(&user.roles, chooser).await?;
    context.permissions = context
        .active_role
        .map(|role| user.permissions_for(role).to_vec())
        .unwrap_or_default();

    store.set(StorageKey::Username, &context.username)?;
    store.set(StorageKey::UserId, &context.user_id.to_string())?;
    context.persist_profile(store)?;
    context.persist_access(store)?;
    Ok(context)
}

fn context_from_user(login: &LoginResponse, user: &UserRecord) -> SessionContext {
    SessionContext {
        user_id: login.user_id,
        username: login.username.clone(),
        firstname: user.firstname.clone(),
        lastname: user.lastname.clone(),
        email: user.email.clone(),
        created_at: user.created_at.clone(),
        updated_at: user.updated_at.clone(),
        active_role: None,
        permissions: Vec::new(),
    }
}

/// Authenticate and establish a session
pub async fn login(
    gateway: &Gateway,
    chooser: &dyn RoleChooser,
    request: &LoginRequest,
) -> Result<SessionContext, ClientError> {
    let response = auth::login(gateway, request).await?;
    establish_session(gateway, chooser, &response).await
}

/// Create an account and establish a session for it
pub async fn register(
    gateway: &Gateway,
    chooser: &dyn RoleChooser,
    request: &RegisterRequest,
) -> Result<SessionContext, ClientError> {
    let response = auth::register(gateway, request).await?;
    establish_session(gateway, chooser, &response).await
}

/// Drop every persisted credential and profile key
pub fn logout(store: &dyn CredentialStore) -> Result<(), ClientError> {
    store.clear()?;
    info!("logged out");
    Ok(())
}
