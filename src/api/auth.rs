// api/auth.rs - token acquisition endpoints
//
// Login and register are unauthenticated, so they bypass the refresh cycle.

use tracing::debug;

use crate::api::contracts::{read_json, LoginRequest, LoginResponse, RegisterRequest};
use crate::api::gateway::{Gateway, RequestOptions};
use crate::error::ClientError;

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const REGISTER_PATH: &str = "/api/auth/register";

/// POST /api/auth/login
pub async fn login(gateway: &Gateway, request: &LoginRequest) -> Result<LoginResponse, ClientError> {
    debug!(username = %request.username, "logging in");
    let response = gateway
        .send_public(LOGIN_PATH, RequestOptions::post().json(request)?)
        .await?;
    read_json(response).await
}

/// POST /api/auth/register
pub async fn register(
    gateway: &Gateway,
    request: &RegisterRequest,
) -> Result<LoginResponse, ClientError> {
    debug!(email = %request.email, "registering account");
    let response = gateway
        .send_public(REGISTER_PATH, RequestOptions::post().json(request)?)
        .await?;
    read_json(response).await
}
