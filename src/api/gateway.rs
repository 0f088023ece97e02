// Authenticated Request Gateway
//
// Every API call goes through `Gateway::fetch`. The bearer credential comes
// from the injected credential store. A 401 triggers at most one
// refresh-and-retry cycle.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::api::contracts::{RefreshRequest, RefreshResponse};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::session::store::{CredentialStore, StorageKey};

pub const REFRESH_PATH: &str = "/api/auth/refresh";

/// Method, body and caller headers for a single request
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Vec<u8>>,
    pub headers: HeaderMap,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            body: None,
            headers: HeaderMap::new(),
        }
    }
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn method(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn post() -> Self {
        Self::method(Method::POST)
    }

    pub fn put() -> Self {
        Self::method(Method::PUT)
    }

    pub fn delete() -> Self {
        Self::method(Method::DELETE)
    }

    /// Serialize `body` as the JSON request body
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ClientError> {
        self.body = Some(serde_json::to_vec(body)?);
        Ok(self)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// HTTP gateway bound to one API base URL and one credential store
#[derive(Clone)]
pub struct Gateway {
    http: reqwest::Client,
    base_url: Url,
    store: Arc<dyn CredentialStore>,
}

impl Gateway {
    pub fn new(base_url: &str, store: Arc<dyn CredentialStore>) -> Result<Self, ClientError> {
        Self::with_client(reqwest::Client::new(), base_url, store)
    }

    pub fn with_client(
        http: reqwest::Client,
        base_url: &str,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(base_url)?;
        // a trailing slash keeps any path prefix when joining
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            http,
            base_url,
            store,
        })
    }

    /// Build from configuration (user agent, optional timeout)
    pub fn from_config(
        config: &ClientConfig,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder().user_agent(config.api.user_agent.clone());
        if let Some(timeout) = config.api.request_timeout() {
            builder = builder.timeout(timeout);
        }
        Self::with_client(builder.build()?, &config.api.base_url, store)
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a path (with optional query) or absolute URL.
    ///
    /// Paths are relative to the base URL including its path, so
    /// `/api/books` against `http://host/store` is `http://host/store/api/books`.
    pub fn url(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Issue an authenticated request.
    ///
    /// Non-401 responses are returned untouched, whatever their status. On a
    /// 401 the refresh procedure runs once. If it yields a new access token,
    /// the request is re-issued once and that response is returned.
    /// Otherwise the call fails with `ClientError::Unauthorized`.
    pub async fn fetch(&self, path: &str, options: RequestOptions) -> Result<Response, ClientError> {
        let url = self.url(path)?;
        let token = self.store.access_token();

        let response = self.send(&url, &options, token.as_deref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!(%url, "access token rejected, attempting refresh");
        let fresh = match self.refresh_access_token().await? {
            Some(fresh) => fresh,
            None => return Err(ClientError::Unauthorized),
        };

        self.send(&url, &options, Some(&fresh)).await
    }

    /// Issue a request without credentials and without refresh handling
    pub async fn send_public(&self, path: &str, options: RequestOptions) -> Result<Response, ClientError> {
        let url = self.url(path)?;
        self.send(&url, &options, None).await
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// Returns `Ok(None)` when no refresh token is stored (no request is
    /// made) or when the server rejects it (both tokens are purged).
    pub async fn refresh_access_token(&self) -> Result<Option<String>, ClientError> {
        let refresh_token = match self.store.refresh_token() {
            Some(token) => token,
            None => {
                debug!("no refresh token stored");
                return Ok(None);
            }
        };

        let url = self.url(REFRESH_PATH)?;
        let options = RequestOptions::post().json(&RefreshRequest { refresh_token })?;
        let response = self.send(&url, &options, None).await?;

        if !response.status().is_success() {
            warn!(status = response.status().as_u16(), "refresh rejected, purging stored tokens");
            self.store.purge_tokens()?;
            return Ok(None);
        }

        let body = response.text().await?;
        let refreshed: RefreshResponse = serde_json::from_str(&body)
            .map_err(|e| ClientError::decode(format!("refresh response: {}", e)))?;

        self.store.set(StorageKey::AccessToken, &refreshed.access_token)?;
        info!("access token refreshed");
        Ok(Some(refreshed.access_token))
    }

    async fn send(
        &self,
        url: &Url,
        options: &RequestOptions,
        token: Option<&str>,
    ) -> Result<Response, ClientError> {
        let headers = Self::compose_headers(&options.headers, token)?;

        let mut request = self
            .http
            .request(options.method.clone(), url.clone())
            .headers(headers);
        if let Some(body) = &options.body {
            request = request.body(body.clone());
        }

        debug!(method = %options.method, %url, "sending request");
        let response = request.send().await?;
        debug!(method = %options.method, %url, status = response.status().as_u16(), "response received");
        Ok(response)
    }

    /// Caller headers first, then the JSON content type, then the bearer
    /// token when one is present. Later inserts win.
    fn compose_headers(caller: &HeaderMap, token: Option<&str>) -> Result<HeaderMap, ClientError> {
        let mut headers = caller.clone();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ClientError::invalid_input("access token is not a valid header value"))?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }
}
