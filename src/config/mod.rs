use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub environment: Environment,
    pub api: ApiConfig,
    pub catalog: CatalogConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    /// No timeout unless explicitly configured
    pub request_timeout_secs: Option<u64>,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub books_page_size: u32,
    pub users_page_size: u32,
    pub default_sort_direction: String,
    pub users_sort_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub default_filter: String,
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("BOOKSTORE_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // API overrides
        if let Ok(v) = env::var("BOOKSTORE_API_URL") {
            self.api.base_url = v.trim_end_matches('/').to_string();
        }
        if let Ok(v) = env::var("BOOKSTORE_REQUEST_TIMEOUT_SECS") {
            self.api.request_timeout_secs = v.parse().ok();
        }
        if let Ok(v) = env::var("BOOKSTORE_USER_AGENT") {
            self.api.user_agent = v;
        }

        // Catalog overrides
        if let Ok(v) = env::var("BOOKSTORE_BOOKS_PAGE_SIZE") {
            self.catalog.books_page_size = v.parse().unwrap_or(self.catalog.books_page_size);
        }
        if let Ok(v) = env::var("BOOKSTORE_USERS_PAGE_SIZE") {
            self.catalog.users_page_size = v.parse().unwrap_or(self.catalog.users_page_size);
        }

        // Logging overrides
        if let Ok(v) = env::var("BOOKSTORE_LOG_FILTER") {
            self.logging.default_filter = v;
        }

        self
    }

    fn user_agent() -> String {
        format!("bookstore-client/{}", env!("CARGO_PKG_VERSION"))
    }

    fn catalog_defaults() -> CatalogConfig {
        CatalogConfig {
            books_page_size: 9,
            users_page_size: 15,
            default_sort_direction: "ASC".to_string(),
            users_sort_by: "firstname".to_string(),
        }
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            api: ApiConfig {
                base_url: "http://localhost:8080".to_string(),
                request_timeout_secs: None,
                user_agent: Self::user_agent(),
            },
            catalog: Self::catalog_defaults(),
            logging: LoggingConfig {
                default_filter: "bookstore_client=debug".to_string(),
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            api: ApiConfig {
                base_url: "https://staging.bookstore.example.com".to_string(),
                request_timeout_secs: None,
                user_agent: Self::user_agent(),
            },
            catalog: Self::catalog_defaults(),
            logging: LoggingConfig {
                default_filter: "bookstore_client=info".to_string(),
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            api: ApiConfig {
                base_url: "https://bookstore.example.com".to_string(),
                request_timeout_secs: None,
                user_agent: Self::user_agent(),
            },
            catalog: Self::catalog_defaults(),
            logging: LoggingConfig {
                default_filter: "warn".to_string(),
            },
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::development()
    }
}

// Global singleton config - initialized once on first access
pub static CONFIG: Lazy<ClientConfig> = Lazy::new(ClientConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static ClientConfig {
    &CONFIG
}
