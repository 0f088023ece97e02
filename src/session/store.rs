use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use thiserror::Error;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 64;

/// Errors from credential store backends
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Keys persisted for an authenticated session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    AccessToken,
    RefreshToken,
    Username,
    UserId,
    Firstname,
    Lastname,
    Email,
    CreatedAt,
    UpdatedAt,
    Role,
    Permissions,
}

impl StorageKey {
    pub const ALL: [StorageKey; 11] = [
        StorageKey::AccessToken,
        StorageKey::RefreshToken,
        StorageKey::Username,
        StorageKey::UserId,
        StorageKey::Firstname,
        StorageKey::Lastname,
        StorageKey::Email,
        StorageKey::CreatedAt,
        StorageKey::UpdatedAt,
        StorageKey::Role,
        StorageKey::Permissions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::AccessToken => "access_token",
            StorageKey::RefreshToken => "refresh_token",
            StorageKey::Username => "username",
            StorageKey::UserId => "user_id",
            StorageKey::Firstname => "firstname",
            StorageKey::Lastname => "lastname",
            StorageKey::Email => "email",
            StorageKey::CreatedAt => "created_at",
            StorageKey::UpdatedAt => "updated_at",
            StorageKey::Role => "role",
            StorageKey::Permissions => "permissions",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == raw)
    }
}

/// Change notification emitted on every store mutation.
///
/// `key` is kept raw so listeners can tell a key they do not know about
/// from one they do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub new_value: Option<String>,
}

/// Process-wide key/value storage for credentials and session context.
///
/// Mutations are expected to be serialized by the caller's event flow; the
/// backends only guard their own map.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: StorageKey) -> Option<String>;
    fn set(&self, key: StorageKey, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: StorageKey) -> Result<(), StoreError>;
    fn clear(&self) -> Result<(), StoreError>;
    fn subscribe(&self) -> broadcast::Receiver<StorageEvent>;

    fn access_token(&self) -> Option<String> {
        self.get(StorageKey::AccessToken)
    }

    fn refresh_token(&self) -> Option<String> {
        self.get(StorageKey::RefreshToken)
    }

    /// Remove both tokens, leaving profile keys untouched
    fn purge_tokens(&self) -> Result<(), StoreError> {
        self.remove(StorageKey::AccessToken)?;
        self.remove(StorageKey::RefreshToken)
    }
}

/// Map + event channel shared by the store backends
struct Entries {
    map: RwLock<BTreeMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
}

impl Entries {
    fn new(initial: BTreeMap<String, String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            map: RwLock::new(initial),
            events,
        }
    }

    fn get(&self, key: &str) -> Option<String> {
        self.map
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn snapshot(&self) -> BTreeMap<String, String> {
        self.map.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set(&self, key: &str, value: &str) {
        let previous = self
            .map
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        if previous.as_deref() != Some(value) {
            self.emit(key, Some(value.to_string()));
        }
    }

    fn remove(&self, key: &str) {
        let previous = self
            .map
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        if previous.is_some() {
            self.emit(key, None);
        }
    }

    fn clear(&self) {
        let drained = std::mem::take(&mut *self.map.write().unwrap_or_else(PoisonError::into_inner));
        for key in drained.keys() {
            self.emit(key, None);
        }
    }

    /// Replace the whole map, emitting events for every changed key
    fn replace(&self, next: BTreeMap<String, String>) -> usize {
        let previous = std::mem::replace(
            &mut *self.map.write().unwrap_or_else(PoisonError::into_inner),
            next.clone(),
        );

        let mut changed = 0;
        for (key, value) in &next {
            if previous.get(key) != Some(value) {
                self.emit(key, Some(value.clone()));
                changed += 1;
            }
        }
        for key in previous.keys() {
            if !next.contains_key(key) {
                self.emit(key, None);
                changed += 1;
            }
        }
        changed
    }

    fn emit(&self, key: &str, new_value: Option<String>) {
        // No receivers is fine; events are advisory
        let _ = self.events.send(StorageEvent {
            key: key.to_string(),
            new_value,
        });
    }
}

/// In-memory store, used in-process and by tests
pub struct MemoryStore {
    entries: Entries,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Entries::new(BTreeMap::new()),
        }
    }

    /// Inject a raw key, bypassing `StorageKey`. Mirrors another writer
    /// touching the same storage with keys this client does not own.
    pub fn set_raw(&self, key: &str, value: &str) {
        self.entries.set(key, value);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: StorageKey) -> Option<String> {
        self.entries.get(key.as_str())
    }

    fn set(&self, key: StorageKey, value: &str) -> Result<(), StoreError> {
        self.entries.set(key.as_str(), value);
        Ok(())
    }

    fn remove(&self, key: StorageKey) -> Result<(), StoreError> {
        self.entries.remove(key.as_str());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.entries.clear();
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.entries.events.subscribe()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredSession {
    updated_at: Option<DateTime<Utc>>,
    entries: BTreeMap<String, String>,
}

/// JSON file backed store; survives between CLI invocations
pub struct FileStore {
    path: PathBuf,
    entries: Entries,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let stored = Self::read_file(&path)?;
        Ok(Self {
            path,
            entries: Entries::new(stored.entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file, emitting events for keys another process changed.
    /// Returns the number of changed keys.
    ///
    /// For long-lived processes sharing the file; `open` already reads the
    /// current state, so one-shot CLI commands never need this.
    pub fn reload(&self) -> Result<usize, StoreError> {
        let stored = Self::read_file(&self.path)?;
        Ok(self.entries.replace(stored.entries))
    }

    fn read_file(path: &Path) -> Result<StoredSession, StoreError> {
        if !path.exists() {
            return Ok(StoredSession::default());
        }

        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(StoredSession::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn persist(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let stored = StoredSession {
            updated_at: Some(Utc::now()),
            entries: self.entries.snapshot(),
        };
        let content = serde_json::to_string_pretty(&stored)?;
        let mut file = Self::owner_only(&self.path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }

    /// Truncating open; the file holds tokens, so on unix it is 0600
    fn owner_only(path: &Path) -> std::io::Result<fs::File> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let file = options.open(path)?;
        // mode only applies on create; tighten files written earlier
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
        }
        Ok(file)
    }
}

impl CredentialStore for FileStore {
    fn get(&self, key: StorageKey) -> Option<String> {
        self.entries.get(key.as_str())
    }

    fn set(&self, key: StorageKey, value: &str) -> Result<(), StoreError> {
        self.entries.set(key.as_str(), value);
        self.persist()
    }

    fn remove(&self, key: StorageKey) -> Result<(), StoreError> {
        self.entries.remove(key.as_str());
        self.persist()
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.entries.clear();
        self.persist()
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.entries.events.subscribe()
    }
}
