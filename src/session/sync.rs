// Advisory storage-change listener.
//
// Keeps a `watch` channel of "is authenticated" in step with the credential
// store, including changes made by another process sharing the same store
// (surfaced through `FileStore::reload`). Delivery order is not guaranteed
// and events for keys this client does not own are ignored.

use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::session::store::{CredentialStore, StorageEvent, StorageKey};

/// Handle to a running sync listener
pub struct AuthSync {
    authenticated: watch::Receiver<bool>,
    task: JoinHandle<()>,
}

impl AuthSync {
    pub fn authenticated(&self) -> watch::Receiver<bool> {
        self.authenticated.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        *self.authenticated.borrow()
    }

    pub fn stop(self) {
        self.task.abort();
    }
}

/// Spawn the listener on the current tokio runtime.
///
/// Library API for long-lived embedders that share a store across
/// components. The `bookstore` binary re-opens the session file on every
/// invocation and does not run a listener.
pub fn spawn_auth_sync(store: Arc<dyn CredentialStore>) -> AuthSync {
    let mut events = store.subscribe();
    let (tx, rx) = watch::channel(store.access_token().is_some());

    let task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Some(authenticated) = apply_event(&event, store.as_ref()) {
                        tx.send_replace(authenticated);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "storage events lagged, re-reading store");
                    tx.send_replace(store.access_token().is_some());
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    AuthSync {
        authenticated: rx,
        task,
    }
}

/// New authenticated state for an event, or `None` when the event is not
/// about the access token.
fn apply_event(event: &StorageEvent, store: &dyn CredentialStore) -> Option<bool> {
    match StorageKey::parse(&event.key) {
        Some(StorageKey::AccessToken) => Some(store.access_token().is_some()),
        Some(_) => None,
        None => {
            debug!(key = %event.key, "ignoring storage event for unknown key");
            None
        }
    }
}
