pub mod context;
pub mod store;
pub mod sync;

pub use context::{establish_session, login, logout, register, select_active_role, RoleChooser, SessionContext};
pub use store::{CredentialStore, FileStore, MemoryStore, StorageEvent, StorageKey, StoreError};
pub use sync::{spawn_auth_sync, AuthSync};
