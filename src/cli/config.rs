use std::fs;
use std::path::PathBuf;

use crate::session::store::FileStore;

const SESSION_FILE: &str = "session.json";

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("BOOKSTORE_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("bookstore").join("cli")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

pub fn session_file() -> anyhow::Result<PathBuf> {
    Ok(get_config_dir()?.join(SESSION_FILE))
}

/// Credential store shared by every CLI invocation
pub fn open_session_store() -> anyhow::Result<FileStore> {
    let path = session_file()?;
    FileStore::open(&path)
        .map_err(|e| anyhow::anyhow!("failed to open session file {}: {}", path.display(), e))
}
