use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Key under which the access token is persisted.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

/// Synchronous key/value storage for session secrets.
pub trait TokenStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, ClientError>;
    fn save(&self, key: &str, value: &str) -> Result<(), ClientError>;
    fn clear(&self, key: &str) -> Result<(), ClientError>;
}

/// File-backed store: one TOML file per key.
///
/// # Example
/// ```no_run
/// use notes_client::auth::{FileTokenStore, TokenStore, ACCESS_TOKEN_KEY};
///
/// let store = FileTokenStore::new_default();
/// store.save(ACCESS_TOKEN_KEY, "eyJhbGciOi...")?;
/// # Ok::<(), notes_client::error::ClientError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    base_dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn new_default() -> Self {
        Self::new(crate::config::default_token_dir())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.toml", normalize_key(key)))
    }

    fn ensure_parent(path: &Path) -> Result<(), ClientError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self, key: &str) -> Result<Option<String>, ClientError> {
        let path = self.entry_path(key);
        let raw = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(ClientError::Io(err)),
        };
        let entry: StoredEntry = toml::from_str(&raw)?;
        if entry.version != ENTRY_VERSION {
            return Err(ClientError::Storage(format!(
                "unsupported entry version {} in {}",
                entry.version,
                path.display()
            )));
        }
        Ok(Some(entry.value))
    }

    fn save(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let path = self.entry_path(key);
        Self::ensure_parent(&path)?;
        let entry = StoredEntry {
            version: ENTRY_VERSION,
            key: key.to_string(),
            value: value.to_string(),
            saved_at: Utc::now(),
        };
        fs::write(&path, toml::to_string(&entry)?)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), ClientError> {
        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(ClientError::Io(err)),
        }
    }
}

/// Process-local store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `value` stored under [`ACCESS_TOKEN_KEY`].
    pub fn with_access_token(value: impl Into<String>) -> Self {
        let store = Self::new();
        store.lock().insert(ACCESS_TOKEN_KEY.to_string(), value.into());
        store
    }

    /// Current value for `key`, bypassing the trait's `Result`.
    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self, key: &str) -> Result<Option<String>, ClientError> {
        Ok(self.get(key))
    }

    fn save(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), ClientError> {
        self.lock().remove(key);
        Ok(())
    }
}

const ENTRY_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    version: u32,
    key: String,
    value: String,
    saved_at: DateTime<Utc>,
}

fn normalize_key(key: &str) -> String {
    let trimmed = key.trim();
    let mut out = String::with_capacity(trimmed.len());
    for ch in trimmed.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
            out.push(ch);
        } else {
            out.push('-');
        }
    }
    if out.trim_matches('-').is_empty() {
        "default".to_string()
    } else {
        out
    }
}
