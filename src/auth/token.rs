use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use super::store::{TokenStore, ACCESS_TOKEN_KEY};

/// The single shared access token.
///
/// Every clone observes the same value. Reads never touch the backing store;
/// writes go through to it, and a failed write leaves memory authoritative. Only the
/// [`RefreshCoordinator`](super::RefreshCoordinator) mutates it.
#[derive(Clone)]
pub struct AccessToken {
    value: Arc<RwLock<Option<String>>>,
    store: Arc<dyn TokenStore>,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("present", &self.is_present())
            .finish()
    }
}

impl AccessToken {
    /// Hydrate from `store`. A store that cannot be read starts the session logged out.
    pub fn load(store: Arc<dyn TokenStore>) -> Self {
        let initial = match store.load(ACCESS_TOKEN_KEY) {
            Ok(value) => value.filter(|token| !token.is_empty()),
            Err(err) => {
                tracing::warn!(error = %err, "Failed to load persisted access token");
                None
            }
        };
        Self {
            value: Arc::new(RwLock::new(initial)),
            store,
        }
    }

    pub fn get(&self) -> Option<String> {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_present(&self) -> bool {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub(crate) fn set(&self, token: String) {
        if let Err(err) = self.store.save(ACCESS_TOKEN_KEY, &token) {
            tracing::warn!(error = %err, "Failed to persist access token");
        }
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    pub(crate) fn clear(&self) {
        if let Err(err) = self.store.clear(ACCESS_TOKEN_KEY) {
            tracing::warn!(error = %err, "Failed to clear persisted access token");
        }
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::{FileTokenStore, MemoryTokenStore};
    use crate::error::ClientError;
    use tempfile::TempDir;

    struct BrokenStore;

    impl TokenStore for BrokenStore {
        fn load(&self, _key: &str) -> Result<Option<String>, ClientError> {
            Err(ClientError::Storage("disk on fire".into()))
        }
        fn save(&self, _key: &str, _value: &str) -> Result<(), ClientError> {
            Err(ClientError::Storage("disk on fire".into()))
        }
        fn clear(&self, _key: &str) -> Result<(), ClientError> {
            Err(ClientError::Storage("disk on fire".into()))
        }
    }

    #[test]
    fn hydrates_from_store() {
        let token = AccessToken::load(Arc::new(MemoryTokenStore::with_access_token("abc")));
        assert_eq!(token.get().as_deref(), Some("abc"));
    }

    #[test]
    fn clones_share_one_value() {
        let store = Arc::new(MemoryTokenStore::new());
        let token = AccessToken::load(store.clone());
        let other = token.clone();
        token.set("fresh".into());
        assert_eq!(other.get().as_deref(), Some("fresh"));
        assert_eq!(store.get(ACCESS_TOKEN_KEY).as_deref(), Some("fresh"));
        other.clear();
        assert!(!token.is_present());
        assert!(store.get(ACCESS_TOKEN_KEY).is_none());
    }

    #[test]
    fn survives_reload_through_file_store() {
        let dir = TempDir::new().unwrap();
        AccessToken::load(Arc::new(FileTokenStore::new(dir.path()))).set("persisted".into());
        let reloaded = AccessToken::load(Arc::new(FileTokenStore::new(dir.path())));
        assert_eq!(reloaded.get().as_deref(), Some("persisted"));
    }

    #[test]
    fn store_failures_keep_memory_authoritative() {
        let token = AccessToken::load(Arc::new(BrokenStore));
        assert!(!token.is_present());
        token.set("in-memory".into());
        assert_eq!(token.get().as_deref(), Some("in-memory"));
        token.clear();
        assert!(token.get().is_none());
    }

    #[test]
    fn debug_does_not_leak_token() {
        let token = AccessToken::load(Arc::new(MemoryTokenStore::with_access_token("secret")));
        let rendered = format!("{token:?}");
        assert!(!rendered.contains("secret"));
    }
}
