use std::rc::Rc;

use crate::config::PortalConfig;
use crate::error::StorageError;
use crate::storage::KeyValueStore;

/// Token and username accessors over durable storage.
///
/// Both values are written and removed together so a reader never sees one
/// without the other.
#[derive(Clone)]
pub struct SessionStore {
    store: Rc<dyn KeyValueStore>,
    token_key: String,
    username_key: String,
}

impl SessionStore {
    pub fn new(store: Rc<dyn KeyValueStore>, config: &PortalConfig) -> Self {
        Self {
            store,
            token_key: config.token_key.clone(),
            username_key: config.username_key.clone(),
        }
    }

    pub fn save(&self, token: &str, username: &str) -> Result<(), StorageError> {
        self.store.set_item(&self.token_key, token)?;
        if let Err(error) = self.store.set_item(&self.username_key, username) {
            if let Err(rollback) = self.store.remove_item(&self.token_key) {
                tracing::warn!(error = %rollback, "failed to roll back session token");
            }
            return Err(error);
        }
        Ok(())
    }

    pub fn token(&self) -> Option<String> {
        self.read(&self.token_key)
    }

    pub fn username(&self) -> Option<String> {
        self.read(&self.username_key)
    }

    pub fn clear(&self) {
        for key in [&self.token_key, &self.username_key] {
            if let Err(error) = self.store.remove_item(key) {
                tracing::warn!(%error, "failed to clear session value");
            }
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.token().is_some_and(|token| !token.is_empty())
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get_item(key) {
            Ok(value) => value,
            Err(error) => {
                tracing::debug!(%error, "session read failed; treating as absent");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    /// Accepts the token write and refuses the username write.
    struct HalfBrokenStore {
        inner: MemoryStore,
    }

    impl KeyValueStore for HalfBrokenStore {
        fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get_item(key)
        }

        fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if key == "username" {
                return Err(StorageError::Write {
                    key: key.to_string(),
                });
            }
            self.inner.set_item(key, value)
        }

        fn remove_item(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove_item(key)
        }
    }

    /// Refuses the username write and every removal.
    struct StuckStore {
        inner: MemoryStore,
    }

    impl KeyValueStore for StuckStore {
        fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get_item(key)
        }

        fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if key == "username" {
                return Err(StorageError::Write {
                    key: key.to_string(),
                });
            }
            self.inner.set_item(key, value)
        }

        fn remove_item(&self, key: &str) -> Result<(), StorageError> {
            Err(StorageError::Remove {
                key: key.to_string(),
            })
        }
    }

    struct UnavailableStore;

    impl KeyValueStore for UnavailableStore {
        fn get_item(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable)
        }

        fn set_item(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable)
        }

        fn remove_item(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable)
        }
    }

    fn session(store: MemoryStore) -> SessionStore {
        SessionStore::new(Rc::new(store), &PortalConfig::default())
    }

    #[test]
    fn save_then_clear_leaves_nothing_behind() {
        let store = MemoryStore::new();
        let session = session(store.clone());
        session.save("tok-1", "alice").expect("save");
        assert_eq!(session.token().as_deref(), Some("tok-1"));
        assert_eq!(session.username().as_deref(), Some("alice"));

        session.clear();
        assert_eq!(session.token(), None);
        assert_eq!(session.username(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn clear_is_idempotent() {
        let session = session(MemoryStore::new());
        session.clear();
        session.clear();
        assert!(!session.is_logged_in());
    }

    #[test]
    fn empty_token_is_not_logged_in() {
        let session = session(MemoryStore::new());
        session.save("", "alice").expect("save");
        assert!(!session.is_logged_in());
        session.save("tok", "alice").expect("save");
        assert!(session.is_logged_in());
    }

    #[test]
    fn failed_username_write_rolls_back_token() {
        let inner = MemoryStore::new();
        let session = SessionStore::new(
            Rc::new(HalfBrokenStore {
                inner: inner.clone(),
            }),
            &PortalConfig::default(),
        );
        let error = session.save("tok", "alice").expect_err("username write fails");
        assert!(matches!(error, StorageError::Write { .. }));
        assert!(session.token().is_none());
        assert!(inner.is_empty());
    }

    #[test]
    fn failed_rollback_still_reports_the_username_write() {
        let inner = MemoryStore::new();
        let session = SessionStore::new(
            Rc::new(StuckStore {
                inner: inner.clone(),
            }),
            &PortalConfig::default(),
        );
        let error = session.save("tok", "alice").expect_err("username write fails");
        assert_eq!(
            error,
            StorageError::Write {
                key: "username".to_string()
            }
        );
        assert!(inner.contains_key("access_token"));
        assert!(!inner.contains_key("username"));
    }

    #[test]
    fn unavailable_storage_reads_as_absent() {
        let session = SessionStore::new(Rc::new(UnavailableStore), &PortalConfig::default());
        assert_eq!(session.token(), None);
        assert_eq!(session.username(), None);
        assert!(!session.is_logged_in());
        session.clear();
    }
}
