//! Persisted login state.

use std::sync::Arc;

use tracing::{info, warn};

use folio_core::constants::{TOKEN_KEY, USER_ID_KEY};
use folio_core::error::{FolioError, Result};
use folio_core::traits::Storage;
use folio_core::types::SessionState;

/// Reads and writes the stored user id and bearer token.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn Storage>,
}

impl SessionStore {
    /// Creates a session store over `storage`.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.storage.get_item(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Failed to read session");
                None
            }
        }
    }

    /// The current session. Unreadable storage reads as logged out.
    pub fn session(&self) -> SessionState {
        SessionState {
            user_id: self.read(USER_ID_KEY),
            token: self.read(TOKEN_KEY),
        }
    }

    /// Stores a new login.
    pub fn establish(&self, user_id: &str, token: &str) -> Result<SessionState> {
        let user_id = user_id.trim();
        let token = token.trim();
        if user_id.is_empty() || token.is_empty() {
            return Err(FolioError::ValidationError(
                "user id and token are required".into(),
            ));
        }

        self.storage.set_item(USER_ID_KEY, user_id)?;
        if let Err(e) = self.storage.set_item(TOKEN_KEY, token) {
            let _ = self.storage.remove_item(USER_ID_KEY);
            return Err(e);
        }

        info!(user_id, "Session established");
        Ok(SessionState::new(user_id, token))
    }

    /// Forgets the stored login.
    pub fn clear(&self) -> Result<()> {
        self.storage.remove_item(TOKEN_KEY)?;
        self.storage.remove_item(USER_ID_KEY)?;
        info!("Session cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_cache::MemoryStorage;

    fn store() -> SessionStore {
        SessionStore::new(Arc::new(MemoryStorage::new()))
    }

    #[test]
    fn test_anonymous_by_default() {
        let session = store().session();
        assert!(!session.is_logged_in());
        assert_eq!(session, SessionState::anonymous());
    }

    #[test]
    fn test_establish_and_clear() {
        let store = store();
        let session = store.establish(" u1 ", "tok").unwrap();
        assert_eq!(session, SessionState::new("u1", "tok"));
        assert_eq!(store.session(), session);

        store.clear().unwrap();
        assert!(!store.session().is_logged_in());
    }

    #[test]
    fn test_blank_credentials_rejected() {
        let store = store();
        assert!(matches!(
            store.establish("u1", "  "),
            Err(FolioError::ValidationError(_))
        ));
        assert!(store.session().user_id.is_none());
    }

    #[test]
    fn test_failed_token_write_leaves_no_user() {
        // Large enough for the user id only.
        let store = SessionStore::new(Arc::new(MemoryStorage::with_quota(16)));
        let token = "t".repeat(64);
        assert!(store.establish("u1", &token).is_err());
        assert!(store.session().user_id.is_none());
    }
}
