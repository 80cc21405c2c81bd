//! Client-held authentication state.
//!
//! A [`SessionStore`] is created explicitly (there is no global instance) and handed to
//! whatever needs it, usually behind an `Arc`. Observers receive every transition through
//! a `watch` channel.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api;
use crate::error::ApiError;
use crate::models::{AuthResponse, RegisterRequest, UserProfile};
use crate::storage::{self, SessionStorage, TOKEN_KEY};
use crate::transport::ApiClient;

pub const LOGIN_FAILED: &str = "Login failed";
pub const REGISTRATION_FAILED: &str = "Registration failed";

/// Snapshot of the session. `is_authenticated` always equals `token.is_some()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub user: Option<UserProfile>,
    pub token: Option<String>,
    pub is_authenticated: bool,
    pub loading: bool,
    pub error: Option<String>,
}

impl Session {
    pub fn authenticated(user: UserProfile, token: String) -> Self {
        Self {
            user: Some(user),
            token: Some(token),
            is_authenticated: true,
            loading: false,
            error: None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(UserProfile::is_admin)
    }

    fn clear_credentials(&mut self) {
        self.user = None;
        self.token = None;
        self.is_authenticated = false;
    }
}

pub struct SessionStore {
    client: ApiClient,
    state: watch::Sender<Session>,
}

impl SessionStore {
    /// Build the store from whatever the client's storage holds. Both the token and the
    /// user record must be present to start authenticated.
    pub fn hydrate(client: ApiClient) -> Self {
        let initial = match storage::load_credentials(client.storage().as_ref()) {
            Some((user, token)) => {
                debug!(user_id = user.id, "session restored from storage");
                Session::authenticated(user, token)
            }
            None => Session::default(),
        };
        let (state, _) = watch::channel(initial);
        Self { client, state }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    fn storage(&self) -> &Arc<dyn SessionStorage> {
        self.client.storage()
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated
    }

    fn begin(&self, clear_error: bool) {
        self.state.send_modify(|s| {
            s.loading = true;
            if clear_error {
                s.error = None;
            }
        });
    }

    fn accept(&self, auth: AuthResponse) -> UserProfile {
        if let Err(e) = storage::persist_credentials(self.storage().as_ref(), &auth.user, &auth.token) {
            warn!(error = %e, "failed to persist session");
        }
        let user = auth.user.clone();
        self.state
            .send_replace(Session::authenticated(auth.user, auth.token));
        user
    }

    fn reject(&self, message: String) {
        if let Err(e) = storage::clear_credentials(self.storage().as_ref()) {
            warn!(error = %e, "failed to clear stored credentials");
        }
        self.state.send_modify(|s| {
            s.clear_credentials();
            s.loading = false;
            s.error = Some(message);
        });
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, ApiError> {
        info!(email, "logging in");
        self.begin(true);
        match api::auth::login(&self.client, email, password).await {
            Ok(auth) => {
                let user = self.accept(auth);
                info!(user_id = user.id, "login successful");
                Ok(user)
            }
            Err(e) => {
                warn!(error = %e, "login failed");
                self.reject(e.user_message(LOGIN_FAILED));
                Err(e)
            }
        }
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<UserProfile, ApiError> {
        info!(email = %request.email, "registering");
        self.begin(true);
        match api::auth::register(&self.client, request).await {
            Ok(auth) => {
                let user = self.accept(auth);
                info!(user_id = user.id, "registration successful");
                Ok(user)
            }
            Err(e) => {
                warn!(error = %e, "registration failed");
                self.reject(e.user_message(REGISTRATION_FAILED));
                Err(e)
            }
        }
    }

    /// Refresh the user record using the stored token. Without a token, or on any
    /// failure, the session is forced back to anonymous and storage is wiped.
    pub async fn fetch_current_user(&self) -> Result<UserProfile, ApiError> {
        let Some(token) = self.storage().get(TOKEN_KEY).filter(|t| !t.is_empty()) else {
            debug!("no stored token; skipping profile fetch");
            self.force_anonymous();
            return Err(ApiError::NotAuthenticated);
        };

        self.begin(false);
        match api::auth::current_user(&self.client).await {
            Ok(user) => {
                if let Err(e) = storage::persist_user(self.storage().as_ref(), &user) {
                    warn!(error = %e, "failed to persist user record");
                }
                self.state.send_modify(|s| {
                    s.user = Some(user.clone());
                    s.token = Some(token);
                    s.is_authenticated = true;
                    s.loading = false;
                });
                debug!(user_id = user.id, "current user refreshed");
                Ok(user)
            }
            Err(e) => {
                warn!(error = %e, "failed to restore current user; clearing session");
                self.force_anonymous();
                Err(e)
            }
        }
    }

    fn force_anonymous(&self) {
        if let Err(e) = storage::clear_credentials(self.storage().as_ref()) {
            warn!(error = %e, "failed to clear stored credentials");
        }
        self.state.send_modify(|s| {
            s.clear_credentials();
            s.loading = false;
        });
    }

    /// Drop the session locally. The in-memory state is cleared even if storage fails.
    pub fn logout(&self) -> Result<()> {
        info!("logging out");
        self.state.send_replace(Session::default());
        storage::clear_credentials(self.storage().as_ref())
    }

    /// Install credentials without a network round trip.
    pub fn set_credentials(&self, user: UserProfile, token: String) -> Result<()> {
        let persisted = storage::persist_credentials(self.storage().as_ref(), &user, &token);
        self.state
            .send_replace(Session::authenticated(user, token));
        persisted
    }

    pub fn clear_error(&self) {
        self.state.send_modify(|s| s.error = None);
    }

    /// Bring the in-memory session in line with storage, e.g. after the transport wiped
    /// credentials on a 401. Returns true if the session changed.
    pub fn reconcile(&self) -> bool {
        let stored = storage::load_credentials(self.storage().as_ref());
        self.state.send_if_modified(|s| match stored {
            Some((user, token)) => {
                if s.token.as_deref() == Some(token.as_str()) && s.user.as_ref() == Some(&user) {
                    return false;
                }
                *s = Session::authenticated(user, token);
                true
            }
            None => {
                if !s.is_authenticated && s.user.is_none() {
                    return false;
                }
                s.clear_credentials();
                true
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::storage::{MemoryStorage, USER_KEY};

    fn store_with(storage: Arc<MemoryStorage>) -> SessionStore {
        let client = ApiClient::new("http://127.0.0.1:9", storage).expect("client");
        SessionStore::hydrate(client)
    }

    fn reader() -> UserProfile {
        UserProfile {
            id: 3,
            email: Some("reader@example.org".to_string()),
            role: Role::User,
            ..Default::default()
        }
    }

    #[test]
    fn hydrates_from_storage() {
        let storage = Arc::new(MemoryStorage::new());
        storage::persist_credentials(storage.as_ref(), &reader(), "T").unwrap();

        let store = store_with(storage);
        let session = store.snapshot();
        assert!(session.is_authenticated);
        assert_eq!(session.token.as_deref(), Some("T"));
        assert_eq!(session.user, Some(reader()));
    }

    #[test]
    fn token_without_user_starts_anonymous() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(TOKEN_KEY, "T").unwrap();
        let store = store_with(storage);
        assert!(!store.is_authenticated());
    }

    #[test]
    fn set_credentials_then_logout() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_with(storage.clone());
        let mut rx = store.subscribe();

        store.set_credentials(reader(), "T".to_string()).unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_authenticated);
        assert_eq!(storage.get(TOKEN_KEY).as_deref(), Some("T"));
        assert!(storage.get(USER_KEY).is_some());

        store.logout().unwrap();
        assert_eq!(store.snapshot(), Session::default());
        assert!(storage.is_empty());
    }

    #[test]
    fn reconcile_follows_storage() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_with(storage.clone());
        store.set_credentials(reader(), "T".to_string()).unwrap();
        assert!(!store.reconcile());

        storage::clear_credentials(storage.as_ref()).unwrap();
        assert!(store.reconcile());
        let session = store.snapshot();
        assert!(!session.is_authenticated);
        assert!(session.token.is_none());
        assert!(session.user.is_none());
    }

    #[tokio::test]
    async fn fetch_without_token_makes_no_request() {
        let store = store_with(Arc::new(MemoryStorage::new()));
        let err = store.fetch_current_user().await.unwrap_err();
        assert!(matches!(err, ApiError::NotAuthenticated));
        assert!(!store.snapshot().loading);
    }
}
