use std::sync::Mutex;
use tracing::info;

pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
/// Where a 401 outside the auth pages sends the user.
pub const SESSION_EXPIRED_REDIRECT: &str = "/login?sessionExpired=true";

/// The host's notion of "where the user currently is".
pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;
    fn redirect(&self, to: &str);
}

/// True on the login or registration page (including query-string variants).
pub fn is_auth_page(path: &str) -> bool {
    path.contains(LOGIN_PATH) || path.contains(REGISTER_PATH)
}

#[derive(Debug, Default)]
struct LocationState {
    path: String,
    redirects: Vec<String>,
}

/// In-process navigator: tracks the current path and every redirect it received.
#[derive(Debug, Default)]
pub struct Location {
    state: Mutex<LocationState>,
}

impl Location {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(LocationState {
                path: path.into(),
                redirects: Vec::new(),
            }),
        }
    }

    pub fn redirects(&self) -> Vec<String> {
        self.state().redirects.clone()
    }

    /// True once a session-expired redirect has been issued.
    pub fn session_expired(&self) -> bool {
        self.state()
            .redirects
            .iter()
            .any(|r| r == SESSION_EXPIRED_REDIRECT)
    }

    fn state(&self) -> std::sync::MutexGuard<'_, LocationState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Navigator for Location {
    fn current_path(&self) -> String {
        self.state().path.clone()
    }

    fn redirect(&self, to: &str) {
        let mut state = self.state();
        info!(from = %state.path, to, "redirecting");
        state.path = to.to_string();
        state.redirects.push(to.to_string());
    }
}
