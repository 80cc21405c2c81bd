//! Page-level state: what a view needs to render the feed, subscriptions and admin console.
//!
//! Each page owns its loading flag and error banner, normalizes list responses, and turns
//! [`ApiError`]s into user-facing text.

pub mod admin;
pub mod news;
pub mod subscriptions;

use crate::error::ApiError;

pub const NOT_LOGGED_IN: &str = "You are not logged in. Please log in again.";
pub const AUTHORIZATION_FAILED: &str = "Authorization failed. Please log in again.";

/// Banner text for a failed page load.
pub fn describe_error(err: &ApiError, fallback: &str) -> String {
    match err {
        ApiError::Unauthorized { .. } => AUTHORIZATION_FAILED.to_string(),
        ApiError::NotAuthenticated => NOT_LOGGED_IN.to_string(),
        ApiError::Validation { status, message } | ApiError::Server { status, message } => {
            format!("Error: {}. {}", status.as_u16(), message.as_deref().unwrap_or(""))
                .trim_end()
                .to_string()
        }
        ApiError::Network(_) | ApiError::Timeout(_) => format!("{} {}", fallback, err),
        _ => fallback.to_string(),
    }
}

/// Opaque id tying an async result to the request that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

/// Latest-only bookkeeping: starting a request supersedes the previous one, and results
/// of superseded requests are ignored.
#[derive(Debug, Default)]
pub struct LatestOnly {
    next: u64,
    active: Option<RequestId>,
}

impl LatestOnly {
    pub fn begin(&mut self) -> RequestId {
        let id = RequestId(self.next);
        self.next += 1;
        self.active = Some(id);
        id
    }

    pub fn is_active(&self, id: RequestId) -> bool {
        self.active == Some(id)
    }

    /// Finish the request if it is still the latest one.
    pub fn finish_if_active(&mut self, id: RequestId) -> bool {
        if self.is_active(id) {
            self.active = None;
            true
        } else {
            false
        }
    }
}
