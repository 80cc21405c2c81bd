use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

/// Failure of a call against the remote API.
///
/// The transport classifies every non-2xx response into one of the HTTP
/// variants below; wrappers and the session store return it unchanged.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No response was received (connection refused, DNS, TLS...).
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("unauthorized: {}", .message.as_deref().unwrap_or("session is no longer valid"))]
    Unauthorized { message: Option<String> },

    /// 4xx other than 401; the server usually explains what was wrong.
    #[error("request rejected ({status}): {}", .message.as_deref().unwrap_or("no details"))]
    Validation {
        status: StatusCode,
        message: Option<String>,
    },

    #[error("server error ({status}): {}", .message.as_deref().unwrap_or("no details"))]
    Server {
        status: StatusCode,
        message: Option<String>,
    },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid request path {path}: {source}")]
    InvalidUrl {
        path: String,
        #[source]
        source: url::ParseError,
    },

    /// The call needs a session token and none is stored.
    #[error("not logged in")]
    NotAuthenticated,

    /// Admin operations are refused locally for non-admin sessions.
    #[error("admin role required")]
    NotAdmin,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// Pull a human readable message out of an error body.
/// `message` wins over `error`; anything that is not such an object yields `None`.
pub fn extract_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed
        .message
        .or(parsed.error)
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
}

impl ApiError {
    /// Classify a non-success response.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let message = extract_message(body);
        if status == StatusCode::UNAUTHORIZED {
            ApiError::Unauthorized { message }
        } else if status.is_client_error() {
            ApiError::Validation { status, message }
        } else {
            ApiError::Server { status, message }
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. } | ApiError::NotAuthenticated)
    }

    /// HTTP status of the response, if one was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED),
            ApiError::Validation { status, .. } | ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message provided by the server, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized { message }
            | ApiError::Validation { message, .. }
            | ApiError::Server { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Text suitable for an error banner: the server's message when it sent one,
    /// otherwise `fallback` (with transport details appended when there was no response).
    pub fn user_message(&self, fallback: &str) -> String {
        if let Some(message) = self.server_message() {
            return message.to_string();
        }
        match self {
            ApiError::Network(_) | ApiError::Timeout(_) => format!("{}: {}", fallback, self),
            _ => fallback.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_statuses() {
        assert!(matches!(
            ApiError::from_response(StatusCode::UNAUTHORIZED, ""),
            ApiError::Unauthorized { message: None }
        ));
        let err = ApiError::from_response(StatusCode::BAD_REQUEST, r#"{"error":"invalid source id"}"#);
        assert!(matches!(err, ApiError::Validation { .. }));
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
        assert_eq!(err.server_message(), Some("invalid source id"));

        let err = ApiError::from_response(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert!(matches!(err, ApiError::Server { message: None, .. }));
        assert_eq!(err.status(), Some(StatusCode::BAD_GATEWAY));
    }

    #[test]
    fn message_field_wins_over_error_field() {
        assert_eq!(
            extract_message(r#"{"message":"first","error":"second"}"#).as_deref(),
            Some("first")
        );
        assert_eq!(extract_message(r#"{"error":"  "}"#), None);
        assert_eq!(extract_message("[1,2,3]"), None);
    }

    #[test]
    fn user_message_falls_back() {
        let err = ApiError::from_response(StatusCode::INTERNAL_SERVER_ERROR, "{}");
        assert_eq!(err.user_message("Failed to load news"), "Failed to load news");

        let err = ApiError::from_response(StatusCode::TOO_MANY_REQUESTS, r#"{"error":"refresh limit reached"}"#);
        assert_eq!(err.user_message("Failed to refresh"), "refresh limit reached");

        let err = ApiError::Timeout(Duration::from_secs(15));
        assert!(err.user_message("Failed to load news").starts_with("Failed to load news: request timed out"));
    }
}
