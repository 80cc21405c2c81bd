use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account role as reported by the API. Anything unrecognised is treated as a plain user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    #[serde(other)]
    User,
}

/// The logged-in user, replaced wholesale on every profile fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tg_chat_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tg_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tg_first_name: Option<String>,
}

impl UserProfile {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Email when known, else the Telegram handle, else the numeric id.
    pub fn display_name(&self) -> String {
        self.email
            .clone()
            .or_else(|| self.tg_username.as_ref().map(|u| format!("@{}", u)))
            .unwrap_or_else(|| format!("user #{}", self.id))
    }
}

fn default_active() -> bool {
    true
}

/// A news source. Subscription listings use `source_id`/`source_name` and decode into the
/// same type; some endpoints send `title` instead of `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    #[serde(alias = "source_id")]
    pub id: i64,
    #[serde(default, alias = "title", alias = "source_name")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl Source {
    pub fn display_name(&self) -> String {
        if self.name.trim().is_empty() {
            format!("Source {}", self.id)
        } else {
            self.name.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
}

// Request bodies

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscribeRequest {
    pub source_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateSourceRequest {
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    pub is_active: bool,
}

/// Partial update; `None` fields are left untouched by the server.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateSourceRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl UpdateSourceRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.url.is_none() && self.category_id.is_none() && self.is_active.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateCategoryRequest {
    pub name: String,
}

// Responses

/// Reply of `/auth/login` and `/auth/register`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub user: UserProfile,
    pub token: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// Reply of `POST /user/refresh`; the refresh itself runs server-side.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefreshAccepted {
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn subscription_entries_decode_as_sources() {
        let source: Source = serde_json::from_value(json!({
            "source_id": 4,
            "source_name": "Lenta",
            "is_active": true
        }))
        .expect("decode subscription");
        assert_eq!(source.id, 4);
        assert_eq!(source.name, "Lenta");

        let titled: Source = serde_json::from_value(json!({"id": 5, "title": "RBC"})).expect("decode titled");
        assert_eq!(titled.display_name(), "RBC");
        assert!(titled.is_active);

        let nameless: Source = serde_json::from_value(json!({"id": 6})).expect("decode nameless");
        assert_eq!(nameless.display_name(), "Source 6");
    }

    #[test]
    fn unknown_role_is_user() {
        let user: UserProfile = serde_json::from_value(json!({"id": 1, "role": "moderator"})).expect("decode");
        assert_eq!(user.role, Role::User);
        let admin: UserProfile = serde_json::from_value(json!({"id": 2, "role": "admin"})).expect("decode");
        assert!(admin.is_admin());
    }

    #[test]
    fn update_request_omits_unset_fields() {
        let req = UpdateSourceRequest {
            is_active: Some(false),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&req).unwrap(), json!({"is_active": false}));
        assert!(UpdateSourceRequest::default().is_empty());
    }
}
