use crate::error::ApiError;
use crate::models::{AuthResponse, LoginRequest, MessageResponse, RegisterRequest, UserProfile};
use crate::transport::ApiClient;

pub async fn login(client: &ApiClient, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
    let body = LoginRequest {
        email: email.to_string(),
        password: password.to_string(),
    };
    client.post("/auth/login", &body).await
}

pub async fn register(client: &ApiClient, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
    client.post("/auth/register", request).await
}

/// Server-side logout notification. Clearing the local session does not depend on it.
pub async fn logout(client: &ApiClient) -> Result<MessageResponse, ApiError> {
    client.post_empty("/auth/logout").await
}

pub async fn current_user(client: &ApiClient) -> Result<UserProfile, ApiError> {
    client.get("/user/profile", &[]).await
}
