//! Admin-only endpoints. The server enforces the role; callers get a 401/403 otherwise.

use super::get_page;
use crate::envelope::Page;
use crate::error::ApiError;
use crate::models::{
    Category, CreateCategoryRequest, CreateSourceRequest, MessageResponse, Source, UpdateSourceRequest,
    UserProfile,
};
use crate::transport::{paging, ApiClient};

pub async fn stats(client: &ApiClient) -> Result<serde_json::Value, ApiError> {
    client.get("/admin/stats", &[]).await
}

pub async fn users(client: &ApiClient, page: u32, page_size: u32) -> Result<Page<UserProfile>, ApiError> {
    get_page(client, "/admin/users", &paging(page, page_size)).await
}

pub async fn make_admin(client: &ApiClient, user_id: i64) -> Result<MessageResponse, ApiError> {
    client
        .post_empty(&format!("/admin/users/{}/make-admin", user_id))
        .await
}

pub async fn remove_admin(client: &ApiClient, user_id: i64) -> Result<MessageResponse, ApiError> {
    client
        .post_empty(&format!("/admin/users/{}/remove-admin", user_id))
        .await
}

pub async fn create_source(client: &ApiClient, request: &CreateSourceRequest) -> Result<Source, ApiError> {
    client.post("/admin/sources", request).await
}

pub async fn update_source(
    client: &ApiClient,
    source_id: i64,
    request: &UpdateSourceRequest,
) -> Result<Source, ApiError> {
    client
        .put(&format!("/admin/sources/{}", source_id), request)
        .await
}

pub async fn delete_source(client: &ApiClient, source_id: i64) -> Result<MessageResponse, ApiError> {
    client
        .delete(&format!("/admin/sources/{}", source_id))
        .await
}

pub async fn add_category(client: &ApiClient, name: &str) -> Result<Category, ApiError> {
    let body = CreateCategoryRequest {
        name: name.to_string(),
    };
    client.post("/admin/categories", &body).await
}
