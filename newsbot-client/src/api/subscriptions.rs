use super::get_page;
use crate::error::ApiError;
use crate::models::{MessageResponse, Source, SubscribeRequest};
use crate::transport::ApiClient;

/// Sources the current user is subscribed to.
pub async fn subscriptions(client: &ApiClient) -> Result<Vec<Source>, ApiError> {
    Ok(get_page(client, "/user/subscriptions/", &[]).await?.items)
}

pub async fn subscribe(client: &ApiClient, source_id: i64) -> Result<MessageResponse, ApiError> {
    client
        .post("/user/subscriptions/", &SubscribeRequest { source_id })
        .await
}

pub async fn unsubscribe(client: &ApiClient, source_id: i64) -> Result<MessageResponse, ApiError> {
    client
        .delete(&format!("/user/subscriptions/{}", source_id))
        .await
}
