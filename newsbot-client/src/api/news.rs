use super::get_page;
use crate::envelope::Page;
use crate::error::ApiError;
use crate::models::{NewsItem, RefreshAccepted};
use crate::transport::{paging, ApiClient};

/// News from every source the user is subscribed to.
pub async fn user_news(client: &ApiClient, page: u32, page_size: u32) -> Result<Page<NewsItem>, ApiError> {
    get_page(client, "/news/", &paging(page, page_size)).await
}

pub async fn news_by_source(
    client: &ApiClient,
    source_id: i64,
    page: u32,
    page_size: u32,
) -> Result<Page<NewsItem>, ApiError> {
    let path = format!("/news/source/{}", source_id);
    get_page(client, &path, &paging(page, page_size)).await
}

/// Ask the server to re-poll the user's sources now.
pub async fn refresh_news(client: &ApiClient) -> Result<RefreshAccepted, ApiError> {
    client.post_empty("/user/refresh").await
}
