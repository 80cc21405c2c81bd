use super::get_page;
use crate::envelope::Page;
use crate::error::ApiError;
use crate::models::{Category, CreateSourceRequest, Source};
use crate::transport::{paging, ApiClient};

/// Active sources a user can subscribe to.
pub async fn active_sources(client: &ApiClient, page: u32, page_size: u32) -> Result<Page<Source>, ApiError> {
    get_page(client, "/news/sources", &paging(page, page_size)).await
}

/// Every source, including inactive ones.
pub async fn all_sources(client: &ApiClient, page: u32, page_size: u32) -> Result<Page<Source>, ApiError> {
    get_page(client, "/news/all-sources", &paging(page, page_size)).await
}

pub async fn categories(client: &ApiClient) -> Result<Vec<Category>, ApiError> {
    Ok(get_page(client, "/news/categories", &[]).await?.items)
}

/// Propose a new source from the subscriptions page.
pub async fn add_source(client: &ApiClient, request: &CreateSourceRequest) -> Result<Source, ApiError> {
    client.post("/news/sources", request).await
}
