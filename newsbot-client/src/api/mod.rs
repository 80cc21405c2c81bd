//! Endpoint wrappers: one async function per REST call.
//!
//! Wrappers only build paths, query strings and bodies. They never retry, cache or
//! swallow errors; list endpoints are normalized into [`Page`](crate::envelope::Page).

pub mod admin;
pub mod auth;
pub mod news;
pub mod sources;
pub mod subscriptions;

use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::envelope::{normalize, Page};
use crate::error::ApiError;
use crate::transport::{ApiClient, Query};

/// GET a list endpoint and fold whatever envelope it uses into a page.
pub(crate) async fn get_page<T: DeserializeOwned>(
    client: &ApiClient,
    path: &str,
    query: Query<'_>,
) -> Result<Page<T>, ApiError> {
    let value = client
        .request_value(Method::GET, path, query, None::<&()>)
        .await?;
    Ok(normalize(value)?)
}
