use tracing::{info, warn};

use super::{describe_error, NOT_LOGGED_IN};
use crate::api;
use crate::error::ApiError;
use crate::models::{Category, CreateSourceRequest, Source};
use crate::transport::ApiClient;

const LOAD_FAILED: &str = "Failed to load data.";
const SUBSCRIBE_FAILED: &str = "Could not subscribe. Please try again.";
const UNSUBSCRIBE_FAILED: &str = "Could not unsubscribe. Please try again.";
const ADD_SOURCE_FAILED: &str = "Failed to add source";

/// The user's subscriptions next to the catalogue of sources they can subscribe to.
#[derive(Debug, Default)]
pub struct SubscriptionsView {
    pub subscriptions: Vec<Source>,
    pub sources: Vec<Source>,
    pub categories: Vec<Category>,
    pub loading: bool,
    pub error: Option<String>,
    sources_page_size: u32,
}

impl SubscriptionsView {
    pub fn new(sources_page_size: u32) -> Self {
        Self {
            sources_page_size,
            ..Default::default()
        }
    }

    /// Load subscriptions, sources and categories concurrently; any failure fails the page.
    pub async fn load(&mut self, client: &ApiClient) -> Result<(), ApiError> {
        if !client.has_token() {
            self.error = Some(NOT_LOGGED_IN.to_string());
            return Err(ApiError::NotAuthenticated);
        }
        self.loading = true;
        self.error = None;

        let result = tokio::try_join!(
            api::subscriptions::subscriptions(client),
            api::sources::active_sources(client, 1, self.sources_page_size),
            api::sources::categories(client),
        );
        self.loading = false;

        match result {
            Ok((subscriptions, sources, categories)) => {
                info!(
                    subscriptions = subscriptions.len(),
                    sources = sources.items.len(),
                    categories = categories.len(),
                    "subscriptions page loaded"
                );
                self.subscriptions = subscriptions;
                self.sources = sources.items;
                self.categories = categories;
                Ok(())
            }
            Err(e) => {
                self.error = Some(describe_error(&e, LOAD_FAILED));
                Err(e)
            }
        }
    }

    pub fn is_subscribed(&self, source_id: i64) -> bool {
        self.subscriptions.iter().any(|s| s.id == source_id)
    }

    /// Subscribe by id. The local list takes the catalogue entry when the source is on the
    /// loaded catalogue page; otherwise the subscriptions are re-fetched from the server.
    pub async fn subscribe(&mut self, client: &ApiClient, source_id: i64) -> Result<(), ApiError> {
        if let Err(e) = api::subscriptions::subscribe(client, source_id).await {
            warn!(source_id, error = %e, "subscribe failed");
            self.error = Some(e.user_message(SUBSCRIBE_FAILED));
            return Err(e);
        }
        info!(source_id, "subscribed");
        if self.is_subscribed(source_id) {
            return Ok(());
        }
        match self.sources.iter().find(|s| s.id == source_id).cloned() {
            Some(source) => self.subscriptions.push(source),
            None => match api::subscriptions::subscriptions(client).await {
                Ok(subscriptions) => self.subscriptions = subscriptions,
                Err(e) => warn!(error = %e, "failed to reload subscriptions after subscribing"),
            },
        }
        Ok(())
    }

    pub fn subscription(&self, source_id: i64) -> Option<&Source> {
        self.subscriptions.iter().find(|s| s.id == source_id)
    }

    pub async fn unsubscribe(&mut self, client: &ApiClient, source_id: i64) -> Result<(), ApiError> {
        if let Err(e) = api::subscriptions::unsubscribe(client, source_id).await {
            warn!(source_id, error = %e, "unsubscribe failed");
            self.error = Some(e.user_message(UNSUBSCRIBE_FAILED));
            return Err(e);
        }
        self.subscriptions.retain(|s| s.id != source_id);
        info!(source_id, "unsubscribed");
        Ok(())
    }

    /// Propose a new source, then reload the catalogue so it shows up.
    pub async fn add_source(&mut self, client: &ApiClient, request: &CreateSourceRequest) -> Result<Source, ApiError> {
        let created = match api::sources::add_source(client, request).await {
            Ok(source) => source,
            Err(e) => {
                self.error = Some(e.user_message(ADD_SOURCE_FAILED));
                return Err(e);
            }
        };
        match api::sources::active_sources(client, 1, self.sources_page_size).await {
            Ok(page) => self.sources = page.items,
            Err(e) => warn!(error = %e, "failed to reload sources after adding one"),
        }
        Ok(created)
    }
}
