use tracing::{debug, info};

use super::{describe_error, LatestOnly, RequestId, NOT_LOGGED_IN};
use crate::api;
use crate::envelope::Page;
use crate::error::ApiError;
use crate::models::NewsItem;
use crate::transport::ApiClient;

const LOAD_FAILED: &str = "Failed to load news.";
const REFRESH_FAILED: &str = "Failed to refresh news";
const REFRESH_ACCEPTED: &str = "News refresh requested";

/// Parameters of one feed load, captured when it starts.
#[derive(Debug, Clone)]
pub struct NewsQuery {
    id: RequestId,
    pub source: Option<i64>,
    pub page: u32,
    pub page_size: u32,
}

/// State of the paginated news feed, optionally filtered to one source.
#[derive(Debug)]
pub struct NewsFeed {
    pub page: u32,
    pub page_size: u32,
    pub source: Option<i64>,
    pub items: Vec<NewsItem>,
    pub total: u64,
    pub total_pages: u32,
    pub loading: bool,
    pub error: Option<String>,
    requests: LatestOnly,
}

impl NewsFeed {
    pub fn new(page_size: u32) -> Self {
        Self {
            page: 1,
            page_size,
            source: None,
            items: Vec::new(),
            total: 0,
            total_pages: 1,
            loading: false,
            error: None,
            requests: LatestOnly::default(),
        }
    }

    /// Switch the source filter; the feed restarts from the first page.
    pub fn select_source(&mut self, source: Option<i64>) {
        self.source = source;
        self.page = 1;
    }

    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    /// Start a load for the current page/filter. Any load still in flight is superseded.
    pub fn begin_load(&mut self) -> NewsQuery {
        self.loading = true;
        self.error = None;
        NewsQuery {
            id: self.requests.begin(),
            source: self.source,
            page: self.page,
            page_size: self.page_size,
        }
    }

    pub async fn fetch(client: &ApiClient, query: &NewsQuery) -> Result<Page<NewsItem>, ApiError> {
        match query.source {
            Some(source_id) => api::news::news_by_source(client, source_id, query.page, query.page_size).await,
            None => api::news::user_news(client, query.page, query.page_size).await,
        }
    }

    /// Apply a finished load. Returns `Ok(false)` (and changes nothing) when the load was
    /// superseded by a newer one. A failed load sets the banner and hands the error back.
    pub fn apply(&mut self, query: &NewsQuery, result: Result<Page<NewsItem>, ApiError>) -> Result<bool, ApiError> {
        if !self.requests.finish_if_active(query.id) {
            debug!(page = query.page, source = ?query.source, "dropping stale news response");
            return Ok(false);
        }
        self.loading = false;
        match result {
            Ok(page) => {
                self.items = page.items;
                self.total = page.total;
                self.total_pages = page.total_pages;
                Ok(true)
            }
            Err(e) => {
                self.error = Some(describe_error(&e, LOAD_FAILED));
                Err(e)
            }
        }
    }

    /// Load the current page. Without a stored token no request is made.
    pub async fn load(&mut self, client: &ApiClient) -> Result<bool, ApiError> {
        if !client.has_token() {
            self.loading = false;
            self.error = Some(NOT_LOGGED_IN.to_string());
            return Err(ApiError::NotAuthenticated);
        }
        let query = self.begin_load();
        let result = Self::fetch(client, &query).await;
        self.apply(&query, result)
    }

    /// Ask the server to re-poll sources. Returns the text for a notification;
    /// [`NewsFeed::refresh_failure`] renders the error.
    pub async fn refresh(client: &ApiClient) -> Result<String, ApiError> {
        if !client.has_token() {
            return Err(ApiError::NotAuthenticated);
        }
        let accepted = api::news::refresh_news(client).await?;
        info!(request_id = ?accepted.request_id, "news refresh accepted");
        Ok(accepted.message.unwrap_or_else(|| REFRESH_ACCEPTED.to_string()))
    }

    pub fn refresh_failure(err: &ApiError) -> String {
        match err {
            ApiError::NotAuthenticated => NOT_LOGGED_IN.to_string(),
            _ => err.user_message(REFRESH_FAILED),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i64) -> NewsItem {
        NewsItem {
            id,
            title: format!("headline {}", id),
            content: None,
            url: format!("https://example.org/{}", id),
            published_at: None,
            source_id: 1,
            source_name: None,
            category_id: None,
        }
    }

    fn page_of(ids: &[i64]) -> Page<NewsItem> {
        Page {
            items: ids.iter().copied().map(item).collect(),
            total: ids.len() as u64,
            total_pages: 1,
            page: None,
        }
    }

    #[test]
    fn stale_response_is_dropped() {
        let mut feed = NewsFeed::new(20);
        let first = feed.begin_load();
        feed.set_page(2);
        let second = feed.begin_load();

        assert!(feed.apply(&second, Ok(page_of(&[21, 22]))).unwrap());
        assert!(!feed.apply(&first, Ok(page_of(&[1, 2]))).unwrap());

        assert_eq!(feed.items.iter().map(|n| n.id).collect::<Vec<_>>(), vec![21, 22]);
        assert!(!feed.loading);
    }

    #[test]
    fn selecting_a_source_resets_page() {
        let mut feed = NewsFeed::new(20);
        feed.set_page(4);
        feed.select_source(Some(9));
        assert_eq!(feed.page, 1);
        let query = feed.begin_load();
        assert_eq!(query.source, Some(9));
        assert!(feed.loading);
    }

    #[test]
    fn failed_load_sets_banner() {
        let mut feed = NewsFeed::new(20);
        let query = feed.begin_load();
        assert!(feed.apply(&query, Err(ApiError::NotAuthenticated)).is_err());
        assert_eq!(feed.error.as_deref(), Some(NOT_LOGGED_IN));
        assert!(!feed.loading);
    }

    #[test]
    fn refresh_failure_text() {
        assert_eq!(NewsFeed::refresh_failure(&ApiError::NotAuthenticated), NOT_LOGGED_IN);
        let rejected = ApiError::from_response(reqwest::StatusCode::TOO_MANY_REQUESTS, r#"{"error":"slow down"}"#);
        assert_eq!(NewsFeed::refresh_failure(&rejected), "slow down");
        let bare = ApiError::from_response(reqwest::StatusCode::BAD_GATEWAY, "");
        assert_eq!(NewsFeed::refresh_failure(&bare), REFRESH_FAILED);
    }
}
