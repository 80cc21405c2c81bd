use anyhow::{Context, Result};
use common::Config;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::navigation::{is_auth_page, Navigator, SESSION_EXPIRED_REDIRECT};
use crate::storage::{self, SessionStorage, TOKEN_KEY};

/// Query parameters as `(name, value)` pairs.
pub type Query<'a> = &'a [(&'a str, String)];

/// `page`/`page_size` query pair used by every paginated endpoint.
pub fn paging(page: u32, page_size: u32) -> Vec<(&'static str, String)> {
    vec![("page", page.to_string()), ("page_size", page_size.to_string())]
}

/// Decode a successful body. An empty body is `null`; types that cannot be built from
/// `null` (plain structs) are decoded from an empty object instead.
fn decode<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, ApiError> {
    if value.is_null() {
        if let Ok(decoded) = serde_json::from_value(serde_json::Value::Null) {
            return Ok(decoded);
        }
        return Ok(serde_json::from_value(serde_json::Value::Object(Default::default()))?);
    }
    Ok(serde_json::from_value(value)?)
}

/// The single configured HTTP client every endpoint wrapper goes through.
///
/// Before sending, the stored bearer token (if any) is attached. After receiving, a 401
/// wipes the persisted credentials and, unless the user is already on the login or
/// registration page, schedules a redirect to the login page.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    timeout: Duration,
    redirect_delay: Duration,
    storage: Arc<dyn SessionStorage>,
    navigator: Option<Arc<dyn Navigator>>,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, storage: Arc<dyn SessionStorage>) -> Result<Self> {
        let base_url = base_url.into();
        url::Url::parse(&base_url).with_context(|| format!("Invalid API base URL: {}", base_url))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .user_agent(concat!("newsbot-client/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(common::DEFAULT_TIMEOUT_SECONDS),
            redirect_delay: Duration::from_millis(common::DEFAULT_REDIRECT_DELAY_MS),
            storage,
            navigator: None,
            client,
        })
    }

    pub fn from_config(config: &Config, storage: Arc<dyn SessionStorage>) -> Result<Self> {
        Ok(Self::new(config.base_url(), storage)?
            .with_timeout(config.timeout())
            .with_redirect_delay(config.redirect_delay()))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_redirect_delay(mut self, delay: Duration) -> Self {
        self.redirect_delay = delay;
        self
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn storage(&self) -> &Arc<dyn SessionStorage> {
        &self.storage
    }

    /// True when a non-empty token is currently persisted.
    pub fn has_token(&self) -> bool {
        self.token().is_some()
    }

    fn token(&self) -> Option<String> {
        self.storage.get(TOKEN_KEY).filter(|t| !t.is_empty())
    }

    fn endpoint(&self, path: &str) -> Result<url::Url, ApiError> {
        let joined = if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        };
        url::Url::parse(&joined).map_err(|source| ApiError::InvalidUrl {
            path: path.to_string(),
            source,
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: Query<'_>) -> Result<T, ApiError> {
        let value = self.request_value(Method::GET, path, query, None::<&()>).await?;
        decode(value)
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let value = self.request_value(Method::POST, path, &[], Some(body)).await?;
        decode(value)
    }

    /// POST without a request body.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let value = self.request_value(Method::POST, path, &[], None::<&()>).await?;
        decode(value)
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let value = self.request_value(Method::PUT, path, &[], Some(body)).await?;
        decode(value)
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let value = self.request_value(Method::DELETE, path, &[], None::<&()>).await?;
        decode(value)
    }

    /// Issue one request and return the raw JSON body (`null` when the body is empty).
    pub async fn request_value<B>(
        &self,
        method: Method,
        path: &str,
        query: Query<'_>,
        body: Option<&B>,
    ) -> Result<serde_json::Value, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(path)?;
        let mut request = self.client.request(method.clone(), url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let token = self.token();
        debug!(%method, path, authenticated = token.is_some(), "api request");
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let text = response.text().await?;
            Ok::<_, reqwest::Error>((status, text))
        };

        let (status, text) = match tokio::time::timeout(self.timeout, exchange).await {
            Err(_) => {
                warn!(%method, path, timeout = ?self.timeout, "api request timed out");
                return Err(ApiError::Timeout(self.timeout));
            }
            Ok(Err(e)) if e.is_timeout() => {
                warn!(%method, path, timeout = ?self.timeout, "api request timed out");
                return Err(ApiError::Timeout(self.timeout));
            }
            Ok(Err(e)) => {
                warn!(%method, path, error = %e, "api request failed without a response");
                return Err(ApiError::Network(e));
            }
            Ok(Ok(parts)) => parts,
        };

        if status.is_success() {
            debug!(%method, path, status = status.as_u16(), "api response");
            if text.trim().is_empty() {
                return Ok(serde_json::Value::Null);
            }
            return Ok(serde_json::from_str(&text)?);
        }

        warn!(%method, path, status = status.as_u16(), "api error response");
        if status == StatusCode::UNAUTHORIZED {
            self.handle_unauthorized();
        }
        Err(ApiError::from_response(status, &text))
    }

    fn handle_unauthorized(&self) {
        info!("unauthorized response; clearing stored credentials");
        if let Err(e) = storage::clear_credentials(self.storage.as_ref()) {
            warn!(error = %e, "failed to clear stored credentials");
        }

        let Some(navigator) = &self.navigator else {
            return;
        };
        let current = navigator.current_path();
        if is_auth_page(&current) {
            debug!(path = %current, "already on an auth page; not redirecting");
            return;
        }

        let navigator = Arc::clone(navigator);
        let delay = self.redirect_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            navigator.redirect(SESSION_EXPIRED_REDIRECT);
        });
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("redirect_delay", &self.redirect_delay)
            .field("has_navigator", &self.navigator.is_some())
            .finish()
    }
}
