use tracing::{info, warn};

use super::describe_error;
use crate::api;
use crate::error::ApiError;
use crate::models::{Category, Source, UpdateSourceRequest, UserProfile};
use crate::session::Session;
use crate::transport::ApiClient;

const USERS_FAILED: &str = "Failed to load users";
const SOURCES_FAILED: &str = "Failed to load sources";
const CATEGORIES_FAILED: &str = "Failed to load categories";
const MAKE_ADMIN_FAILED: &str = "Failed to grant admin rights";
const REMOVE_ADMIN_FAILED: &str = "Failed to revoke admin rights";
const UPDATE_SOURCE_FAILED: &str = "Failed to update source";
const DELETE_SOURCE_FAILED: &str = "Failed to delete source";
const ADD_CATEGORY_FAILED: &str = "Failed to add category";

/// One paginated admin table.
#[derive(Debug)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl<T> Listing<T> {
    fn new(page_size: u32) -> Self {
        Self {
            items: Vec::new(),
            page: 1,
            page_size,
            total: 0,
            total_pages: 1,
        }
    }
}

/// Admin console state: users, sources and categories plus the status banners.
#[derive(Debug)]
pub struct AdminConsole {
    pub users: Listing<UserProfile>,
    pub sources: Listing<Source>,
    pub categories: Vec<Category>,
    pub total_users: u64,
    pub total_sources: u64,
    pub error: Option<String>,
    pub success: Option<String>,
}

impl AdminConsole {
    /// Open the console for `session`. Non-admin sessions are refused without any request.
    pub fn open(session: &Session, users_page_size: u32, sources_page_size: u32) -> Result<Self, ApiError> {
        if !session.is_authenticated {
            return Err(ApiError::NotAuthenticated);
        }
        if !session.is_admin() {
            return Err(ApiError::NotAdmin);
        }
        Ok(Self {
            users: Listing::new(users_page_size),
            sources: Listing::new(sources_page_size),
            categories: Vec::new(),
            total_users: 0,
            total_sources: 0,
            error: None,
            success: None,
        })
    }

    fn fail(&mut self, err: &ApiError, fallback: &str) {
        warn!(error = %err, "{}", fallback);
        self.success = None;
        self.error = Some(err.user_message(fallback));
    }

    fn succeed(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        self.error = None;
        self.success = Some(message);
    }

    /// Dashboard counters: categories plus the totals of the users and sources tables,
    /// fetched with a page size of one.
    pub async fn load_counts(&mut self, client: &ApiClient) -> Result<(), ApiError> {
        self.categories = api::sources::categories(client).await?;
        self.total_sources = api::sources::all_sources(client, 1, 1).await?.total;
        self.total_users = api::admin::users(client, 1, 1).await?.total;
        Ok(())
    }

    pub async fn load_users(&mut self, client: &ApiClient) -> Result<(), ApiError> {
        match api::admin::users(client, self.users.page, self.users.page_size).await {
            Ok(page) => {
                self.users.total = page.total;
                self.users.total_pages = page.total_pages;
                self.users.items = page.items;
                self.total_users = self.users.total;
                Ok(())
            }
            Err(e) => {
                self.error = Some(describe_error(&e, USERS_FAILED));
                Err(e)
            }
        }
    }

    pub async fn load_sources(&mut self, client: &ApiClient) -> Result<(), ApiError> {
        match api::sources::all_sources(client, self.sources.page, self.sources.page_size).await {
            Ok(page) => {
                self.sources.total = page.total;
                self.sources.total_pages = page.total_pages;
                self.sources.items = page.items;
                self.total_sources = self.sources.total;
                Ok(())
            }
            Err(e) => {
                self.error = Some(describe_error(&e, SOURCES_FAILED));
                Err(e)
            }
        }
    }

    pub async fn load_categories(&mut self, client: &ApiClient) -> Result<(), ApiError> {
        match api::sources::categories(client).await {
            Ok(categories) => {
                self.categories = categories;
                Ok(())
            }
            Err(e) => {
                self.error = Some(describe_error(&e, CATEGORIES_FAILED));
                Err(e)
            }
        }
    }

    pub async fn make_admin(&mut self, client: &ApiClient, user_id: i64) -> Result<(), ApiError> {
        if let Err(e) = api::admin::make_admin(client, user_id).await {
            self.fail(&e, MAKE_ADMIN_FAILED);
            return Err(e);
        }
        self.succeed(format!("User {} is now an admin", user_id));
        self.load_users(client).await
    }

    pub async fn remove_admin(&mut self, client: &ApiClient, user_id: i64) -> Result<(), ApiError> {
        if let Err(e) = api::admin::remove_admin(client, user_id).await {
            self.fail(&e, REMOVE_ADMIN_FAILED);
            return Err(e);
        }
        self.succeed(format!("User {} is no longer an admin", user_id));
        self.load_users(client).await
    }

    pub async fn update_source(
        &mut self,
        client: &ApiClient,
        source_id: i64,
        request: &UpdateSourceRequest,
    ) -> Result<(), ApiError> {
        if let Err(e) = api::admin::update_source(client, source_id, request).await {
            self.fail(&e, UPDATE_SOURCE_FAILED);
            return Err(e);
        }
        self.succeed(format!("Source {} updated", source_id));
        self.load_sources(client).await
    }

    pub async fn delete_source(&mut self, client: &ApiClient, source_id: i64) -> Result<(), ApiError> {
        if let Err(e) = api::admin::delete_source(client, source_id).await {
            self.fail(&e, DELETE_SOURCE_FAILED);
            return Err(e);
        }
        self.succeed(format!("Source {} deleted", source_id));
        self.load_sources(client).await
    }

    pub async fn add_category(&mut self, client: &ApiClient, name: &str) -> Result<Category, ApiError> {
        let category = match api::admin::add_category(client, name).await {
            Ok(category) => category,
            Err(e) => {
                self.fail(&e, ADD_CATEGORY_FAILED);
                return Err(e);
            }
        };
        self.succeed(format!("Category \"{}\" added", category.name));
        self.load_categories(client).await?;
        Ok(category)
    }
}
