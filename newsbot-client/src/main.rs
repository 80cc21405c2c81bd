/*
newsbot - terminal front-end for the newsBot aggregator.
Reads the layered config, restores the persisted session and runs one command against the API.
*/

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use newsbot_client::api;
use newsbot_client::envelope::Page;
use newsbot_client::models::{CreateSourceRequest, RegisterRequest, Source, UpdateSourceRequest, UserProfile};
use newsbot_client::navigation::{Location, Navigator, LOGIN_PATH, REGISTER_PATH};
use newsbot_client::pages::admin::AdminConsole;
use newsbot_client::pages::news::NewsFeed;
use newsbot_client::pages::subscriptions::SubscriptionsView;
use newsbot_client::storage::FileStorage;
use newsbot_client::{ApiClient, ApiError, SessionStore};

#[derive(Parser, Debug)]
#[command(name = "newsbot", about = "newsBot client: news feed, subscriptions and admin console")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the session file from the config
    #[arg(long, value_name = "FILE")]
    session: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and persist the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account and persist the session
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the persisted session
    Logout,
    /// Show the current user, refreshed from the server
    Whoami,
    /// Show a page of the news feed
    News {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        page_size: Option<u32>,
        /// Only news from this source
        #[arg(long)]
        source: Option<i64>,
    },
    /// Ask the server to re-poll subscribed sources
    Refresh,
    /// List sources available for subscription
    Sources {
        /// Include inactive sources
        #[arg(long)]
        all: bool,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        page_size: Option<u32>,
    },
    Categories,
    Subscriptions,
    Subscribe {
        source_id: i64,
    },
    Unsubscribe {
        source_id: i64,
    },
    /// Propose a new source
    AddSource {
        #[arg(long)]
        name: String,
        #[arg(long)]
        url: String,
        #[arg(long)]
        category: Option<i64>,
    },
    /// Admin console
    #[command(subcommand)]
    Admin(AdminCommand),
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    Stats,
    Users {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        page_size: Option<u32>,
    },
    MakeAdmin {
        user_id: i64,
    },
    RemoveAdmin {
        user_id: i64,
    },
    CreateSource {
        #[arg(long)]
        name: String,
        #[arg(long)]
        url: String,
        #[arg(long)]
        category: Option<i64>,
        /// Create the source disabled
        #[arg(long)]
        inactive: bool,
    },
    UpdateSource {
        source_id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        category: Option<i64>,
        #[arg(long)]
        active: Option<bool>,
    },
    DeleteSource {
        source_id: i64,
    },
    AddCategory {
        name: String,
    },
}

impl Command {
    /// Where the user "is" while the command runs; auth commands never trigger the
    /// session-expired redirect.
    fn location(&self) -> &'static str {
        match self {
            Command::Login { .. } => LOGIN_PATH,
            Command::Register { .. } => REGISTER_PATH,
            Command::Admin(_) => "/admin",
            Command::Subscriptions | Command::Subscribe { .. } | Command::Unsubscribe { .. } | Command::AddSource { .. } => {
                "/subscriptions"
            }
            _ => "/news",
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI args
    let args = Args::parse();

    // Initialize logging (stderr, so command output stays clean)
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    // Resolve config paths
    let default_path = PathBuf::from("config.default.toml");
    let override_path = if let Some(p) = args.config {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() { Some(p) } else { None }
    };

    let config = Config::load_with_defaults(Some(&default_path), override_path.as_deref())
        .await
        .and_then(Config::apply_env_overrides)
        .map_err(|e| {
            error!(%e, "failed to load configuration");
            e
        })?;
    info!(base_url = config.base_url(), override_file = ?override_path, "configuration loaded");

    let session_path = args.session.unwrap_or_else(|| config.session_path());
    let storage = Arc::new(FileStorage::open(&session_path)?);
    debug!(path = %storage.path().display(), "session storage ready");

    let location = Arc::new(Location::new(args.command.location()));
    let client = ApiClient::from_config(&config, storage)?.with_navigator(location.clone());
    let store = SessionStore::hydrate(client);

    let result = run(args.command, &store, &config).await;

    if let Err(e) = &result {
        // Errors may arrive wrapped in banner context; downcasting looks through it.
        let unauthorized = e.downcast_ref::<ApiError>().is_some_and(ApiError::is_unauthorized);
        if unauthorized || location.session_expired() {
            // The redirect fires after a short delay; let it land before reporting.
            tokio::time::sleep(config.redirect_delay() + std::time::Duration::from_millis(20)).await;
            if location.session_expired() || !store.client().has_token() {
                eprintln!("Session expired or missing. Run `newsbot login` to sign in.");
            }
            debug!(path = %location.current_path(), "final location");
        }
    }
    result
}

async fn run(command: Command, store: &SessionStore, config: &Config) -> Result<()> {
    let client = store.client();
    match command {
        Command::Login { email, password } => {
            let user = store.login(&email, &password).await?;
            println!("Logged in as {} ({:?})", user.display_name(), user.role);
        }
        Command::Register { email, password } => {
            let user = store.register(&RegisterRequest { email, password }).await?;
            println!("Registered and logged in as {}", user.display_name());
        }
        Command::Logout => {
            if client.has_token() {
                if let Err(e) = api::auth::logout(client).await {
                    warn!(error = %e, "server-side logout failed; clearing local session anyway");
                }
            }
            store.logout().context("Failed to clear the session file")?;
            println!("Logged out");
        }
        Command::Whoami => {
            let user = store.fetch_current_user().await?;
            print_user(&user);
        }
        Command::News { page, page_size, source } => {
            let mut feed = NewsFeed::new(page_size.unwrap_or(config.news_page_size()));
            feed.select_source(source);
            feed.set_page(page);
            if let Err(e) = feed.load(client).await {
                let banner = feed.error.clone().unwrap_or_else(|| e.to_string());
                return Err(anyhow::Error::new(e).context(banner));
            }
            print_news(&feed);
        }
        Command::Refresh => {
            let message = NewsFeed::refresh(client).await.map_err(|e| {
                let text = NewsFeed::refresh_failure(&e);
                anyhow::Error::new(e).context(text)
            })?;
            println!("{}", message);
        }
        Command::Sources { all, page, page_size } => {
            let page_size = page_size.unwrap_or(config.sources_page_size());
            let sources = if all {
                api::sources::all_sources(client, page, page_size).await?
            } else {
                api::sources::active_sources(client, page, page_size).await?
            };
            print_sources(&sources);
        }
        Command::Categories => {
            for category in api::sources::categories(client).await? {
                println!("{:>5}  {}", category.id, category.name);
            }
        }
        Command::Subscriptions => {
            let mut view = SubscriptionsView::new(config.sources_page_size());
            view.load(client).await?;
            if view.subscriptions.is_empty() {
                println!("No subscriptions yet. Use `newsbot sources` and `newsbot subscribe <id>`.");
            }
            for source in &view.subscriptions {
                println!("{:>5}  {}", source.id, source.display_name());
            }
        }
        Command::Subscribe { source_id } => {
            let mut view = SubscriptionsView::new(config.sources_page_size());
            view.subscribe(client, source_id).await?;
            let name = view
                .subscription(source_id)
                .map(Source::display_name)
                .unwrap_or_else(|| format!("source {}", source_id));
            println!("Subscribed to {}", name);
        }
        Command::Unsubscribe { source_id } => {
            api::subscriptions::unsubscribe(client, source_id).await?;
            println!("Unsubscribed from source {}", source_id);
        }
        Command::AddSource { name, url, category } => {
            let mut view = SubscriptionsView::new(config.sources_page_size());
            let request = CreateSourceRequest {
                name,
                url,
                category_id: category,
                is_active: true,
            };
            let created = view.add_source(client, &request).await?;
            println!("Added source {} ({})", created.display_name(), created.id);
        }
        Command::Admin(command) => run_admin(command, store, config).await?,
    }
    Ok(())
}

async fn run_admin(command: AdminCommand, store: &SessionStore, config: &Config) -> Result<()> {
    let client = store.client();
    let mut console = AdminConsole::open(&store.snapshot(), config.users_page_size(), config.sources_page_size())?;
    match command {
        AdminCommand::Stats => {
            let stats = api::admin::stats(client).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        AdminCommand::Users { page, page_size } => {
            console.users.page = page.max(1);
            if let Some(size) = page_size {
                console.users.page_size = size;
            }
            console.load_users(client).await?;
            for user in &console.users.items {
                println!("{:>5}  {:<6}  {}", user.id, role_label(user), user.display_name());
            }
            println!(
                "page {}/{} ({} users)",
                console.users.page, console.users.total_pages, console.users.total
            );
        }
        AdminCommand::MakeAdmin { user_id } => {
            console.make_admin(client, user_id).await?;
            report(&console);
        }
        AdminCommand::RemoveAdmin { user_id } => {
            console.remove_admin(client, user_id).await?;
            report(&console);
        }
        AdminCommand::CreateSource {
            name,
            url,
            category,
            inactive,
        } => {
            let request = CreateSourceRequest {
                name,
                url,
                category_id: category,
                is_active: !inactive,
            };
            let created = api::admin::create_source(client, &request).await?;
            println!("Created source {} ({})", created.display_name(), created.id);
        }
        AdminCommand::UpdateSource {
            source_id,
            name,
            url,
            category,
            active,
        } => {
            let request = UpdateSourceRequest {
                name,
                url,
                category_id: category,
                is_active: active,
            };
            if request.is_empty() {
                anyhow::bail!("Nothing to update: pass at least one of --name, --url, --category, --active");
            }
            console.update_source(client, source_id, &request).await?;
            report(&console);
        }
        AdminCommand::DeleteSource { source_id } => {
            console.delete_source(client, source_id).await?;
            report(&console);
        }
        AdminCommand::AddCategory { name } => {
            console.add_category(client, &name).await?;
            report(&console);
        }
    }
    Ok(())
}

fn role_label(user: &UserProfile) -> &'static str {
    if user.is_admin() { "admin" } else { "user" }
}

fn report(console: &AdminConsole) {
    if let Some(message) = &console.success {
        println!("{}", message);
    }
}

fn print_user(user: &UserProfile) {
    println!("id:    {}", user.id);
    println!("name:  {}", user.display_name());
    println!("role:  {}", role_label(user));
    if let Some(chat) = user.tg_chat_id {
        println!("telegram chat: {}", chat);
    }
}

fn print_news(feed: &NewsFeed) {
    if feed.items.is_empty() {
        println!("No news yet. Subscribe to sources or wait for the next update.");
        return;
    }
    for item in &feed.items {
        let when = item
            .published_at
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        let source = item.source_name.as_deref().unwrap_or("");
        println!("[{}] {} {}", item.id, when, source);
        println!("    {}", item.title);
        println!("    {}", item.url);
    }
    println!("page {}/{} ({} news)", feed.page, feed.total_pages, feed.total);
}

fn print_sources(page: &Page<Source>) {
    for source in &page.items {
        let state = if source.is_active { "" } else { " (inactive)" };
        println!(
            "{:>5}  {}{}  {}",
            source.id,
            source.display_name(),
            state,
            source.url.as_deref().unwrap_or("")
        );
    }
    println!("{} sources, {} page(s)", page.total, page.total_pages);
}
