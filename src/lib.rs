mod authentication;
mod cache;
mod config;
mod context;
mod db_helpers;
mod errors;
mod forms;
mod handlers;
mod media;
mod models;
mod pagination;
mod templates;

use anyhow::Context as _;
pub use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::*,
    Extension, Router,
};
use handlers::*;
use sqlx::{migrate::MigrateDatabase, sqlite::SqliteConnectOptions, Sqlite, SqlitePool};
use std::{
    net::{SocketAddr, TcpListener},
    str::FromStr,
    sync::Arc,
    time::Instant,
};

pub use authentication::{AuthUser, MaybeUser};
pub use cache::{CaptchaStore, CategoryCache, Challenge};
pub use config::Config;
pub use context::{build_context, user_menu, Context, MenuItem, MENU};
pub use db_helpers::{
    aggregate_categories_in_db, count_articles_in_db, create_article_in_db,
    delete_category_in_db, get_article_by_slug_in_db, get_category_by_slug_in_db, insert_category, list_articles_in_db,
    search_articles_in_db, set_article_published_in_db, update_article_in_db, ArticleChanges,
    ArticleScope, CategoryOrder, CategoryQuery,
};
pub use errors::RequestError;
pub use forms::{Form, FormErrors};
pub use models::{Article, Category, CategoryCount, NewArticle};
pub use pagination::{Page, Paginator};
pub use templates::Templates;

/// Everything a request handler needs, shared across requests.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<Config>,
    pub categories: CategoryCache,
    pub captchas: CaptchaStore,
    pub templates: Arc<Templates>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self> {
        let pool = init_db(&config.database_url).await?;
        let templates = Templates::new().context("Failed to compile templates")?;
        Ok(AppState {
            pool,
            categories: CategoryCache::new(config.category_cache_ttl),
            captchas: CaptchaStore::default(),
            templates: Arc::new(templates),
            config: Arc::new(config),
        })
    }
}

pub async fn run_app(app: Router, state: AppState, address: SocketAddr) -> Result<()> {
    let app = app.layer(Extension(state));
    axum::Server::bind(&address)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

pub async fn init_db(db_url: &str) -> Result<SqlitePool> {
    if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
        tracing::info!("Creating database {}", db_url);
        Sqlite::create_database(db_url)
            .await
            .context("Failed to create database")?;
    } else {
        tracing::debug!("Database already exists");
    }
    let options = SqliteConnectOptions::from_str(db_url)
        .context("Invalid DATABASE_URL")?
        .foreign_keys(true);
    let pool = SqlitePool::connect_with(options).await?;
    tracing::info!("Running migrations");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    Ok(pool)
}

pub fn get_random_free_port() -> (u16, SocketAddr) {
    let listener = TcpListener::bind("localhost:0").unwrap();
    match listener.local_addr() {
        Ok(addr) => (addr.port(), addr),
        Err(_) => panic!("Could not get a free port"),
    }
}

async fn log_requests<B>(request: Request<B>, next: Next<B>) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();
    let response = next.run(request).await;
    tracing::info!(
        %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    response
}

pub fn make_router() -> Router {
    Router::new()
        .route("/check_health", get(alive))
        .route("/", get(home))
        .route("/about/", get(about))
        .route(
            "/addpage/",
            get(add_page_form)
                .post(add_page)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/contact/", get(contact_form).post(contact))
        .route("/login/", get(login_form).post(login_user))
        .route("/logout/", get(logout_user))
        .route("/register/", get(register_form).post(register_user))
        .route("/post/:post_slug/", get(show_post))
        .route("/category/:cat_slug/", get(show_category))
        .fallback(not_found)
        .layer(middleware::from_fn(log_requests))
}
