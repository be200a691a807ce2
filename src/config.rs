use std::{net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::{Context, Result};

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:3001";
const DEFAULT_MEDIA_ROOT: &str = "media";
const DEFAULT_CATEGORY_CACHE_TTL: u64 = 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_address: SocketAddr,
    pub media_root: PathBuf,
    pub category_cache_ttl: Duration,
}

impl Config {
    pub fn new(database_url: impl Into<String>, jwt_secret: impl Into<String>) -> Self {
        Config {
            database_url: database_url.into(),
            jwt_secret: jwt_secret.into(),
            bind_address: SocketAddr::from(([127, 0, 0, 1], 3001)),
            media_root: PathBuf::from(DEFAULT_MEDIA_ROOT),
            category_cache_ttl: Duration::from_secs(DEFAULT_CATEGORY_CACHE_TTL),
        }
    }

    /// Reads the configuration from the environment. Call `dotenvy::dotenv()` first
    /// to pick up a `.env` file.
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt_secret = std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        let bind_address = std::env::var("BIND_ADDRESS")
            .unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_owned())
            .parse()
            .context("BIND_ADDRESS must be a socket address")?;
        let media_root = std::env::var("MEDIA_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_MEDIA_ROOT));
        let category_cache_ttl = match std::env::var("CATEGORY_CACHE_TTL") {
            Ok(value) => value
                .parse()
                .context("CATEGORY_CACHE_TTL must be a number of seconds")?,
            Err(_) => DEFAULT_CATEGORY_CACHE_TTL,
        };
        Ok(Config {
            database_url,
            jwt_secret,
            bind_address,
            media_root,
            category_cache_ttl: Duration::from_secs(category_cache_ttl),
        })
    }
}
