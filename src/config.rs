use std::{env, path::PathBuf, str::FromStr};

use tracing::debug;

use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Without a database URL the in-memory store is used.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    /// Session lifetime in hours.
    pub jwt_maxage: i64,
    pub port: u16,
    pub static_dir: PathBuf,
    pub media_dir: PathBuf,
    pub posts_per_page: u32,
    /// Username promoted to admin at startup.
    pub bootstrap_admin: Option<String>,
}

impl Config {
    pub fn init() -> Result<Config> {
        if let Err(err) = dotenv::dotenv() {
            debug!("No .env file loaded: {}", err);
        }

        let jwt_secret = env::var("JWT_SECRET_KEY")
            .ok()
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| Error::Config("JWT_SECRET_KEY must be set".to_string()))?;

        Ok(Config {
            database_url: non_empty_var("DATABASE_URL"),
            jwt_secret,
            jwt_maxage: parse_var("JWT_MAXAGE", 24)?,
            port: parse_var("PORT", 8080)?,
            static_dir: non_empty_var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("static")),
            media_dir: non_empty_var("MEDIA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("media")),
            posts_per_page: parse_var("POSTS_PER_PAGE", 10)?,
            bootstrap_admin: non_empty_var("BOOTSTRAP_ADMIN"),
        })
    }

    pub fn debug_log(&self) {
        debug!("  database {}", if self.database_url.is_some() { "postgres" } else { "in-memory" });
        debug!("  jwt max age {}h", self.jwt_maxage);
        debug!("  port {}", self.port);
        debug!("  static dir {}", self.static_dir.display());
        debug!("  media dir {}", self.media_dir.display());
        debug!("  posts per page {}", self.posts_per_page);
        if let Some(ref admin) = self.bootstrap_admin {
            debug!("  bootstrap admin {}", admin);
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_var<T: FromStr>(key: &str, default: T) -> Result<T> {
    match non_empty_var(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{} has an invalid value: {}", key, value))),
        None => Ok(default),
    }
}
