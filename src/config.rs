use std::env;

use dotenv::dotenv;
use log::debug;
use reqwest::Url;

use crate::error::{Error, Result};
use crate::pager::DEFAULT_PAGE_SIZE;

#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: String,
    pub media_url: String,
    pub page_size: u32,
}

impl Config {
    /// Builds a config from explicit base URLs, validating both.
    pub fn new(backend_url: impl AsRef<str>, media_url: impl AsRef<str>) -> Result<Self> {
        Ok(Config {
            backend_url: base_url("BACKEND_URL", backend_url.as_ref())?,
            media_url: base_url("MEDIA_URL", media_url.as_ref())?,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Loads the config from the environment, reading a local `.env` first when there is one.
    ///
    /// - `BACKEND_URL`: base URL of the backend API (required)
    /// - `MEDIA_URL`: base URL media storage paths are served from (required)
    /// - `FEED_PAGE_SIZE`: page size for feeds, defaults to 20
    pub fn load_env_config() -> Result<Self> {
        if dotenv().is_err() {
            debug!("No .env file found, using the process environment only");
        }
        let mut config = Config::new(required("BACKEND_URL")?, required("MEDIA_URL")?)?;
        if let Ok(size) = env::var("FEED_PAGE_SIZE") {
            config.page_size = match size.trim().parse::<u32>() {
                Ok(size) if size > 0 => size,
                _ => {
                    return Err(Error::Config(format!(
                        "FEED_PAGE_SIZE must be a positive integer, got {size:?}"
                    )))
                }
            };
        }
        Ok(config)
    }

    /// Absolute URL of a backend endpoint path such as `/posts`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.backend_url, path)
    }

    /// Public URL of a file in media storage.
    pub fn media_url(&self, storage_path: &str) -> String {
        format!(
            "{}/{}",
            self.media_url,
            storage_path.trim_start_matches('/')
        )
    }
}

fn required(key: &str) -> Result<String> {
    env::var(key).map_err(|_| Error::Config(format!("{key} environment variable must be set")))
}

fn base_url(key: &str, value: &str) -> Result<String> {
    Url::parse(value).map_err(|e| Error::Config(format!("{key} is not a valid URL: {e}")))?;
    Ok(value.trim_end_matches('/').to_string())
}
