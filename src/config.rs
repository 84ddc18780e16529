use crate::fetcher::RetryPolicy;
use anyhow::{bail, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

pub const BASE_URL: &str = "https://dentalstall.com/shop/";
pub const STORAGE_FILE_PATH: &str = "data/scraped_data.json";
pub const IMAGE_STORAGE_PATH: &str = "data/images";
pub const DEFAULT_MAX_PAGES: usize = 5;
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const FETCH_ATTEMPTS: u32 = 3;
pub const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Environment variable holding the trigger secret.
pub const TOKEN_ENV_VAR: &str = "CATALOG_SCRAPER_TOKEN";

/// Per-invocation crawl settings, as accepted by the trigger.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub max_pages: usize,
    pub proxy: Option<String>,
    /// Seed the change cache from the store before crawling.
    pub rehydrate_cache: bool,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            proxy: None,
            rehydrate_cache: false,
        }
    }
}

impl ScraperConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_pages == 0 {
            bail!("max_pages must be a positive integer");
        }
        if let Some(proxy) = &self.proxy {
            if proxy.trim().is_empty() {
                bail!("proxy address must not be empty");
            }
        }
        Ok(())
    }
}

/// Where things live and how hard to try, fixed for one deployment.
#[derive(Debug, Clone)]
pub struct ScrapingOptions {
    pub base_url: String,
    pub output_file: PathBuf,
    pub image_root: PathBuf,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ScrapingOptions {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            output_file: PathBuf::from(STORAGE_FILE_PATH),
            image_root: PathBuf::from(IMAGE_STORAGE_PATH),
            timeout: REQUEST_TIMEOUT,
            retry: RetryPolicy {
                attempts: FETCH_ATTEMPTS,
                delay: RETRY_DELAY,
            },
        }
    }
}
