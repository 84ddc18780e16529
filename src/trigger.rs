use crate::config::{ScraperConfig, ScrapingOptions};
use crate::crawler::{CrawlReport, Crawler};
use crate::tui::CrawlTUI;
use anyhow::{bail, Result};
use log::{error, info, warn};
use serde::Serialize;
use std::fmt;

/// The shared secret a trigger must present. Never printed.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Result<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            bail!("Trigger secret must not be empty");
        }
        Ok(Self(secret))
    }

    /// Compares without short-circuiting on the first differing byte.
    pub fn matches(&self, token: &str) -> bool {
        let expected = self.0.as_bytes();
        let given = token.as_bytes();
        if expected.len() != given.len() {
            return false;
        }
        expected
            .iter()
            .zip(given)
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[derive(Debug, Clone)]
pub struct TriggerRequest {
    pub config: ScraperConfig,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TriggerResponse {
    Completed { message: String, new_products: usize },
    BadRequest { detail: String },
    Unauthorized { detail: String },
    ServerError { detail: String },
}

impl TriggerResponse {
    pub fn status_code(&self) -> u16 {
        match self {
            TriggerResponse::Completed { .. } => 200,
            TriggerResponse::BadRequest { .. } => 400,
            TriggerResponse::Unauthorized { .. } => 401,
            TriggerResponse::ServerError { .. } => 500,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TriggerResponse::Completed { .. })
    }
}

/// Authenticates, validates, then hands the config to `crawl`.
///
/// Nothing runs unless the token matches.
pub fn handle_trigger<C>(request: TriggerRequest, secret: &Credential, crawl: C) -> TriggerResponse
where
    C: FnOnce(ScraperConfig) -> Result<CrawlReport>,
{
    if !secret.matches(&request.token) {
        warn!("Rejected crawl trigger with invalid token");
        return TriggerResponse::Unauthorized {
            detail: "Unauthorized".to_string(),
        };
    }

    if let Err(e) = request.config.validate() {
        return TriggerResponse::BadRequest {
            detail: format!("Invalid configuration: {}", e),
        };
    }

    info!("Scraping started (max_pages={})", request.config.max_pages);
    match crawl(request.config) {
        Ok(report) => TriggerResponse::Completed {
            message: "Scraping completed".to_string(),
            new_products: report.new_products(),
        },
        Err(e) => {
            error!("Crawl failed: {:#}", e);
            TriggerResponse::ServerError {
                detail: format!("An error occurred: {:#}", e),
            }
        }
    }
}

/// Runs a live crawl against the configured site.
pub fn trigger_crawl(
    request: TriggerRequest,
    secret: &Credential,
    options: &ScrapingOptions,
    tui: Option<&mut CrawlTUI>,
) -> TriggerResponse {
    handle_trigger(request, secret, |config| {
        let mut crawler = Crawler::from_config(config, options)?;
        crawler.run(tui)
    })
}
