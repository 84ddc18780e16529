use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use reqwest::blocking::Client;
use std::thread;
use std::time::Duration;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Something that can turn a URL into a response body.
pub trait Fetch {
    fn get(&self, url: &str) -> Result<Vec<u8>>;
}

impl<T: Fetch + ?Sized> Fetch for &T {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        (**self).get(url)
    }
}

/// Blocking HTTP client with a fixed timeout and an optional proxy.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, proxy: Option<&str>) -> Result<Self> {
        let mut builder = Client::builder().timeout(timeout).user_agent(USER_AGENT);

        if let Some(proxy_url) = proxy {
            debug!("Using proxy: {}", proxy_url);
            let proxy = reqwest::Proxy::all(proxy_url)
                .with_context(|| format!("Invalid proxy address: {}", proxy_url))?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("Failed to fetch {}", url))?
            .error_for_status()
            .with_context(|| format!("Unsuccessful status from {}", url))?;

        let body = response.bytes().context("Failed to read response body")?;
        Ok(body.to_vec())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    /// Pause between two consecutive attempts.
    pub delay: Duration,
}

/// Fetches numbered listing pages, retrying transient failures.
pub struct PageFetcher<F> {
    fetcher: F,
    base_url: String,
    retry: RetryPolicy,
}

impl<F: Fetch> PageFetcher<F> {
    pub fn new(fetcher: F, base_url: &str, retry: RetryPolicy) -> Self {
        let base_url = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };

        Self {
            fetcher,
            base_url,
            retry,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn page_url(&self, page: usize) -> String {
        format!("{}page/{}/", self.base_url, page)
    }

    pub fn fetch(&self, page: usize) -> Result<Vec<u8>> {
        let url = self.page_url(page);
        let attempts = self.retry.attempts.max(1);

        for attempt in 1..=attempts {
            debug!("Fetching {} (attempt {}/{})", url, attempt, attempts);
            match self.fetcher.get(&url) {
                Ok(body) => return Ok(body),
                Err(e) => {
                    warn!("Attempt {}/{} for {} failed: {:#}", attempt, attempts, url, e);
                    if attempt < attempts {
                        thread::sleep(self.retry.delay);
                    }
                }
            }
        }

        Err(anyhow!("Giving up on {} after {} attempts", url, attempts))
    }
}
