use crate::cache::ChangeCache;
use crate::config::{ScraperConfig, ScrapingOptions};
use crate::extractor::FieldExtractor;
use crate::fetcher::{Fetch, HttpFetcher, PageFetcher};
use crate::images::{HttpImageStore, ImageStore};
use crate::models::{ProductRecord, IDENTITY_KEY};
use crate::storage::{JsonStore, UpsertOutcome};
use crate::tui::CrawlTUI;
use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use scraper::{Html, Selector};
use std::sync::LazyLock;

static LISTING: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("ul.products").expect("listing selector is valid"));
static ENTRY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li.product").expect("entry selector is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlPhase {
    Idle,
    Fetching(usize),
    Extracting(usize),
    Persisting,
    Done,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageStats {
    pub entries: usize,
    pub failed: usize,
    pub accepted: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub pages_processed: usize,
    pub pages_skipped: Vec<usize>,
    pub entries_seen: usize,
    pub entries_failed: usize,
    /// Records accepted by the change cache, in crawl order.
    pub products: Vec<ProductRecord>,
    pub store: UpsertOutcome,
}

impl CrawlReport {
    pub fn new_products(&self) -> usize {
        self.products.len()
    }
}

/// Drives one crawl: pages in order, entries through the cache, one final upsert.
pub struct Crawler<F, S> {
    config: ScraperConfig,
    pages: PageFetcher<F>,
    extractor: FieldExtractor<S>,
    cache: ChangeCache,
    store: JsonStore,
    phase: CrawlPhase,
}

impl Crawler<HttpFetcher, HttpImageStore<HttpFetcher>> {
    /// Crawler wired to the live site, with the proxy applied to every request.
    pub fn from_config(config: ScraperConfig, options: &ScrapingOptions) -> Result<Self> {
        let proxy = config.proxy.clone();
        let pages = HttpFetcher::new(options.timeout, proxy.as_deref())?;
        let images = HttpImageStore::new(HttpFetcher::new(options.timeout, proxy.as_deref())?);
        Self::new(config, options, pages, images)
    }
}

impl<F: Fetch, S: ImageStore> Crawler<F, S> {
    pub fn new(config: ScraperConfig, options: &ScrapingOptions, fetcher: F, images: S) -> Result<Self> {
        config.validate()?;
        let store = JsonStore::open(&options.output_file)?;

        Ok(Self {
            config,
            pages: PageFetcher::new(fetcher, &options.base_url, options.retry),
            extractor: FieldExtractor::new(&options.image_root, images),
            cache: ChangeCache::new(),
            store,
            phase: CrawlPhase::Idle,
        })
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    pub fn cache_mut(&mut self) -> &mut ChangeCache {
        &mut self.cache
    }

    pub fn store(&self) -> &JsonStore {
        &self.store
    }

    /// Full crawl: page loop, persist, summary.
    pub fn run(&mut self, mut tui: Option<&mut CrawlTUI>) -> Result<CrawlReport> {
        if self.config.rehydrate_cache {
            let known = self.store.records().context("Failed to rehydrate change cache")?;
            self.cache.rehydrate(&known);
            info!("Change cache seeded with {} stored records", known.len());
        }

        let mut report = self.scrape(tui.as_deref_mut());
        report.store = self.save(&report.products)?;
        self.phase = CrawlPhase::Done;

        info!("Scraping completed. {} new products added.", report.new_products());
        if let Some(tui) = tui {
            if let Err(e) = tui.finish(report.new_products(), report.store.total) {
                debug!("Progress display failed: {}", e);
            }
        }
        Ok(report)
    }

    /// Walks pages `1..=max_pages`; unreachable pages are skipped.
    pub fn scrape(&mut self, mut tui: Option<&mut CrawlTUI>) -> CrawlReport {
        let mut report = CrawlReport::default();
        let max_pages = self.config.max_pages;

        if let Some(tui) = tui.as_mut() {
            if let Err(e) = tui.start_crawl(max_pages, self.pages.base_url()) {
                debug!("Progress display failed: {}", e);
            }
        }

        for page in 1..=max_pages {
            self.phase = CrawlPhase::Fetching(page);
            let body = match self.pages.fetch(page) {
                Ok(body) => body,
                Err(e) => {
                    error!("Failed to retrieve page {}: {:#}", page, e);
                    report.pages_skipped.push(page);
                    if let Some(tui) = tui.as_mut() {
                        if let Err(e) = tui.page_skipped(page) {
                            debug!("Progress display failed: {}", e);
                        }
                    }
                    continue;
                }
            };

            self.phase = CrawlPhase::Extracting(page);
            let stats = self.scrape_page(&body, &mut report.products);
            report.pages_processed += 1;
            report.entries_seen += stats.entries;
            report.entries_failed += stats.failed;
            info!(
                "Scraping completed for page {} ({} entries, {} accepted, {} unreadable)",
                page, stats.entries, stats.accepted, stats.failed
            );

            if let Some(tui) = tui.as_mut() {
                if let Err(e) = tui.page_done(page, stats.entries, stats.accepted) {
                    debug!("Progress display failed: {}", e);
                }
            }
        }

        report
    }

    /// Extracts every entry on one page, appending accepted records to `products`.
    pub fn scrape_page(&mut self, body: &[u8], products: &mut Vec<ProductRecord>) -> PageStats {
        let html = String::from_utf8_lossy(body);
        let document = Html::parse_document(&html);
        let mut stats = PageStats::default();

        for listing in document.select(&LISTING) {
            for entry in listing.select(&ENTRY) {
                stats.entries += 1;
                let Some(record) = self.extractor.extract(entry) else {
                    stats.failed += 1;
                    continue;
                };

                if self.cache.accept(&record) {
                    debug!("Accepted {:?} at price {:?}", record.description, record.price);
                    products.push(record);
                    stats.accepted += 1;
                } else {
                    debug!("Unchanged {:?}, skipping", record.description);
                }
            }
        }

        if stats.entries == 0 {
            warn!("No product entries found on page");
        }
        stats
    }

    /// Merges the accepted records into the store, keyed by description.
    pub fn save(&mut self, products: &[ProductRecord]) -> Result<UpsertOutcome> {
        self.phase = CrawlPhase::Persisting;
        self.store
            .bulk_upsert(IDENTITY_KEY, products)
            .with_context(|| format!("Failed to save products to {}", self.store.path().display()))
    }
}
