use anyhow::{anyhow, Result};
use catalog_scraper::config::{ScraperConfig, ScrapingOptions};
use catalog_scraper::crawler::Crawler;
use catalog_scraper::fetcher::{Fetch, RetryPolicy};
use catalog_scraper::images::{HttpImageStore, ImageStore};
use catalog_scraper::models::ProductRecord;
use catalog_scraper::trigger::{handle_trigger, Credential, TriggerRequest, TriggerResponse};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const BASE: &str = "https://shop.test/shop/";

/// Serves canned bodies by URL; anything else fails. Records every request.
#[derive(Default)]
struct CannedSite {
    pages: HashMap<String, String>,
    requests: RefCell<Vec<String>>,
}

impl CannedSite {
    fn with_page(mut self, page: usize, body: &str) -> Self {
        self.pages.insert(format!("{}page/{}/", BASE, page), body.to_string());
        self
    }

    fn requests_for(&self, page: usize) -> usize {
        let url = format!("{}page/{}/", BASE, page);
        self.requests.borrow().iter().filter(|u| **u == url).count()
    }
}

impl Fetch for CannedSite {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        self.requests.borrow_mut().push(url.to_string());
        self.pages
            .get(url)
            .map(|body| body.as_bytes().to_vec())
            .ok_or_else(|| anyhow!("503 Service Unavailable for {}", url))
    }
}

#[derive(Default)]
struct RecordingImages {
    saved: RefCell<Vec<(String, PathBuf)>>,
}

impl ImageStore for RecordingImages {
    fn store(&self, url: &str, path: &Path) -> Result<()> {
        self.saved.borrow_mut().push((url.to_string(), path.to_path_buf()));
        Ok(())
    }
}

fn entry(title: &str, price: &str, description: &str, image: Option<&str>) -> String {
    let img = image
        .map(|src| format!(r#"<img src="placeholder.svg" data-lazy-src="{}">"#, src))
        .unwrap_or_default();
    format!(
        r##"<li class="product type-product">
             <div class="mf-product-thumbnail"><a href="#">{img}</a></div>
             <div class="mf-product-details">
               <h2 class="woo-loop-product__title"><a href="#">{title}</a></h2>
               <span class="price"><bdi><span class="woocommerce-Price-currencySymbol">₹</span>{price}</bdi></span>
               <div class="woocommerce-product-details__short-description"><p>{description}</p></div>
             </div>
           </li>"##
    )
}

fn page(entries: &[String]) -> String {
    format!(
        r#"<html><body><div class="shop"><ul class="products columns-4">{}</ul></div></body></html>"#,
        entries.concat()
    )
}

fn options(dir: &Path, delay: Duration) -> ScrapingOptions {
    ScrapingOptions {
        base_url: BASE.to_string(),
        output_file: dir.join("data/scraped_data.json"),
        image_root: dir.join("data/images"),
        timeout: Duration::from_secs(1),
        retry: RetryPolicy { attempts: 3, delay },
    }
}

fn config(max_pages: usize) -> ScraperConfig {
    ScraperConfig {
        max_pages,
        ..ScraperConfig::default()
    }
}

#[test]
fn only_new_records_reach_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let opts = options(dir.path(), Duration::ZERO);
    fs::create_dir_all(opts.output_file.parent().unwrap()).unwrap();
    fs::write(
        &opts.output_file,
        r#"[{"product_title": "Cement", "product_price": 450, "path_to_image": "x.jpg", "short_description": "B"}]"#,
    )
    .unwrap();

    let site = CannedSite::default().with_page(
        1,
        &page(&[
            entry("Bonding Agent", "1,299.00", "A", None),
            entry("Cement", "450.00", "B", None),
        ]),
    );
    let images = RecordingImages::default();
    let mut crawler = Crawler::new(config(1), &opts, &site, &images).unwrap();
    crawler.cache_mut().set("B", Some(450));

    let report = crawler.run(None).unwrap();

    assert_eq!(report.products.len(), 1);
    assert_eq!(report.products[0].description, "A");
    assert_eq!(report.products[0].price, Some(1299));
    assert_eq!(report.store.inserted, 1);
    assert_eq!(report.store.total, 2);

    let stored = crawler.store().records().unwrap();
    let descriptions: Vec<_> = stored.iter().map(|r| r.description.as_str()).collect();
    assert_eq!(descriptions, vec!["B", "A"]);
}

#[test]
fn failing_page_is_retried_then_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let opts = options(dir.path(), Duration::from_millis(15));
    let site = CannedSite::default()
        .with_page(2, &page(&[entry("Gloves", "300", "Nitrile gloves", None)]))
        .with_page(3, &page(&[entry("Masks", "150", "Surgical masks", None)]));
    let images = RecordingImages::default();
    let mut crawler = Crawler::new(config(3), &opts, &site, &images).unwrap();

    let started = Instant::now();
    let report = crawler.run(None).unwrap();

    assert!(started.elapsed() >= Duration::from_millis(30));
    assert_eq!(site.requests_for(1), 3);
    assert_eq!(site.requests_for(2), 1);
    assert_eq!(site.requests_for(3), 1);
    assert_eq!(report.pages_skipped, vec![1]);
    assert_eq!(report.pages_processed, 2);
    assert_eq!(report.new_products(), 2);
}

#[test]
fn images_are_requested_for_lazy_sources_only() {
    let dir = tempfile::tempdir().unwrap();
    let opts = options(dir.path(), Duration::ZERO);
    let site = CannedSite::default().with_page(
        1,
        &page(&[
            entry("Scaler Tip #3", "99", "Ultrasonic tip", Some("https://cdn.test/tip.jpg")),
            entry("Bib", "5", "Patient bib", None),
        ]),
    );
    let images = RecordingImages::default();
    let mut crawler = Crawler::new(config(1), &opts, &site, &images).unwrap();

    let report = crawler.run(None).unwrap();

    let expected = opts.image_root.join("Scaler_Tip__3.jpg");
    assert_eq!(
        *images.saved.borrow(),
        vec![("https://cdn.test/tip.jpg".to_string(), expected.clone())]
    );
    assert_eq!(report.products[0].image_path, expected.to_string_lossy());
    assert_eq!(report.products[1].image_path, opts.image_root.join("Bib.jpg").to_string_lossy());
}

#[test]
fn image_files_land_under_image_root() {
    let dir = tempfile::tempdir().unwrap();
    let opts = options(dir.path(), Duration::ZERO);
    let site = CannedSite::default().with_page(
        1,
        &page(&[
            entry("Explorer", "10", "Periodontal explorer", Some("https://cdn.test/explorer.jpg")),
            entry("Mirror", "20", "Mouth mirror", Some("https://cdn.test/missing.jpg")),
        ]),
    );
    let mut cdn = CannedSite::default();
    cdn.pages.insert("https://cdn.test/explorer.jpg".to_string(), "JPEGDATA".to_string());
    let mut crawler = Crawler::new(config(1), &opts, &site, HttpImageStore::new(&cdn)).unwrap();

    let report = crawler.run(None).unwrap();

    assert_eq!(report.new_products(), 2);
    assert_eq!(fs::read(opts.image_root.join("Explorer.jpg")).unwrap(), b"JPEGDATA");
    assert!(!opts.image_root.join("Mirror.jpg").exists());
}

#[test]
fn price_change_within_a_run_is_accepted_again() {
    let dir = tempfile::tempdir().unwrap();
    let opts = options(dir.path(), Duration::ZERO);
    let site = CannedSite::default()
        .with_page(1, &page(&[entry("Floss", "40", "Waxed floss", None)]))
        .with_page(2, &page(&[entry("Floss", "35", "Waxed floss", None)]));
    let images = RecordingImages::default();
    let mut crawler = Crawler::new(config(2), &opts, &site, &images).unwrap();

    let report = crawler.run(None).unwrap();

    assert_eq!(report.new_products(), 2);
    assert_eq!(report.store.total, 1);
    let stored: Vec<ProductRecord> = crawler.store().records().unwrap();
    assert_eq!(stored[0].price, Some(35));
}

#[test]
fn storage_failure_surfaces_as_server_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut opts = options(dir.path(), Duration::ZERO);
    // a directory where the store file should be
    opts.output_file = dir.path().to_path_buf();
    let site = CannedSite::default().with_page(1, &page(&[entry("Floss", "40", "Waxed floss", None)]));
    let images = RecordingImages::default();
    let secret = Credential::new("letmein").unwrap();
    let request = TriggerRequest {
        config: config(1),
        token: "letmein".to_string(),
    };

    let response = handle_trigger(request, &secret, |config| {
        Crawler::new(config, &opts, &site, &images)?.run(None)
    });

    assert_eq!(response.status_code(), 500);
    match response {
        TriggerResponse::ServerError { detail } => assert!(detail.starts_with("An error occurred: ")),
        other => panic!("unexpected response: {:?}", other),
    }
}

#[test]
fn multi_paragraph_description_merges_with_stored_key() {
    let dir = tempfile::tempdir().unwrap();
    let opts = options(dir.path(), Duration::ZERO);
    fs::create_dir_all(opts.output_file.parent().unwrap()).unwrap();
    fs::write(
        &opts.output_file,
        r#"[{"product_title": "Composite Kit", "product_price": 100, "path_to_image": "data/images/Composite_Kit.jpg", "short_description": "Line oneLine  two"}]"#,
    )
    .unwrap();

    let listing = r#"<ul class="products">
          <li class="product">
            <div class="mf-product-thumbnail"></div>
            <h2 class="woo-loop-product__title">Composite Kit</h2>
            <bdi>₹120.00</bdi>
            <div class="woocommerce-product-details__short-description">
              <p>Line one</p>
<p>Line  two</p>
            </div>
          </li>
        </ul>"#;
    let site = CannedSite::default().with_page(1, listing);
    let images = RecordingImages::default();
    let mut crawler = Crawler::new(config(1), &opts, &site, &images).unwrap();

    let report = crawler.run(None).unwrap();

    assert_eq!(report.products[0].description, "Line oneLine  two");
    assert_eq!(report.store.updated, 1);
    assert_eq!(report.store.inserted, 0);
    let stored = crawler.store().records().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].price, Some(120));
}
