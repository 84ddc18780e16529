use crate::images::ImageStore;
use crate::models::{ProductRecord, NO_DESCRIPTION, UNKNOWN_TITLE};
use crate::parser;
use anyhow::{Context, Result};
use log::{error, warn};
use scraper::{ElementRef, Selector};
use std::path::PathBuf;
use std::sync::LazyLock;

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector {:?}: {:?}", css, e))
}

static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("h2.woo-loop-product__title"));
static SALE_PRICE: LazyLock<Selector> = LazyLock::new(|| selector("ins"));
static PRICE: LazyLock<Selector> = LazyLock::new(|| selector("bdi"));
static THUMBNAIL: LazyLock<Selector> = LazyLock::new(|| selector("div.mf-product-thumbnail"));
static IMAGE: LazyLock<Selector> = LazyLock::new(|| selector("img"));
static DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| selector("div.woocommerce-product-details__short-description"));

const LAZY_SRC_ATTR: &str = "data-lazy-src";

/// Trims every text node, drops the empty ones and concatenates the rest.
///
/// Descriptions are identity keys, so this must stay byte-compatible with
/// keys already in the store: inner whitespace runs are kept as-is.
fn element_text(element: ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Turns one listing entry into a [`ProductRecord`], saving its image on the side.
pub struct FieldExtractor<S> {
    image_root: PathBuf,
    images: S,
}

impl<S: ImageStore> FieldExtractor<S> {
    pub fn new(image_root: impl Into<PathBuf>, images: S) -> Self {
        Self {
            image_root: image_root.into(),
            images,
        }
    }

    /// Returns `None` when the entry is too malformed to read; the reason is logged.
    pub fn extract(&self, entry: ElementRef) -> Option<ProductRecord> {
        match self.try_extract(entry) {
            Ok(record) => Some(record),
            Err(e) => {
                error!("Error parsing product details: {:#}", e);
                None
            }
        }
    }

    fn try_extract(&self, entry: ElementRef) -> Result<ProductRecord> {
        let title = entry
            .select(&TITLE)
            .next()
            .map(element_text)
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string());

        let price = match entry
            .select(&SALE_PRICE)
            .next()
            .or_else(|| entry.select(&PRICE).next())
        {
            Some(element) => Some(
                parser::clean_price(&element_text(element))
                    .with_context(|| format!("Bad price for {:?}", title))?,
            ),
            None => None,
        };

        let thumbnail = entry
            .select(&THUMBNAIL)
            .next()
            .with_context(|| format!("Thumbnail container missing for {:?}", title))?;
        let image_url = thumbnail
            .select(&IMAGE)
            .next()
            .and_then(|img| img.value().attr(LAZY_SRC_ATTR));

        let image_path = parser::image_path_for(&self.image_root, &title);
        if let Some(url) = image_url {
            if let Err(e) = self.images.store(url, &image_path) {
                warn!("Error saving image {}: {:#}", url, e);
            }
        }

        let description = entry
            .select(&DESCRIPTION)
            .next()
            .map(element_text)
            .unwrap_or_else(|| NO_DESCRIPTION.to_string());

        Ok(ProductRecord {
            title,
            price,
            image_path: image_path.to_string_lossy().into_owned(),
            description,
        })
    }
}
