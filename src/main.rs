use anyhow::{bail, Context, Result};
use catalog_scraper::config::{ScraperConfig, ScrapingOptions, TOKEN_ENV_VAR};
use catalog_scraper::trigger::{trigger_crawl, Credential, TriggerRequest};
use catalog_scraper::tui::CrawlTUI;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Catalog Scraper - product listing crawler")]
struct Args {
    /// Token presented with this crawl request
    #[clap(short, long)]
    token: String,

    /// Expected trigger secret
    #[clap(long, env = TOKEN_ENV_VAR, hide_env_values = true)]
    secret: String,

    /// Crawl configuration as JSON, e.g. '{"max_pages": 3}'
    #[clap(long)]
    config: Option<String>,

    /// Maximum number of listing pages to crawl
    #[clap(short, long)]
    max_pages: Option<usize>,

    /// Proxy address applied to every request
    #[clap(short, long)]
    proxy: Option<String>,

    /// Seed the change cache from the store before crawling
    #[clap(long)]
    rehydrate_cache: bool,

    /// Path to the JSON store file
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Directory images are written to
    #[clap(short, long)]
    images: Option<PathBuf>,

    /// Enable debug output
    #[clap(short, long)]
    debug: bool,
}

impl Args {
    fn scraper_config(&self) -> Result<ScraperConfig> {
        let mut config = match &self.config {
            Some(body) => serde_json::from_str(body).context("Failed to parse --config JSON")?,
            None => ScraperConfig::default(),
        };
        if let Some(max_pages) = self.max_pages {
            config.max_pages = max_pages;
        }
        if let Some(proxy) = &self.proxy {
            config.proxy = Some(proxy.clone());
        }
        if self.rehydrate_cache {
            config.rehydrate_cache = true;
        }
        Ok(config)
    }

    fn scraping_options(&self) -> ScrapingOptions {
        let mut options = ScrapingOptions::default();
        if let Some(output) = &self.output {
            options.output_file = output.clone();
        }
        if let Some(images) = &self.images {
            options.image_root = images.clone();
        }
        options
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let secret = Credential::new(args.secret.clone())?;
    let request = TriggerRequest {
        config: args.scraper_config()?,
        token: args.token.clone(),
    };
    let options = args.scraping_options();

    println!("Catalog Scraper");
    println!("===============");

    let mut tui = CrawlTUI::stdout();
    let response = trigger_crawl(request, &secret, &options, Some(&mut tui));

    println!("{}", serde_json::to_string_pretty(&response)?);
    if !response.is_success() {
        bail!("Crawl request failed with status {}", response.status_code());
    }

    Ok(())
}
