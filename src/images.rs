use crate::fetcher::Fetch;
use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::Path;

/// Best-effort "download this URL to that path" capability.
pub trait ImageStore {
    fn store(&self, url: &str, path: &Path) -> Result<()>;
}

impl<T: ImageStore + ?Sized> ImageStore for &T {
    fn store(&self, url: &str, path: &Path) -> Result<()> {
        (**self).store(url, path)
    }
}

/// Downloads through any [`Fetch`] and writes the bytes to disk.
pub struct HttpImageStore<F> {
    fetcher: F,
}

impl<F: Fetch> HttpImageStore<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }
}

impl<F: Fetch> ImageStore for HttpImageStore<F> {
    fn store(&self, url: &str, path: &Path) -> Result<()> {
        let bytes = self.fetcher.get(url)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create image directory {}", parent.display()))?;
        }
        fs::write(path, &bytes)
            .with_context(|| format!("Failed to write image {}", path.display()))?;

        debug!("Saved {} bytes from {} to {}", bytes.len(), url, path.display());
        Ok(())
    }
}
