use crate::models::ProductRecord;
use std::collections::HashMap;

/// Last seen price per identity key, scoped to one crawl.
///
/// A record passes the filter when its price differs from the cached one or
/// its key has not been seen yet. Unless [`ChangeCache::rehydrate`] is
/// called, nothing survives the crawl, so "unchanged" only means unchanged
/// within the current run.
#[derive(Debug, Default)]
pub struct ChangeCache {
    prices: HashMap<String, Option<i64>>,
}

impl ChangeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the cache from previously stored records.
    pub fn rehydrate<'a>(&mut self, records: impl IntoIterator<Item = &'a ProductRecord>) {
        for record in records {
            self.set(record.identity_key(), record.price);
        }
    }

    /// `None` means never seen; `Some(None)` means seen without a price.
    pub fn get(&self, key: &str) -> Option<Option<i64>> {
        self.prices.get(key).copied()
    }

    pub fn set(&mut self, key: &str, price: Option<i64>) {
        self.prices.insert(key.to_string(), price);
    }

    /// Records the price and reports whether the record is new or changed.
    pub fn accept(&mut self, record: &ProductRecord) -> bool {
        if self.get(record.identity_key()) == Some(record.price) {
            return false;
        }
        self.set(record.identity_key(), record.price);
        true
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}
