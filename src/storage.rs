use crate::models::ProductRecord;
use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

type Entry = Map<String, Value>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub inserted: usize,
    pub updated: usize,
    pub total: usize,
}

/// A JSON array of records on disk, merged by a chosen key field.
///
/// Every write rewrites the whole file.
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    /// Opens the store, creating an empty one (and its directory) if missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self { path: path.into() };
        if !store.path.exists() {
            debug!("Initializing empty store at {}", store.path.display());
            store.save(&[])?;
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw entries, including any fields the crawler does not know about.
    pub fn load(&self) -> Result<Vec<Entry>> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read store file: {}", self.path.display()))?;
        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("Store file is not valid JSON: {}", self.path.display()))?;

        let Value::Array(items) = value else {
            bail!("Store file {} does not hold a JSON array", self.path.display());
        };

        items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(entry) => Ok(entry),
                other => Err(anyhow!("Store entry {} is not an object: {}", i, other)),
            })
            .collect()
    }

    pub fn records(&self) -> Result<Vec<ProductRecord>> {
        self.load()?
            .into_iter()
            .map(|entry| {
                serde_json::from_value(Value::Object(entry)).context("Malformed product record in store")
            })
            .collect()
    }

    /// Merges `records` into the store by `key_field` and rewrites the file.
    ///
    /// Fields of an incoming record overwrite the stored ones; fields it does
    /// not carry are kept. Applying the same batch twice is a no-op the
    /// second time.
    pub fn bulk_upsert<T: Serialize>(&self, key_field: &str, records: &[T]) -> Result<UpsertOutcome> {
        let mut entries = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for entry in self.load()? {
            let key = key_of(&entry, key_field)?;
            match index.get(&key) {
                Some(&slot) => entries[slot] = entry,
                None => {
                    index.insert(key, entries.len());
                    entries.push(entry);
                }
            }
        }

        let mut outcome = UpsertOutcome::default();
        for record in records {
            let incoming = to_entry(record)?;
            let key = key_of(&incoming, key_field)?;
            match index.get(&key) {
                Some(&slot) => {
                    entries[slot].extend(incoming);
                    outcome.updated += 1;
                }
                None => {
                    index.insert(key, entries.len());
                    entries.push(incoming);
                    outcome.inserted += 1;
                }
            }
        }

        outcome.total = entries.len();
        self.save(&entries)?;
        info!(
            "Upserted {} records into {} ({} new, {} updated, {} total)",
            records.len(),
            self.path.display(),
            outcome.inserted,
            outcome.updated,
            outcome.total
        );
        Ok(outcome)
    }

    /// Single-record merge against a fresh snapshot of the file.
    ///
    /// Returns `true` when the record was inserted rather than merged.
    pub fn create_or_update<T: Serialize>(&self, key_field: &str, record: &T) -> Result<bool> {
        let incoming = to_entry(record)?;
        let key = key_of(&incoming, key_field)?;
        let mut entries = self.load()?;

        let mut inserted = true;
        for entry in entries.iter_mut() {
            if key_of(entry, key_field)? == key {
                entry.extend(incoming.clone());
                inserted = false;
                break;
            }
        }
        if inserted {
            entries.push(incoming);
        }

        self.save(&entries)?;
        Ok(inserted)
    }

    fn save(&self, entries: &[Entry]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create store directory {}", parent.display()))?;
        }

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        entries
            .serialize(&mut serializer)
            .context("Failed to serialize store entries")?;

        let tmp_path = self.tmp_path();
        fs::write(&tmp_path, &buf)
            .with_context(|| format!("Failed to write store file: {}", tmp_path.display()))?;
        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            if let Err(cleanup) = fs::remove_file(&tmp_path) {
                warn!("Failed to remove {}: {}", tmp_path.display(), cleanup);
            }
            return Err(e)
                .with_context(|| format!("Failed to replace store file: {}", self.path.display()));
        }
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn to_entry<T: Serialize>(record: &T) -> Result<Entry> {
    match serde_json::to_value(record).context("Failed to serialize record")? {
        Value::Object(entry) => Ok(entry),
        other => Err(anyhow!("Record does not serialize to an object: {}", other)),
    }
}

/// The key as JSON text, so `1` and `"1"` stay distinct.
fn key_of(entry: &Entry, key_field: &str) -> Result<String> {
    match entry.get(key_field) {
        Some(Value::Null) | None => Err(anyhow!("Record has no {:?} key", key_field)),
        Some(value) => Ok(value.to_string()),
    }
}
