//! Cafe-attribute catalog.
//!
//! The catalog is loaded wholesale from a JSON document before any
//! filtering. Two layouts are accepted:
//!
//! - an object keyed by store key (`"name{code}": { "city": ... }`), where
//!   non-object values are document metadata and are skipped
//! - an array of records, keyed by their `id` (or `name`)
//!
//! Entries keep document order, which is the order the pipeline processes
//! them in.

mod entry;
mod error;

use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

pub use entry::CatalogEntry;
pub use error::CatalogError;

use entry::CatalogRecordDto;

/// The loaded catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Build a catalog from already-constructed entries.
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Load a catalog from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json(&json)?;
        debug!(path = %path.display(), entries = catalog.len(), "loaded catalog");
        Ok(catalog)
    }

    /// Parse a catalog document.
    ///
    /// Records that are objects but fail to parse (e.g. no `city`) are
    /// logged and skipped rather than failing the whole catalog.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let document: Value = serde_json::from_str(json)?;

        let keyed: Vec<(String, Value)> = match document {
            Value::Object(map) => map.into_iter().collect(),
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| (array_key(&item, i), item))
                .collect(),
            _ => return Err(CatalogError::Layout),
        };

        let entries = keyed
            .into_iter()
            .filter(|(_, value)| value.is_object())
            .filter_map(
                |(key, value)| match serde_json::from_value::<CatalogRecordDto>(value) {
                    Ok(dto) => Some(CatalogEntry::from_dto(key, dto)),
                    Err(e) => {
                        warn!(store_key = %key, error = %e, "skipping malformed catalog record");
                        None
                    }
                },
            )
            .collect();

        Ok(Self { entries })
    }

    /// All entries, in document order.
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Entries in `city`, in document order.
    pub fn filter_city<'a>(&'a self, city: &'a str) -> impl Iterator<Item = &'a CatalogEntry> {
        self.entries.iter().filter(move |e| e.in_city(city))
    }

    /// Distinct cities in first-seen order.
    pub fn cities(&self) -> Vec<String> {
        let mut cities: Vec<String> = Vec::new();
        for entry in &self.entries {
            let city = entry.city.trim().to_ascii_lowercase();
            if !cities.contains(&city) {
                cities.push(city);
            }
        }
        cities
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Key for a record in array layout: its `id`, else its `name`, else its
/// position.
fn array_key(item: &Value, index: usize) -> String {
    ["id", "name"]
        .iter()
        .find_map(|field| item.get(field).and_then(Value::as_str))
        .map_or_else(|| index.to_string(), str::to_string)
}
