//! Raw catalog records.

use serde::Deserialize;
use serde_json::Value;

use crate::normalize::strip_branch_code;

/// Catalog record as it appears in the source document.
///
/// Attribute values are kept as raw JSON: the catalog mixes numbers and
/// numeric strings, and deciding what is valid belongs to the mapper.
#[derive(Debug, Clone, Deserialize)]
pub(super) struct CatalogRecordDto {
    pub name: Option<String>,
    pub city: String,
    pub wifi: Option<Value>,
    pub seat: Option<Value>,
    pub quiet: Option<Value>,
    pub cheap: Option<Value>,
    pub address: Option<String>,
}

/// One store from the cafe-attribute catalog.
///
/// Read-only input to the ingestion pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    /// Key of the record in the catalog document, possibly with a branch
    /// code suffix (`"name{code"`).
    pub store_key: String,

    /// Human-readable store name as given by the catalog. May carry noise;
    /// see [`crate::normalize`].
    pub name: String,

    pub city: String,
    pub wifi: Option<Value>,
    pub seat: Option<Value>,
    pub quiet: Option<Value>,
    pub cheap: Option<Value>,
    pub address: Option<String>,
}

impl CatalogEntry {
    pub(super) fn from_dto(store_key: String, dto: CatalogRecordDto) -> Self {
        let name = dto
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| strip_branch_code(&store_key).to_string());

        Self {
            store_key,
            name,
            city: dto.city,
            wifi: dto.wifi,
            seat: dto.seat,
            quiet: dto.quiet,
            cheap: dto.cheap,
            address: dto.address,
        }
    }

    /// Whether this entry belongs to `city` (ASCII case-insensitive).
    pub fn in_city(&self, city: &str) -> bool {
        self.city.trim().eq_ignore_ascii_case(city.trim())
    }
}
