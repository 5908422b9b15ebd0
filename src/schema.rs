use std::collections::BTreeMap;

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A stored tariff record. `id` is the store-assigned surrogate key;
/// `(date, cargo_type)` is the business key and is unique within the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Tariff {
    pub id: i64,
    pub date: NaiveDate,
    pub cargo_type: String,
    pub rate: f64,
}

/// One `(date, cargo_type, rate)` triple produced by shape-checking a raw
/// rates payload. By the time this type exists, the date is a real calendar
/// date and the rate is a number.
#[derive(Debug, Clone, PartialEq)]
pub struct TariffEntry {
    pub date: NaiveDate,
    pub cargo_type: String,
    pub rate: f64,
}

/// A shape-checked rates document: the payload's tariff entries flattened
/// into payload order.
#[derive(Debug, Clone, PartialEq)]
pub struct RatesDocument {
    entries: Vec<TariffEntry>,
}

impl RatesDocument {
    pub(crate) fn new(entries: Vec<TariffEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[TariffEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Counts reported by one reconciliation run. Entries that matched an
/// existing record with an unchanged rate appear in neither count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub created: u64,
    pub updated: u64,
}

/// Rate multiplier as written in the rates file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RateValue {
    #[schemars(description = "Rate as a JSON number, e.g. 0.04")]
    Number(f64),

    #[schemars(description = "Rate as a numeric string, e.g. \"0.04\"")]
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RatesFileEntry {
    #[schemars(
        description = "Cargo category the rate applies to (e.g. 'Glass', 'Other'). Matched exactly, case-sensitively, at pricing time."
    )]
    pub cargo_type: String,

    #[schemars(
        description = "Rate multiplier applied to the declared cargo value. Either a JSON number or a numeric string."
    )]
    pub rate: RateValue,
}

/// The on-disk rates file: a JSON object whose keys are dates in YYYY-MM-DD
/// format and whose values are the tariff entries taking effect on that date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RatesFile(pub BTreeMap<String, Vec<RatesFileEntry>>);

impl RatesFile {
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(RatesFile)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
