//! # Cargo Insurance
//!
//! Core logic for a small cargo-insurance pricing service: tariff rates are
//! bulk-loaded from a JSON file and looked up at pricing time by the exact
//! `(date, cargo_type)` pair.
//!
//! ## Core Concepts
//!
//! - **Rates file**: a JSON object mapping `YYYY-MM-DD` dates to lists of
//!   `{cargo_type, rate}` entries; the whole payload is shape-checked before
//!   anything is written
//! - **Reconciliation**: each entry either creates a missing record, updates
//!   a record whose stored rate differs, or is a no-op; one run reports how
//!   many records it created and updated
//! - **Pricing**: `insurance_cost = declared_value * rate`, with a missing
//!   tariff reported as not-found rather than priced at zero
//! - **Store seam**: the [`TariffStore`] trait keeps the logic independent of
//!   PostgreSQL; tests run against [`MemoryTariffStore`]
//!
//! The HTTP layer in [`http`] maps `POST /loaddata` and
//! `GET /calculate_insurance` onto these operations.
//!
//! ## Example
//!
//! ```rust,ignore
//! use cargo_insurance::{ingestion, pricing, MemoryTariffStore};
//!
//! let store = MemoryTariffStore::new();
//!
//! let payload = serde_json::json!({
//!     "2024-01-01": [{"cargo_type": "electronics", "rate": 0.05}],
//! });
//! let document = ingestion::parse_rates_document(&payload)?;
//! let report = ingestion::reconcile(&store, &document).await?;
//! assert_eq!((report.created, report.updated), (1, 0));
//!
//! let cost = pricing::calculate_insurance(&store, "2024-01-01", "electronics", 1000.0).await?;
//! assert_eq!(cost, 50.0);
//! ```

pub mod config;
pub mod dates;
pub mod error;
pub mod http;
pub mod ingestion;
pub mod postgres;
pub mod pricing;
pub mod schema;
pub mod store;

pub use config::AppConfig;
pub use dates::parse_date;
pub use error::{Result, TariffError};
pub use ingestion::{load_rates_file, parse_rates_document, reconcile};
pub use postgres::PgTariffStore;
pub use pricing::calculate_insurance;
pub use schema::{LoadReport, RatesDocument, RatesFile, RatesFileEntry, RateValue, Tariff, TariffEntry};
pub use store::{MemoryTariffStore, TariffStore};
