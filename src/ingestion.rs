use std::path::Path;

use log::{debug, error, info};
use serde_json::Value;

use crate::dates::parse_date;
use crate::error::{Result, TariffError};
use crate::schema::{LoadReport, RatesDocument, TariffEntry};
use crate::store::TariffStore;

/// Shape-checks a raw JSON payload against the rates-file format and
/// flattens it into typed `(date, cargo_type, rate)` entries in payload
/// order.
///
/// Checks run in a fixed order — root type, then per top-level pair the key
/// format and value type, then per list element the element type, required
/// fields, and rate coercion — and the first violation fails the whole
/// payload with a message naming the offending key or entry. Nothing is
/// written anywhere; this runs before any store access.
pub fn parse_rates_document(payload: &Value) -> Result<RatesDocument> {
    let root = payload.as_object().ok_or_else(|| {
        TariffError::InvalidPayload(format!(
            "rates document root must be a JSON object mapping dates to tariff lists, got {}",
            json_type_name(payload)
        ))
    })?;

    let mut entries = Vec::new();
    for (raw_date, value) in root {
        let date = parse_date(raw_date).map_err(|_| {
            TariffError::InvalidPayload(format!(
                "top-level key \"{}\" is not a date in YYYY-MM-DD format",
                raw_date
            ))
        })?;

        let list = value.as_array().ok_or_else(|| {
            TariffError::InvalidPayload(format!(
                "tariff list for \"{}\" must be a JSON array, got {}",
                raw_date,
                json_type_name(value)
            ))
        })?;

        for (index, item) in list.iter().enumerate() {
            let entry = item.as_object().ok_or_else(|| {
                TariffError::InvalidPayload(format!(
                    "tariff entry {} for \"{}\" must be a JSON object, got {}",
                    index,
                    raw_date,
                    json_type_name(item)
                ))
            })?;

            let cargo_type = entry
                .get("cargo_type")
                .ok_or_else(|| missing_field(raw_date, index, "cargo_type"))?;
            let cargo_type = cargo_type.as_str().ok_or_else(|| {
                TariffError::InvalidPayload(format!(
                    "field \"cargo_type\" of tariff entry {} for \"{}\" must be a string, got {}",
                    index,
                    raw_date,
                    json_type_name(cargo_type)
                ))
            })?;

            let rate = entry
                .get("rate")
                .ok_or_else(|| missing_field(raw_date, index, "rate"))?;
            let rate = coerce_rate(rate).ok_or_else(|| {
                TariffError::InvalidPayload(format!(
                    "field \"rate\" of tariff entry {} for \"{}\" must be a number or a numeric string, got {}",
                    index,
                    raw_date,
                    json_type_name(rate)
                ))
            })?;

            entries.push(TariffEntry {
                date,
                cargo_type: cargo_type.to_string(),
                rate,
            });
        }
    }

    Ok(RatesDocument::new(entries))
}

fn missing_field(raw_date: &str, index: usize, field: &str) -> TariffError {
    TariffError::InvalidPayload(format!(
        "tariff entry {} for \"{}\" is missing required field \"{}\"",
        index, raw_date, field
    ))
}

/// Accepts a JSON number or a numeric string such as "0.04".
fn coerce_rate(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Reconciles parsed entries against the store, strictly in document order:
/// create when the business key is absent, update when the stored rate
/// differs from the incoming one (exact float comparison), no-op otherwise.
///
/// A duplicate key within one document therefore resolves to the last
/// entry's rate. A create that loses a unique-key race to a concurrent
/// writer is treated as a no-op: the record exists, which is all the insert
/// was meant to ensure.
pub async fn reconcile<S: TariffStore + ?Sized>(
    store: &S,
    document: &RatesDocument,
) -> Result<LoadReport> {
    let mut report = LoadReport::default();

    for entry in document.entries() {
        match store.find_by_key(entry.date, &entry.cargo_type).await? {
            Some(existing) => {
                if existing.rate != entry.rate {
                    store.update_rate(existing.id, entry.rate).await?;
                    debug!(
                        "updated tariff for {} / {}: rate {} -> {}",
                        entry.date, entry.cargo_type, existing.rate, entry.rate
                    );
                    report.updated += 1;
                }
            }
            None => match store.create(entry.date, &entry.cargo_type, entry.rate).await {
                Ok(_) => {
                    debug!(
                        "created tariff for {} / {} at rate {}",
                        entry.date, entry.cargo_type, entry.rate
                    );
                    report.created += 1;
                }
                Err(TariffError::DuplicateTariff { .. }) => {}
                Err(other) => return Err(other),
            },
        }
    }

    Ok(report)
}

/// Runs a full ingestion: read the rates file, shape-check it, and reconcile
/// every entry against the store.
pub async fn load_rates_file<S: TariffStore + ?Sized>(
    store: &S,
    path: &Path,
) -> Result<LoadReport> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|err| {
        error!("failed to read rates file {}: {}", path.display(), err);
        TariffError::from(err)
    })?;

    let payload: Value = serde_json::from_str(&raw)?;
    let document = parse_rates_document(&payload)?;
    let report = reconcile(store, &document).await?;

    info!(
        "reconciled {} from {} entries: {} created, {} updated",
        path.display(),
        document.len(),
        report.created,
        report.updated
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use async_trait::async_trait;
    use chrono::NaiveDate;
    use serde_json::json;

    use crate::schema::Tariff;
    use crate::store::MemoryTariffStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_flattens_entries_in_payload_order() {
        let payload = json!({
            "2020-07-01": [
                {"cargo_type": "Glass", "rate": 0.035},
            ],
            "2020-06-01": [
                {"cargo_type": "Glass", "rate": 0.04},
                {"cargo_type": "Other", "rate": "0.01"},
            ],
        });

        let document = parse_rates_document(&payload).unwrap();
        assert_eq!(document.len(), 3);

        let entries = document.entries();
        assert_eq!(entries[0].date, date(2020, 7, 1));
        assert_eq!(entries[0].rate, 0.035);
        assert_eq!(entries[1].date, date(2020, 6, 1));
        assert_eq!(entries[1].cargo_type, "Glass");
        assert_eq!(entries[2].cargo_type, "Other");
        assert_eq!(entries[2].rate, 0.01);
    }

    #[test]
    fn test_parse_accepts_empty_document() {
        let document = parse_rates_document(&json!({})).unwrap();
        assert!(document.is_empty());
    }

    #[test]
    fn test_parse_rejects_non_object_root() {
        let err = parse_rates_document(&json!([{"cargo_type": "Glass", "rate": 0.04}])).unwrap_err();
        assert!(matches!(err, TariffError::InvalidPayload(_)));
        assert!(err.to_string().contains("root must be a JSON object"));
        assert!(err.to_string().contains("array"));
    }

    #[test]
    fn test_parse_rejects_non_date_key() {
        let err = parse_rates_document(&json!({"2024": []})).unwrap_err();
        assert!(err.to_string().contains("\"2024\""));
        assert!(err.to_string().contains("YYYY-MM-DD"));
    }

    #[test]
    fn test_parse_rejects_non_array_value() {
        let err = parse_rates_document(&json!({"2020-06-01": "Glass"})).unwrap_err();
        assert!(err.to_string().contains("must be a JSON array"));
        assert!(err.to_string().contains("string"));
    }

    #[test]
    fn test_parse_rejects_non_object_entry() {
        let err = parse_rates_document(&json!({"2020-06-01": ["Glass"]})).unwrap_err();
        assert!(err.to_string().contains("tariff entry 0"));
        assert!(err.to_string().contains("must be a JSON object"));
    }

    #[test]
    fn test_parse_rejects_missing_fields() {
        let err = parse_rates_document(&json!({"2020-06-01": [{"rate": 0.04}]})).unwrap_err();
        assert!(err.to_string().contains("missing required field \"cargo_type\""));

        let err =
            parse_rates_document(&json!({"2020-06-01": [{"cargo_type": "Glass"}]})).unwrap_err();
        assert!(err.to_string().contains("missing required field \"rate\""));
    }

    #[test]
    fn test_parse_rejects_wrong_field_types() {
        let err = parse_rates_document(&json!({"2020-06-01": [{"cargo_type": 5, "rate": 0.04}]}))
            .unwrap_err();
        assert!(err.to_string().contains("\"cargo_type\""));
        assert!(err.to_string().contains("must be a string"));

        let err = parse_rates_document(
            &json!({"2020-06-01": [{"cargo_type": "Glass", "rate": true}]}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("\"rate\""));
        assert!(err.to_string().contains("boolean"));
    }

    #[test]
    fn test_parse_rejects_non_numeric_rate_string() {
        let err = parse_rates_document(
            &json!({"2020-06-01": [{"cargo_type": "Glass", "rate": "cheap"}]}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("numeric string"));
    }

    #[tokio::test]
    async fn test_reconcile_creates_then_noops_then_updates() {
        let store = MemoryTariffStore::new();

        let document = parse_rates_document(
            &json!({"2024-01-01": [{"cargo_type": "electronics", "rate": 0.05}]}),
        )
        .unwrap();
        let report = reconcile(&store, &document).await.unwrap();
        assert_eq!((report.created, report.updated), (1, 0));

        // Same payload again: nothing changed, nothing counted.
        let report = reconcile(&store, &document).await.unwrap();
        assert_eq!((report.created, report.updated), (0, 0));

        let document = parse_rates_document(
            &json!({"2024-01-01": [{"cargo_type": "electronics", "rate": 0.08}]}),
        )
        .unwrap();
        let report = reconcile(&store, &document).await.unwrap();
        assert_eq!((report.created, report.updated), (0, 1));

        let stored = store
            .find_by_key(date(2024, 1, 1), "electronics")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.rate, 0.08);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent() {
        let store = MemoryTariffStore::new();
        let document = parse_rates_document(&json!({
            "2020-06-01": [
                {"cargo_type": "Glass", "rate": 0.04},
                {"cargo_type": "Other", "rate": 0.01},
            ],
            "2020-07-01": [
                {"cargo_type": "Glass", "rate": 0.035},
            ],
        }))
        .unwrap();

        let first = reconcile(&store, &document).await.unwrap();
        assert_eq!((first.created, first.updated), (3, 0));
        let after_first = store.snapshot().await;

        let second = reconcile(&store, &document).await.unwrap();
        assert_eq!((second.created, second.updated), (0, 0));
        assert_eq!(store.snapshot().await, after_first);
    }

    #[tokio::test]
    async fn test_reconcile_last_entry_wins_within_document() {
        let store = MemoryTariffStore::new();
        let document = parse_rates_document(&json!({
            "2020-06-01": [
                {"cargo_type": "Glass", "rate": 0.04},
                {"cargo_type": "Glass", "rate": 0.05},
            ],
        }))
        .unwrap();

        let report = reconcile(&store, &document).await.unwrap();
        assert_eq!((report.created, report.updated), (1, 1));
        assert_eq!(store.len().await, 1);

        let stored = store
            .find_by_key(date(2020, 6, 1), "Glass")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.rate, 0.05);
    }

    /// Store that reports no existing record but refuses the insert, as seen
    /// by a writer losing a unique-key race.
    struct LostRaceStore;

    #[async_trait]
    impl TariffStore for LostRaceStore {
        async fn find_by_key(&self, _: NaiveDate, _: &str) -> Result<Option<Tariff>> {
            Ok(None)
        }

        async fn create(&self, date: NaiveDate, cargo_type: &str, _: f64) -> Result<Tariff> {
            Err(TariffError::DuplicateTariff {
                date,
                cargo_type: cargo_type.to_string(),
            })
        }

        async fn update_rate(&self, _: i64, _: f64) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_reconcile_ignores_lost_create_race() {
        let document = parse_rates_document(
            &json!({"2024-01-01": [{"cargo_type": "electronics", "rate": 0.05}]}),
        )
        .unwrap();

        let report = reconcile(&LostRaceStore, &document).await.unwrap();
        assert_eq!((report.created, report.updated), (0, 0));
    }

    struct BrokenStore;

    #[async_trait]
    impl TariffStore for BrokenStore {
        async fn find_by_key(&self, _: NaiveDate, _: &str) -> Result<Option<Tariff>> {
            Err(TariffError::StoreError("connection reset".to_string()))
        }

        async fn create(&self, _: NaiveDate, _: &str, _: f64) -> Result<Tariff> {
            Err(TariffError::StoreError("connection reset".to_string()))
        }

        async fn update_rate(&self, _: i64, _: f64) -> Result<()> {
            Err(TariffError::StoreError("connection reset".to_string()))
        }
    }

    #[tokio::test]
    async fn test_reconcile_propagates_store_errors() {
        let document = parse_rates_document(
            &json!({"2024-01-01": [{"cargo_type": "electronics", "rate": 0.05}]}),
        )
        .unwrap();

        let err = reconcile(&BrokenStore, &document).await.unwrap_err();
        assert!(matches!(err, TariffError::StoreError(_)));
    }

    #[tokio::test]
    async fn test_load_rates_file_missing_file_is_io_error() {
        let store = MemoryTariffStore::new();
        let err = load_rates_file(&store, Path::new("/nonexistent/rates.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, TariffError::IoError(_)));
    }

    #[tokio::test]
    async fn test_load_rates_file_malformed_json_is_serialization_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let store = MemoryTariffStore::new();
        let err = load_rates_file(&store, file.path()).await.unwrap_err();
        assert!(matches!(err, TariffError::SerializationError(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_load_rates_file_end_to_end() {
        let payload = json!({
            "2020-06-01": [
                {"cargo_type": "Glass", "rate": 0.04},
                {"cargo_type": "Other", "rate": "0.01"},
            ],
        });
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", payload).unwrap();

        let store = MemoryTariffStore::new();
        let report = load_rates_file(&store, file.path()).await.unwrap();
        assert_eq!((report.created, report.updated), (2, 0));

        let stored = store
            .find_by_key(date(2020, 6, 1), "Other")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.rate, 0.01);
    }
}
