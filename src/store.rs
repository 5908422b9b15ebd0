use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;

use crate::error::{Result, TariffError};
use crate::schema::Tariff;

/// Persistence seam for tariff records.
///
/// Reconciliation and pricing only ever touch storage through these three
/// operations, keyed by the `(date, cargo_type)` business key, so they run
/// unchanged against [`MemoryTariffStore`] in tests and
/// [`PgTariffStore`](crate::postgres::PgTariffStore) in production.
#[async_trait]
pub trait TariffStore: Send + Sync {
    /// Point lookup by the business key.
    async fn find_by_key(&self, date: NaiveDate, cargo_type: &str) -> Result<Option<Tariff>>;

    /// Inserts a new tariff and returns it with its store-assigned id.
    /// Fails with [`TariffError::DuplicateTariff`] when the business key is
    /// already taken.
    async fn create(&self, date: NaiveDate, cargo_type: &str, rate: f64) -> Result<Tariff>;

    /// Replaces the rate of the record with the given id.
    async fn update_rate(&self, id: i64, rate: f64) -> Result<()>;
}

/// In-memory tariff store backed by a map over the business key. Assigns
/// surrogate ids from a counter, starting at 1.
#[derive(Debug, Default)]
pub struct MemoryTariffStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    next_id: i64,
    tariffs: HashMap<(NaiveDate, String), Tariff>,
}

impl MemoryTariffStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored tariffs, ordered by id.
    pub async fn snapshot(&self) -> Vec<Tariff> {
        let inner = self.inner.lock().await;
        let mut tariffs: Vec<Tariff> = inner.tariffs.values().cloned().collect();
        tariffs.sort_by_key(|t| t.id);
        tariffs
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.tariffs.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.tariffs.is_empty()
    }
}

#[async_trait]
impl TariffStore for MemoryTariffStore {
    async fn find_by_key(&self, date: NaiveDate, cargo_type: &str) -> Result<Option<Tariff>> {
        let inner = self.inner.lock().await;
        Ok(inner.tariffs.get(&(date, cargo_type.to_string())).cloned())
    }

    async fn create(&self, date: NaiveDate, cargo_type: &str, rate: f64) -> Result<Tariff> {
        let mut inner = self.inner.lock().await;
        let key = (date, cargo_type.to_string());
        if inner.tariffs.contains_key(&key) {
            return Err(TariffError::DuplicateTariff {
                date,
                cargo_type: cargo_type.to_string(),
            });
        }

        inner.next_id += 1;
        let tariff = Tariff {
            id: inner.next_id,
            date,
            cargo_type: cargo_type.to_string(),
            rate,
        };
        inner.tariffs.insert(key, tariff.clone());
        Ok(tariff)
    }

    async fn update_rate(&self, id: i64, rate: f64) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let tariff = inner
            .tariffs
            .values_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| TariffError::StoreError(format!("no tariff with id {}", id)))?;
        tariff.rate = rate;
        Ok(())
    }
}
