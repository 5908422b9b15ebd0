use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use crate::error::{Result, TariffError};
use crate::schema::Tariff;
use crate::store::TariffStore;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS tariff (
    id BIGSERIAL PRIMARY KEY,
    date DATE NOT NULL,
    cargo_type VARCHAR(50) NOT NULL,
    rate DOUBLE PRECISION NOT NULL,
    UNIQUE (date, cargo_type)
)
"#;

/// PostgreSQL-backed tariff store. The unique constraint on
/// `(date, cargo_type)` is the arbiter for concurrent creates; a violated
/// insert surfaces as [`TariffError::DuplicateTariff`].
pub struct PgTariffStore {
    pool: PgPool,
}

impl PgTariffStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(Self::db_error)?;
        Ok(Self::new(pool))
    }

    /// Creates the tariff table and its unique business key if missing.
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA_SQL)
            .execute(&self.pool)
            .await
            .map_err(Self::db_error)?;
        Ok(())
    }

    fn tariff_from_row(row: &PgRow) -> Result<Tariff> {
        Ok(Tariff {
            id: row.try_get("id").map_err(Self::db_error)?,
            date: row.try_get("date").map_err(Self::db_error)?,
            cargo_type: row.try_get("cargo_type").map_err(Self::db_error)?,
            rate: row.try_get("rate").map_err(Self::db_error)?,
        })
    }

    fn db_error(error: sqlx::Error) -> TariffError {
        TariffError::StoreError(format!("database error: {}", error))
    }
}

#[async_trait]
impl TariffStore for PgTariffStore {
    async fn find_by_key(&self, date: NaiveDate, cargo_type: &str) -> Result<Option<Tariff>> {
        let row = sqlx::query(
            "SELECT id, date, cargo_type, rate FROM tariff WHERE date = $1 AND cargo_type = $2",
        )
        .bind(date)
        .bind(cargo_type)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::db_error)?;

        row.as_ref().map(Self::tariff_from_row).transpose()
    }

    async fn create(&self, date: NaiveDate, cargo_type: &str, rate: f64) -> Result<Tariff> {
        let row = sqlx::query(
            "INSERT INTO tariff (date, cargo_type, rate) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(date)
        .bind(cargo_type)
        .bind(rate)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            if let sqlx::Error::Database(db) = &error {
                if db.is_unique_violation() {
                    return TariffError::DuplicateTariff {
                        date,
                        cargo_type: cargo_type.to_string(),
                    };
                }
            }
            Self::db_error(error)
        })?;

        let id: i64 = row.try_get("id").map_err(Self::db_error)?;
        Ok(Tariff {
            id,
            date,
            cargo_type: cargo_type.to_string(),
            rate,
        })
    }

    async fn update_rate(&self, id: i64, rate: f64) -> Result<()> {
        let result = sqlx::query("UPDATE tariff SET rate = $1 WHERE id = $2")
            .bind(rate)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Self::db_error)?;

        if result.rows_affected() == 0 {
            return Err(TariffError::StoreError(format!("no tariff with id {}", id)));
        }
        Ok(())
    }
}
