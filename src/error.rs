use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TariffError {
    #[error("Invalid rates document: {0}")]
    InvalidPayload(String),

    #[error("Incorrect date format. Expected format: YYYY-MM-DD")]
    InvalidDate,

    #[error("Tariff not found")]
    TariffNotFound,

    #[error("Tariff for cargo type \"{cargo_type}\" on {date} already exists")]
    DuplicateTariff { date: NaiveDate, cargo_type: String },

    #[error("Tariff store error: {0}")]
    StoreError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TariffError>;
