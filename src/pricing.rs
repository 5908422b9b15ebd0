use log::debug;

use crate::dates::parse_date;
use crate::error::{Result, TariffError};
use crate::store::TariffStore;

/// Computes the insurance cost for a declared cargo value: the product of
/// the value and the rate stored for the exact `(date, cargo_type)` pair.
///
/// The date text is parsed before any store access, so a malformed date
/// never reaches the store. A missing tariff is a
/// [`TariffError::TariffNotFound`], never a silent zero. The declared value
/// is passed through as-is and the result carries no rounding or currency
/// handling.
pub async fn calculate_insurance<S: TariffStore + ?Sized>(
    store: &S,
    date: &str,
    cargo_type: &str,
    declared_value: f64,
) -> Result<f64> {
    let date = parse_date(date)?;
    let tariff = store
        .find_by_key(date, cargo_type)
        .await?
        .ok_or(TariffError::TariffNotFound)?;

    debug!(
        "pricing {} on {} at rate {}: declared value {}",
        cargo_type, date, tariff.rate, declared_value
    );
    Ok(declared_value * tariff.rate)
}
