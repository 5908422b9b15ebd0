use chrono::NaiveDate;

use crate::error::{Result, TariffError};

/// Parses a date in the `YYYY-MM-DD` format shared by the rates-file keys
/// and the `calculate_insurance` date parameter.
///
/// Pure parse, no store access and no logging; calendar-invalid dates such
/// as `2024-02-30` fail like any other malformed input.
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| TariffError::InvalidDate)
}
