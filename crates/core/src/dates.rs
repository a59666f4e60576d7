//! Date and range helpers for bucket labels and drill-down values.

use crate::constants::{LINK_DATE_FORMAT, OPEN_BUCKET_SUFFIX};
use crate::{TrendError, TrendResult};
use chrono::{Months, NaiveDate};

/// Formats a date as it appears in links, e.g. `01/07/2016`.
pub fn date_to_string(date: NaiveDate) -> String {
    date.format(LINK_DATE_FORMAT).to_string()
}

/// Parses a `DD/MM/YYYY` link date.
pub fn string_to_date(value: &str) -> TrendResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), LINK_DATE_FORMAT)
        .map_err(|e| TrendError::InvalidValue(format!("'{value}' is not a DD/MM/YYYY date: {e}")))
}

/// The same calendar day `years` years earlier; 29 February falls back to the 28th.
pub fn years_before(date: NaiveDate, years: u32) -> TrendResult<NaiveDate> {
    years
        .checked_mul(12)
        .and_then(|months| date.checked_sub_months(Months::new(months)))
        .ok_or_else(|| {
            TrendError::InvalidValue(format!("{years} years before {date} is out of range"))
        })
}

/// Splits a bucket value such as `01/07/2016 - 01/10/2016`, `20 - 40` or `80 +` into
/// its trimmed bounds. The open-bucket suffix is dropped.
///
/// # Errors
///
/// Returns [`TrendError::InvalidValue`] if either side of a `-` is empty.
pub fn split_range(value: &str) -> TrendResult<Vec<&str>> {
    let parts: Vec<&str> = value
        .split('-')
        .map(|part| part.trim().trim_end_matches(OPEN_BUCKET_SUFFIX).trim())
        .collect();

    if parts.len() > 1 && parts.iter().any(|part| part.is_empty()) {
        return Err(TrendError::InvalidValue(format!(
            "'{value}' is missing a range bound"
        )));
    }
    Ok(parts.into_iter().filter(|part| !part.is_empty()).collect())
}
