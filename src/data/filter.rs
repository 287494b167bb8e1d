use std::collections::BTreeSet;

use super::model::{FieldValue, Record, Row};
use crate::error::{CensusError, Result};

// ---------------------------------------------------------------------------
// Record scans
// ---------------------------------------------------------------------------

/// Records whose `year_key` value equals `year`. Numbers match by value
/// (`2020 == 2020.0`); text never matches a number.
///
/// Every row is inspected, so one row without the key (or one row that is not
/// a record at all) fails the whole scan. No match is `Ok(vec![])`.
pub fn filter_by_year<'a>(
    rows: &'a [Row],
    year_key: &str,
    year: &FieldValue,
) -> Result<Vec<&'a Record>> {
    let mut matched = Vec::new();
    for row in rows {
        let record = row.as_record()?;
        if record.require(year_key)? == year {
            matched.push(record);
        }
    }
    Ok(matched)
}

/// Distinct values found under `year_key`.
pub fn distinct_years(rows: &[Row], year_key: &str) -> Result<BTreeSet<FieldValue>> {
    rows.iter()
        .map(|row| -> Result<FieldValue> { Ok(row.as_record()?.require(year_key)?.clone()) })
        .collect()
}

// ---------------------------------------------------------------------------
// Population arithmetic
// ---------------------------------------------------------------------------

/// Population of one record as a real number.
pub fn population_of(record: &Record, population_key: &str) -> Result<f64> {
    let value = record.require(population_key)?;
    value.as_f64().ok_or_else(|| {
        CensusError::TypeMismatch(format!(
            "'{population_key}' holds {} {value}, expected a number",
            value.kind()
        ))
    })
}

/// Arithmetic mean of the population over `records`. An empty slice has no
/// mean and is reported as [`CensusError::NoResult`].
pub fn mean_population(records: &[&Record], population_key: &str) -> Result<f64> {
    if records.is_empty() {
        return Err(CensusError::NoResult("filter_by_year"));
    }
    let mut total = 0.0;
    for record in records {
        total += population_of(record, population_key)?;
    }
    Ok(total / records.len() as f64)
}

/// Only integers are accepted as a closeness tolerance.
pub fn validate_closeness(closeness: &FieldValue) -> Result<i64> {
    closeness.as_i64().ok_or_else(|| {
        CensusError::TypeMismatch(format!(
            "closeness must be an integer, got {} {closeness}",
            closeness.kind()
        ))
    })
}

/// Records with `|population - average| <= closeness`.
pub fn within_closeness<'a>(
    records: &[&'a Record],
    population_key: &str,
    average: f64,
    closeness: i64,
) -> Result<Vec<&'a Record>> {
    let tolerance = closeness as f64;
    let mut close = Vec::new();
    for &record in records {
        if (population_of(record, population_key)? - average).abs() <= tolerance {
            close.push(record);
        }
    }
    Ok(close)
}
