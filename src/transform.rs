//! Raw observation to row conversion
//!
//! Pure functions only: no I/O, no logging. Missing data is an ordinary
//! outcome here, represented as `None` in the produced rows.

use crate::models::date_range::COMPACT_DATE_FORMAT;
use crate::models::{DateRange, ObservationRow, Parameter, RawObservationSet};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Rows produced for one location plus the number of source date keys dropped
#[derive(Debug, Clone, PartialEq)]
pub struct Transformed {
    pub rows: Vec<ObservationRow>,
    /// Keys that did not parse as a date or fell outside the requested range
    pub discarded_keys: usize,
}

/// Build one row per date found in `raw`, restricted to `range`, ascending.
///
/// A field is `None` when the source omitted it, sent a non-numeric or
/// non-finite value, or sent the fill value.
#[must_use]
pub fn transform(location_name: &str, raw: &RawObservationSet, range: DateRange) -> Transformed {
    let fill_value = raw.effective_fill_value();
    let mut by_date: BTreeMap<NaiveDate, ObservationRow> = BTreeMap::new();
    let mut discarded_keys = 0;

    let mut seen_keys: BTreeMap<&str, Option<NaiveDate>> = BTreeMap::new();
    for values in raw.parameters.values() {
        for key in values.keys() {
            seen_keys
                .entry(key.as_str())
                .or_insert_with(|| parse_date_key(key).filter(|d| range.contains(*d)));
        }
    }

    for (key, date) in &seen_keys {
        let Some(date) = date else {
            discarded_keys += 1;
            continue;
        };
        let row = by_date
            .entry(*date)
            .or_insert_with(|| ObservationRow::empty(location_name, *date));
        for parameter in Parameter::ALL {
            if let Some(value) = clean_value(raw.value(parameter, key), fill_value) {
                row.set(parameter, Some(value));
            }
        }
    }

    Transformed {
        rows: by_date.into_values().collect(),
        discarded_keys,
    }
}

/// Normalize a source date key (`YYYYMMDD`, or already `YYYY-MM-DD`)
#[must_use]
pub fn parse_date_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, COMPACT_DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(key, "%Y-%m-%d"))
        .ok()
}

fn clean_value(value: Option<f64>, fill_value: f64) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v != fill_value)
}
