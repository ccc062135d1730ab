//! Combines per-location rows into the run's weather table

use crate::models::{ObservationRow, WeatherTable};
use std::collections::HashSet;

/// Concatenate per-location row sequences in input order.
///
/// Each sequence is expected to be unique per date already. When the same
/// location appears more than once in the input, only the first row for each
/// `(location, date)` pair is kept.
#[must_use]
pub fn merge<I>(per_location: I) -> WeatherTable
where
    I: IntoIterator<Item = Vec<ObservationRow>>,
{
    let mut table = WeatherTable::new();
    let mut seen = HashSet::new();

    for rows in per_location {
        for row in rows {
            if seen.insert((row.location.clone(), row.date)) {
                table.push(row);
            }
        }
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn rows(location: &str, days: &[u32]) -> Vec<ObservationRow> {
        days.iter()
            .map(|d| {
                let mut row = ObservationRow::empty(
                    location,
                    NaiveDate::from_ymd_opt(2024, 12, *d).unwrap(),
                );
                row.temperature = Some(f64::from(*d));
                row
            })
            .collect()
    }

    #[test]
    fn test_merge_preserves_location_then_date_order() {
        let table = merge(vec![rows("Chennai", &[1, 2, 3]), rows("Madurai", &[1, 2])]);

        let keys: Vec<_> = table
            .rows()
            .iter()
            .map(|r| (r.location.as_str(), r.date.format("%d").to_string()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("Chennai", "01".to_string()),
                ("Chennai", "02".to_string()),
                ("Chennai", "03".to_string()),
                ("Madurai", "01".to_string()),
                ("Madurai", "02".to_string()),
            ]
        );
    }

    #[test]
    fn test_failed_location_contributes_nothing() {
        let table = merge(vec![rows("Chennai", &[1, 2, 3]), Vec::new()]);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_merge_of_nothing_is_empty_table() {
        let table = merge(Vec::<Vec<ObservationRow>>::new());
        assert!(table.is_empty());
    }

    #[test]
    fn test_repeated_location_keeps_first_rows() {
        let mut second = rows("Chennai", &[2, 3, 4]);
        second[0].temperature = Some(99.0);

        let table = merge(vec![rows("Chennai", &[1, 2]), second]);

        assert_eq!(table.len(), 4);
        let dec2 = table.rows().iter().find(|r| r.date.format("%d").to_string() == "02");
        assert_eq!(dec2.unwrap().temperature, Some(2.0));
        assert_eq!(table.rows_for("Chennai").count(), 4);
    }
}
