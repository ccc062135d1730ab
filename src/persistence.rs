//! Local CSV persistence of the weather table

use crate::models::date_range::COMPACT_DATE_FORMAT;
use crate::models::{DateRange, ObservationRow, WeatherTable};
use crate::{EtlError, Result};
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

/// Column order of the written file
pub const HEADER: [&str; 6] = [
    "location",
    "date",
    "temperature",
    "humidity",
    "wind_speed",
    "precipitation",
];

/// `<data_dir>/<execution date>/weather_data_<start>_<end>.csv`
#[must_use]
pub fn output_path(data_dir: &Path, execution_date: NaiveDate, range: DateRange) -> PathBuf {
    let file_name = format!(
        "weather_data_{}_{}.csv",
        range.start().format(COMPACT_DATE_FORMAT),
        range.end().format(COMPACT_DATE_FORMAT)
    );
    data_dir
        .join(execution_date.format("%Y-%m-%d").to_string())
        .join(file_name)
}

/// Write `table` as CSV to `path` and return the path written.
///
/// Rows go to a temporary file next to the destination which is renamed into
/// place only once everything has been flushed, so a failure never leaves a
/// truncated file at `path`.
pub fn write(table: &WeatherTable, path: &Path) -> Result<PathBuf> {
    info!(path = %path.display(), rows = table.len(), "Writing CSV");

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|e| {
        EtlError::write(format!("Cannot create directory {}: {e}", parent.display()))
    })?;

    let tmp = NamedTempFile::new_in(&parent).map_err(|e| {
        EtlError::write(format!("Cannot create temporary file in {}: {e}", parent.display()))
    })?;

    let mut wtr = csv::Writer::from_writer(tmp);
    let write_err =
        |e: csv::Error| EtlError::write(format!("Writing {} failed: {e}", path.display()));

    wtr.write_record(HEADER).map_err(write_err)?;
    for row in table.rows() {
        let fields = [
            row.location.clone(),
            row.date.format("%Y-%m-%d").to_string(),
            format_value(row.temperature),
            format_value(row.humidity),
            format_value(row.wind_speed),
            format_value(row.precipitation),
        ];
        wtr.write_record(&fields).map_err(write_err)?;
    }

    let tmp = wtr
        .into_inner()
        .map_err(|e| {
            EtlError::write(format!("Flushing {} failed: {}", path.display(), e.error()))
        })?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| EtlError::write(format!("Syncing {} failed: {e}", path.display())))?;
    tmp.persist(path).map_err(|e| {
        EtlError::write(format!("Cannot move file to {}: {}", path.display(), e.error))
    })?;

    info!(rows = table.len(), "CSV written successfully");
    Ok(path.to_path_buf())
}

/// Read a file produced by [`write`] back into a table
pub fn read(path: &Path) -> Result<WeatherTable> {
    let mut rdr = csv::Reader::from_path(path)
        .map_err(|e| EtlError::validation(format!("Cannot open {}: {e}", path.display())))?;

    let headers = rdr
        .headers()
        .map_err(|e| {
            EtlError::validation(format!("Cannot read header of {}: {e}", path.display()))
        })?;
    if headers.iter().ne(HEADER) {
        return Err(EtlError::validation(format!(
            "Unexpected header in {}: {:?}",
            path.display(),
            headers
        )));
    }

    let mut table = WeatherTable::new();
    for (index, record) in rdr.records().enumerate() {
        let line = index + 2;
        let record = record
            .map_err(|e| EtlError::validation(format!("{}:{line}: {e}", path.display())))?;
        let field = |i: usize| record.get(i).unwrap_or_default();

        let date = NaiveDate::parse_from_str(field(1), "%Y-%m-%d").map_err(|_| {
            EtlError::validation(format!("{}:{line}: invalid date '{}'", path.display(), field(1)))
        })?;
        let mut row = ObservationRow::empty(field(0), date);
        row.temperature = parse_value(field(2), path, line)?;
        row.humidity = parse_value(field(3), path, line)?;
        row.wind_speed = parse_value(field(4), path, line)?;
        row.precipitation = parse_value(field(5), path, line)?;
        table.push(row);
    }

    Ok(table)
}

/// Missing values are written as empty fields
fn format_value(value: Option<f64>) -> String {
    value.map_or(String::new(), |v| v.to_string())
}

fn parse_value(field: &str, path: &Path, line: usize) -> Result<Option<f64>> {
    if field.is_empty() {
        return Ok(None);
    }
    field.parse::<f64>().map(Some).map_err(|_| {
        EtlError::validation(format!("{}:{line}: invalid number '{field}'", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, d).unwrap()
    }

    fn sample_table() -> WeatherTable {
        let mut first = ObservationRow::empty("Chennai", date(1));
        first.temperature = Some(26.13);
        first.humidity = Some(81.0);
        first.wind_speed = Some(3.4);
        first.precipitation = Some(0.0);

        let mut second = ObservationRow::empty("Chennai", date(2));
        second.temperature = Some(-1.5);

        let third = ObservationRow::empty("São Paulo, SP", date(1));

        WeatherTable::from_rows(vec![first, second, third])
    }

    #[test]
    fn test_output_path_layout() {
        let range = DateRange::new(date(1), date(31)).unwrap();
        let path = output_path(Path::new("data"), date(5), range);
        assert_eq!(
            path,
            PathBuf::from("data/2024-12-05/weather_data_20241201_20241231.csv")
        );
    }

    #[test]
    fn test_write_creates_header_and_empty_sentinels() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("out.csv");

        let written = write(&sample_table(), &path).unwrap();
        assert_eq!(written, path);

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(
            lines,
            vec![
                "location,date,temperature,humidity,wind_speed,precipitation",
                "Chennai,2024-12-01,26.13,81,3.4,0",
                "Chennai,2024-12-02,-1.5,,,",
                "\"São Paulo, SP\",2024-12-01,,,,",
            ]
        );
    }

    #[test]
    fn test_round_trip_preserves_rows_and_missing_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let table = sample_table();

        write(&table, &path).unwrap();
        let read_back = read(&path).unwrap();

        assert_eq!(read_back, table);
    }

    #[test]
    fn test_empty_table_writes_header_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.csv");

        write(&WeatherTable::new(), &path).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap().trim_end(),
            HEADER.join(",")
        );
        assert!(read(&path).unwrap().is_empty());
    }

    #[test]
    fn test_write_into_unwritable_location_is_write_failure() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let err = write(&sample_table(), &blocker.join("out.csv")).unwrap_err();
        assert!(matches!(err, EtlError::Write { .. }));
    }

    #[test]
    fn test_failed_write_leaves_no_partial_file() {
        let dir = TempDir::new().unwrap();
        // Destination is an existing directory, so the final rename fails.
        let path = dir.path().join("taken");
        fs::create_dir(&path).unwrap();

        assert!(write(&sample_table(), &path).is_err());
        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
        assert!(path.is_dir());
    }

    #[test]
    fn test_read_rejects_foreign_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("foreign.csv");
        fs::write(&path, "date,state,Temperature_Max\n2024-12-01,Chennai,30\n").unwrap();

        assert!(matches!(read(&path), Err(EtlError::Validation { .. })));
    }
}
