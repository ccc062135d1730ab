//! Fake collaborators shared by the integration tests

#![allow(dead_code)]

use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use weather_etl::{
    BucketStore, Coordinate, DateRange, EtlConfig, EtlError, Geocoder, ObjectStorage, Parameter,
    Pipeline, RawObservationSet, Result, WeatherSource,
};

pub const BUCKET: &str = "weather-archive";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn names(locations: &[&str]) -> Vec<String> {
    locations.iter().map(|l| l.to_string()).collect()
}

/// Geocoder with a fixed gazetteer
pub struct FakeGeocoder {
    places: HashMap<String, Coordinate>,
}

impl FakeGeocoder {
    pub fn new() -> Self {
        let places = [
            ("Chennai", 13.0837, 80.2702),
            ("Madurai", 9.9252, 78.1198),
            ("Oslo", 59.9133, 10.7389),
            ("Reykjavik", 64.1466, -21.9426),
        ]
        .into_iter()
        .map(|(name, lat, lon)| (name.to_string(), Coordinate::new(lat, lon).unwrap()))
        .collect();
        Self { places }
    }
}

impl Geocoder for FakeGeocoder {
    async fn resolve(&self, location_name: &str) -> Result<Coordinate> {
        self.places
            .get(location_name)
            .copied()
            .ok_or_else(|| EtlError::lookup(location_name, "location not found"))
    }
}

/// Deterministic weather derived from latitude and position in the range.
///
/// Coordinates listed in `failing` answer with a retrieval error; humidity on
/// the second day of any range comes back as the -999 fill value.
pub struct FakeWeather {
    failing: HashSet<String>,
}

impl FakeWeather {
    pub fn new() -> Self {
        Self {
            failing: HashSet::new(),
        }
    }

    pub fn failing_for(mut self, coordinate: Coordinate) -> Self {
        self.failing.insert(coordinate.format_coordinates());
        self
    }
}

impl WeatherSource for FakeWeather {
    async fn fetch(&self, coordinate: Coordinate, range: DateRange) -> Result<RawObservationSet> {
        if self.failing.contains(&coordinate.format_coordinates()) {
            return Err(EtlError::retrieval("POWER API error 500 Internal Server Error"));
        }

        let mut raw = RawObservationSet::new();
        raw.fill_value = Some(-999.0);
        for (index, day) in range.iter().enumerate() {
            let key = day.format("%Y%m%d").to_string();
            let base = coordinate.latitude().round() + index as f64;
            raw.insert(Parameter::Temperature, &key, Some(base + 0.5));
            let humidity = if index == 1 { -999.0 } else { 70.0 + index as f64 };
            raw.insert(Parameter::Humidity, &key, Some(humidity));
            raw.insert(Parameter::WindSpeed, &key, Some(2.25));
            raw.insert(Parameter::Precipitation, &key, Some(0.0));
        }
        Ok(raw)
    }
}

/// Storage that rejects every upload
pub struct DeniedStorage;

impl ObjectStorage for DeniedStorage {
    async fn upload(&self, _local_path: &Path, bucket: &str, _key: &str) -> Result<()> {
        Err(EtlError::upload(format!("Access Denied for bucket {bucket}")))
    }
}

pub fn config_in(dir: &TempDir) -> EtlConfig {
    let mut config = EtlConfig::default();
    config.output.data_dir = dir.path().join("data");
    config.logging.log_dir = dir.path().join("logs");
    config.storage.bucket = Some(BUCKET.to_string());
    config
}

pub fn pipeline_in<S: ObjectStorage>(
    dir: &TempDir,
    weather: FakeWeather,
    storage: S,
) -> Pipeline<FakeGeocoder, FakeWeather, S> {
    Pipeline::new(config_in(dir), FakeGeocoder::new(), weather, storage)
        .with_execution_date(date(2024, 12, 5))
}

pub fn memory_pipeline(dir: &TempDir) -> Pipeline<FakeGeocoder, FakeWeather, BucketStore> {
    pipeline_in(dir, FakeWeather::new(), BucketStore::in_memory(BUCKET))
}

pub fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                found.extend(files_under(&path));
            } else {
                found.push(path);
            }
        }
    }
    found.sort();
    found
}
