//! `weather-etl` - daily weather observations from geocoded place names to CSV and object storage
//!
//! This library resolves location names to coordinates, fetches daily
//! observations from NASA POWER, normalizes them into one row per location and
//! date, writes the combined table to CSV and uploads the file under a
//! date-partitioned key.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod geocoding;
pub mod logging;
pub mod models;
pub mod persistence;
pub mod pipeline;
pub mod run_log;
pub mod transform;
pub mod upload;
pub mod weather;

// Re-export core types for public API
pub use crate::config::EtlConfig;
pub use error::EtlError;
pub use geocoding::{Geocoder, NominatimGeocoder};
pub use models::{Coordinate, DateRange, ObservationRow, Parameter, RawObservationSet, WeatherTable};
pub use pipeline::{LocationStatus, Pipeline, PipelineState, RunOutcome, RunReport, UploadStatus};
pub use run_log::{LogLevel, RunLog, RunLogEntry, Stage};
pub use upload::{BucketStore, ObjectStorage, S3Storage};
pub use weather::{NasaPowerClient, WeatherSource};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, EtlError>;
