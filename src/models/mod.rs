//! Data models for the weather ETL pipeline
//!
//! This module contains the core domain models organized by concern:
//! - Location: resolved geographic coordinates
//! - Date range: validated inclusive request windows
//! - Observation: raw source payloads, normalized rows and the combined table

pub mod date_range;
pub mod location;
pub mod observation;

// Re-export all public types for convenient access
pub use date_range::{DateRange, parse_date};
pub use location::Coordinate;
pub use observation::{ObservationRow, Parameter, RawObservationSet, WeatherTable};
