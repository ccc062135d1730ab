//! Weather retrieval
//!
//! The [`WeatherSource`] trait is the seam between the pipeline and the
//! upstream data provider. [`nasa_power::NasaPowerClient`] is the production
//! implementation.

use crate::Result;
use crate::models::{Coordinate, DateRange, RawObservationSet};

pub mod nasa_power;

pub use nasa_power::NasaPowerClient;

/// Source of daily observations for a coordinate
pub trait WeatherSource {
    /// Fetch every tracked parameter for each date of `range`.
    ///
    /// The source may leave out dates or parameters; those show up as absent
    /// entries in the returned set rather than as an error.
    async fn fetch(&self, coordinate: Coordinate, range: DateRange) -> Result<RawObservationSet>;
}
