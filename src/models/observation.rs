//! Raw and normalized weather observations

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Value the POWER API uses for missing measurements when the response
/// header does not announce one
pub const DEFAULT_FILL_VALUE: f64 = -999.0;

/// Weather parameters tracked by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Parameter {
    /// Air temperature at 2 m, °C
    Temperature,
    /// Relative humidity at 2 m, %
    Humidity,
    /// Wind speed at 2 m, m/s
    WindSpeed,
    /// Corrected precipitation, mm/day
    Precipitation,
}

impl Parameter {
    pub const ALL: [Parameter; 4] = [
        Parameter::Temperature,
        Parameter::Humidity,
        Parameter::WindSpeed,
        Parameter::Precipitation,
    ];

    /// Parameter code understood by the POWER API
    #[must_use]
    pub fn power_code(self) -> &'static str {
        match self {
            Parameter::Temperature => "T2M",
            Parameter::Humidity => "RH2M",
            Parameter::WindSpeed => "WS2M",
            Parameter::Precipitation => "PRECTOTCORR",
        }
    }

    #[must_use]
    pub fn from_power_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.power_code() == code)
    }

    /// Comma separated parameter list for a POWER request
    #[must_use]
    pub fn request_list() -> String {
        Self::ALL.map(Parameter::power_code).join(",")
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Parameter::Temperature => "temperature",
            Parameter::Humidity => "humidity",
            Parameter::WindSpeed => "wind_speed",
            Parameter::Precipitation => "precipitation",
        };
        f.write_str(name)
    }
}

/// Unprocessed response for one location: parameter -> raw date key -> value.
///
/// Date keys are kept exactly as the source sent them; values that were not
/// numeric are stored as `None`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawObservationSet {
    pub parameters: BTreeMap<Parameter, BTreeMap<String, Option<f64>>>,
    pub fill_value: Option<f64>,
}

impl RawObservationSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly useful for fakes and tests
    #[must_use]
    pub fn with_value(mut self, parameter: Parameter, date_key: &str, value: Option<f64>) -> Self {
        self.insert(parameter, date_key, value);
        self
    }

    pub fn insert(&mut self, parameter: Parameter, date_key: &str, value: Option<f64>) {
        self.parameters
            .entry(parameter)
            .or_default()
            .insert(date_key.to_string(), value);
    }

    #[must_use]
    pub fn value(&self, parameter: Parameter, date_key: &str) -> Option<f64> {
        self.parameters
            .get(&parameter)
            .and_then(|values| values.get(date_key))
            .copied()
            .flatten()
    }

    /// Fill value announced by the source, or the documented default
    #[must_use]
    pub fn effective_fill_value(&self) -> f64 {
        self.fill_value.unwrap_or(DEFAULT_FILL_VALUE)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parameters.values().all(BTreeMap::is_empty)
    }
}

/// One normalized record; `None` marks a missing measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRow {
    pub location: String,
    pub date: NaiveDate,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub precipitation: Option<f64>,
}

impl ObservationRow {
    /// Row for a date with every measurement missing
    #[must_use]
    pub fn empty(location: &str, date: NaiveDate) -> Self {
        Self {
            location: location.to_string(),
            date,
            temperature: None,
            humidity: None,
            wind_speed: None,
            precipitation: None,
        }
    }

    #[must_use]
    pub fn get(&self, parameter: Parameter) -> Option<f64> {
        match parameter {
            Parameter::Temperature => self.temperature,
            Parameter::Humidity => self.humidity,
            Parameter::WindSpeed => self.wind_speed,
            Parameter::Precipitation => self.precipitation,
        }
    }

    pub fn set(&mut self, parameter: Parameter, value: Option<f64>) {
        let field = match parameter {
            Parameter::Temperature => &mut self.temperature,
            Parameter::Humidity => &mut self.humidity,
            Parameter::WindSpeed => &mut self.wind_speed,
            Parameter::Precipitation => &mut self.precipitation,
        };
        *field = value;
    }

    /// Number of measurements that are missing
    #[must_use]
    pub fn missing_count(&self) -> usize {
        Parameter::ALL
            .into_iter()
            .filter(|p| self.get(*p).is_none())
            .count()
    }
}

/// Combined rows of a run, ordered by input location then ascending date
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WeatherTable {
    rows: Vec<ObservationRow>,
}

impl WeatherTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_rows(rows: Vec<ObservationRow>) -> Self {
        Self { rows }
    }

    #[must_use]
    pub fn rows(&self) -> &[ObservationRow] {
        &self.rows
    }

    #[must_use]
    pub fn into_rows(self) -> Vec<ObservationRow> {
        self.rows
    }

    pub(crate) fn push(&mut self, row: ObservationRow) {
        self.rows.push(row);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows belonging to one location, in table order
    pub fn rows_for<'a>(&'a self, location: &'a str) -> impl Iterator<Item = &'a ObservationRow> {
        self.rows.iter().filter(move |row| row.location == location)
    }
}
