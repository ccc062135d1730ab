//! Location name resolution
//!
//! Turns a human-readable place name into a [`Coordinate`] using an external
//! geocoding service. Failures are reported as [`EtlError::Lookup`] so the
//! pipeline can skip the location and carry on.

use crate::config::GeocodingConfig;
use crate::models::Coordinate;
use crate::{EtlError, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Resolves place names to coordinates
pub trait Geocoder {
    async fn resolve(&self, location_name: &str) -> Result<Coordinate>;
}

/// Geocoder backed by an OpenStreetMap Nominatim instance
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
}

/// Single Nominatim search hit; coordinates arrive as strings
#[derive(Debug, Deserialize)]
pub struct NominatimPlace {
    pub lat: String,
    pub lon: String,
    pub display_name: Option<String>,
}

impl NominatimPlace {
    /// Convert to a validated coordinate
    pub fn to_coordinate(&self, location_name: &str) -> Result<Coordinate> {
        let latitude = self.lat.trim().parse::<f64>().map_err(|_| {
            EtlError::lookup(location_name, format!("invalid latitude '{}'", self.lat))
        })?;
        let longitude = self.lon.trim().parse::<f64>().map_err(|_| {
            EtlError::lookup(location_name, format!("invalid longitude '{}'", self.lon))
        })?;
        Coordinate::new(latitude, longitude)
            .map_err(|e| EtlError::lookup(location_name, e.to_string()))
    }
}

impl NominatimGeocoder {
    /// Create a new geocoder from configuration
    pub fn new(config: &GeocodingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| EtlError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn search_url(&self, location_name: &str) -> String {
        format!(
            "{}/search?q={}&format=jsonv2&limit=1",
            self.base_url,
            urlencoding::encode(location_name)
        )
    }
}

impl Geocoder for NominatimGeocoder {
    #[instrument(skip(self), fields(location = location_name))]
    async fn resolve(&self, location_name: &str) -> Result<Coordinate> {
        let name = location_name.trim();
        if name.is_empty() {
            return Err(EtlError::lookup(location_name, "location name is empty"));
        }

        info!("Geocoding location: '{}'", name);
        let start_time = Instant::now();

        let url = self.search_url(name);
        debug!("Nominatim request URL: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| EtlError::lookup(name, format!("geocoding service unreachable: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(EtlError::lookup(
                name,
                format!("geocoding service returned status {status}"),
            ));
        }

        let places: Vec<NominatimPlace> = response.json().await.map_err(|e| {
            EtlError::lookup(name, format!("failed to parse geocoding response: {e}"))
        })?;

        let Some(place) = places.first() else {
            warn!("No results found for location '{}'", name);
            return Err(EtlError::lookup(name, "location not found"));
        };

        let coordinate = place.to_coordinate(name)?;
        info!(
            "Resolved '{}' to {} in {:.3}s",
            place.display_name.as_deref().unwrap_or(name),
            coordinate,
            start_time.elapsed().as_secs_f64()
        );

        Ok(coordinate)
    }
}
