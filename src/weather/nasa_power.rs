//! NASA POWER daily point API client

use super::WeatherSource;
use crate::config::WeatherConfig;
use crate::models::date_range::COMPACT_DATE_FORMAT;
use crate::models::{Coordinate, DateRange, Parameter, RawObservationSet};
use crate::{EtlError, Result};
use reqwest::Client;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

const DAILY_POINT_PATH: &str = "/api/temporal/daily/point";

/// Client for `power.larc.nasa.gov` daily point data
pub struct NasaPowerClient {
    client: Client,
    base_url: String,
    community: String,
    max_span_days: u32,
}

impl NasaPowerClient {
    /// Create a new client from configuration
    pub fn new(config: &WeatherConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(format!("weather-etl/{}", crate::VERSION))
            .build()
            .map_err(|e| EtlError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            community: config.community.clone(),
            max_span_days: config.max_span_days,
        })
    }

    fn request_url(&self, coordinate: Coordinate, range: DateRange) -> String {
        format!(
            "{}{}?parameters={}&community={}&longitude={}&latitude={}&start={}&end={}&format=JSON",
            self.base_url,
            DAILY_POINT_PATH,
            Parameter::request_list(),
            self.community,
            coordinate.longitude(),
            coordinate.latitude(),
            range.start().format(COMPACT_DATE_FORMAT),
            range.end().format(COMPACT_DATE_FORMAT),
        )
    }
}

impl WeatherSource for NasaPowerClient {
    #[instrument(skip(self), fields(coordinate = %coordinate, range = %range))]
    async fn fetch(&self, coordinate: Coordinate, range: DateRange) -> Result<RawObservationSet> {
        range.ensure_max_span(self.max_span_days)?;

        info!("Fetching daily weather for {} over {}", coordinate, range);
        let start_time = Instant::now();

        let url = self.request_url(coordinate, range);
        debug!("POWER request URL: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| EtlError::retrieval(format!("POWER request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(EtlError::retrieval(format!(
                "POWER API error {status} for {coordinate}: {}",
                error_text.chars().take(200).collect::<String>()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| EtlError::retrieval(format!("Failed to parse POWER response: {e}")))?;

        let raw = parse_power_response(&body)?;

        let total_duration = start_time.elapsed();
        info!(
            "Retrieved {} parameters in {:.3}s",
            raw.parameters.len(),
            total_duration.as_secs_f64()
        );
        if total_duration.as_secs() > 5 {
            warn!(
                "Slow POWER API response: {:.3}s",
                total_duration.as_secs_f64()
            );
        }

        Ok(raw)
    }
}

/// Extract the tracked parameters from a POWER JSON document.
///
/// The document must carry an object at `properties.parameter`, and every
/// parameter entry must itself be an object keyed by date. Parameters the
/// pipeline does not track are ignored. Values that are not numbers are kept
/// as absent.
pub fn parse_power_response(body: &Value) -> Result<RawObservationSet> {
    let parameters = body
        .get("properties")
        .and_then(|p| p.get("parameter"))
        .and_then(Value::as_object)
        .ok_or_else(|| EtlError::retrieval("POWER response has no properties.parameter object"))?;

    let mut raw = RawObservationSet::new();
    raw.fill_value = body
        .get("header")
        .and_then(|h| h.get("fill_value"))
        .and_then(Value::as_f64);

    for (code, values) in parameters {
        let Some(parameter) = Parameter::from_power_code(code) else {
            debug!("Ignoring untracked POWER parameter {}", code);
            continue;
        };
        let values = values.as_object().ok_or_else(|| {
            EtlError::retrieval(format!("POWER parameter {code} is not a date mapping"))
        })?;
        for (date_key, value) in values {
            raw.insert(parameter, date_key, value.as_f64());
        }
    }

    Ok(raw)
}
