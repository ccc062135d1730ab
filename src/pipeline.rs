//! Pipeline orchestration
//!
//! Sequences geocoding, retrieval and transformation per location, then
//! aggregates, persists and uploads once. Location-scoped failures are
//! recorded and skipped; a failed write ends the run as
//! [`RunOutcome::Failed`]; a failed upload ends it as
//! [`RunOutcome::PartialSuccess`] with the local file kept.

use crate::config::EtlConfig;
use crate::geocoding::Geocoder;
use crate::models::{Coordinate, DateRange, ObservationRow};
use crate::run_log::{RunLog, Stage};
use crate::upload::{ObjectStorage, remote_key};
use crate::weather::WeatherSource;
use crate::{EtlError, Result, aggregate, persistence, transform};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// Position of a run in the pipeline state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineState {
    Init,
    Geocoding,
    Retrieving,
    Transforming,
    Aggregating,
    Persisting,
    Uploading,
    Done,
    PartialSuccess,
    Failed,
}

/// Terminal state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunOutcome {
    /// File written and, when enabled, uploaded
    Done,
    /// File written but the upload did not complete
    PartialSuccess,
    /// Nothing trustworthy was written
    Failed,
}

impl From<RunOutcome> for PipelineState {
    fn from(outcome: RunOutcome) -> Self {
        match outcome {
            RunOutcome::Done => PipelineState::Done,
            RunOutcome::PartialSuccess => PipelineState::PartialSuccess,
            RunOutcome::Failed => PipelineState::Failed,
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunOutcome::Done => "Done",
            RunOutcome::PartialSuccess => "PartialSuccess",
            RunOutcome::Failed => "Failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocationStatus {
    Succeeded { coordinate: Coordinate, rows: usize },
    Skipped { stage: Stage, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationOutcome {
    pub name: String,
    pub status: LocationStatus,
}

impl LocationOutcome {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        matches!(self.status, LocationStatus::Succeeded { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadStatus {
    Uploaded { bucket: String, key: String },
    Failed { reason: String },
    /// Upload disabled in configuration
    Disabled,
    /// The run failed before reaching the upload stage
    NotAttempted,
}

/// Everything a caller needs to know once a run has ended
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub range: DateRange,
    pub execution_date: NaiveDate,
    /// Every state entered, in order, ending with the terminal state
    pub states: Vec<PipelineState>,
    pub locations: Vec<LocationOutcome>,
    pub rows_written: usize,
    pub local_path: Option<PathBuf>,
    pub upload: UploadStatus,
    pub log: RunLog,
    pub log_files: Vec<PathBuf>,
}

impl RunReport {
    pub fn succeeded_locations(&self) -> impl Iterator<Item = &LocationOutcome> {
        self.locations.iter().filter(|l| l.succeeded())
    }

    pub fn skipped_locations(&self) -> impl Iterator<Item = &LocationOutcome> {
        self.locations.iter().filter(|l| !l.succeeded())
    }

    #[must_use]
    pub fn final_state(&self) -> PipelineState {
        self.outcome.into()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run finished: {} ({})", self.outcome, self.range)?;
        writeln!(
            f,
            "Locations: {} succeeded, {} skipped",
            self.succeeded_locations().count(),
            self.skipped_locations().count()
        )?;
        for location in &self.locations {
            match &location.status {
                LocationStatus::Succeeded { coordinate, rows } => {
                    writeln!(f, "   ✓ {} {}: {} rows", location.name, coordinate, rows)?;
                }
                LocationStatus::Skipped { stage, reason } => {
                    writeln!(f, "   ✗ {}: skipped at {}: {}", location.name, stage, reason)?;
                }
            }
        }
        writeln!(f, "Rows written: {}", self.rows_written)?;
        match &self.local_path {
            Some(path) => writeln!(f, "Local file: {}", path.display())?,
            None => writeln!(f, "Local file: none")?,
        }
        match &self.upload {
            UploadStatus::Uploaded { bucket, key } => writeln!(f, "Upload: s3://{bucket}/{key}"),
            UploadStatus::Failed { reason } => writeln!(f, "Upload: failed ({reason})"),
            UploadStatus::Disabled => writeln!(f, "Upload: disabled"),
            UploadStatus::NotAttempted => writeln!(f, "Upload: not attempted"),
        }
    }
}

/// The ETL orchestrator, generic over its three external collaborators
pub struct Pipeline<G, W, S> {
    config: EtlConfig,
    geocoder: G,
    weather: W,
    storage: S,
    execution_date: Option<NaiveDate>,
}

/// Mutable bookkeeping of a run in progress
struct RunState {
    range: DateRange,
    execution_date: NaiveDate,
    states: Vec<PipelineState>,
    locations: Vec<LocationOutcome>,
    log: RunLog,
}

impl RunState {
    fn enter(&mut self, state: PipelineState) {
        self.states.push(state);
    }
}

impl<G, W, S> Pipeline<G, W, S>
where
    G: Geocoder,
    W: WeatherSource,
    S: ObjectStorage,
{
    pub fn new(config: EtlConfig, geocoder: G, weather: W, storage: S) -> Self {
        Self {
            config,
            geocoder,
            weather,
            storage,
            execution_date: None,
        }
    }

    /// Pin the date used for output folders and object keys (defaults to today)
    #[must_use]
    pub fn with_execution_date(mut self, date: NaiveDate) -> Self {
        self.execution_date = Some(date);
        self
    }

    #[must_use]
    pub fn config(&self) -> &EtlConfig {
        &self.config
    }

    /// Check a request without touching the network
    pub fn validate_request(
        &self,
        locations: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DateRange> {
        if locations.is_empty() {
            return Err(EtlError::validation("At least one location is required"));
        }
        let range = DateRange::new(start, end)?;
        range.ensure_max_span(self.config.weather.max_span_days)?;
        Ok(range)
    }

    /// Execute a full run.
    ///
    /// Location names are trimmed before use, so padded duplicates collapse
    /// onto the same rows. Returns `Err` only when the request itself is
    /// invalid, in which case no network call has been made. Every other
    /// failure is reflected in the report's outcome.
    #[instrument(skip(self, locations), fields(locations = locations.len()))]
    pub async fn run(
        &self,
        locations: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RunReport> {
        let range = self.validate_request(locations, start, end)?;
        let execution_date = self
            .execution_date
            .unwrap_or_else(|| Local::now().date_naive());

        let mut run = RunState {
            range,
            execution_date,
            states: vec![PipelineState::Init],
            locations: Vec::with_capacity(locations.len()),
            log: RunLog::new(),
        };
        run.log.info(
            Stage::Init,
            format!(
                "Starting run for {} location(s) over {}",
                locations.len(),
                range
            ),
        );

        let mut per_location = Vec::with_capacity(locations.len());
        for name in locations.iter().map(|n| n.trim()) {
            let status = match self.process_location(name, range, &mut run).await {
                Ok((coordinate, rows)) => {
                    let status = LocationStatus::Succeeded {
                        coordinate,
                        rows: rows.len(),
                    };
                    per_location.push(rows);
                    status
                }
                Err((stage, error)) => {
                    run.log.error(stage, format!("Skipping '{name}': {error}"));
                    per_location.push(Vec::new());
                    LocationStatus::Skipped {
                        stage,
                        reason: error.to_string(),
                    }
                }
            };
            run.locations.push(LocationOutcome {
                name: name.to_string(),
                status,
            });
        }

        run.enter(PipelineState::Aggregating);
        let table = aggregate::merge(per_location);
        if table.is_empty() {
            run.log
                .error(Stage::Aggregating, "No weather data fetched for any location");
        } else {
            run.log.info(
                Stage::Aggregating,
                format!("Combined table holds {} rows", table.len()),
            );
        }

        run.enter(PipelineState::Persisting);
        let destination =
            persistence::output_path(&self.config.output.data_dir, execution_date, range);
        let local_path = match persistence::write(&table, &destination) {
            Ok(path) => {
                run.log.info(
                    Stage::Persisting,
                    format!("Weather data saved to {}", path.display()),
                );
                path
            }
            Err(e) => {
                run.log.error(Stage::Persisting, e.to_string());
                let upload = UploadStatus::NotAttempted;
                return Ok(self.finish(run, RunOutcome::Failed, 0, None, upload));
            }
        };

        let upload = if self.config.storage.enabled {
            run.enter(PipelineState::Uploading);
            self.upload(&local_path, execution_date, &mut run).await
        } else {
            run.log.info(Stage::Uploading, "Upload disabled, keeping local file only");
            UploadStatus::Disabled
        };

        let outcome = match upload {
            UploadStatus::Failed { .. } => RunOutcome::PartialSuccess,
            _ => RunOutcome::Done,
        };
        Ok(self.finish(run, outcome, table.len(), Some(local_path), upload))
    }

    async fn process_location(
        &self,
        name: &str,
        range: DateRange,
        run: &mut RunState,
    ) -> std::result::Result<(Coordinate, Vec<ObservationRow>), (Stage, EtlError)> {
        run.enter(PipelineState::Geocoding);
        let coordinate = self
            .geocoder
            .resolve(name)
            .await
            .map_err(|e| (Stage::Geocoding, e))?;
        run.log.info(
            Stage::Geocoding,
            format!("Resolved '{name}' to {coordinate}"),
        );

        run.enter(PipelineState::Retrieving);
        let raw = self
            .weather
            .fetch(coordinate, range)
            .await
            .map_err(|e| (Stage::Retrieving, e))?;

        run.enter(PipelineState::Transforming);
        let transformed = transform::transform(name, &raw, range);
        if transformed.discarded_keys > 0 {
            warn!(
                "Dropped {} date keys for '{}' outside {} or unparsable",
                transformed.discarded_keys, name, range
            );
        }
        let missing: usize = transformed.rows.iter().map(ObservationRow::missing_count).sum();
        run.log.info(
            Stage::Transforming,
            format!(
                "'{name}' produced {} rows ({missing} missing values)",
                transformed.rows.len()
            ),
        );

        Ok((coordinate, transformed.rows))
    }

    async fn upload(
        &self,
        local_path: &Path,
        execution_date: NaiveDate,
        run: &mut RunState,
    ) -> UploadStatus {
        let Some(bucket) = self.config.storage.bucket.as_deref() else {
            let reason = "No bucket configured".to_string();
            run.log.error(Stage::Uploading, reason.clone());
            return UploadStatus::Failed { reason };
        };

        let file_name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let key = remote_key(&self.config.storage.prefix, execution_date, &file_name);

        match self.storage.upload(local_path, bucket, &key).await {
            Ok(()) => {
                run.log.info(
                    Stage::Uploading,
                    format!("Successfully uploaded {file_name} to {key}"),
                );
                UploadStatus::Uploaded {
                    bucket: bucket.to_string(),
                    key,
                }
            }
            Err(e) => {
                run.log.error(
                    Stage::Uploading,
                    format!("Failed to upload {file_name}: {e}"),
                );
                UploadStatus::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    fn finish(
        &self,
        mut run: RunState,
        outcome: RunOutcome,
        rows_written: usize,
        local_path: Option<PathBuf>,
        upload: UploadStatus,
    ) -> RunReport {
        run.enter(outcome.into());
        run.log.info(Stage::Done, format!("Run ended in state {outcome}"));

        let log_files = match run.log.persist(&self.config.logging.log_dir, Local::now()) {
            Ok(files) => files,
            Err(e) => {
                warn!("Could not persist run log: {}", e);
                Vec::new()
            }
        };
        info!("Run finished with outcome {}", outcome);

        RunReport {
            outcome,
            range: run.range,
            execution_date: run.execution_date,
            states: run.states,
            locations: run.locations,
            rows_written,
            local_path,
            upload,
            log: run.log,
            log_files,
        }
    }
}
