//! Structured record of a pipeline run
//!
//! Entries are appended by the orchestrator as stages complete and written
//! out once the run ends, split by level into date-partitioned folders:
//!
//! ```text
//! <log_dir>/Info_logs/<YYYY-MM-DD>/info_log_<YYYYmmdd_HHMMSS>.json
//! <log_dir>/Error_logs/<YYYY-MM-DD>/error_log_<YYYYmmdd_HHMMSS>.json
//! ```
//!
//! Each file holds one JSON object per line.

use crate::Result;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Error,
}

/// Pipeline stage an entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Init,
    Geocoding,
    Retrieving,
    Transforming,
    Aggregating,
    Persisting,
    Uploading,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "init",
            Stage::Geocoding => "geocoding",
            Stage::Retrieving => "retrieving",
            Stage::Transforming => "transforming",
            Stage::Aggregating => "aggregating",
            Stage::Persisting => "persisting",
            Stage::Uploading => "uploading",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunLogEntry {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub stage: Stage,
    pub message: String,
}

/// Append-only list of entries for one run
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    entries: Vec<RunLogEntry>,
}

impl RunLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, stage: Stage, message: impl Into<String>) {
        let message = message.into();
        info!(stage = %stage, "{}", message);
        self.push(LogLevel::Info, stage, message);
    }

    pub fn error(&mut self, stage: Stage, message: impl Into<String>) {
        let message = message.into();
        error!(stage = %stage, "{}", message);
        self.push(LogLevel::Error, stage, message);
    }

    fn push(&mut self, level: LogLevel, stage: Stage, message: String) {
        self.entries.push(RunLogEntry {
            timestamp: Local::now(),
            level,
            stage,
            message,
        });
    }

    #[must_use]
    pub fn entries(&self) -> &[RunLogEntry] {
        &self.entries
    }

    pub fn errors(&self) -> impl Iterator<Item = &RunLogEntry> {
        self.entries.iter().filter(|e| e.level == LogLevel::Error)
    }

    /// Write the entries under `log_dir`, one file per level that has entries.
    /// Returns the files written.
    pub fn persist(&self, log_dir: &Path, now: DateTime<Local>) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for (level, folder, stem) in [
            (LogLevel::Info, "Info_logs", "info_log"),
            (LogLevel::Error, "Error_logs", "error_log"),
        ] {
            let entries: Vec<_> = self.entries.iter().filter(|e| e.level == level).collect();
            if entries.is_empty() {
                continue;
            }

            let dir = log_dir
                .join(folder)
                .join(now.format("%Y-%m-%d").to_string());
            fs::create_dir_all(&dir)?;
            let path = dir.join(format!("{stem}_{}.json", now.format("%Y%m%d_%H%M%S")));

            let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
            for entry in entries {
                let line = serde_json::to_string(entry).map_err(std::io::Error::other)?;
                writeln!(file, "{line}")?;
            }
            written.push(path);
        }
        Ok(written)
    }
}
