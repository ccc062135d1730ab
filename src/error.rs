//! Error types and handling for the weather ETL pipeline

use thiserror::Error;

/// Main error type for the weather ETL pipeline
#[derive(Error, Debug)]
pub enum EtlError {
    /// A location name could not be resolved to coordinates
    #[error("Lookup failed for '{location}': {message}")]
    Lookup { location: String, message: String },

    /// The weather source returned an error or an unusable payload
    #[error("Retrieval failed: {message}")]
    Retrieval { message: String },

    /// The weather table could not be written to local storage
    #[error("Write failed: {message}")]
    Write { message: String },

    /// The local file could not be transferred to object storage
    #[error("Upload failed: {message}")]
    Upload { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl EtlError {
    /// Create a new lookup error for a location
    pub fn lookup<L: Into<String>, S: Into<String>>(location: L, message: S) -> Self {
        Self::Lookup {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Create a new retrieval error
    pub fn retrieval<S: Into<String>>(message: S) -> Self {
        Self::Retrieval {
            message: message.into(),
        }
    }

    /// Create a new write error
    pub fn write<S: Into<String>>(message: S) -> Self {
        Self::Write {
            message: message.into(),
        }
    }

    /// Create a new upload error
    pub fn upload<S: Into<String>>(message: S) -> Self {
        Self::Upload {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether the error only affects a single location and the run may continue
    #[must_use]
    pub fn is_location_scoped(&self) -> bool {
        matches!(self, EtlError::Lookup { .. } | EtlError::Retrieval { .. })
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            EtlError::Lookup { location, .. } => {
                format!("Could not find coordinates for '{location}'.")
            }
            EtlError::Retrieval { .. } => {
                "Unable to fetch weather data. Please check your internet connection.".to_string()
            }
            EtlError::Write { .. } => {
                "Writing the output file failed. Please check the data directory permissions."
                    .to_string()
            }
            EtlError::Upload { .. } => {
                "Upload to object storage failed. The local file was kept for a manual retry."
                    .to_string()
            }
            EtlError::Validation { message } => format!("Invalid input: {message}"),
            EtlError::Config { .. } => {
                "Configuration error. Please check your config file and credentials.".to_string()
            }
            EtlError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}
