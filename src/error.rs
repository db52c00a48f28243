//! Error types and handling for `PowerFetch`

use thiserror::Error;

/// Main error type for the `PowerFetch` application
#[derive(Error, Debug)]
pub enum PowerFetchError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Collaborator communication errors
    #[error("API error: {message}")]
    Api { message: String },

    /// Input validation errors
    #[error("Invalid input: {source}")]
    Validation {
        #[from]
        source: ValidationError,
    },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl PowerFetchError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            PowerFetchError::Config { message } => {
                format!("Configuration error: {message}. Please check your config file.")
            }
            PowerFetchError::Api { message } => {
                format!("Unable to reach an external service: {message}")
            }
            PowerFetchError::Validation { source } => source.to_string(),
            PowerFetchError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}

/// Rejections raised before a run issues any network call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Please select exactly {expected} locations (got {found})")]
    LocationCount { expected: usize, found: usize },

    #[error("Please select both start and end dates")]
    MissingDates,

    #[error("Start date {start} is after end date {end}")]
    InvertedDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("Coordinate out of range: latitude {latitude}, longitude {longitude}")]
    CoordinateOutOfRange { latitude: f64, longitude: f64 },
}

/// Failure of a single location's fetch → preprocess → download chain
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChainError {
    #[error("Raw data fetch failed with status {status}: {body}")]
    Fetch { status: u16, body: String },

    #[error("Preprocessing failed with status {status}: {body}")]
    Preprocess { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for ChainError {
    fn from(err: reqwest::Error) -> Self {
        ChainError::Transport(err.to_string())
    }
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::Transport(err.to_string())
    }
}
