//! `PowerFetch` - NASA POWER data collection for machine-learning evaluation
//!
//! This library fetches hourly POWER data for a set of selected locations,
//! hands each dataset to an external preprocessing service, delivers the
//! cleaned files and presents the evaluation service's results.

pub mod api;
pub mod config;
pub mod download;
pub mod error;
pub mod ml_service;
pub mod models;
pub mod orchestrator;
pub mod power;
pub mod presenter;
pub mod selector;
pub mod telemetry;
pub mod web;

// Re-export core types for public API
pub use config::PowerFetchConfig;
pub use download::{BlobDownloadSink, BlobRegistry, DownloadSink, FileDownloadSink, ReleaseGuard};
pub use error::{ChainError, PowerFetchError, ValidationError};
pub use ml_service::{Evaluator, MlServiceClient, Preprocessor};
pub use models::{
    EvaluationReport, FetchOutcome, FileId, Location, QueryForm, QueryParameters, RunReport,
    RunResult,
};
pub use orchestrator::FetchOrchestrator;
pub use power::{DatasetStore, PowerClient, PowerProxySource, RawDataSource};
pub use selector::LocationSelector;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
