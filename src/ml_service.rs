//! Client for the preprocessing / evaluation service
//!
//! Both endpoints take a server-side file path. Preprocessing returns the
//! cleaned CSV, evaluation returns metrics and an actual-vs-predicted series.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::MlServiceConfig;
use crate::error::ChainError;
use crate::models::{EvaluationReport, FileId};
use crate::power::DatasetStore;
use crate::power::client::USER_AGENT;

/// Second stage of a chain: cleaned CSV for a stored dataset
#[async_trait]
pub trait Preprocessor: Send + Sync {
    async fn preprocess(&self, file_id: &FileId) -> Result<String, ChainError>;
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("Evaluation service returned {status}: {detail}")]
    Service { status: u16, detail: String },

    #[error("Evaluation request failed: {0}")]
    Transport(String),

    #[error("Invalid evaluation response: {0}")]
    InvalidResponse(String),
}

/// Source of evaluation results for one file path
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Service JSON, untouched
    async fn evaluate_raw(&self, filepath: &str) -> Result<Value, EvaluationError>;

    async fn evaluate(&self, filepath: &str) -> Result<EvaluationReport, EvaluationError> {
        let value = self.evaluate_raw(filepath).await?;
        serde_json::from_value(value).map_err(|e| EvaluationError::InvalidResponse(e.to_string()))
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Value,
}

/// Prefer the service's `detail` field, fall back to the raw body
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: Value::String(detail),
        }) => detail,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) => body.to_string(),
    }
}

#[derive(Clone)]
pub struct MlServiceClient {
    client: Client,
    base_url: String,
    datasets: DatasetStore,
}

impl MlServiceClient {
    pub fn new(config: &MlServiceConfig, datasets: DatasetStore) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(USER_AGENT)
            .build()
            .with_context(|| "Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            datasets,
        })
    }

    fn endpoint(&self, name: &str, filepath: &str) -> String {
        format!(
            "{}/{name}?filepath={}",
            self.base_url,
            urlencoding::encode(filepath)
        )
    }

    /// Server-side path the service reads for `file_id`
    #[must_use]
    pub fn dataset_path(&self, file_id: &FileId) -> String {
        self.datasets.path_for(file_id).to_string_lossy().into_owned()
    }
}

#[async_trait]
impl Preprocessor for MlServiceClient {
    #[instrument(skip(self), fields(file_id = %file_id))]
    async fn preprocess(&self, file_id: &FileId) -> Result<String, ChainError> {
        let url = self.endpoint("preprocess", &self.dataset_path(file_id));
        debug!("Preprocess request URL: {}", url);
        let start_time = Instant::now();

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Preprocessing {} failed with {}", file_id, status);
            return Err(ChainError::Preprocess {
                status: status.as_u16(),
                body,
            });
        }

        let cleaned = response.text().await?;
        info!(
            "Preprocessed {} in {:.3}s",
            file_id,
            start_time.elapsed().as_secs_f64()
        );
        Ok(cleaned)
    }
}

#[async_trait]
impl Evaluator for MlServiceClient {
    #[instrument(skip(self))]
    async fn evaluate_raw(&self, filepath: &str) -> Result<Value, EvaluationError> {
        let url = self.endpoint("evaluate", filepath);
        let transport = |e: reqwest::Error| EvaluationError::Transport(e.to_string());

        let response = self.client.get(&url).send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EvaluationError::Service {
                status: status.as_u16(),
                detail: error_detail(&body),
            });
        }

        let body = response.text().await.map_err(transport)?;
        serde_json::from_str(&body).map_err(|e| EvaluationError::InvalidResponse(e.to_string()))
    }
}
