//! NASA POWER integration
//!
//! Raw hourly point data is fetched from POWER and persisted to the dataset
//! directory, where the preprocessing service picks it up by path.

use async_trait::async_trait;
use tracing::{info, instrument};

use crate::error::ChainError;
use crate::models::{Location, QueryParameters};

pub mod client;
pub mod csv;
pub mod dataset;

pub use client::PowerClient;
pub use dataset::DatasetStore;

/// First stage of a chain: raw CSV for one location
#[async_trait]
pub trait RawDataSource: Send + Sync {
    async fn fetch(
        &self,
        location: &Location,
        params: &QueryParameters,
    ) -> Result<String, ChainError>;
}

/// Fetches from POWER and stores the response where the preprocessing
/// service expects it
#[derive(Clone)]
pub struct PowerProxySource {
    client: PowerClient,
    store: DatasetStore,
}

impl PowerProxySource {
    pub fn new(client: PowerClient, store: DatasetStore) -> Self {
        Self { client, store }
    }
}

#[async_trait]
impl RawDataSource for PowerProxySource {
    #[instrument(skip(self, params), fields(location = %location))]
    async fn fetch(
        &self,
        location: &Location,
        params: &QueryParameters,
    ) -> Result<String, ChainError> {
        let csv = self.client.fetch_point(location, params).await?;
        let path = self
            .store
            .save(&location.file_id(), &csv)
            .await
            .map_err(|e| ChainError::Transport(format!("could not store dataset: {e}")))?;
        info!(
            "Data retrieved successfully! {} rows found, saved to {}",
            csv::data_row_count(&csv),
            path.display()
        );
        Ok(csv)
    }
}
