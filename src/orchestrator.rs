//! Multi-location fetch orchestration
//!
//! A run takes an immutable snapshot of the selected locations and the query
//! parameters, then drives one fetch → preprocess → download chain per
//! location. Chains run concurrently on the caller's task and the run waits
//! for every one of them; a failing chain is captured as a
//! [`FetchOutcome::Failure`] and never cuts its siblings short.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{info, instrument, warn};

use crate::download::DownloadSink;
use crate::error::{ChainError, ValidationError};
use crate::ml_service::Preprocessor;
use crate::models::{
    FetchOutcome, FileId, Location, LocationOutcome, QueryParameters, RunReport, RunResult,
};
use crate::power::RawDataSource;
use crate::selector::MAX_LOCATIONS;

pub struct FetchOrchestrator {
    source: Arc<dyn RawDataSource>,
    preprocessor: Arc<dyn Preprocessor>,
    sink: Arc<dyn DownloadSink>,
    release_grace: Duration,
}

impl FetchOrchestrator {
    pub fn new(
        source: Arc<dyn RawDataSource>,
        preprocessor: Arc<dyn Preprocessor>,
        sink: Arc<dyn DownloadSink>,
        release_grace: Duration,
    ) -> Self {
        Self {
            source,
            preprocessor,
            sink,
            release_grace,
        }
    }

    /// Checks run before any collaborator is contacted
    pub fn validate(
        locations: &[Location],
        params: &QueryParameters,
    ) -> Result<(), ValidationError> {
        if locations.len() != MAX_LOCATIONS {
            return Err(ValidationError::LocationCount {
                expected: MAX_LOCATIONS,
                found: locations.len(),
            });
        }
        params.validate()?;
        locations.iter().try_for_each(Location::validate)
    }

    /// Follow-up target of a completed run.
    ///
    /// Only the first location is considered, even when several were fetched.
    #[must_use]
    pub fn navigation_target(locations: &[Location]) -> Option<FileId> {
        locations.first().map(Location::file_id)
    }

    #[instrument(skip_all, fields(locations = locations.len()))]
    pub async fn run(
        &self,
        locations: Vec<Location>,
        params: QueryParameters,
    ) -> Result<RunReport, ValidationError> {
        Self::validate(&locations, &params)?;
        info!(
            "Starting run for {} locations, {} to {}",
            locations.len(),
            params.start_date,
            params.end_date
        );

        let params = &params;
        let chains = locations.iter().map(|location| async move {
            let outcome = match self.run_chain(location, params).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!("Chain for {} failed: {}", location, err);
                    err.into()
                }
            };
            LocationOutcome {
                location: *location,
                outcome,
            }
        });
        let outcomes = join_all(chains).await;

        let result = RunResult::from_outcomes(&outcomes);
        match &result {
            RunResult::AllSucceeded => info!("All {} chains succeeded", outcomes.len()),
            RunResult::PartialOrTotalFailure { failed_locations } => warn!(
                "{} of {} chains failed",
                failed_locations.len(),
                outcomes.len()
            ),
        }

        Ok(RunReport {
            outcomes,
            result,
            navigate_to: Self::navigation_target(&locations),
        })
    }

    async fn run_chain(
        &self,
        location: &Location,
        params: &QueryParameters,
    ) -> Result<FetchOutcome, ChainError> {
        self.source.fetch(location, params).await?;

        let file_id = location.file_id();
        let cleaned_csv = self.preprocessor.preprocess(&file_id).await?;

        let delivery = self
            .sink
            .deliver(&file_id.download_file_name(), &cleaned_csv)
            .await?;
        let _release = delivery.guard.schedule(self.release_grace);

        Ok(FetchOutcome::Success {
            cleaned_csv,
            download: delivery.locator,
        })
    }
}
