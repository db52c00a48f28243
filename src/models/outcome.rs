//! Per-location and aggregate results of a run

use serde::{Deserialize, Serialize};

use super::location::{FileId, Location};
use crate::error::ChainError;

/// Result of one location's chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchOutcome {
    Success {
        cleaned_csv: String,
        /// Where the delivered file can be found (path or URL)
        download: String,
    },
    Failure {
        reason: String,
    },
}

impl FetchOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }
}

impl From<ChainError> for FetchOutcome {
    fn from(err: ChainError) -> Self {
        FetchOutcome::Failure {
            reason: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationOutcome {
    pub location: Location,
    pub outcome: FetchOutcome,
}

/// Aggregate over every chain of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunResult {
    AllSucceeded,
    PartialOrTotalFailure {
        failed_locations: Vec<(Location, String)>,
    },
}

impl RunResult {
    /// Success only when every outcome succeeded
    #[must_use]
    pub fn from_outcomes(outcomes: &[LocationOutcome]) -> Self {
        let failed_locations: Vec<(Location, String)> = outcomes
            .iter()
            .filter_map(|o| match &o.outcome {
                FetchOutcome::Failure { reason } => Some((o.location, reason.clone())),
                FetchOutcome::Success { .. } => None,
            })
            .collect();

        if failed_locations.is_empty() {
            RunResult::AllSucceeded
        } else {
            RunResult::PartialOrTotalFailure { failed_locations }
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, RunResult::AllSucceeded)
    }
}

/// Everything a caller needs to update its view after a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Outcomes in the order the locations were submitted
    pub outcomes: Vec<LocationOutcome>,
    pub result: RunResult,
    /// Follow-up target; derived from the first submitted location only
    pub navigate_to: Option<FileId>,
}
