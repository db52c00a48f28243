//! Text rendering of run outcomes and evaluation results

use std::fmt::{self, Display};

use serde::Serialize;

use crate::models::{EvaluationReport, FetchOutcome, RunReport, RunResult};

pub const SUCCESS_MESSAGE: &str = "Data fetched and file download has started.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Notification shown after a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Aggregate notification for a finished run
#[must_use]
pub fn run_notice(report: &RunReport) -> Notice {
    match &report.result {
        RunResult::AllSucceeded => Notice {
            level: NoticeLevel::Success,
            message: SUCCESS_MESSAGE.to_string(),
        },
        RunResult::PartialOrTotalFailure { failed_locations } => {
            let details = failed_locations
                .iter()
                .map(|(location, reason)| format!("{location}: {reason}"))
                .collect::<Vec<_>>()
                .join("; ");
            Notice::error(format!(
                "Failed to fetch data for {} of {} locations. {details}",
                failed_locations.len(),
                report.outcomes.len()
            ))
        }
    }
}

/// Per-location listing of a run
pub struct RunSummary<'a>(pub &'a RunReport);

impl Display for RunSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.0.outcomes {
            match &entry.outcome {
                FetchOutcome::Success { download, .. } => {
                    writeln!(f, "✅ {} → {}", entry.location, download)?;
                }
                FetchOutcome::Failure { reason } => {
                    writeln!(f, "❌ {} → {}", entry.location, reason)?;
                }
            }
        }
        write!(f, "{}", run_notice(self.0).message)
    }
}

/// Metrics, prediction table and plot series of one evaluation
pub struct EvaluationView<'a>(pub &'a EvaluationReport);

impl Display for EvaluationView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let metrics = &self.0.evaluation_metrics;
        writeln!(f, "Evaluation Metrics:")?;
        writeln!(f, "  • RMSE: {}", metrics.rmse)?;
        writeln!(f, "  • MAE: {}", metrics.mae)?;
        writeln!(f, "  • R2: {}", metrics.r2)?;
        writeln!(f)?;
        writeln!(f, "Predictions vs. Actual Values")?;

        let points = self.0.chart_points();
        let rows: Vec<(String, String)> = points
            .iter()
            .map(|p| (p.actual.to_string(), p.predicted.to_string()))
            .collect();
        let width = rows
            .iter()
            .map(|(actual, _)| actual.len())
            .chain(std::iter::once("Actual".len()))
            .max()
            .unwrap_or_default();

        writeln!(f, "  {:<width$} | Predicted", "Actual")?;
        writeln!(f, "  {}-+-{}", "-".repeat(width), "-".repeat("Predicted".len()))?;
        for (actual, predicted) in &rows {
            writeln!(f, "  {actual:<width$} | {predicted}")?;
        }
        write!(f, "{} points", points.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        EvaluationMetrics, Location, LocationOutcome, PlotSeries,
    };

    fn report(outcomes: Vec<LocationOutcome>) -> RunReport {
        let result = RunResult::from_outcomes(&outcomes);
        RunReport {
            outcomes,
            result,
            navigate_to: None,
        }
    }

    #[test]
    fn test_success_notice() {
        let notice = run_notice(&report(vec![LocationOutcome {
            location: Location::new(1.0, 2.0),
            outcome: FetchOutcome::Success {
                cleaned_csv: String::new(),
                download: "x.csv".into(),
            },
        }]));
        assert_eq!(notice.level, NoticeLevel::Success);
        assert_eq!(notice.message, SUCCESS_MESSAGE);
    }

    #[test]
    fn test_failure_notice_names_location_and_reason() {
        let notice = run_notice(&report(vec![LocationOutcome {
            location: Location::new(1.0, 2.0),
            outcome: FetchOutcome::Failure {
                reason: "Preprocessing failed with status 404".into(),
            },
        }]));
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(notice.message.contains("1 of 1"));
        assert!(notice.message.contains("(1.0000, 2.0000): Preprocessing failed"));
    }

    #[test]
    fn test_evaluation_view() {
        let evaluation = EvaluationReport {
            evaluation_metrics: EvaluationMetrics {
                rmse: 1.5,
                mae: 1.25,
                r2: 0.75,
            },
            plot: PlotSeries {
                x: vec![10.0, 20.0],
                y: vec![11.0, 19.5],
            },
            predictions: None,
        };
        let text = EvaluationView(&evaluation).to_string();
        assert!(text.contains("RMSE: 1.5"));
        assert!(text.contains("R2: 0.75"));
        assert!(text.contains("20     | 19.5"));
        assert!(text.ends_with("2 points"));
    }
}
