//! Evaluation service response structures

use serde::{Deserialize, Serialize};

/// JSON body returned by the evaluation service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub evaluation_metrics: EvaluationMetrics,
    pub plot: PlotSeries,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predictions: Option<Predictions>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    #[serde(rename = "RMSE")]
    pub rmse: f64,
    #[serde(rename = "MAE")]
    pub mae: f64,
    #[serde(rename = "R2")]
    pub r2: f64,
}

/// `x` holds actual values, `y` the model's predictions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PlotSeries {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Predictions {
    pub actual: Vec<f64>,
    pub predicted: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    pub actual: f64,
    pub predicted: f64,
}

impl EvaluationReport {
    /// Pairs `x[i]` with `y[i]`; extra values of the longer series are dropped.
    #[must_use]
    pub fn chart_points(&self) -> Vec<ChartPoint> {
        self.plot
            .x
            .iter()
            .zip(&self.plot.y)
            .map(|(&actual, &predicted)| ChartPoint { actual, predicted })
            .collect()
    }
}
