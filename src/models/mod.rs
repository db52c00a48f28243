pub mod evaluation;
pub mod location;
pub mod outcome;
pub mod query;

pub use evaluation::{ChartPoint, EvaluationMetrics, EvaluationReport, PlotSeries};
pub use location::{FileId, Location};
pub use outcome::{FetchOutcome, LocationOutcome, RunReport, RunResult};
pub use query::{QueryForm, QueryParameters};
