use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use axum::{
    Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::{
    config::{DefaultsConfig, PowerFetchConfig},
    download::{BlobDownloadSink, BlobRegistry},
    error::{ChainError, ValidationError},
    ml_service::{EvaluationError, Evaluator, MlServiceClient},
    models::{FetchOutcome, FileId, Location, QueryForm, QueryParameters, RunResult},
    orchestrator::FetchOrchestrator,
    power::{DatasetStore, PowerClient, PowerProxySource, RawDataSource},
    presenter::{Notice, run_notice},
    selector::LocationSelector,
};

pub const DOWNLOADS_PATH: &str = "/api/downloads";

/// Shared state of the HTTP API
#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn RawDataSource>,
    pub evaluator: Arc<dyn Evaluator>,
    pub orchestrator: Arc<FetchOrchestrator>,
    pub blobs: BlobRegistry,
    pub selector: Arc<Mutex<LocationSelector>>,
    pub datasets: DatasetStore,
    pub defaults: DefaultsConfig,
}

impl AppState {
    pub fn from_config(config: &PowerFetchConfig) -> Result<Self> {
        let datasets = DatasetStore::new(&config.power.dataset_dir);
        let source = Arc::new(PowerProxySource::new(
            PowerClient::new(&config.power)?,
            datasets.clone(),
        ));
        let ml = Arc::new(MlServiceClient::new(&config.ml_service, datasets.clone())?);
        let blobs = BlobRegistry::new();
        let sink = Arc::new(BlobDownloadSink::new(blobs.clone(), DOWNLOADS_PATH));
        let orchestrator = Arc::new(FetchOrchestrator::new(
            source.clone(),
            ml.clone(),
            sink,
            config.downloads.release_grace(),
        ));

        Ok(Self {
            source,
            evaluator: ml,
            orchestrator,
            blobs,
            selector: Arc::new(Mutex::new(LocationSelector::new())),
            datasets,
            defaults: config.defaults.clone(),
        })
    }

    fn selector(&self) -> std::sync::MutexGuard<'_, LocationSelector> {
        self.selector.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/nasa", get(get_nasa))
        .route("/evaluation", get(get_evaluation))
        .route("/markers", get(get_markers).post(add_marker))
        .route("/runs", post(submit_run))
        .route("/downloads/{id}", get(get_download))
        .with_state(state)
}

fn error_response(status: StatusCode, error: &str, detail: Option<String>) -> Response {
    let body = match detail {
        Some(detail) => json!({ "error": error, "detail": detail }),
        None => json!({ "error": error }),
    };
    (status, Json(body)).into_response()
}

fn csv_attachment(file_name: &str, csv: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        csv,
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct NasaQuery {
    start: Option<String>,
    end: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    community: Option<String>,
    parameters: Option<String>,
    format: Option<String>,
    theme: Option<String>,
    user: Option<String>,
    #[serde(rename = "time-standard")]
    time_standard: Option<String>,
}

const DEFAULT_LATITUDE: f64 = 19.6565;
const DEFAULT_LONGITUDE: f64 = 73.1556;

fn parse_power_date(value: Option<String>, default: NaiveDate) -> Result<NaiveDate, String> {
    match value {
        None => Ok(default),
        Some(text) => NaiveDate::parse_from_str(&text, "%Y%m%d")
            .map_err(|_| format!("Invalid date '{text}', expected yyyyMMdd")),
    }
}

/// Raw POWER proxy: fetch one location, persist it, return the CSV
async fn get_nasa(State(state): State<AppState>, Query(query): Query<NasaQuery>) -> Response {
    let defaults = &state.defaults;
    let dates = parse_power_date(query.start, defaults.start_date)
        .and_then(|start| Ok((start, parse_power_date(query.end, defaults.end_date)?)));
    let (start_date, end_date) = match dates {
        Ok(dates) => dates,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, &message, None),
    };

    let location = Location::new(
        query.latitude.unwrap_or(DEFAULT_LATITUDE),
        query.longitude.unwrap_or(DEFAULT_LONGITUDE),
    );
    if let Err(err) = location.validate() {
        return error_response(StatusCode::BAD_REQUEST, &err.to_string(), None);
    }
    let params = QueryParameters {
        start_date,
        end_date,
        community: query.community.unwrap_or_else(|| defaults.community.clone()),
        parameters: query.parameters.unwrap_or_else(|| defaults.parameters.clone()),
        format: query.format.unwrap_or_else(|| defaults.format.clone()),
        theme: query.theme.unwrap_or_else(|| defaults.theme.clone()),
        user: query.user.unwrap_or_else(|| defaults.user.clone()),
        time_standard: query
            .time_standard
            .unwrap_or_else(|| defaults.time_standard.clone()),
    };

    match state.source.fetch(&location, &params).await {
        Ok(csv) => csv_attachment("nasa_data.csv", csv),
        Err(ChainError::Fetch { status, .. }) => error_response(
            StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
            "Failed to fetch data from NASA POWER API",
            None,
        ),
        Err(err) => {
            warn!("NASA proxy failed: {}", err);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string(), None)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EvaluationQuery {
    filepath: Option<String>,
}

async fn get_evaluation(
    State(state): State<AppState>,
    Query(query): Query<EvaluationQuery>,
) -> Response {
    let Some(filepath) = query.filepath.filter(|p| !p.is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "Missing filepath parameter", None);
    };

    match state.evaluator.evaluate_raw(&filepath).await {
        Ok(value) => Json(value).into_response(),
        Err(EvaluationError::Service { status, detail }) => error_response(
            StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
            "Evaluation service error",
            Some(detail),
        ),
        Err(err) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Server error",
            Some(err.to_string()),
        ),
    }
}

#[derive(Debug, Deserialize)]
pub struct MarkerRequest {
    lat: f64,
    lng: f64,
}

async fn get_markers(State(state): State<AppState>) -> Json<Vec<Location>> {
    Json(state.selector().snapshot())
}

async fn add_marker(State(state): State<AppState>, Json(marker): Json<MarkerRequest>) -> Response {
    let location = Location::new(marker.lat, marker.lng);
    if let Err(err) = location.validate() {
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, &err.to_string(), None);
    }

    let mut selector = state.selector();
    match selector.select(location) {
        Ok(markers) => Json(markers.to_vec()).into_response(),
        Err(rejected) => error_response(StatusCode::CONFLICT, &rejected.to_string(), None),
    }
}

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    /// Falls back to the markers selected through `/markers`
    locations: Option<Vec<Location>>,
    params: Option<QueryForm>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeView {
    Success { location: Location, download: String },
    Failure { location: Location, reason: String },
}

#[derive(Debug, Serialize)]
pub struct NavigationTarget {
    pub file_id: FileId,
    pub filepath: String,
}

#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub result: RunResult,
    pub outcomes: Vec<OutcomeView>,
    pub notice: Notice,
    pub navigate_to: Option<NavigationTarget>,
}

async fn submit_run(State(state): State<AppState>, Json(request): Json<RunRequest>) -> Response {
    let locations = request
        .locations
        .unwrap_or_else(|| state.selector().snapshot());
    let form = request.params.unwrap_or_else(|| state.defaults.form());

    let report = match QueryParameters::try_from(form) {
        Ok(params) => state.orchestrator.run(locations, params).await,
        Err(err) => Err(err),
    };
    let report = match report {
        Ok(report) => report,
        Err(err) => return validation_response(&err),
    };

    let notice = run_notice(&report);
    info!("Run finished: {}", notice.message);
    let navigate_to = report.navigate_to.clone().map(|file_id| NavigationTarget {
        filepath: state.datasets.path_for(&file_id).to_string_lossy().into_owned(),
        file_id,
    });
    let outcomes = report
        .outcomes
        .into_iter()
        .map(|entry| match entry.outcome {
            FetchOutcome::Success { download, .. } => OutcomeView::Success {
                location: entry.location,
                download,
            },
            FetchOutcome::Failure { reason } => OutcomeView::Failure {
                location: entry.location,
                reason,
            },
        })
        .collect();

    Json(RunResponse {
        result: report.result,
        outcomes,
        notice,
        navigate_to,
    })
    .into_response()
}

fn validation_response(err: &ValidationError) -> Response {
    let notice = Notice::error(err.to_string());
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "error": notice.message, "notice": notice })),
    )
        .into_response()
}

async fn get_download(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.blobs.get(&id) {
        Some(blob) => csv_attachment(&blob.file_name, blob.contents),
        None => error_response(StatusCode::NOT_FOUND, "Download expired or unknown", None),
    }
}

#[cfg(test)]
mod tests;
