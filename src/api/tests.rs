use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use super::*;
use crate::download::DownloadSink;
use crate::ml_service::Preprocessor;

struct FakeSource;

#[async_trait]
impl RawDataSource for FakeSource {
    async fn fetch(
        &self,
        location: &Location,
        _params: &QueryParameters,
    ) -> Result<String, ChainError> {
        if location.latitude < 0.0 {
            return Err(ChainError::Fetch {
                status: 503,
                body: "maintenance".into(),
            });
        }
        Ok(format!("raw {}", location.file_id()))
    }
}

struct FakePreprocessor;

#[async_trait]
impl Preprocessor for FakePreprocessor {
    async fn preprocess(&self, file_id: &FileId) -> Result<String, ChainError> {
        Ok(format!("cleaned {file_id}"))
    }
}

struct FakeEvaluator;

#[async_trait]
impl Evaluator for FakeEvaluator {
    async fn evaluate_raw(&self, filepath: &str) -> Result<Value, EvaluationError> {
        if filepath.ends_with("missing.csv") {
            return Err(EvaluationError::Service {
                status: 404,
                detail: "File does not exist.".into(),
            });
        }
        Ok(json!({
            "evaluation_metrics": {"RMSE": 1.0, "MAE": 0.5, "R2": 0.9},
            "plot": {"x": [1.0], "y": [1.1]}
        }))
    }
}

fn state() -> AppState {
    let blobs = BlobRegistry::new();
    let sink: Arc<dyn DownloadSink> = Arc::new(BlobDownloadSink::new(blobs.clone(), DOWNLOADS_PATH));
    AppState {
        source: Arc::new(FakeSource),
        evaluator: Arc::new(FakeEvaluator),
        orchestrator: Arc::new(FetchOrchestrator::new(
            Arc::new(FakeSource),
            Arc::new(FakePreprocessor),
            sink,
            Duration::from_secs(60),
        )),
        blobs,
        selector: Arc::new(Mutex::new(LocationSelector::new())),
        datasets: DatasetStore::new("/srv/datasets"),
        defaults: DefaultsConfig::default(),
    }
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn json_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

#[tokio::test]
async fn test_nasa_proxy_returns_csv_attachment() {
    let response = router(state())
        .oneshot(get_request("/nasa?latitude=10&longitude=20"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"nasa_data.csv\""
    );
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"raw 10.0000_20.0000");
}

#[tokio::test]
async fn test_nasa_proxy_passes_upstream_status() {
    let (status, body) = send(router(state()), get_request("/nasa?latitude=-10&longitude=20")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        json_body(&body)["error"],
        "Failed to fetch data from NASA POWER API"
    );
}

#[tokio::test]
async fn test_nasa_proxy_rejects_bad_date() {
    let (status, _) = send(router(state()), get_request("/nasa?start=2018-01-01")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_nasa_proxy_rejects_out_of_range_coordinates() {
    for uri in [
        "/nasa?latitude=95&longitude=20",
        "/nasa?latitude=10&longitude=-181",
        "/nasa?latitude=NaN&longitude=20",
    ] {
        let (status, body) = send(router(state()), get_request(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(
            json_body(&body)["error"]
                .as_str()
                .unwrap()
                .contains("out of range")
        );
    }
}

#[tokio::test]
async fn test_evaluation_requires_filepath() {
    let (status, body) = send(router(state()), get_request("/evaluation")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&body)["error"], "Missing filepath parameter");
}

#[tokio::test]
async fn test_evaluation_maps_service_error() {
    let (status, body) = send(
        router(state()),
        get_request("/evaluation?filepath=%2Ftmp%2Fmissing.csv"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let body = json_body(&body);
    assert_eq!(body["error"], "Evaluation service error");
    assert_eq!(body["detail"], "File does not exist.");
}

#[tokio::test]
async fn test_evaluation_passes_payload_through() {
    let (status, body) = send(
        router(state()),
        get_request("/evaluation?filepath=%2Ftmp%2Fcleaned.csv"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["evaluation_metrics"]["R2"], 0.9);
}

#[tokio::test]
async fn test_markers_capped_at_four() {
    let state = state();
    for i in 0..4 {
        let (status, _) = send(
            router(state.clone()),
            json_request("/markers", json!({"lat": f64::from(i), "lng": 1.0})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(
        router(state.clone()),
        json_request("/markers", json!({"lat": 9.0, "lng": 9.0})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json_body(&body)["error"], "You can only select 4 locations.");

    let (_, body) = send(router(state), get_request("/markers")).await;
    assert_eq!(json_body(&body).as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_run_uses_selected_markers_and_serves_downloads() {
    let state = state();
    for (lat, lng) in [(10.0, 20.0), (30.0, 40.0), (50.0, 60.0), (70.0, 80.0)] {
        send(
            router(state.clone()),
            json_request("/markers", json!({"lat": lat, "lng": lng})),
        )
        .await;
    }

    let (status, body) = send(router(state.clone()), json_request("/runs", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["result"]["status"], "all_succeeded");
    assert_eq!(body["notice"]["level"], "success");
    assert_eq!(body["navigate_to"]["file_id"], "10.0000_20.0000");
    assert_eq!(
        body["navigate_to"]["filepath"],
        "/srv/datasets/nasa_power_data_10.0000_20.0000.csv"
    );

    let outcomes = body["outcomes"].as_array().unwrap();
    assert_eq!(outcomes.len(), 4);
    let download = outcomes[1]["download"].as_str().unwrap();
    let uri = download.strip_prefix("/api").unwrap();

    let response = router(state).oneshot(get_request(uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"cleaned_data_30.0000_40.0000.csv\""
    );
}

#[tokio::test]
async fn test_run_reports_partial_failure() {
    let (status, body) = send(
        router(state()),
        json_request(
            "/runs",
            json!({"locations": [
                {"latitude": 1.0, "longitude": 1.0},
                {"latitude": -2.0, "longitude": 2.0},
                {"latitude": 3.0, "longitude": 3.0},
                {"latitude": 4.0, "longitude": 4.0}
            ]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["result"]["status"], "partial_or_total_failure");
    assert_eq!(body["outcomes"][1]["status"], "failure");
    assert!(
        body["outcomes"][1]["reason"]
            .as_str()
            .unwrap()
            .contains("maintenance")
    );
    assert_eq!(body["outcomes"][2]["status"], "success");
    assert_eq!(body["navigate_to"]["file_id"], "1.0000_1.0000");
}

#[tokio::test]
async fn test_run_with_three_locations_is_rejected() {
    let (status, body) = send(
        router(state()),
        json_request(
            "/runs",
            json!({"locations": [
                {"latitude": 1.0, "longitude": 1.0},
                {"latitude": 2.0, "longitude": 2.0},
                {"latitude": 3.0, "longitude": 3.0}
            ]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(
        json_body(&body)["error"]
            .as_str()
            .unwrap()
            .contains("exactly 4")
    );
}

#[tokio::test]
async fn test_run_with_missing_dates_is_rejected() {
    let (status, body) = send(
        router(state()),
        json_request("/runs", json!({"params": {"start_date": null}})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        json_body(&body)["error"],
        "Please select both start and end dates"
    );
}

#[tokio::test]
async fn test_unknown_download_is_not_found() {
    let (status, _) = send(router(state()), get_request("/downloads/blob-99")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
