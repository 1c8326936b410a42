mod query;
mod snapshot;

use analytics::{Granularity, Metrics, recompute};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{NaiveDate, Utc};
use ingest::PulseConfig;
use query::MetricsQuery;
use serde::Serialize;
use snapshot::SnapshotStore;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Clone)]
struct AppState {
    config: Arc<PulseConfig>,
    snapshot: Arc<SnapshotStore>,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    error: anyhow::Error,
}

impl ApiError {
    fn bad_request(error: anyhow::Error) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = format!("error: {:#}", self.error);
        (self.status, body).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize)]
struct Settings {
    refresh_secs: u64,
    min_confidence: f64,
    granularity: Granularity,
    start_date: Option<NaiveDate>,
    records_path: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = PulseConfig::from_env()?;
    let bind_addr = config.dashboard_bind.clone();
    let state = AppState {
        snapshot: Arc::new(SnapshotStore::new(config.records_path.clone())),
        config: Arc::new(config),
    };

    info!(%bind_addr, "pulse dashboard listening");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app(state)).await?;
    Ok(())
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/settings", get(get_settings))
        .route("/api/metrics", get(get_metrics))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn get_settings(State(state): State<AppState>) -> Json<Settings> {
    let today = Utc::now().date_naive();
    let config = &state.config;
    Json(Settings {
        refresh_secs: config.refresh_secs,
        min_confidence: config.min_confidence,
        granularity: config.granularity,
        start_date: config.default_filter(today).start_date,
        records_path: state.snapshot.path().display().to_string(),
    })
}

async fn get_metrics(
    State(state): State<AppState>,
    Query(query): Query<MetricsQuery>,
) -> ApiResult<Json<Metrics>> {
    let today = Utc::now().date_naive();
    let (filter, granularity) = query
        .resolve(&state.config, today)
        .map_err(ApiError::bad_request)?;
    let records = state.snapshot.records().await?;

    let metrics = tokio::task::spawn_blocking(move || recompute(&records, &filter, granularity))
        .await
        .map_err(|e| ApiError::from(anyhow::Error::new(e).context("metrics task")))?;
    Ok(Json(metrics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use std::fs;
    use std::path::Path;
    use tower::ServiceExt;

    const RECORDS: &str = concat!(
        r##"{"timestamp": "2025-04-01T10:00:00Z", "sentiment": "POSITIVE", "confidence": 0.9, "text": "#go up"}"##,
        "\n",
        r##"{"timestamp": "2025-04-01T10:05:00Z", "sentiment": "NEGATIVE", "confidence": 0.7, "text": "#go down"}"##,
        "\n",
    );

    fn state_for(records_path: &Path) -> AppState {
        let path = records_path.display().to_string();
        let config = PulseConfig::from_lookup(
            |key| (key == "PULSE_RECORDS_PATH").then(|| path.clone()),
            Path::new("/home/tester"),
        );
        AppState {
            snapshot: Arc::new(SnapshotStore::new(config.records_path.clone())),
            config: Arc::new(config),
        }
    }

    async fn call(state: AppState, uri: &str) -> (StatusCode, String) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app(state).oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn health_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = call(state_for(&dir.path().join("r.jsonl")), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn metrics_for_valid_query() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");
        fs::write(&path, RECORDS).unwrap();

        let (status, body) = call(
            state_for(&path),
            "/api/metrics?granularity=H&hashtag=%23go&start=2025-04-01&end=2025-04-01",
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["total"], 2);
        assert_eq!(json["per_sentiment_counts"]["POSITIVE"], 1);
        assert_eq!(json["per_sentiment_counts"]["NEGATIVE"], 1);
    }

    #[tokio::test]
    async fn bad_query_values_are_bad_requests() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_for(&dir.path().join("records.jsonl"));
        for uri in [
            "/api/metrics?granularity=week",
            "/api/metrics?min_confidence=2",
            "/api/metrics?start=yesterday",
        ] {
            let (status, body) = call(state.clone(), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert!(body.starts_with("error: "), "{body}");
        }
    }

    #[tokio::test]
    async fn unreadable_records_are_a_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");
        fs::create_dir(&path).unwrap();

        let (status, body) = call(state_for(&path), "/api/metrics").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("records.jsonl"), "{body}");
    }

    #[tokio::test]
    async fn settings_echo_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");
        let (status, body) = call(state_for(&path), "/api/settings").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["min_confidence"], 0.5);
        assert_eq!(json["records_path"], path.display().to_string());
    }
}
