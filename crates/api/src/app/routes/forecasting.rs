use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tracing::info;

use crate::app::dto::{
    AlertsResponse, DEFAULT_HOURS_BACK, GenerateForecastRequest, ListForecastsQuery, SendAlertsRequest,
    SummaryQuery, TrainQuery, TrainResponse, TrainingStatusResponse,
};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/train", post(train))
        .route("/training-status", get(training_status))
        .route("/generate", post(generate))
        .route("/forecasts", get(list_forecasts))
        .route("/forecasts/summary", get(forecast_summary))
        .route("/alerts/send", post(send_alerts))
}

pub async fn train(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<TrainQuery>,
) -> Result<Json<TrainResponse>, ApiError> {
    let outcome = services.train(query.force_retrain).await?;
    let message = if outcome.trained {
        "Model trained successfully"
    } else {
        "Model already trained"
    };
    Ok(Json(TrainResponse {
        trained: outcome.trained,
        model_version: outcome.metadata.version,
        sample_count: outcome.metadata.sample_count,
        trained_at: outcome.metadata.trained_at,
        message,
    }))
}

pub async fn training_status(Extension(services): Extension<Arc<AppServices>>) -> Json<TrainingStatusResponse> {
    let forecaster = services.forecaster();
    let metadata = forecaster.active_model().map(|m| m.metadata().clone());
    Json(TrainingStatusResponse {
        is_trained: metadata.is_some(),
        is_training: forecaster.is_training(),
        model_version: metadata.as_ref().map(|m| m.version),
        sample_count: metadata.as_ref().map(|m| m.sample_count),
        trained_at: metadata.map(|m| m.trained_at),
    })
}

pub async fn generate(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<GenerateForecastRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let hours = body.hours_ahead;
    let forecasts = services.generate(body).await?;
    info!(count = forecasts.len(), hours_ahead = hours, "forecasts generated");
    Ok((StatusCode::CREATED, Json(forecasts)))
}

pub async fn list_forecasts(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<ListForecastsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(services.list_forecasts(&query)?))
}

pub async fn forecast_summary(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<SummaryQuery>,
) -> impl IntoResponse {
    Json(services.forecast_summary(query.hours_back.unwrap_or(DEFAULT_HOURS_BACK)))
}

pub async fn send_alerts(
    Extension(services): Extension<Arc<AppServices>>,
    body: Option<Json<SendAlertsRequest>>,
) -> Result<Json<AlertsResponse>, ApiError> {
    let req = body.map(|Json(b)| b).unwrap_or_default();
    let alerts = services.send_alerts(&req).await?;
    Ok(Json(AlertsResponse {
        total_alerts: alerts.len(),
        alerts_sent: alerts,
    }))
}
