use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    response::IntoResponse,
    routing::{get, post},
};

use bloodline_core::RiskLevel;

use crate::app::dto::{ExecuteTransferRequest, ForecastPlanQuery, OpportunitiesQuery, OpportunitiesResponse};
use crate::app::errors::{ApiError, parse_opt};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/opportunities", get(opportunities))
        .route("/execute", post(execute))
        .route("/summary", get(summary))
        .route("/forecast-based", post(forecast_based))
}

pub async fn opportunities(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<OpportunitiesQuery>,
) -> Result<Json<OpportunitiesResponse>, ApiError> {
    let opportunities = services.opportunities(parse_opt(query.blood_type.as_deref())?);
    Ok(Json(OpportunitiesResponse {
        total: opportunities.len(),
        opportunities,
    }))
}

pub async fn execute(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<ExecuteTransferRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(services.execute_transfer(&body)?))
}

pub async fn summary(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    Json(services.redistribution_summary())
}

pub async fn forecast_based(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<ForecastPlanQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let threshold = parse_opt::<RiskLevel>(query.threshold_risk.as_deref())?.unwrap_or(RiskLevel::High);
    Ok(Json(services.forecast_plan(threshold)))
}
