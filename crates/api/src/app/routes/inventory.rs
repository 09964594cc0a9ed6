use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    response::IntoResponse,
    routing::{get, post},
};

use bloodline_core::HospitalId;

use crate::app::dto::{InventoryQuery, UpdateInventoryRequest};
use crate::app::errors::{ApiError, parse_opt};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(get_inventory))
        .route("/update", post(update_inventory))
}

pub async fn get_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<InventoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let blood_type = parse_opt(query.blood_type.as_deref())?;
    let hospital = query.hospital_id.map(HospitalId::new);
    Ok(Json(services.inventory(blood_type, hospital)))
}

pub async fn update_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<UpdateInventoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(services.update_inventory(&body)?))
}
