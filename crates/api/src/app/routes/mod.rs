use axum::Router;

pub mod forecasting;
pub mod inventory;
pub mod redistribution;
pub mod system;

/// Router for everything under `/forecasting`.
pub fn router() -> Router {
    Router::new()
        .merge(forecasting::router())
        .nest("/inventory", inventory::router())
        .nest("/redistribution", redistribution::router())
}
