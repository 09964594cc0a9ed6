use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bloodline_alerts::Alert;
use bloodline_redistribution::RedistributionOpportunity;

pub const DEFAULT_HOURS_AHEAD: u32 = 48;
pub const MIN_HOURS_AHEAD: u32 = 24;
pub const MAX_HOURS_AHEAD: u32 = 168;
pub const DEFAULT_HOURS_BACK: u32 = 24;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct TrainQuery {
    #[serde(default)]
    pub force_retrain: bool,
}

fn default_hours_ahead() -> u32 {
    DEFAULT_HOURS_AHEAD
}

#[derive(Debug, Deserialize)]
pub struct GenerateForecastRequest {
    #[serde(default = "default_hours_ahead")]
    pub hours_ahead: u32,
    pub regions: Option<Vec<String>>,
    #[serde(default)]
    pub retrain: bool,
    #[serde(default)]
    pub outbreak_regions: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListForecastsQuery {
    pub blood_type: Option<String>,
    pub region: Option<String>,
    pub min_risk: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub hours_back: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SendAlertsRequest {
    pub forecast_id: Option<String>,
    pub min_risk_level: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InventoryQuery {
    pub blood_type: Option<String>,
    pub hospital_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateInventoryRequest {
    pub hospital_id: u64,
    pub blood_type: String,
    pub current_units: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct OpportunitiesQuery {
    pub blood_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteTransferRequest {
    pub from_hospital_id: u64,
    pub to_hospital_id: u64,
    pub blood_type: String,
    pub units: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct ForecastPlanQuery {
    pub threshold_risk: Option<String>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct TrainResponse {
    pub trained: bool,
    pub model_version: u64,
    pub sample_count: usize,
    pub trained_at: DateTime<Utc>,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct TrainingStatusResponse {
    pub is_trained: bool,
    pub is_training: bool,
    pub model_version: Option<u64>,
    pub sample_count: Option<usize>,
    pub trained_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct AlertsResponse {
    pub total_alerts: usize,
    pub alerts_sent: Vec<Alert>,
}

#[derive(Debug, Serialize)]
pub struct OpportunitiesResponse {
    pub total: usize,
    pub opportunities: Vec<RedistributionOpportunity>,
}
