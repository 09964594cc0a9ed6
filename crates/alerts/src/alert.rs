use chrono::{DateTime, Utc};
use serde::Serialize;

use bloodline_core::{BloodType, ForecastId, RegionId, RiskLevel};
use bloodline_forecast::DemandForecast;

pub const ALERT_TYPE: &str = "blood_shortage_prediction";
pub const CALL_TO_ACTION: &str = "Please schedule a donation appointment if you are available.";

/// Shortage alert composed from one forecast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub alert_type: &'static str,
    pub forecast_id: ForecastId,
    pub blood_type: BloodType,
    pub region: RegionId,
    pub shortage_risk: RiskLevel,
    pub predicted_demand: f64,
    pub target_time: DateTime<Utc>,
    pub message: String,
    pub call_to_action: &'static str,
    /// Recipients the sink accepted the alert for.
    pub notified_recipients: usize,
}

impl Alert {
    pub fn compose(forecast: &DemandForecast) -> Self {
        let message = format!(
            "{} risk of {} shortage in {} predicted for {}. Expected demand: {} units.",
            forecast.shortage_risk,
            forecast.blood_type,
            forecast.region,
            forecast.target_time.format("%Y-%m-%d %H:%M"),
            forecast.predicted_demand.trunc() as u64,
        );
        Self {
            alert_type: ALERT_TYPE,
            forecast_id: forecast.id,
            blood_type: forecast.blood_type,
            region: forecast.region.clone(),
            shortage_risk: forecast.shortage_risk,
            predicted_demand: forecast.predicted_demand,
            target_time: forecast.target_time,
            message,
            call_to_action: CALL_TO_ACTION,
            notified_recipients: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn message_names_risk_type_region_and_time() {
        let at = Utc.with_ymd_and_hms(2025, 11, 3, 9, 30, 0).unwrap();
        let forecast = DemandForecast {
            id: ForecastId::new(),
            blood_type: BloodType::ONeg,
            region: RegionId::new("East Delhi").unwrap(),
            generated_at: at,
            target_time: at,
            slice_hours: 24,
            predicted_demand: 17.8,
            confidence: 0.9,
            shortage_risk: RiskLevel::Critical,
            baseline_units: 4,
            model_version: 1,
            alert_sent: false,
        };
        let alert = Alert::compose(&forecast);
        assert_eq!(
            alert.message,
            "Critical risk of O- shortage in East Delhi predicted for 2025-11-03 09:30. Expected demand: 17 units."
        );
        assert_eq!(alert.forecast_id, forecast.id);
        assert_eq!(alert.notified_recipients, 0);
    }
}
