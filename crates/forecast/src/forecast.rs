//! Demand forecast records and horizon slicing.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use bloodline_core::{BloodType, DomainError, DomainResult, ForecastId, RegionId, RiskLevel};

/// Width of one forecast slice.
pub const SLICE_HOURS: u32 = 24;

/// One target window inside a forecast horizon.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TimeSlice {
    pub target_time: DateTime<Utc>,
    /// Hours of the horizon this slice stands for (<= `SLICE_HOURS`).
    pub hours: u32,
}

/// Split `horizon_hours` into daily slices; the last one may be partial.
pub fn slices(now: DateTime<Utc>, horizon_hours: u32) -> DomainResult<Vec<TimeSlice>> {
    if horizon_hours == 0 {
        return Err(DomainError::validation("horizon must be at least 1 hour"));
    }
    let count = horizon_hours.div_ceil(SLICE_HOURS);
    Ok((1..=count)
        .map(|k| {
            let end = (k * SLICE_HOURS).min(horizon_hours);
            let start = (k - 1) * SLICE_HOURS;
            TimeSlice {
                target_time: now + Duration::hours(i64::from(end)),
                hours: end - start,
            }
        })
        .collect())
}

/// Predicted demand for one (blood type, region, time slice).
///
/// `alert_sent` is the only field that changes after creation, and only
/// from `false` to `true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandForecast {
    pub id: ForecastId,
    pub blood_type: BloodType,
    pub region: RegionId,
    pub generated_at: DateTime<Utc>,
    pub target_time: DateTime<Utc>,
    pub slice_hours: u32,
    /// Units per day, never negative.
    pub predicted_demand: f64,
    pub confidence: f64,
    pub shortage_risk: RiskLevel,
    /// Inventory baseline the risk was classified against.
    pub baseline_units: u32,
    pub model_version: u64,
    pub alert_sent: bool,
}

impl DemandForecast {
    /// Demand expected over this slice's share of the horizon.
    pub fn slice_demand(&self) -> f64 {
        self.predicted_demand * f64::from(self.slice_hours) / f64::from(SLICE_HOURS)
    }
}
