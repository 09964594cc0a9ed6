//! Shortage risk classification from days of supply.

use bloodline_core::RiskLevel;

/// Floor for predicted daily demand so the classifier is total.
pub const DEMAND_EPSILON: f64 = 1e-6;

/// Upper bounds (exclusive, in days of supply) for each risk level.
/// Anything at or above the last bound is `Low`.
pub const RISK_BREAKPOINTS: [(f64, RiskLevel); 3] = [
    (1.0, RiskLevel::Critical),
    (2.0, RiskLevel::High),
    (3.0, RiskLevel::Medium),
];

/// `current_units / max(predicted_per_day, epsilon)`.
pub fn days_of_supply(predicted_per_day: f64, current_units: u32) -> f64 {
    let demand = if predicted_per_day.is_finite() {
        predicted_per_day.max(DEMAND_EPSILON)
    } else {
        DEMAND_EPSILON
    };
    f64::from(current_units) / demand
}

pub fn classify_days(days: f64) -> RiskLevel {
    RISK_BREAKPOINTS
        .iter()
        .find(|(bound, _)| days < *bound)
        .map(|(_, level)| *level)
        .unwrap_or(RiskLevel::Low)
}

/// Risk for a predicted daily demand against an inventory baseline.
pub fn classify(predicted_per_day: f64, current_units: u32) -> RiskLevel {
    classify_days(days_of_supply(predicted_per_day, current_units))
}
