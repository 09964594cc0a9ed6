//! Forecast-driven redistribution planning.
//!
//! Stock is projected forward by subtracting each hospital's share of its
//! region's forecast demand over the horizon, then the regular matcher runs
//! on the projected positions. Only (blood type, region) pairs whose latest
//! forecast reaches the threshold risk can produce shortages.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use bloodline_core::{BloodType, HospitalId, RegionId, RiskLevel};
use bloodline_forecast::DemandForecast;
use bloodline_inventory::{Hospital, InventoryLevel};

use crate::matcher::{RedistributionOpportunity, Site, match_sites, sort_by_priority};

pub const NO_FORECASTS_MESSAGE: &str = "No forecasts available. Generate forecasts first.";

/// Aggregated forecast for one (blood type, region) batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionDemand {
    pub blood_type: BloodType,
    pub region: RegionId,
    pub max_risk: RiskLevel,
    /// Units expected over the whole horizon.
    pub horizon_demand: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPlan {
    pub plan: Vec<RedistributionOpportunity>,
    pub total_actions: usize,
    pub threshold_risk: RiskLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ForecastPlan {
    fn new(plan: Vec<RedistributionOpportunity>, threshold_risk: RiskLevel) -> Self {
        Self {
            total_actions: plan.len(),
            plan,
            threshold_risk,
            message: None,
        }
    }
}

/// Group forecasts per (blood type, region), ordered by blood type then region.
pub fn region_demand(forecasts: &[DemandForecast]) -> Vec<RegionDemand> {
    let mut grouped: BTreeMap<(BloodType, &RegionId), RegionDemand> = BTreeMap::new();
    for f in forecasts {
        grouped
            .entry((f.blood_type, &f.region))
            .and_modify(|d| {
                d.max_risk = d.max_risk.max(f.shortage_risk);
                d.horizon_demand += f.slice_demand();
            })
            .or_insert_with(|| RegionDemand {
                blood_type: f.blood_type,
                region: f.region.clone(),
                max_risk: f.shortage_risk,
                horizon_demand: f.slice_demand(),
            });
    }
    grouped.into_values().collect()
}

/// Build the plan from a stock snapshot and the latest forecast batch.
pub fn build_plan(
    levels: &[InventoryLevel],
    hospitals: &[Hospital],
    forecasts: &[DemandForecast],
    threshold: RiskLevel,
) -> ForecastPlan {
    if forecasts.is_empty() {
        return ForecastPlan {
            message: Some(NO_FORECASTS_MESSAGE.to_string()),
            ..ForecastPlan::new(Vec::new(), threshold)
        };
    }

    let directory: HashMap<HospitalId, &Hospital> = hospitals.iter().map(|h| (h.id, h)).collect();
    let demand = region_demand(forecasts);

    let mut at_risk: BTreeMap<BloodType, BTreeSet<&RegionId>> = BTreeMap::new();
    for d in demand.iter().filter(|d| d.max_risk.at_least(threshold)) {
        at_risk.entry(d.blood_type).or_default().insert(&d.region);
    }

    let mut plan = Vec::new();

    for (blood_type, regions) in &at_risk {
        let rows: Vec<&InventoryLevel> = levels.iter().filter(|l| l.blood_type == *blood_type).collect();
        let demand_for: HashMap<&RegionId, f64> = demand
            .iter()
            .filter(|d| d.blood_type == *blood_type)
            .map(|d| (&d.region, d.horizon_demand))
            .collect();

        let mut shortages = Vec::new();
        let mut surpluses = Vec::new();

        for &level in &rows {
            let region = region_of(&directory, level.hospital_id);
            let projected = match region.and_then(|r| demand_for.get(r).map(|d| (r, *d))) {
                Some((r, region_total)) => {
                    let peers: Vec<&InventoryLevel> = rows
                        .iter()
                        .copied()
                        .filter(|p| region_of(&directory, p.hospital_id) == Some(r))
                        .collect();
                    f64::from(level.current_units) - region_total * share(level, &peers)
                }
                None => f64::from(level.current_units),
            };

            let min = f64::from(level.min_required);
            let in_risk_region = region.is_some_and(|r| regions.contains(r));

            if in_risk_region && projected < min {
                shortages.push(Site {
                    hospital_id: level.hospital_id,
                    name: name_of(&directory, level.hospital_id),
                    units: (min - projected).ceil() as u32,
                });
            } else {
                let surplus = projected.floor() - min;
                if surplus >= 1.0 {
                    surpluses.push(Site {
                        hospital_id: level.hospital_id,
                        name: name_of(&directory, level.hospital_id),
                        units: surplus as u32,
                    });
                }
            }
        }

        let tagged: Vec<String> = regions.iter().map(|r| r.as_str().to_string()).collect();
        plan.extend(match_sites(*blood_type, shortages, surpluses).into_iter().map(|mut o| {
            o.forecast_based = true;
            o.predicted_shortage_regions = tagged.clone();
            o
        }));
    }

    sort_by_priority(&mut plan);
    ForecastPlan::new(plan, threshold)
}

fn region_of<'a>(directory: &HashMap<HospitalId, &'a Hospital>, id: HospitalId) -> Option<&'a RegionId> {
    directory.get(&id).map(|h| &h.region)
}

fn name_of(directory: &HashMap<HospitalId, &Hospital>, id: HospitalId) -> String {
    directory
        .get(&id)
        .map(|h| h.name.clone())
        .unwrap_or_else(|| format!("Hospital {id}"))
}

/// Fraction of regional demand a hospital absorbs, proportional to its
/// `min_required` (even split when every peer's minimum is zero).
fn share(level: &InventoryLevel, peers: &[&InventoryLevel]) -> f64 {
    let total: u32 = peers.iter().map(|p| p.min_required).sum();
    if total == 0 {
        1.0 / peers.len().max(1) as f64
    } else {
        f64::from(level.min_required) / f64::from(total)
    }
}
