use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use bloodline_core::{BloodType, DomainError, DomainResult, HospitalId, RiskLevel};
use bloodline_forecast::DemandForecast;
use bloodline_inventory::{HospitalDirectory, InventoryLedger, InventoryLevel, LevelBounds};

use crate::matcher::{RedistributionOpportunity, Site, match_sites, sort_by_priority};
use crate::plan::{ForecastPlan, build_plan};
use crate::summary::RedistributionSummary;

/// Result of a committed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReceipt {
    pub from_hospital_id: HospitalId,
    pub to_hospital_id: HospitalId,
    pub blood_type: BloodType,
    pub units_transferred: u32,
    pub source_remaining: u32,
    pub dest_new_level: u32,
}

/// Redistribution entry points over a shared ledger and hospital directory.
pub struct Redistributor {
    ledger: Arc<InventoryLedger>,
    hospitals: Arc<dyn HospitalDirectory>,
    bounds: LevelBounds,
}

impl Redistributor {
    pub fn new(
        ledger: Arc<InventoryLedger>,
        hospitals: Arc<dyn HospitalDirectory>,
        bounds: LevelBounds,
    ) -> Self {
        Self {
            ledger,
            hospitals,
            bounds,
        }
    }

    fn name_of(&self, id: HospitalId) -> String {
        self.hospitals
            .get(id)
            .map(|h| h.name)
            .unwrap_or_else(|| format!("Hospital {id}"))
    }

    fn site(&self, level: &InventoryLevel, units: u32) -> Site {
        Site {
            hospital_id: level.hospital_id,
            name: self.name_of(level.hospital_id),
            units,
        }
    }

    /// Proposals from the current stock snapshot, most urgent first.
    pub fn find_opportunities(&self, blood_type: Option<BloodType>) -> Vec<RedistributionOpportunity> {
        let mut by_type: BTreeMap<BloodType, (Vec<Site>, Vec<Site>)> = BTreeMap::new();
        for level in self.ledger.list(blood_type, None) {
            let (shortages, surpluses) = by_type.entry(level.blood_type).or_default();
            if level.deficit() > 0 {
                shortages.push(self.site(&level, level.deficit()));
            } else if level.surplus() > 0 {
                surpluses.push(self.site(&level, level.surplus()));
            }
        }

        let mut out: Vec<RedistributionOpportunity> = by_type
            .into_iter()
            .flat_map(|(bt, (shortages, surpluses))| match_sites(bt, shortages, surpluses))
            .collect();
        sort_by_priority(&mut out);
        out
    }

    /// Plan against the latest forecast batch (see [`build_plan`]).
    pub fn forecast_based_plan(&self, latest: &[DemandForecast], threshold: RiskLevel) -> ForecastPlan {
        let plan = build_plan(&self.ledger.list(None, None), &self.hospitals.list(), latest, threshold);
        info!(actions = plan.total_actions, threshold = %threshold, "forecast-based plan computed");
        plan
    }

    /// Execute one transfer against live stock.
    ///
    /// A known destination without a row for `blood_type` gets one with the
    /// configured bounds, but only if the transfer commits.
    pub fn execute(
        &self,
        from: HospitalId,
        to: HospitalId,
        blood_type: BloodType,
        units: u32,
        now: DateTime<Utc>,
    ) -> DomainResult<TransferReceipt> {
        if units == 0 {
            return Err(DomainError::validation("units must be positive"));
        }
        if from == to {
            return Err(DomainError::validation("source and destination must differ"));
        }
        for id in [from, to] {
            if self.hospitals.get(id).is_none() {
                return Err(DomainError::not_found(format!("hospital {id}")));
            }
        }

        let outcome = self
            .ledger
            .transfer_into(from, to, blood_type, units, self.bounds, now)?;

        Ok(TransferReceipt {
            from_hospital_id: from,
            to_hospital_id: to,
            blood_type,
            units_transferred: units,
            source_remaining: outcome.source.current_units,
            dest_new_level: outcome.destination.current_units,
        })
    }

    pub fn summary(&self) -> RedistributionSummary {
        RedistributionSummary::from_levels(&self.ledger.list(None, None))
    }
}
