//! Historical demand records and the sources that provide them.

use std::sync::RwLock;

use chrono::{DateTime, Datelike, Duration, Utc, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use bloodline_core::{BloodType, RegionCatalog, RegionId};

use crate::season::Season;

/// Observed demand for one (blood type, region) at a point in time.
///
/// Immutable once written; derived calendar fields are computed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandRecord {
    blood_type: BloodType,
    region: RegionId,
    observed_at: DateTime<Utc>,
    demand_units: u32,
    day_of_week: u32,
    month: u32,
    season: Season,
    disease_outbreak: bool,
}

impl DemandRecord {
    pub fn new(
        blood_type: BloodType,
        region: RegionId,
        observed_at: DateTime<Utc>,
        demand_units: u32,
        disease_outbreak: bool,
    ) -> Self {
        let month = observed_at.month();
        Self {
            blood_type,
            region,
            observed_at,
            demand_units,
            day_of_week: observed_at.weekday().num_days_from_monday(),
            month,
            season: Season::from_month(month),
            disease_outbreak,
        }
    }

    pub fn blood_type(&self) -> BloodType {
        self.blood_type
    }

    pub fn region(&self) -> &RegionId {
        &self.region
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }

    pub fn demand_units(&self) -> u32 {
        self.demand_units
    }

    pub fn day_of_week(&self) -> u32 {
        self.day_of_week
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn season(&self) -> Season {
        self.season
    }

    pub fn disease_outbreak(&self) -> bool {
        self.disease_outbreak
    }
}

/// Read access to historical demand (ingestion happens elsewhere).
pub trait DemandHistory: Send + Sync {
    fn records(&self) -> Vec<DemandRecord>;
}

/// In-memory history for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryDemandHistory {
    inner: RwLock<Vec<DemandRecord>>,
}

impl InMemoryDemandHistory {
    pub fn new(records: Vec<DemandRecord>) -> Self {
        Self {
            inner: RwLock::new(records),
        }
    }

    /// Append-only ingestion.
    pub fn append(&self, records: impl IntoIterator<Item = DemandRecord>) {
        let mut guard = self.inner.write().unwrap_or_else(|p| p.into_inner());
        guard.extend(records);
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DemandHistory for InMemoryDemandHistory {
    fn records(&self) -> Vec<DemandRecord> {
        self.inner
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

/// Share of total demand per blood type (population distribution).
pub const BLOOD_TYPE_WEIGHTS: [(BloodType, f64); 8] = [
    (BloodType::OPos, 0.35),
    (BloodType::APos, 0.30),
    (BloodType::BPos, 0.20),
    (BloodType::AbPos, 0.05),
    (BloodType::ONeg, 0.05),
    (BloodType::ANeg, 0.03),
    (BloodType::BNeg, 0.015),
    (BloodType::AbNeg, 0.005),
];

/// Seeded generator of realistic demand history.
///
/// Patterns: seasonal multiplier, +/-20% regional and daily noise, a 10%
/// outbreak chance (x1.5 demand) during wet seasons, and a 10% weekend dip.
#[derive(Debug, Clone)]
pub struct SyntheticHistory {
    pub days: u32,
    pub seed: u64,
    pub base_units: f64,
    pub outbreak_probability: f64,
}

impl Default for SyntheticHistory {
    fn default() -> Self {
        Self {
            days: 365,
            seed: 42,
            base_units: 100.0,
            outbreak_probability: 0.1,
        }
    }
}

impl SyntheticHistory {
    pub fn with_days(mut self, days: u32) -> Self {
        self.days = days;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Generate `days` of history ending just before `until`.
    pub fn generate(&self, regions: &RegionCatalog, until: DateTime<Utc>) -> Vec<DemandRecord> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let start = until - Duration::days(i64::from(self.days));
        let mut out =
            Vec::with_capacity(self.days as usize * regions.len() * BLOOD_TYPE_WEIGHTS.len());

        for day in 0..self.days {
            let at = start + Duration::days(i64::from(day));
            let season = Season::from_month(at.month());
            let weekend = matches!(at.weekday(), Weekday::Sat | Weekday::Sun);

            for region in regions.regions() {
                let region_factor = rng.gen_range(0.8..1.2);

                for (blood_type, weight) in BLOOD_TYPE_WEIGHTS {
                    let mut demand = weight * self.base_units * season.multiplier() * region_factor;
                    demand *= rng.gen_range(0.8..1.2);

                    let outbreak = season.is_wet() && rng.gen_bool(self.outbreak_probability);
                    if outbreak {
                        demand *= 1.5;
                    }
                    if weekend {
                        demand *= 0.9;
                    }

                    out.push(DemandRecord::new(
                        blood_type,
                        region.clone(),
                        at,
                        demand.max(0.0) as u32,
                        outbreak,
                    ));
                }
            }
        }

        out
    }
}
