//! Forecast persistence port plus an in-memory implementation.

use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;

use bloodline_core::{BloodType, DomainError, DomainResult, ForecastId, RegionId, RiskLevel};

use crate::forecast::DemandForecast;

pub const DEFAULT_LIST_LIMIT: usize = 50;

/// Filters for listing forecasts.
#[derive(Debug, Clone)]
pub struct ForecastQuery {
    pub blood_type: Option<BloodType>,
    pub region: Option<RegionId>,
    pub min_risk: Option<RiskLevel>,
    pub limit: usize,
}

impl Default for ForecastQuery {
    fn default() -> Self {
        Self {
            blood_type: None,
            region: None,
            min_risk: None,
            limit: DEFAULT_LIST_LIMIT,
        }
    }
}

impl ForecastQuery {
    fn matches(&self, f: &DemandForecast) -> bool {
        self.blood_type.is_none_or(|bt| f.blood_type == bt)
            && self.region.as_ref().is_none_or(|r| &f.region == r)
            && self.min_risk.is_none_or(|min| f.shortage_risk.at_least(min))
    }
}

pub trait ForecastStore: Send + Sync {
    fn insert_many(&self, forecasts: Vec<DemandForecast>);

    fn get(&self, id: ForecastId) -> Option<DemandForecast>;

    /// Newest first, truncated to `query.limit`.
    fn list(&self, query: &ForecastQuery) -> Vec<DemandForecast>;

    /// Flip `alert_sent` to `true`.
    ///
    /// Returns `Ok(true)` for the one caller that performed the transition,
    /// `Ok(false)` if it was already set, `NotFound` for unknown ids.
    fn mark_alerted(&self, id: ForecastId) -> DomainResult<bool>;

    /// Forecasts generated at or after `cutoff`.
    fn since(&self, cutoff: DateTime<Utc>) -> Vec<DemandForecast>;

    /// The most recent generation batch for every (blood type, region).
    fn latest_batch(&self) -> Vec<DemandForecast>;

    /// Unalerted forecasts for future slices at or above `min_risk`.
    fn pending_alerts(&self, min_risk: RiskLevel, now: DateTime<Utc>) -> Vec<DemandForecast>;
}

#[derive(Debug, Default)]
pub struct InMemoryForecastStore {
    inner: RwLock<HashMap<ForecastId, DemandForecast>>,
}

impl InMemoryForecastStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn collect<P>(&self, pred: P) -> Vec<DemandForecast>
    where
        P: Fn(&DemandForecast) -> bool,
    {
        let guard = self.inner.read().unwrap_or_else(|p| p.into_inner());
        let mut out: Vec<DemandForecast> = guard.values().filter(|f| pred(f)).cloned().collect();
        sort_newest_first(&mut out);
        out
    }
}

fn sort_newest_first(forecasts: &mut [DemandForecast]) {
    forecasts.sort_by(|a, b| {
        b.generated_at
            .cmp(&a.generated_at)
            .then(a.target_time.cmp(&b.target_time))
            .then(a.region.cmp(&b.region))
            .then(a.blood_type.cmp(&b.blood_type))
    });
}

impl ForecastStore for InMemoryForecastStore {
    fn insert_many(&self, forecasts: Vec<DemandForecast>) {
        let mut guard = self.inner.write().unwrap_or_else(|p| p.into_inner());
        for f in forecasts {
            guard.insert(f.id, f);
        }
    }

    fn get(&self, id: ForecastId) -> Option<DemandForecast> {
        self.inner
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(&id)
            .cloned()
    }

    fn list(&self, query: &ForecastQuery) -> Vec<DemandForecast> {
        let mut out = self.collect(|f| query.matches(f));
        out.truncate(query.limit);
        out
    }

    fn mark_alerted(&self, id: ForecastId) -> DomainResult<bool> {
        let mut guard = self.inner.write().unwrap_or_else(|p| p.into_inner());
        let forecast = guard
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found(format!("forecast {id}")))?;
        if forecast.alert_sent {
            return Ok(false);
        }
        forecast.alert_sent = true;
        Ok(true)
    }

    fn since(&self, cutoff: DateTime<Utc>) -> Vec<DemandForecast> {
        self.collect(|f| f.generated_at >= cutoff)
    }

    fn latest_batch(&self) -> Vec<DemandForecast> {
        let guard = self.inner.read().unwrap_or_else(|p| p.into_inner());

        let mut newest: HashMap<(BloodType, &RegionId), DateTime<Utc>> = HashMap::new();
        for f in guard.values() {
            newest
                .entry((f.blood_type, &f.region))
                .and_modify(|at| *at = (*at).max(f.generated_at))
                .or_insert(f.generated_at);
        }

        let mut out: Vec<DemandForecast> = guard
            .values()
            .filter(|f| newest.get(&(f.blood_type, &f.region)) == Some(&f.generated_at))
            .cloned()
            .collect();
        sort_newest_first(&mut out);
        out
    }

    fn pending_alerts(&self, min_risk: RiskLevel, now: DateTime<Utc>) -> Vec<DemandForecast> {
        self.collect(|f| !f.alert_sent && f.target_time > now && f.shortage_risk.at_least(min_risk))
    }
}

/// Risk counts over a window of recent forecasts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastSummary {
    pub period_hours: u32,
    pub total_forecasts: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub blood_types_covered: Vec<String>,
    pub regions_covered: Vec<String>,
}

impl ForecastSummary {
    pub fn from_forecasts(period_hours: u32, forecasts: &[DemandForecast]) -> Self {
        let count = |level: RiskLevel| forecasts.iter().filter(|f| f.shortage_risk == level).count();
        let blood_types: BTreeSet<&str> = forecasts.iter().map(|f| f.blood_type.as_str()).collect();
        let regions: BTreeSet<&str> = forecasts.iter().map(|f| f.region.as_str()).collect();

        Self {
            period_hours,
            total_forecasts: forecasts.len(),
            critical: count(RiskLevel::Critical),
            high: count(RiskLevel::High),
            medium: count(RiskLevel::Medium),
            low: count(RiskLevel::Low),
            blood_types_covered: blood_types.into_iter().map(str::to_owned).collect(),
            regions_covered: regions.into_iter().map(str::to_owned).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(h: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap() + Duration::hours(h)
    }

    fn forecast(bt: BloodType, region: &str, generated: i64, target: i64, risk: RiskLevel) -> DemandForecast {
        DemandForecast {
            id: ForecastId::new(),
            blood_type: bt,
            region: RegionId::new(region).unwrap(),
            generated_at: at(generated),
            target_time: at(target),
            slice_hours: 24,
            predicted_demand: 12.0,
            confidence: 0.8,
            shortage_risk: risk,
            baseline_units: 20,
            model_version: 1,
            alert_sent: false,
        }
    }

    #[test]
    fn len_recovers_from_poisoned_lock() {
        let store = std::sync::Arc::new(InMemoryForecastStore::new());
        store.insert_many(vec![forecast(BloodType::ONeg, "Noida", 0, 24, RiskLevel::High)]);
        let poisoner = std::sync::Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.inner.write().unwrap();
            panic!("writer died mid-update");
        })
        .join();

        assert!(store.inner.is_poisoned());
        assert_eq!(store.len(), 1);
        assert!(!store.is_empty());
    }

    #[test]
    fn list_filters_and_orders_newest_first() {
        let store = InMemoryForecastStore::new();
        store.insert_many(vec![
            forecast(BloodType::OPos, "Noida", 0, 24, RiskLevel::Low),
            forecast(BloodType::OPos, "Noida", 5, 29, RiskLevel::Critical),
            forecast(BloodType::ANeg, "Dwarka", 3, 27, RiskLevel::High),
        ]);

        let all = store.list(&ForecastQuery::default());
        let generated: Vec<_> = all.iter().map(|f| f.generated_at).collect();
        assert_eq!(generated, vec![at(5), at(3), at(0)]);

        let noida = store.list(&ForecastQuery {
            region: Some(RegionId::new("Noida").unwrap()),
            ..Default::default()
        });
        assert_eq!(noida.len(), 2);

        let risky = store.list(&ForecastQuery {
            min_risk: Some(RiskLevel::High),
            limit: 1,
            ..Default::default()
        });
        assert_eq!(risky.len(), 1);
        assert_eq!(risky[0].shortage_risk, RiskLevel::Critical);
    }

    #[test]
    fn mark_alerted_transitions_once() {
        let store = InMemoryForecastStore::new();
        let f = forecast(BloodType::BPos, "Noida", 0, 24, RiskLevel::High);
        let id = f.id;
        store.insert_many(vec![f]);

        assert!(store.mark_alerted(id).unwrap());
        assert!(!store.mark_alerted(id).unwrap());
        assert!(store.get(id).unwrap().alert_sent);
        assert!(matches!(
            store.mark_alerted(ForecastId::new()),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn latest_batch_keeps_only_newest_generation_per_pair() {
        let store = InMemoryForecastStore::new();
        store.insert_many(vec![
            forecast(BloodType::OPos, "Noida", 0, 24, RiskLevel::Low),
            forecast(BloodType::OPos, "Noida", 10, 34, RiskLevel::High),
            forecast(BloodType::OPos, "Noida", 10, 58, RiskLevel::Medium),
            forecast(BloodType::OPos, "Dwarka", 2, 26, RiskLevel::Low),
        ]);

        let latest = store.latest_batch();
        assert_eq!(latest.len(), 3);
        assert!(latest
            .iter()
            .filter(|f| f.region.as_str() == "Noida")
            .all(|f| f.generated_at == at(10)));
    }

    #[test]
    fn pending_alerts_skip_past_and_alerted() {
        let store = InMemoryForecastStore::new();
        let past = forecast(BloodType::OPos, "Noida", 0, 1, RiskLevel::Critical);
        let alerted = forecast(BloodType::OPos, "Noida", 0, 48, RiskLevel::Critical);
        let low = forecast(BloodType::OPos, "Noida", 0, 48, RiskLevel::Low);
        let due = forecast(BloodType::ONeg, "Noida", 0, 48, RiskLevel::High);
        let (alerted_id, due_id) = (alerted.id, due.id);
        store.insert_many(vec![past, alerted, low, due]);
        store.mark_alerted(alerted_id).unwrap();

        let pending = store.pending_alerts(RiskLevel::High, at(2));
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, due_id);
    }

    #[test]
    fn summary_counts_and_sorts_coverage() {
        let forecasts = vec![
            forecast(BloodType::OPos, "Noida", 0, 24, RiskLevel::Critical),
            forecast(BloodType::ANeg, "Dwarka", 0, 24, RiskLevel::Critical),
            forecast(BloodType::OPos, "Dwarka", 0, 24, RiskLevel::Low),
        ];
        let s = ForecastSummary::from_forecasts(24, &forecasts);
        assert_eq!(s.total_forecasts, 3);
        assert_eq!((s.critical, s.high, s.medium, s.low), (2, 0, 0, 1));
        assert_eq!(s.blood_types_covered, vec!["A-", "O+"]);
        assert_eq!(s.regions_covered, vec!["Dwarka", "Noida"]);
    }
}
