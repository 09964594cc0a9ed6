//! Service wiring: one `AppServices` per process, shared by every handler.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use bloodline_alerts::{
    Alert, AlertDispatcher, AlertTarget, DonorDirectory, InMemoryDonorDirectory, NotificationSink, TracingNotificationSink,
};
use bloodline_core::{BloodType, DomainError, DomainResult, ForecastId, HospitalId, RegionId, RiskLevel};
use bloodline_forecast::{
    DemandForecast, DemandHistory, ForecastQuery, ForecastStore, ForecastSummary, Forecaster, GenerateRequest,
    InMemoryDemandHistory, InMemoryForecastStore, SyntheticHistory, TrainOutcome,
};
use bloodline_inventory::{HospitalDirectory, InMemoryHospitalDirectory, InventoryLedger, InventoryLevel};
use bloodline_redistribution::{
    ForecastPlan, RedistributionOpportunity, RedistributionSummary, Redistributor, TransferReceipt,
};

use crate::app::dto::{
    ExecuteTransferRequest, GenerateForecastRequest, ListForecastsQuery, MAX_HOURS_AHEAD, MIN_HOURS_AHEAD,
    SendAlertsRequest, UpdateInventoryRequest,
};
use crate::app::errors::{ApiError, parse_opt};
use crate::config::AppConfig;

pub struct AppServices {
    config: AppConfig,
    forecaster: Arc<Forecaster>,
    history: Arc<dyn DemandHistory>,
    forecasts: Arc<InMemoryForecastStore>,
    ledger: Arc<InventoryLedger>,
    hospitals: Arc<InMemoryHospitalDirectory>,
    donors: Arc<InMemoryDonorDirectory>,
    redistributor: Redistributor,
    dispatcher: AlertDispatcher,
}

impl AppServices {
    /// Wire in-memory stores with a log-only notification sink.
    pub fn build(config: AppConfig) -> DomainResult<Self> {
        Self::with_sink(config, Arc::new(TracingNotificationSink))
    }

    pub fn with_sink(config: AppConfig, sink: Arc<dyn NotificationSink>) -> DomainResult<Self> {
        let forecaster = Arc::new(Forecaster::new(config.forecaster()?));

        let records = SyntheticHistory::default()
            .with_days(config.history_days)
            .with_seed(config.seed)
            .generate(forecaster.regions(), Utc::now());
        info!(records = records.len(), days = config.history_days, "synthetic demand history generated");
        let history: Arc<dyn DemandHistory> = Arc::new(InMemoryDemandHistory::new(records));

        let forecasts = Arc::new(InMemoryForecastStore::new());
        let ledger = Arc::new(InventoryLedger::new());
        let hospitals = Arc::new(InMemoryHospitalDirectory::new());
        let donors = Arc::new(InMemoryDonorDirectory::new());

        let redistributor = Redistributor::new(
            Arc::clone(&ledger),
            Arc::clone(&hospitals) as Arc<dyn HospitalDirectory>,
            config.level_bounds(),
        );
        let dispatcher = AlertDispatcher::new(
            Arc::clone(&forecasts) as Arc<dyn ForecastStore>,
            Arc::clone(&donors) as Arc<dyn DonorDirectory>,
            sink,
            config.dispatcher(),
        );

        Ok(Self {
            config,
            forecaster,
            history,
            forecasts,
            ledger,
            hospitals,
            donors,
            redistributor,
            dispatcher,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn forecaster(&self) -> &Forecaster {
        &self.forecaster
    }

    pub fn ledger(&self) -> &InventoryLedger {
        &self.ledger
    }

    pub fn hospitals(&self) -> &InMemoryHospitalDirectory {
        &self.hospitals
    }

    pub fn donors(&self) -> &InMemoryDonorDirectory {
        &self.donors
    }

    // -------------------------
    // Forecasting
    // -------------------------

    /// Train on the blocking pool so the async runtime keeps serving.
    pub async fn train(&self, force_retrain: bool) -> Result<TrainOutcome, ApiError> {
        let forecaster = Arc::clone(&self.forecaster);
        let history = Arc::clone(&self.history);
        tokio::task::spawn_blocking(move || forecaster.train(&history.records(), force_retrain, Utc::now()))
            .await
            .map_err(|e| ApiError::Internal(format!("training task failed: {e}")))?
            .map_err(ApiError::from)
    }

    pub async fn generate(&self, req: GenerateForecastRequest) -> Result<Vec<DemandForecast>, ApiError> {
        if !(MIN_HOURS_AHEAD..=MAX_HOURS_AHEAD).contains(&req.hours_ahead) {
            return Err(DomainError::validation(format!(
                "hours_ahead must be between {MIN_HOURS_AHEAD} and {MAX_HOURS_AHEAD}"
            ))
            .into());
        }

        let catalog = self.forecaster.regions();
        let regions = req
            .regions
            .as_deref()
            .map(|names| names.iter().map(|n| catalog.resolve(n)).collect::<DomainResult<Vec<_>>>())
            .transpose()?;
        let outbreak_regions = req
            .outbreak_regions
            .iter()
            .map(|n| catalog.resolve(n))
            .collect::<DomainResult<Vec<_>>>()?;

        if req.retrain {
            self.train(true).await?;
        }

        let mut request = GenerateRequest::new(Utc::now(), req.hours_ahead).with_outbreak_regions(outbreak_regions);
        if let Some(regions) = regions {
            request = request.with_regions(regions);
        }

        let baseline = self.regional_stock();
        let forecasts = self.forecaster.generate(&request, |bt, region| baseline.units(bt, region))?;
        self.forecasts.insert_many(forecasts.clone());
        Ok(forecasts)
    }

    pub fn list_forecasts(&self, query: &ListForecastsQuery) -> Result<Vec<DemandForecast>, ApiError> {
        let region = match query.region.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(name) => Some(self.forecaster.regions().resolve(name)?),
            None => None,
        };
        let mut q = ForecastQuery {
            blood_type: parse_opt(query.blood_type.as_deref())?,
            region,
            min_risk: parse_opt(query.min_risk.as_deref())?,
            ..ForecastQuery::default()
        };
        if let Some(limit) = query.limit {
            q.limit = limit;
        }
        Ok(self.forecasts.list(&q))
    }

    pub fn forecast_summary(&self, hours_back: u32) -> ForecastSummary {
        // Windows reaching past the earliest representable instant cover everything.
        let cutoff = Utc::now()
            .checked_sub_signed(Duration::hours(i64::from(hours_back)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        ForecastSummary::from_forecasts(hours_back, &self.forecasts.since(cutoff))
    }

    pub async fn send_alerts(&self, req: &SendAlertsRequest) -> Result<Vec<Alert>, ApiError> {
        let target = match parse_opt::<ForecastId>(req.forecast_id.as_deref())? {
            Some(id) => AlertTarget::Forecast(id),
            None => AlertTarget::MinRisk(
                parse_opt::<RiskLevel>(req.min_risk_level.as_deref())?.unwrap_or(RiskLevel::High),
            ),
        };
        Ok(self.dispatcher.send_alerts(target, Utc::now()).await?)
    }

    // -------------------------
    // Inventory
    // -------------------------

    pub fn inventory(&self, blood_type: Option<BloodType>, hospital: Option<HospitalId>) -> Vec<InventoryLevel> {
        self.ledger.list(blood_type, hospital)
    }

    pub fn update_inventory(&self, req: &UpdateInventoryRequest) -> Result<InventoryLevel, ApiError> {
        let hospital = HospitalId::new(req.hospital_id);
        let blood_type: BloodType = req.blood_type.parse()?;
        if self.hospitals.get(hospital).is_none() {
            return Err(DomainError::not_found(format!("hospital {hospital}")).into());
        }
        Ok(self.ledger.set_current(
            hospital,
            blood_type,
            req.current_units,
            self.config.level_bounds(),
            Utc::now(),
        )?)
    }

    // -------------------------
    // Redistribution
    // -------------------------

    pub fn opportunities(&self, blood_type: Option<BloodType>) -> Vec<RedistributionOpportunity> {
        self.redistributor.find_opportunities(blood_type)
    }

    pub fn execute_transfer(&self, req: &ExecuteTransferRequest) -> Result<TransferReceipt, ApiError> {
        let blood_type: BloodType = req.blood_type.parse()?;
        Ok(self.redistributor.execute(
            HospitalId::new(req.from_hospital_id),
            HospitalId::new(req.to_hospital_id),
            blood_type,
            req.units,
            Utc::now(),
        )?)
    }

    pub fn forecast_plan(&self, threshold: RiskLevel) -> ForecastPlan {
        self.redistributor
            .forecast_based_plan(&self.forecasts.latest_batch(), threshold)
    }

    pub fn redistribution_summary(&self) -> RedistributionSummary {
        self.redistributor.summary()
    }

    /// Current stock per (blood type, region), used as the risk baseline.
    fn regional_stock(&self) -> RegionalStock {
        let mut units: HashMap<(BloodType, RegionId), u32> = HashMap::new();
        let mut tracked: HashSet<RegionId> = HashSet::new();
        for level in self.ledger.list(None, None) {
            let Some(hospital) = self.hospitals.get(level.hospital_id) else {
                continue;
            };
            let slot = units.entry((level.blood_type, hospital.region.clone())).or_default();
            *slot = slot.saturating_add(level.current_units);
            tracked.insert(hospital.region);
        }
        RegionalStock {
            units,
            tracked,
            fallback: self.config.default_regional_stock,
        }
    }
}

struct RegionalStock {
    units: HashMap<(BloodType, RegionId), u32>,
    tracked: HashSet<RegionId>,
    fallback: u32,
}

impl RegionalStock {
    /// Regions without any tracked hospital fall back to the configured stock.
    fn units(&self, blood_type: BloodType, region: &RegionId) -> u32 {
        if !self.tracked.contains(region) {
            return self.fallback;
        }
        self.units
            .get(&(blood_type, region.clone()))
            .copied()
            .unwrap_or(0)
    }
}
