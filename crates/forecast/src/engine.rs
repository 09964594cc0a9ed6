//! Forecasting engine: owns the active model, trains and predicts.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use bloodline_core::{BloodType, DomainError, DomainResult, ForecastId, RegionCatalog, RegionId};

use crate::features::{FEATURE_SCHEMA_VERSION, FeatureEncoder, FeatureInput, FeatureVector};
use crate::forecast::{DemandForecast, slices};
use crate::forest::{EnsemblePrediction, ForestParams, RandomForest};
use crate::history::DemandRecord;
use crate::model::{ForecastModel, ModelMetadata};
use crate::risk;

/// Confidence reported when the point prediction is not positive.
const FALLBACK_CONFIDENCE: f64 = 0.7;
pub const MIN_CONFIDENCE: f64 = 0.5;
pub const MAX_CONFIDENCE: f64 = 0.95;

#[derive(Debug, Clone)]
pub struct ForecasterConfig {
    pub regions: RegionCatalog,
    pub min_training_records: usize,
    pub forest: ForestParams,
}

impl Default for ForecasterConfig {
    fn default() -> Self {
        Self {
            regions: RegionCatalog::default(),
            min_training_records: 100,
            forest: ForestParams::default(),
        }
    }
}

impl ForecasterConfig {
    pub fn with_regions(mut self, regions: RegionCatalog) -> Self {
        self.regions = regions;
        self
    }

    pub fn with_min_training_records(mut self, min: usize) -> Self {
        self.min_training_records = min;
        self
    }

    pub fn with_forest(mut self, forest: ForestParams) -> Self {
        self.forest = forest;
        self
    }
}

/// Result of a `train` call.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainOutcome {
    /// `false` when an existing model was kept (no `force_retrain`).
    pub trained: bool,
    pub metadata: ModelMetadata,
}

/// Point prediction for one slice of the horizon.
#[derive(Debug, Clone, PartialEq)]
pub struct SlicePrediction {
    pub target_time: DateTime<Utc>,
    pub slice_hours: u32,
    pub predicted_demand: f64,
    pub confidence: f64,
}

/// Parameters for a forecast generation run.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub now: DateTime<Utc>,
    pub horizon_hours: u32,
    /// `None` = all canonical blood types.
    pub blood_types: Option<Vec<BloodType>>,
    /// `None` = all known regions.
    pub regions: Option<Vec<RegionId>>,
    /// Regions currently reporting a disease outbreak.
    pub outbreak_regions: Vec<RegionId>,
}

impl GenerateRequest {
    pub fn new(now: DateTime<Utc>, horizon_hours: u32) -> Self {
        Self {
            now,
            horizon_hours,
            blood_types: None,
            regions: None,
            outbreak_regions: Vec::new(),
        }
    }

    pub fn with_regions(mut self, regions: Vec<RegionId>) -> Self {
        self.regions = Some(regions);
        self
    }

    pub fn with_blood_types(mut self, blood_types: Vec<BloodType>) -> Self {
        self.blood_types = Some(blood_types);
        self
    }

    pub fn with_outbreak_regions(mut self, regions: Vec<RegionId>) -> Self {
        self.outbreak_regions = regions;
        self
    }
}

/// Forecasting engine.
///
/// - At most one training run at a time; concurrent calls fail fast with
///   `TrainingInProgress`.
/// - The active model sits behind a single reference that is swapped whole.
///   Every predict/generate call dereferences it exactly once.
#[derive(Debug)]
pub struct Forecaster {
    config: ForecasterConfig,
    active: RwLock<Option<Arc<ForecastModel>>>,
    training: AtomicBool,
    versions: AtomicU64,
}

/// Clears the training flag when a run ends, including on error.
struct TrainingGuard<'a>(&'a AtomicBool);

impl Drop for TrainingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Forecaster {
    pub fn new(config: ForecasterConfig) -> Self {
        Self {
            config,
            active: RwLock::new(None),
            training: AtomicBool::new(false),
            versions: AtomicU64::new(0),
        }
    }

    pub fn regions(&self) -> &RegionCatalog {
        &self.config.regions
    }

    pub fn is_trained(&self) -> bool {
        self.active_model().is_some()
    }

    pub fn is_training(&self) -> bool {
        self.training.load(Ordering::Acquire)
    }

    /// Snapshot of the current model (cheap `Arc` clone).
    pub fn active_model(&self) -> Option<Arc<ForecastModel>> {
        self.active
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn train(
        &self,
        records: &[DemandRecord],
        force_retrain: bool,
        now: DateTime<Utc>,
    ) -> DomainResult<TrainOutcome> {
        if self
            .training
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("training request rejected: another run is in progress");
            return Err(DomainError::TrainingInProgress);
        }
        let _guard = TrainingGuard(&self.training);

        if !force_retrain {
            if let Some(model) = self.active_model() {
                debug!(version = model.metadata().version, "keeping existing forecast model");
                return Ok(TrainOutcome {
                    trained: false,
                    metadata: model.metadata().clone(),
                });
            }
        }

        if records.len() < self.config.min_training_records {
            return Err(DomainError::InsufficientData {
                available: records.len(),
                required: self.config.min_training_records,
            });
        }

        let started = Instant::now();
        info!(records = records.len(), "training forecast model");

        let encoder = FeatureEncoder::new(self.config.regions.clone());
        let mut xs: Vec<FeatureVector> = Vec::with_capacity(records.len());
        let mut ys: Vec<f64> = Vec::with_capacity(records.len());
        for record in records {
            xs.push(encoder.encode(&FeatureInput {
                blood_type: record.blood_type(),
                region: record.region(),
                at: record.observed_at(),
                outbreak: record.disease_outbreak(),
            })?);
            ys.push(f64::from(record.demand_units()));
        }

        let forest = RandomForest::fit(&xs, &ys, &self.config.forest)?;
        let metadata = ModelMetadata {
            version: self.versions.fetch_add(1, Ordering::AcqRel) + 1,
            sample_count: records.len(),
            trained_at: now,
            feature_schema_version: FEATURE_SCHEMA_VERSION,
            n_trees: forest.n_trees(),
        };
        let model = Arc::new(ForecastModel::new(encoder, forest, metadata.clone()));

        *self.active.write().unwrap_or_else(|p| p.into_inner()) = Some(model);

        info!(
            version = metadata.version,
            sample_count = metadata.sample_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "forecast model trained"
        );

        Ok(TrainOutcome {
            trained: true,
            metadata,
        })
    }

    /// Predict one (blood type, region) over every slice of the horizon.
    pub fn predict(
        &self,
        blood_type: BloodType,
        region: &RegionId,
        horizon_hours: u32,
        now: DateTime<Utc>,
        outbreak: bool,
    ) -> DomainResult<Vec<SlicePrediction>> {
        let model = self.active_model().ok_or(DomainError::ModelNotTrained)?;
        predict_with(&model, blood_type, region, horizon_hours, now, outbreak)
    }

    /// Generate forecasts for every requested (blood type, region, slice),
    /// classifying each against the inventory baseline from `baseline`.
    pub fn generate<F>(&self, req: &GenerateRequest, baseline: F) -> DomainResult<Vec<DemandForecast>>
    where
        F: Fn(BloodType, &RegionId) -> u32,
    {
        let model = self.active_model().ok_or(DomainError::ModelNotTrained)?;

        let regions: Vec<RegionId> = match &req.regions {
            Some(rs) => {
                for r in rs {
                    if !self.config.regions.contains(r) {
                        return Err(DomainError::validation(format!("unknown region: {r}")));
                    }
                }
                rs.clone()
            }
            None => self.config.regions.regions().to_vec(),
        };
        let blood_types: Vec<BloodType> = req
            .blood_types
            .clone()
            .unwrap_or_else(|| BloodType::ALL.to_vec());
        let outbreaks: HashSet<&RegionId> = req.outbreak_regions.iter().collect();

        let mut out = Vec::with_capacity(
            regions.len() * blood_types.len() * req.horizon_hours.div_ceil(24) as usize,
        );

        for region in &regions {
            for &blood_type in &blood_types {
                let base = baseline(blood_type, region);
                let predictions = predict_with(
                    &model,
                    blood_type,
                    region,
                    req.horizon_hours,
                    req.now,
                    outbreaks.contains(region),
                )?;

                for p in predictions {
                    out.push(DemandForecast {
                        id: ForecastId::new(),
                        blood_type,
                        region: region.clone(),
                        generated_at: req.now,
                        target_time: p.target_time,
                        slice_hours: p.slice_hours,
                        predicted_demand: p.predicted_demand,
                        confidence: p.confidence,
                        shortage_risk: risk::classify(p.predicted_demand, base),
                        baseline_units: base,
                        model_version: model.metadata().version,
                        alert_sent: false,
                    });
                }
            }
        }

        info!(
            forecasts = out.len(),
            horizon_hours = req.horizon_hours,
            model_version = model.metadata().version,
            "demand forecasts generated"
        );

        Ok(out)
    }
}

fn predict_with(
    model: &ForecastModel,
    blood_type: BloodType,
    region: &RegionId,
    horizon_hours: u32,
    now: DateTime<Utc>,
    outbreak: bool,
) -> DomainResult<Vec<SlicePrediction>> {
    slices(now, horizon_hours)?
        .into_iter()
        .map(|slice| {
            let x = model.encoder().encode(&FeatureInput {
                blood_type,
                region,
                at: slice.target_time,
                outbreak,
            })?;
            let ensemble = model.predict_encoded(&x);
            Ok(SlicePrediction {
                target_time: slice.target_time,
                slice_hours: slice.hours,
                predicted_demand: ensemble.mean.max(0.0),
                confidence: confidence(&ensemble),
            })
        })
        .collect()
}

/// `clamp(1 - std/mean, 0.5, 0.95)`.
pub fn confidence(prediction: &EnsemblePrediction) -> f64 {
    if prediction.mean <= 0.0 || !prediction.mean.is_finite() {
        return FALLBACK_CONFIDENCE;
    }
    (1.0 - prediction.std_dev / prediction.mean).clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::SyntheticHistory;
    use bloodline_core::RiskLevel;
    use chrono::TimeZone;

    fn small_config() -> ForecasterConfig {
        ForecasterConfig::default()
            .with_regions(RegionCatalog::new(["North", "South"]).unwrap())
            .with_min_training_records(50)
            .with_forest(ForestParams::default().with_trees(8).with_max_depth(6))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 1, 8, 0, 0).unwrap()
    }

    fn history(cfg: &ForecasterConfig, days: u32) -> Vec<DemandRecord> {
        SyntheticHistory::default()
            .with_days(days)
            .generate(&cfg.regions, now())
    }

    #[test]
    fn predict_before_train_fails() {
        let f = Forecaster::new(small_config());
        let region = RegionId::new("North").unwrap();
        let err = f.predict(BloodType::OPos, &region, 24, now(), false).unwrap_err();
        assert_eq!(err, DomainError::ModelNotTrained);

        let err = f.generate(&GenerateRequest::new(now(), 24), |_, _| 10).unwrap_err();
        assert_eq!(err, DomainError::ModelNotTrained);
    }

    #[test]
    fn too_few_records_is_insufficient_data() {
        let cfg = small_config();
        let f = Forecaster::new(cfg.clone());
        let records = history(&cfg, 1); // 2 regions x 8 types = 16 rows
        let err = f.train(&records, false, now()).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientData {
                available: 16,
                required: 50
            }
        );
        assert!(!f.is_trained());
        assert!(!f.is_training());
    }

    #[test]
    fn train_is_idempotent_unless_forced() {
        let cfg = small_config();
        let f = Forecaster::new(cfg.clone());
        let records = history(&cfg, 30);

        let first = f.train(&records, false, now()).unwrap();
        assert!(first.trained);
        assert_eq!(first.metadata.version, 1);
        assert_eq!(first.metadata.sample_count, records.len());

        let second = f.train(&records, false, now()).unwrap();
        assert!(!second.trained);
        assert_eq!(second.metadata.version, 1);

        let forced = f.train(&records, true, now()).unwrap();
        assert!(forced.trained);
        assert_eq!(forced.metadata.version, 2);
        assert_eq!(f.active_model().unwrap().metadata().version, 2);
    }

    #[test]
    fn concurrent_training_fails_fast() {
        let f = Forecaster::new(small_config());
        f.training.store(true, Ordering::Release);
        let err = f.train(&[], true, now()).unwrap_err();
        assert_eq!(err, DomainError::TrainingInProgress);
        // A rejected call must not clear the flag owned by the running call.
        assert!(f.is_training());
    }

    #[test]
    fn readers_keep_their_model_across_a_swap() {
        let cfg = small_config();
        let f = Forecaster::new(cfg.clone());
        let records = history(&cfg, 30);
        f.train(&records, false, now()).unwrap();

        let held = f.active_model().unwrap();
        f.train(&records, true, now()).unwrap();

        assert_eq!(held.metadata().version, 1);
        assert_eq!(f.active_model().unwrap().metadata().version, 2);
    }

    #[test]
    fn generate_covers_every_slice_with_bounded_confidence() {
        let cfg = small_config();
        let f = Forecaster::new(cfg.clone());
        f.train(&history(&cfg, 60), false, now()).unwrap();

        let baseline = 40;
        let forecasts = f
            .generate(&GenerateRequest::new(now(), 72), |_, _| baseline)
            .unwrap();

        assert_eq!(forecasts.len(), 2 * 8 * 3);
        for fc in &forecasts {
            assert!((MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&fc.confidence));
            assert!(fc.predicted_demand >= 0.0);
            assert_eq!(fc.shortage_risk, risk::classify(fc.predicted_demand, baseline));
            assert!(!fc.alert_sent);
            assert!(fc.target_time > now());
        }
    }

    #[test]
    fn generate_rejects_unknown_regions() {
        let cfg = small_config();
        let f = Forecaster::new(cfg.clone());
        f.train(&history(&cfg, 30), false, now()).unwrap();

        let req = GenerateRequest::new(now(), 24).with_regions(vec![RegionId::new("Mars").unwrap()]);
        assert_eq!(f.generate(&req, |_, _| 0).unwrap_err().kind(), "validation_error");
    }

    #[test]
    fn empty_stock_is_critical() {
        let cfg = small_config();
        let f = Forecaster::new(cfg.clone());
        f.train(&history(&cfg, 30), false, now()).unwrap();

        let req = GenerateRequest::new(now(), 24).with_blood_types(vec![BloodType::OPos]);
        let forecasts = f.generate(&req, |_, _| 0).unwrap();
        assert!(forecasts.iter().all(|fc| fc.shortage_risk == RiskLevel::Critical));
    }

    #[test]
    fn confidence_is_clamped() {
        let tight = EnsemblePrediction { mean: 10.0, std_dev: 0.0 };
        let loose = EnsemblePrediction { mean: 10.0, std_dev: 9.0 };
        let zero = EnsemblePrediction { mean: 0.0, std_dev: 1.0 };
        assert_eq!(confidence(&tight), MAX_CONFIDENCE);
        assert_eq!(confidence(&loose), MIN_CONFIDENCE);
        assert_eq!(confidence(&zero), FALLBACK_CONFIDENCE);
    }
}
