//! Trained forecast model plus metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::features::FeatureEncoder;
use crate::forest::{EnsemblePrediction, RandomForest};

/// Metadata describing one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Monotonic per engine; bumps on every successful training run.
    pub version: u64,
    pub sample_count: usize,
    pub trained_at: DateTime<Utc>,
    pub feature_schema_version: u32,
    pub n_trees: usize,
}

/// Immutable trained model.
///
/// Replaced wholesale on retrain; readers holding an `Arc<ForecastModel>`
/// keep a consistent model for the whole predict call.
#[derive(Debug, Clone)]
pub struct ForecastModel {
    encoder: FeatureEncoder,
    forest: RandomForest,
    metadata: ModelMetadata,
}

impl ForecastModel {
    pub fn new(encoder: FeatureEncoder, forest: RandomForest, metadata: ModelMetadata) -> Self {
        Self {
            encoder,
            forest,
            metadata,
        }
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub(crate) fn predict_encoded(&self, x: &crate::features::FeatureVector) -> EnsemblePrediction {
        self.forest.predict(x)
    }
}
