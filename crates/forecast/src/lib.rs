//! `bloodline-forecast`
//!
//! **Responsibility:** demand forecasting and shortage risk classification.
//!
//! - Learns per-day demand from historical records (bagged regression trees).
//! - Emits [`DemandForecast`] rows per (blood type, region, daily slice).
//! - Does not touch inventory; callers pass the stock baseline in.

pub mod engine;
pub mod features;
pub mod forecast;
pub mod forest;
pub mod history;
pub mod model;
pub mod risk;
pub mod season;
pub mod store;

pub use engine::{Forecaster, ForecasterConfig, GenerateRequest, SlicePrediction, TrainOutcome};
pub use features::{FeatureEncoder, FeatureVector};
pub use forecast::{DemandForecast, SLICE_HOURS, TimeSlice};
pub use forest::{ForestParams, RandomForest};
pub use history::{DemandHistory, DemandRecord, InMemoryDemandHistory, SyntheticHistory};
pub use model::{ForecastModel, ModelMetadata};
pub use season::Season;
pub use store::{ForecastQuery, ForecastStore, ForecastSummary, InMemoryForecastStore};
