//! Environment-driven configuration.
//!
//! Every setting has a default; a value that fails to parse is logged and
//! replaced by the default rather than aborting startup.

use std::str::FromStr;
use std::time::Duration;

use bloodline_core::{DEFAULT_REGIONS, DomainResult, RegionCatalog};
use bloodline_forecast::{ForecasterConfig, ForestParams};
use bloodline_inventory::LevelBounds;
use bloodline_alerts::DispatcherConfig;

pub const ENV_BIND_ADDR: &str = "BLOODLINE_BIND_ADDR";
pub const ENV_REGIONS: &str = "BLOODLINE_REGIONS";
pub const ENV_MIN_TRAINING_RECORDS: &str = "BLOODLINE_MIN_TRAINING_RECORDS";
pub const ENV_HISTORY_DAYS: &str = "BLOODLINE_HISTORY_DAYS";
pub const ENV_TREES: &str = "BLOODLINE_TREES";
pub const ENV_MAX_DEPTH: &str = "BLOODLINE_MAX_DEPTH";
pub const ENV_SEED: &str = "BLOODLINE_SEED";
pub const ENV_DEFAULT_REGIONAL_STOCK: &str = "BLOODLINE_DEFAULT_REGIONAL_STOCK";
pub const ENV_MAX_ALERT_RECIPIENTS: &str = "BLOODLINE_MAX_ALERT_RECIPIENTS";
pub const ENV_NOTIFY_TIMEOUT_MS: &str = "BLOODLINE_NOTIFY_TIMEOUT_MS";
pub const ENV_DEFAULT_MIN_REQUIRED: &str = "BLOODLINE_DEFAULT_MIN_REQUIRED";
pub const ENV_DEFAULT_CAPACITY: &str = "BLOODLINE_DEFAULT_CAPACITY";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub regions: Vec<String>,
    pub min_training_records: usize,
    pub history_days: u32,
    pub trees: usize,
    pub max_depth: usize,
    pub seed: u64,
    pub default_regional_stock: u32,
    pub max_alert_recipients: usize,
    pub notify_timeout: Duration,
    pub default_min_required: u32,
    pub default_capacity: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            regions: DEFAULT_REGIONS.iter().map(|r| r.to_string()).collect(),
            min_training_records: 100,
            history_days: 365,
            trees: 50,
            max_depth: 10,
            seed: 42,
            default_regional_stock: 50,
            max_alert_recipients: 10,
            notify_timeout: Duration::from_millis(2000),
            default_min_required: 10,
            default_capacity: 100,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the process env in production).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();

        let regions = match lookup(ENV_REGIONS) {
            Some(raw) => {
                let names: Vec<String> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
                if names.is_empty() || RegionCatalog::new(names.iter().cloned()).is_err() {
                    tracing::warn!(key = ENV_REGIONS, value = %raw, "invalid region list; using defaults");
                    d.regions
                } else {
                    names
                }
            }
            None => d.regions,
        };

        Self {
            bind_addr: lookup(ENV_BIND_ADDR).unwrap_or(d.bind_addr),
            regions,
            min_training_records: parsed(&lookup, ENV_MIN_TRAINING_RECORDS, d.min_training_records),
            history_days: parsed(&lookup, ENV_HISTORY_DAYS, d.history_days),
            trees: positive(&lookup, ENV_TREES, d.trees),
            max_depth: positive(&lookup, ENV_MAX_DEPTH, d.max_depth),
            seed: parsed(&lookup, ENV_SEED, d.seed),
            default_regional_stock: parsed(&lookup, ENV_DEFAULT_REGIONAL_STOCK, d.default_regional_stock),
            max_alert_recipients: parsed(&lookup, ENV_MAX_ALERT_RECIPIENTS, d.max_alert_recipients),
            notify_timeout: Duration::from_millis(positive(
                &lookup,
                ENV_NOTIFY_TIMEOUT_MS,
                d.notify_timeout.as_millis() as u64,
            )),
            default_min_required: parsed(&lookup, ENV_DEFAULT_MIN_REQUIRED, d.default_min_required),
            default_capacity: positive(&lookup, ENV_DEFAULT_CAPACITY, d.default_capacity),
        }
    }

    pub fn region_catalog(&self) -> DomainResult<RegionCatalog> {
        RegionCatalog::new(self.regions.iter().cloned())
    }

    pub fn forecaster(&self) -> DomainResult<ForecasterConfig> {
        Ok(ForecasterConfig::default()
            .with_regions(self.region_catalog()?)
            .with_min_training_records(self.min_training_records)
            .with_forest(
                ForestParams::default()
                    .with_trees(self.trees)
                    .with_max_depth(self.max_depth)
                    .with_seed(self.seed),
            ))
    }

    pub fn dispatcher(&self) -> DispatcherConfig {
        DispatcherConfig::default()
            .with_max_recipients(self.max_alert_recipients)
            .with_notify_timeout(self.notify_timeout)
    }

    pub fn level_bounds(&self) -> LevelBounds {
        LevelBounds {
            min_required: self.default_min_required,
            max_capacity: self.default_capacity,
        }
    }
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy + std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, default = %default, "invalid config value; using default");
            default
        }),
    }
}

fn positive<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy + std::fmt::Display + PartialOrd + Default,
{
    let value = parsed(lookup, key, default);
    if value > T::default() {
        value
    } else {
        tracing::warn!(key, default = %default, "config value must be positive; using default");
        default
    }
}
