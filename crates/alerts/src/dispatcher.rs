use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use bloodline_core::{DomainError, DomainResult, ForecastId, RegionId, RiskLevel};
use bloodline_forecast::ForecastStore;

use crate::alert::Alert;
use crate::ports::{Donor, DonorDirectory, NotificationSink, NotifyError};

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Donors notified per alert.
    pub max_recipients: usize,
    /// Per-recipient delivery timeout.
    pub notify_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_recipients: 10,
            notify_timeout: Duration::from_secs(2),
        }
    }
}

impl DispatcherConfig {
    pub fn with_max_recipients(mut self, max: usize) -> Self {
        self.max_recipients = max;
        self
    }

    pub fn with_notify_timeout(mut self, timeout: Duration) -> Self {
        self.notify_timeout = timeout;
        self
    }
}

/// Which forecasts a `send_alerts` call covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertTarget {
    /// One forecast, regardless of risk.
    Forecast(ForecastId),
    /// Every unalerted future forecast at or above the level.
    MinRisk(RiskLevel),
}

impl Default for AlertTarget {
    fn default() -> Self {
        AlertTarget::MinRisk(RiskLevel::High)
    }
}

pub struct AlertDispatcher {
    forecasts: Arc<dyn ForecastStore>,
    donors: Arc<dyn DonorDirectory>,
    sink: Arc<dyn NotificationSink>,
    config: DispatcherConfig,
}

impl AlertDispatcher {
    pub fn new(
        forecasts: Arc<dyn ForecastStore>,
        donors: Arc<dyn DonorDirectory>,
        sink: Arc<dyn NotificationSink>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            forecasts,
            donors,
            sink,
            config,
        }
    }

    /// Alert on the targeted forecasts.
    ///
    /// The alert flag is flipped before delivery, so a forecast is alerted at
    /// most once even when calls race. Already-alerted forecasts are skipped.
    pub async fn send_alerts(&self, target: AlertTarget, now: DateTime<Utc>) -> DomainResult<Vec<Alert>> {
        let candidates = match target {
            AlertTarget::Forecast(id) => vec![
                self.forecasts
                    .get(id)
                    .ok_or_else(|| DomainError::not_found(format!("forecast {id}")))?,
            ],
            AlertTarget::MinRisk(min) => self.forecasts.pending_alerts(min, now),
        };

        let mut alerts = Vec::with_capacity(candidates.len());
        for forecast in candidates {
            if !self.forecasts.mark_alerted(forecast.id)? {
                debug!(forecast_id = %forecast.id, "forecast already alerted");
                continue;
            }

            let mut alert = Alert::compose(&forecast);
            alert.notified_recipients = self.fan_out(&alert).await;
            info!(
                forecast_id = %alert.forecast_id,
                blood_type = %alert.blood_type,
                region = %alert.region,
                risk = %alert.shortage_risk,
                notified = alert.notified_recipients,
                "shortage alert sent"
            );
            alerts.push(alert);
        }

        Ok(alerts)
    }

    /// Deliver to up to `max_recipients` donors; returns the success count.
    async fn fan_out(&self, alert: &Alert) -> usize {
        let donors = match self.donors.find(alert.blood_type, true).await {
            Ok(donors) => donors,
            Err(err) => {
                warn!(forecast_id = %alert.forecast_id, error = %err, "donor lookup failed");
                return 0;
            }
        };

        let mut tasks = JoinSet::new();
        for donor in select_recipients(donors, &alert.region, self.config.max_recipients) {
            let sink = Arc::clone(&self.sink);
            let alert = alert.clone();
            let timeout = self.config.notify_timeout;
            tasks.spawn(async move {
                match tokio::time::timeout(timeout, sink.deliver(&donor, &alert)).await {
                    Ok(result) => result,
                    Err(_) => Err(NotifyError::Timeout(donor.id)),
                }
            });
        }

        let mut delivered = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(err)) => warn!(forecast_id = %alert.forecast_id, error = %err, "alert delivery failed"),
                Err(err) => warn!(forecast_id = %alert.forecast_id, error = %err, "alert delivery task failed"),
            }
        }
        delivered
    }
}

/// Donors in the alert's region first, then everyone else; capped at `max`.
fn select_recipients(mut donors: Vec<Donor>, region: &RegionId, max: usize) -> Vec<Donor> {
    donors.sort_by_key(|d| &d.region != region);
    donors.truncate(max);
    donors
}
