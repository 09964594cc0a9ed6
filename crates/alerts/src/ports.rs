//! Upstream collaborators consumed by the dispatcher.

use std::collections::HashSet;
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use bloodline_core::{BloodType, DonorId, RegionId};

use crate::alert::Alert;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Donor {
    pub id: DonorId,
    pub name: String,
    pub blood_type: BloodType,
    pub region: RegionId,
    pub available: bool,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("donor directory unavailable: {0}")]
    DirectoryUnavailable(String),

    #[error("delivery to {recipient} failed: {reason}")]
    Delivery { recipient: DonorId, reason: String },

    #[error("delivery to {0} timed out")]
    Timeout(DonorId),
}

/// Donor lookup (read-only).
#[async_trait]
pub trait DonorDirectory: Send + Sync + 'static {
    /// Donors of `blood_type`, optionally restricted to available ones.
    async fn find(&self, blood_type: BloodType, available_only: bool) -> Result<Vec<Donor>, NotifyError>;
}

/// Push/notify sink (write, fire-and-forget from the caller's view).
#[async_trait]
pub trait NotificationSink: Send + Sync + 'static {
    async fn deliver(&self, recipient: &Donor, alert: &Alert) -> Result<(), NotifyError>;
}

/// In-memory donor pool for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryDonorDirectory {
    inner: RwLock<Vec<Donor>>,
}

impl InMemoryDonorDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, donor: Donor) {
        self.inner.write().unwrap_or_else(|p| p.into_inner()).push(donor);
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DonorDirectory for InMemoryDonorDirectory {
    async fn find(&self, blood_type: BloodType, available_only: bool) -> Result<Vec<Donor>, NotifyError> {
        Ok(self
            .inner
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .filter(|d| d.blood_type == blood_type && (d.available || !available_only))
            .cloned()
            .collect())
    }
}

/// Records deliveries; recipients in `failing` are rejected.
#[derive(Debug, Default)]
pub struct InMemoryNotificationSink {
    delivered: Mutex<Vec<(DonorId, Alert)>>,
    failing: RwLock<HashSet<DonorId>>,
}

impl InMemoryNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, recipient: DonorId) {
        self.failing
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .insert(recipient);
    }

    pub fn delivered(&self) -> Vec<(DonorId, Alert)> {
        self.delivered
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

#[async_trait]
impl NotificationSink for InMemoryNotificationSink {
    async fn deliver(&self, recipient: &Donor, alert: &Alert) -> Result<(), NotifyError> {
        let rejected = self
            .failing
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .contains(&recipient.id);
        if rejected {
            return Err(NotifyError::Delivery {
                recipient: recipient.id,
                reason: "recipient rejected".to_string(),
            });
        }
        self.delivered
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push((recipient.id, alert.clone()));
        Ok(())
    }
}

/// Sink that only logs; the default when no push channel is wired.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotificationSink;

#[async_trait]
impl NotificationSink for TracingNotificationSink {
    async fn deliver(&self, recipient: &Donor, alert: &Alert) -> Result<(), NotifyError> {
        info!(
            recipient = %recipient.id,
            forecast_id = %alert.forecast_id,
            blood_type = %alert.blood_type,
            region = %alert.region,
            risk = %alert.shortage_risk,
            "shortage alert delivered"
        );
        Ok(())
    }
}
