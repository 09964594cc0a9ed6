use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bloodline_core::{BloodType, DomainError, DomainResult, HospitalId};

/// Stock of one blood type at one hospital.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLevel {
    pub hospital_id: HospitalId,
    pub blood_type: BloodType,
    pub current_units: u32,
    pub min_required: u32,
    pub max_capacity: u32,
    pub last_updated: DateTime<Utc>,
}

/// Coarse stock status used in summaries.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum InventoryStatus {
    Critical,
    Low,
    Adequate,
    Excess,
}

impl InventoryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InventoryStatus::Critical => "Critical",
            InventoryStatus::Low => "Low",
            InventoryStatus::Adequate => "Adequate",
            InventoryStatus::Excess => "Excess",
        }
    }
}

impl InventoryLevel {
    pub fn new(
        hospital_id: HospitalId,
        blood_type: BloodType,
        current_units: u32,
        min_required: u32,
        max_capacity: u32,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if current_units > max_capacity {
            return Err(DomainError::CapacityExceeded {
                hospital: hospital_id,
                blood_type,
                capacity: max_capacity,
                requested_level: u64::from(current_units),
            });
        }
        Ok(Self {
            hospital_id,
            blood_type,
            current_units,
            min_required,
            max_capacity,
            last_updated: now,
        })
    }

    /// `min_required - current`, or 0.
    pub fn deficit(&self) -> u32 {
        self.min_required.saturating_sub(self.current_units)
    }

    /// `current - min_required`, or 0.
    pub fn surplus(&self) -> u32 {
        self.current_units.saturating_sub(self.min_required)
    }

    pub fn status(&self) -> InventoryStatus {
        let current = f64::from(self.current_units);
        if current < f64::from(self.min_required) * 0.5 {
            InventoryStatus::Critical
        } else if self.current_units < self.min_required {
            InventoryStatus::Low
        } else if current > f64::from(self.max_capacity) * 0.9 {
            InventoryStatus::Excess
        } else {
            InventoryStatus::Adequate
        }
    }

    /// Apply a signed change, rejecting anything outside `[0, capacity]`.
    /// On error `self` is untouched.
    pub(crate) fn apply_delta(&mut self, delta: i64, now: DateTime<Utc>) -> DomainResult<()> {
        let next = i64::from(self.current_units) + delta;
        if next < 0 {
            return Err(DomainError::InsufficientInventory {
                hospital: self.hospital_id,
                blood_type: self.blood_type,
                available: self.current_units,
                requested: u32::try_from(delta.unsigned_abs()).unwrap_or(u32::MAX),
            });
        }
        if next > i64::from(self.max_capacity) {
            return Err(DomainError::CapacityExceeded {
                hospital: self.hospital_id,
                blood_type: self.blood_type,
                capacity: self.max_capacity,
                requested_level: next.unsigned_abs(),
            });
        }
        // 0 <= next <= max_capacity, so it fits in u32.
        self.current_units = next as u32;
        self.last_updated = now;
        Ok(())
    }

    pub(crate) fn set_current(&mut self, units: u32, now: DateTime<Utc>) -> DomainResult<()> {
        self.apply_delta(i64::from(units) - i64::from(self.current_units), now)
    }
}
