//! Domain error model.

use thiserror::Error;

use crate::blood_type::BloodType;
use crate::id::HospitalId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every failure a caller can observe from forecasting, inventory or
/// redistribution maps to exactly one variant here. `kind()` gives the stable
/// machine-readable code; `Display` gives the human message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Too few historical demand records to fit a model.
    #[error("insufficient training data: {available} record(s) available, {required} required")]
    InsufficientData { available: usize, required: usize },

    /// Prediction was requested before any successful training run.
    #[error("forecast model has not been trained")]
    ModelNotTrained,

    /// A value failed validation (unknown blood type/region, bad units, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A debit would take stock below zero.
    #[error(
        "insufficient inventory at hospital {hospital} for {blood_type}: {available} available, {requested} requested"
    )]
    InsufficientInventory {
        hospital: HospitalId,
        blood_type: BloodType,
        available: u32,
        requested: u32,
    },

    /// A credit would take stock above the site's capacity.
    #[error(
        "capacity exceeded at hospital {hospital} for {blood_type}: capacity {capacity}, requested level {requested_level}"
    )]
    CapacityExceeded {
        hospital: HospitalId,
        blood_type: BloodType,
        capacity: u32,
        requested_level: u64,
    },

    /// A referenced hospital, inventory row or forecast does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Another training run is already in flight.
    #[error("a training run is already in progress")]
    TrainingInProgress,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Stable error code reported to callers.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::InsufficientData { .. } => "insufficient_data",
            DomainError::ModelNotTrained => "model_not_trained",
            DomainError::Validation(_) => "validation_error",
            DomainError::InsufficientInventory { .. } => "insufficient_inventory",
            DomainError::CapacityExceeded { .. } => "capacity_exceeded",
            DomainError::NotFound(_) => "not_found",
            DomainError::TrainingInProgress => "training_in_progress",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable() {
        assert_eq!(DomainError::ModelNotTrained.kind(), "model_not_trained");
        assert_eq!(DomainError::validation("x").kind(), "validation_error");
        assert_eq!(DomainError::not_found("hospital 9").kind(), "not_found");
        assert_eq!(DomainError::TrainingInProgress.kind(), "training_in_progress");
    }

    #[test]
    fn messages_carry_context() {
        let err = DomainError::InsufficientInventory {
            hospital: HospitalId::new(3),
            blood_type: BloodType::ONeg,
            available: 2,
            requested: 5,
        };
        let msg = err.to_string();
        assert!(msg.contains("hospital 3"));
        assert!(msg.contains("O-"));
        assert!(msg.contains("2 available"));
    }
}
