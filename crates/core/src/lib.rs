//! `bloodline-core`: shared blood-network data model.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod blood_type;
pub mod error;
pub mod id;
pub mod region;
pub mod risk;

pub use blood_type::BloodType;
pub use error::{DomainError, DomainResult};
pub use id::{DonorId, ForecastId, HospitalId};
pub use region::{DEFAULT_REGIONS, RegionCatalog, RegionId};
pub use risk::RiskLevel;
