//! `bloodline-redistribution`
//!
//! **Responsibility:** propose and execute stock transfers between hospitals.
//!
//! Proposals are computed fresh from a ledger snapshot on every call and are
//! never stored. Execution re-validates against live stock through the
//! inventory ledger, so a stale proposal fails cleanly instead of overdrawing.

pub mod matcher;
pub mod plan;
pub mod service;
pub mod summary;

pub use matcher::{RedistributionOpportunity, SEVERITY_WEIGHT, Site};
pub use plan::{ForecastPlan, RegionDemand};
pub use service::{Redistributor, TransferReceipt};
pub use summary::RedistributionSummary;
