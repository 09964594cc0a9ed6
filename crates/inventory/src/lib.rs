//! Inventory domain module.
//!
//! Stock levels per (hospital, blood type) and the ledger that mutates them.
//! Every mutation keeps `0 <= current <= capacity`; there is no IO here.

pub mod hospital;
pub mod ledger;
pub mod level;

pub use hospital::{Hospital, HospitalDirectory, InMemoryHospitalDirectory};
pub use ledger::{InventoryLedger, LevelBounds, TransferOutcome};
pub use level::{InventoryLevel, InventoryStatus};
