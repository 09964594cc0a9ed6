use std::collections::BTreeSet;

use serde::Serialize;

use bloodline_inventory::{InventoryLevel, InventoryStatus};

/// Network-wide stock picture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedistributionSummary {
    pub total_hospitals: usize,
    pub total_inventory_records: usize,
    pub critical_count: usize,
    pub low_count: usize,
    pub adequate_count: usize,
    pub excess_count: usize,
    pub total_shortage_units: u64,
    pub total_surplus_units: u64,
    /// Units that could move today: `min(shortage, surplus)`.
    pub redistribution_potential: u64,
    pub blood_types_tracked: usize,
}

impl RedistributionSummary {
    pub fn from_levels(levels: &[InventoryLevel]) -> Self {
        let count = |status: InventoryStatus| levels.iter().filter(|l| l.status() == status).count();
        let shortage: u64 = levels.iter().map(|l| u64::from(l.deficit())).sum();
        let surplus: u64 = levels.iter().map(|l| u64::from(l.surplus())).sum();

        Self {
            total_hospitals: levels.iter().map(|l| l.hospital_id).collect::<BTreeSet<_>>().len(),
            total_inventory_records: levels.len(),
            critical_count: count(InventoryStatus::Critical),
            low_count: count(InventoryStatus::Low),
            adequate_count: count(InventoryStatus::Adequate),
            excess_count: count(InventoryStatus::Excess),
            total_shortage_units: shortage,
            total_surplus_units: surplus,
            redistribution_potential: shortage.min(surplus),
            blood_types_tracked: levels.iter().map(|l| l.blood_type).collect::<BTreeSet<_>>().len(),
        }
    }
}
