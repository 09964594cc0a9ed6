//! Demo data for the binary: six hospitals, stock for every blood type and
//! a small donor pool.

use chrono::Utc;
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::info;

use bloodline_alerts::Donor;
use bloodline_core::{BloodType, DomainResult, DonorId, HospitalId, RegionId};
use bloodline_inventory::Hospital;

use crate::app::AppServices;

const HOSPITALS: [(u64, &str, &str); 6] = [
    (1, "Apollo Hospital", "South Delhi"),
    (2, "AIIMS", "South Delhi"),
    (3, "Max Hospital", "Noida"),
    (4, "Fortis Hospital", "Gurgaon"),
    (5, "Safdarjung Hospital", "Central Delhi"),
    (6, "BLK Hospital", "West Delhi"),
];

const DONORS: [(&str, BloodType, &str, bool); 8] = [
    ("Aryan Kumar", BloodType::APos, "South Delhi", true),
    ("Simran Singh", BloodType::BPos, "South Delhi", true),
    ("Priya Sharma", BloodType::OPos, "Noida", true),
    ("Rahul Verma", BloodType::AbPos, "Gurgaon", false),
    ("Anjali Patel", BloodType::ANeg, "Central Delhi", true),
    ("Vikram Reddy", BloodType::BNeg, "West Delhi", true),
    ("Neha Gupta", BloodType::ONeg, "East Delhi", true),
    ("Karan Malhotra", BloodType::AbNeg, "Dwarka", true),
];

/// Populate the in-memory directories and ledger.
///
/// Stock levels are drawn from the configured seed, so two runs with the
/// same seed start from the same state. Hospitals outside the configured
/// region catalog are skipped.
pub fn seed_demo(services: &AppServices) -> DomainResult<()> {
    let catalog = services.forecaster().regions();
    let bounds = services.config().level_bounds();
    let mut rng = StdRng::seed_from_u64(services.config().seed);
    let now = Utc::now();

    let mut hospitals = 0;
    for (id, name, region) in HOSPITALS {
        let region = RegionId::new(region)?;
        if !catalog.contains(&region) {
            continue;
        }
        let id = HospitalId::new(id);
        services.hospitals().insert(Hospital {
            id,
            name: name.to_string(),
            region,
        });
        for blood_type in BloodType::ALL {
            let units = rng.gen_range(0..=bounds.max_capacity.min(60));
            services.ledger().set_current(id, blood_type, units, bounds, now)?;
        }
        hospitals += 1;
    }

    for (name, blood_type, region, available) in DONORS {
        services.donors().insert(Donor {
            id: DonorId::new(),
            name: name.to_string(),
            blood_type,
            region: RegionId::new(region)?,
            available,
        });
    }

    info!(
        hospitals,
        inventory_rows = services.ledger().len(),
        donors = services.donors().len(),
        "demo data seeded"
    );
    Ok(())
}
