//! Feature encoding for the demand model.
//!
//! Layout (schema version [`FEATURE_SCHEMA_VERSION`]):
//!
//! | slot | feature |
//! |---|---|
//! | 0 | blood type code (position in `BloodType::ALL`) |
//! | 1 | region code (position in the region catalog) |
//! | 2 | day of week, Monday = 0 |
//! | 3 | month, 1-12 |
//! | 4 | seasonal multiplier |
//! | 5 | disease outbreak flag (0/1) |
//!
//! The seasonal multiplier is an input feature, not a post-hoc scale, so the
//! model can learn how it interacts with the other signals.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use bloodline_core::{BloodType, DomainError, DomainResult, RegionCatalog, RegionId};

use crate::season::Season;

pub const FEATURE_SCHEMA_VERSION: u32 = 1;
pub const FEATURE_COUNT: usize = 6;

/// Encoded model input.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }
}

/// Raw point to encode.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureInput<'a> {
    pub blood_type: BloodType,
    pub region: &'a RegionId,
    pub at: DateTime<Utc>,
    pub outbreak: bool,
}

/// Pure, deterministic encoder bound to a region catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureEncoder {
    regions: RegionCatalog,
}

impl FeatureEncoder {
    pub fn new(regions: RegionCatalog) -> Self {
        Self { regions }
    }

    pub fn regions(&self) -> &RegionCatalog {
        &self.regions
    }

    pub fn encode(&self, input: &FeatureInput<'_>) -> DomainResult<FeatureVector> {
        let region_code = self
            .regions
            .index_of(input.region)
            .ok_or_else(|| DomainError::validation(format!("unknown region: {}", input.region)))?;

        let month = input.at.month();
        let season = Season::from_month(month);

        Ok(FeatureVector([
            input.blood_type.index() as f64,
            region_code as f64,
            input.at.weekday().num_days_from_monday() as f64,
            month as f64,
            season.multiplier(),
            if input.outbreak { 1.0 } else { 0.0 },
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn encoder() -> FeatureEncoder {
        FeatureEncoder::new(RegionCatalog::default())
    }

    #[test]
    fn encodes_all_slots() {
        let region = RegionId::new("Noida").unwrap();
        // 2025-10-15 is a Wednesday.
        let at = Utc.with_ymd_and_hms(2025, 10, 15, 9, 0, 0).unwrap();
        let v = encoder()
            .encode(&FeatureInput {
                blood_type: BloodType::OPos,
                region: &region,
                at,
                outbreak: true,
            })
            .unwrap();

        assert_eq!(v.values(), &[4.0, 5.0, 2.0, 10.0, 1.8, 1.0]);
    }

    #[test]
    fn identical_inputs_encode_identically() {
        let region = RegionId::new("Dwarka").unwrap();
        let at = Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap();
        let input = FeatureInput {
            blood_type: BloodType::AbNeg,
            region: &region,
            at,
            outbreak: false,
        };
        assert_eq!(encoder().encode(&input).unwrap(), encoder().encode(&input).unwrap());
    }

    #[test]
    fn unknown_region_is_a_validation_error() {
        let region = RegionId::new("Atlantis").unwrap();
        let err = encoder()
            .encode(&FeatureInput {
                blood_type: BloodType::APos,
                region: &region,
                at: Utc::now(),
                outbreak: false,
            })
            .unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }
}
