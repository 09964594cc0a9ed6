//! Greedy surplus-to-deficit pairing for one blood type.
//!
//! This is a heuristic: largest deficit first, each served from the largest
//! remaining surplus. It is not an optimal assignment (a min-cost flow would
//! be), but every proposal respects the unit bounds below.
//!
//! - `transfer_units <= destination deficit`
//! - `transfer_units <= source surplus remaining at that point`

use serde::Serialize;

use bloodline_core::{BloodType, HospitalId};

/// Priority points per unit of destination deficit.
pub const SEVERITY_WEIGHT: u32 = 10;

/// A hospital's position for one blood type: a deficit or a surplus in units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub hospital_id: HospitalId,
    pub name: String,
    pub units: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RedistributionOpportunity {
    pub from_hospital_id: HospitalId,
    pub from_hospital_name: String,
    pub to_hospital_id: HospitalId,
    pub to_hospital_name: String,
    pub blood_type: BloodType,
    pub transfer_units: u32,
    pub priority: u32,
    pub reason: String,
    pub forecast_based: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub predicted_shortage_regions: Vec<String>,
}

/// Pair `shortages` with `surpluses` for a single blood type.
///
/// Shortages are served by descending deficit (ties: lower hospital id).
/// Each one draws from the largest remaining surplus (same tie-break) until
/// it is covered or every surplus is spent.
pub fn match_sites(
    blood_type: BloodType,
    mut shortages: Vec<Site>,
    mut surpluses: Vec<Site>,
) -> Vec<RedistributionOpportunity> {
    shortages.retain(|s| s.units > 0);
    surpluses.retain(|s| s.units > 0);
    shortages.sort_by(|a, b| b.units.cmp(&a.units).then(a.hospital_id.cmp(&b.hospital_id)));

    let mut out = Vec::new();

    for dest in &shortages {
        let mut need = dest.units;

        while need > 0 {
            let Some(src) = surpluses
                .iter_mut()
                .filter(|s| s.units > 0)
                .max_by(|a, b| a.units.cmp(&b.units).then(b.hospital_id.cmp(&a.hospital_id)))
            else {
                return out;
            };

            let units = need.min(src.units);
            out.push(RedistributionOpportunity {
                from_hospital_id: src.hospital_id,
                from_hospital_name: src.name.clone(),
                to_hospital_id: dest.hospital_id,
                to_hospital_name: dest.name.clone(),
                blood_type,
                transfer_units: units,
                priority: dest.units.saturating_mul(SEVERITY_WEIGHT),
                reason: format!(
                    "{} has {} unit shortage while {} has {} unit surplus",
                    dest.name, dest.units, src.name, src.units
                ),
                forecast_based: false,
                predicted_shortage_regions: Vec::new(),
            });

            src.units -= units;
            need -= units;
        }
    }

    out
}

/// Most urgent first; stable, so per-type matching order is kept on ties.
pub fn sort_by_priority(opportunities: &mut [RedistributionOpportunity]) {
    opportunities.sort_by(|a, b| b.priority.cmp(&a.priority));
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn site(id: u64, units: u32) -> Site {
        Site {
            hospital_id: HospitalId::new(id),
            name: format!("H{id}"),
            units,
        }
    }

    #[test]
    fn single_pair() {
        let out = match_sites(BloodType::OPos, vec![site(2, 14)], vec![site(1, 28)]);
        assert_eq!(out.len(), 1);
        let opp = &out[0];
        assert_eq!(opp.from_hospital_id, HospitalId::new(1));
        assert_eq!(opp.to_hospital_id, HospitalId::new(2));
        assert_eq!(opp.transfer_units, 14);
        assert_eq!(opp.priority, 140);
        assert_eq!(opp.reason, "H2 has 14 unit shortage while H1 has 28 unit surplus");
    }

    #[test]
    fn largest_deficit_takes_largest_surplus_first() {
        let out = match_sites(
            BloodType::APos,
            vec![site(10, 5), site(11, 20)],
            vec![site(1, 8), site(2, 15)],
        );
        let pairs: Vec<(u64, u64, u32)> = out
            .iter()
            .map(|o| (o.from_hospital_id.get(), o.to_hospital_id.get(), o.transfer_units))
            .collect();
        // H11 (20): 15 from H2, then 5 from H1; H10 (5): remaining 3 from H1.
        assert_eq!(pairs, vec![(2, 11, 15), (1, 11, 5), (1, 10, 3)]);
    }

    #[test]
    fn ties_break_on_lower_hospital_id() {
        let out = match_sites(
            BloodType::BPos,
            vec![site(9, 4), site(7, 4)],
            vec![site(5, 10), site(3, 10)],
        );
        assert_eq!(out[0].to_hospital_id, HospitalId::new(7));
        assert_eq!(out[0].from_hospital_id, HospitalId::new(3));
    }

    #[test]
    fn no_surplus_no_proposals() {
        assert!(match_sites(BloodType::ONeg, vec![site(1, 4)], vec![]).is_empty());
        assert!(match_sites(BloodType::ONeg, vec![], vec![site(1, 4)]).is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        #[test]
        fn proposals_never_exceed_deficit_or_surplus(
            deficits in prop::collection::vec(1u32..60, 0..8),
            surpluses in prop::collection::vec(1u32..60, 0..8),
        ) {
            let shortages: Vec<Site> = deficits.iter().enumerate().map(|(i, &u)| site(i as u64, u)).collect();
            let sources: Vec<Site> = surpluses.iter().enumerate().map(|(i, &u)| site(100 + i as u64, u)).collect();

            let out = match_sites(BloodType::OPos, shortages.clone(), sources.clone());

            for s in &shortages {
                let received: u32 = out.iter().filter(|o| o.to_hospital_id == s.hospital_id).map(|o| o.transfer_units).sum();
                prop_assert!(received <= s.units);
            }
            for s in &sources {
                let sent: u32 = out.iter().filter(|o| o.from_hospital_id == s.hospital_id).map(|o| o.transfer_units).sum();
                prop_assert!(sent <= s.units);
            }
            let moved: u32 = out.iter().map(|o| o.transfer_units).sum();
            prop_assert_eq!(moved, deficits.iter().sum::<u32>().min(surpluses.iter().sum::<u32>()));
        }
    }
}
