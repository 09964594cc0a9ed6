use std::collections::BTreeMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use bloodline_core::{HospitalId, RegionId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hospital {
    pub id: HospitalId,
    pub name: String,
    pub region: RegionId,
}

/// Read access to the hospital network (upstream collaborator).
pub trait HospitalDirectory: Send + Sync {
    fn get(&self, id: HospitalId) -> Option<Hospital>;

    /// All hospitals, ordered by id.
    fn list(&self) -> Vec<Hospital>;

    fn in_region(&self, region: &RegionId) -> Vec<Hospital> {
        self.list()
            .into_iter()
            .filter(|h| &h.region == region)
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct InMemoryHospitalDirectory {
    inner: RwLock<BTreeMap<HospitalId, Hospital>>,
}

impl InMemoryHospitalDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, hospital: Hospital) {
        self.inner
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .insert(hospital.id, hospital);
    }
}

impl HospitalDirectory for InMemoryHospitalDirectory {
    fn get(&self, id: HospitalId) -> Option<Hospital> {
        self.inner
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(&id)
            .cloned()
    }

    fn list(&self) -> Vec<Hospital> {
        self.inner
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .values()
            .cloned()
            .collect()
    }
}
