//! Geographic regions served by the network.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Region identifier (e.g. `"South Delhi"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(String);

impl RegionId {
    pub fn new(name: impl Into<String>) -> DomainResult<Self> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("region cannot be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for RegionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Regions served out of the box.
pub const DEFAULT_REGIONS: [&str; 8] = [
    "South Delhi",
    "North Delhi",
    "East Delhi",
    "West Delhi",
    "Central Delhi",
    "Noida",
    "Gurgaon",
    "Dwarka",
];

/// Ordered set of known regions.
///
/// The position of a region in the catalog is its categorical code, so the
/// order must not change for the lifetime of a trained model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionCatalog {
    regions: Vec<RegionId>,
}

impl RegionCatalog {
    pub fn new<I, S>(names: I) -> DomainResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut regions: Vec<RegionId> = Vec::new();
        for name in names {
            let region = RegionId::new(name)?;
            if regions.contains(&region) {
                return Err(DomainError::validation(format!("duplicate region: {region}")));
            }
            regions.push(region);
        }
        if regions.is_empty() {
            return Err(DomainError::validation("region catalog cannot be empty"));
        }
        Ok(Self { regions })
    }

    pub fn index_of(&self, region: &RegionId) -> Option<usize> {
        self.regions.iter().position(|r| r == region)
    }

    /// Resolve a region name against the catalog.
    pub fn resolve(&self, name: &str) -> DomainResult<RegionId> {
        let region = RegionId::new(name)?;
        if self.contains(&region) {
            Ok(region)
        } else {
            Err(DomainError::validation(format!("unknown region: {name:?}")))
        }
    }

    pub fn contains(&self, region: &RegionId) -> bool {
        self.index_of(region).is_some()
    }

    pub fn regions(&self) -> &[RegionId] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

impl Default for RegionCatalog {
    fn default() -> Self {
        Self {
            regions: DEFAULT_REGIONS
                .iter()
                .map(|r| RegionId(r.to_string()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_has_eight_regions() {
        let catalog = RegionCatalog::default();
        assert_eq!(catalog.len(), 8);
        assert_eq!(catalog.index_of(&RegionId::new("Noida").unwrap()), Some(5));
    }

    #[test]
    fn resolve_rejects_unknown_regions() {
        let catalog = RegionCatalog::default();
        assert!(catalog.resolve("  Dwarka ").is_ok());
        assert_eq!(catalog.resolve("Mumbai").unwrap_err().kind(), "validation_error");
    }

    #[test]
    fn catalog_rejects_duplicates_and_blanks() {
        assert!(RegionCatalog::new(["A", "A"]).is_err());
        assert!(RegionCatalog::new(["A", " "]).is_err());
        assert!(RegionCatalog::new(Vec::<String>::new()).is_err());
    }
}
