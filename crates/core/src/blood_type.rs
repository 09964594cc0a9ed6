//! Canonical ABO/Rh blood groups.

use core::str::FromStr;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DomainError;

/// One of the 8 canonical ABO/Rh combinations.
///
/// Serialized as its clinical label (`"O+"`, `"AB-"`, ...).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BloodType {
    APos,
    ANeg,
    BPos,
    BNeg,
    OPos,
    ONeg,
    AbPos,
    AbNeg,
}

impl BloodType {
    /// All canonical groups, in a fixed order used for encoding and iteration.
    pub const ALL: [BloodType; 8] = [
        BloodType::APos,
        BloodType::ANeg,
        BloodType::BPos,
        BloodType::BNeg,
        BloodType::OPos,
        BloodType::ONeg,
        BloodType::AbPos,
        BloodType::AbNeg,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BloodType::APos => "A+",
            BloodType::ANeg => "A-",
            BloodType::BPos => "B+",
            BloodType::BNeg => "B-",
            BloodType::OPos => "O+",
            BloodType::ONeg => "O-",
            BloodType::AbPos => "AB+",
            BloodType::AbNeg => "AB-",
        }
    }

    /// Position in [`BloodType::ALL`]; stable categorical code for feature encoding.
    pub fn index(&self) -> usize {
        match self {
            BloodType::APos => 0,
            BloodType::ANeg => 1,
            BloodType::BPos => 2,
            BloodType::BNeg => 3,
            BloodType::OPos => 4,
            BloodType::ONeg => 5,
            BloodType::AbPos => 6,
            BloodType::AbNeg => 7,
        }
    }
}

impl core::fmt::Display for BloodType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BloodType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept the unicode minus sign too; some upstream feeds use it.
        let normalized = s.trim().to_ascii_uppercase().replace('\u{2212}', "-");
        BloodType::ALL
            .into_iter()
            .find(|bt| bt.as_str() == normalized)
            .ok_or_else(|| DomainError::validation(format!("unknown blood type: {s:?}")))
    }
}

impl Serialize for BloodType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BloodType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_canonical_label() {
        for bt in BloodType::ALL {
            assert_eq!(bt.as_str().parse::<BloodType>().unwrap(), bt);
        }
        assert_eq!("ab\u{2212}".parse::<BloodType>().unwrap(), BloodType::AbNeg);
    }

    #[test]
    fn rejects_unknown_labels() {
        let err = "C+".parse::<BloodType>().unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[test]
    fn serializes_as_label() {
        let json = serde_json::to_string(&BloodType::OPos).unwrap();
        assert_eq!(json, "\"O+\"");
        let back: BloodType = serde_json::from_str("\"B-\"").unwrap();
        assert_eq!(back, BloodType::BNeg);
    }

    #[test]
    fn index_matches_position_in_all() {
        for (i, bt) in BloodType::ALL.iter().enumerate() {
            assert_eq!(bt.index(), i);
        }
    }
}
